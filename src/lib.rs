pub mod asm;
pub mod diagnostic;
pub mod emit;
pub mod engine;
pub mod lexer;
pub mod span;
pub mod symtab;
pub mod token;
pub mod vm;

#[cfg(test)]
mod api_tests;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use asm::AsmTranslator;
use diagnostic::{render_diagnostics, Diagnostic};
use engine::CompilationEngine;
use lexer::Lexer;

/// Compile one Jack source text to VM text.
///
/// Diagnostics are returned, not rendered; the drivers decide how to show
/// them. Lexing scans the whole file, so several lexical errors may come
/// back at once; parsing stops at the first violation.
pub fn compile_source(source: &str) -> Result<String, Vec<Diagnostic>> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }
    CompilationEngine::new(tokens)
        .compile_class()
        .map_err(|diag| vec![diag])
}

/// Translate already-parsed VM files, in order, into one assembly artifact.
/// `files` pairs each file's stem with its VM source text. On error, the
/// index of the failing file comes back with the diagnostic.
pub fn translate_program(files: &[(&str, &str)]) -> Result<String, (usize, Diagnostic)> {
    let mut translator = AsmTranslator::new();
    translator.emit_bootstrap();
    for (position, (stem, source)) in files.iter().enumerate() {
        translator.set_file_stem(stem);
        let commands = vm::parse_program(source).map_err(|diag| (position, diag))?;
        for cmd in &commands {
            translator.translate(cmd);
        }
    }
    Ok(translator.finish())
}

/// What a front-end run over a file or directory produced.
#[derive(Debug)]
pub struct CompileOutcome {
    /// Output paths written (or, for a check run, inputs that passed).
    pub compiled: Vec<PathBuf>,
    /// Number of files that failed with rendered diagnostics.
    pub failures: usize,
}

/// Compile a `.jack` file or a directory of them; each `F.jack` produces a
/// sibling `F.vm`. Files keep compiling after one fails; IO errors abort.
pub fn compile_path(input: &Path) -> io::Result<CompileOutcome> {
    run_front_end(input, true)
}

/// Compile without writing any output.
pub fn check_path(input: &Path) -> io::Result<CompileOutcome> {
    run_front_end(input, false)
}

fn run_front_end(input: &Path, write_output: bool) -> io::Result<CompileOutcome> {
    let files = gather_inputs(input, "jack")?;
    let mut outcome = CompileOutcome {
        compiled: Vec::new(),
        failures: 0,
    };
    for file in &files {
        let source = fs::read_to_string(file)?;
        match compile_source(&source) {
            Ok(vm_text) => {
                if write_output {
                    let out_path = file.with_extension("vm");
                    fs::write(&out_path, vm_text)?;
                    outcome.compiled.push(out_path);
                } else {
                    outcome.compiled.push(file.clone());
                }
            }
            Err(diags) => {
                render_diagnostics(&diags, &file.to_string_lossy(), &source);
                outcome.failures += 1;
            }
        }
    }
    Ok(outcome)
}

/// Translate a `.vm` file or a directory of them into a single `.asm`
/// artifact at `output`, prefixed with the bootstrap. Returns whether the
/// run succeeded; a malformed VM file is rendered and nothing is written.
pub fn translate_path(input: &Path, output: &Path) -> io::Result<bool> {
    let files = gather_inputs(input, "vm")?;
    let mut sources = Vec::new();
    for file in &files {
        sources.push((file.clone(), fs::read_to_string(file)?));
    }

    let named: Vec<(&str, &str)> = sources
        .iter()
        .map(|(file, source)| (file_stem(file), source.as_str()))
        .collect();

    match translate_program(&named) {
        Ok(asm_text) => {
            fs::write(output, asm_text)?;
            Ok(true)
        }
        Err((position, diag)) => {
            let (file, source) = &sources[position];
            diag.render(&file.to_string_lossy(), source);
            Ok(false)
        }
    }
}

/// Resolve a file-or-directory argument to an ordered input list. Directory
/// contents are filtered by extension and sorted by file name so runs are
/// deterministic.
fn gather_inputs(input: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    if input.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(input)?
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect();
        files.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
        if files.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no .{} files in '{}'", extension, input.display()),
            ));
        }
        return Ok(files);
    }

    if !input.extension().is_some_and(|ext| ext == extension) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a .{} file", input.display(), extension),
        ));
    }
    Ok(vec![input.to_path_buf()])
}

fn file_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
}
