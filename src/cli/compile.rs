use std::path::PathBuf;
use std::process;

use clap::Args;

#[derive(Args)]
pub struct CompileArgs {
    /// Input .jack file or directory of .jack files
    pub input: PathBuf,
}

pub fn cmd_compile(args: CompileArgs) {
    let outcome = match jackc::compile_path(&args.input) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {}: {}", args.input.display(), e);
            process::exit(1);
        }
    };

    for path in &outcome.compiled {
        eprintln!("Compiled -> {}", path.display());
    }

    if outcome.failures > 0 {
        eprintln!(
            "error: {} file{} failed to compile",
            outcome.failures,
            if outcome.failures == 1 { "" } else { "s" }
        );
        process::exit(1);
    }
}
