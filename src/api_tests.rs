use std::fs;

use crate::diagnostic::ErrorKind;
use crate::*;

fn compile(source: &str) -> String {
    compile_source(source).expect("source should compile")
}

#[test]
fn test_compile_is_deterministic() {
    let source = "class A { field int x; method void bump() { let x = x + 1; \
                  if (x > 10) { let x = 0; } return; } }";
    assert_eq!(compile(source), compile(source));
}

#[test]
fn test_full_class_output() {
    let source = r#"
class Point {
    field int x, y;
    static int count;

    constructor Point new(int ax, int ay) {
        let x = ax;
        let y = ay;
        let count = count + 1;
        return this;
    }

    method int getX() {
        return x;
    }

    function int total() {
        return count;
    }
}
"#;
    insta::assert_snapshot!(compile(source), @r"
    function Point.new 0
    push constant 2
    call Memory.alloc 1
    pop pointer 0
    push argument 0
    pop this 0
    push argument 1
    pop this 1
    push static 0
    push constant 1
    add
    pop static 0
    push pointer 0
    return
    function Point.getX 0
    push argument 0
    pop pointer 0
    push this 0
    return
    function Point.total 0
    push static 0
    return
    ");
}

#[test]
fn test_compile_source_reports_lexical_errors() {
    let diags = compile_source("class A { function void t() { let x = 1 $ 2; } }").unwrap_err();
    assert!(!diags.is_empty());
    assert_eq!(diags[0].kind, ErrorKind::Lexical);
}

#[test]
fn test_compile_source_reports_syntax_errors() {
    let diags = compile_source("class A { function void t() { let } }").unwrap_err();
    assert_eq!(diags.len(), 1, "parsing stops at the first violation");
    assert_eq!(diags[0].kind, ErrorKind::Syntax);
}

#[test]
fn test_string_with_comment_markers_survives_pipeline() {
    let vm = compile(
        "class A { function String t() { return \"a // b /* c\"; } }",
    );
    // one appendChar per character of the 11-character literal
    assert_eq!(vm.matches("call String.appendChar 2").count(), 11);
}

#[test]
fn test_translate_emits_bootstrap_exactly_once() {
    let a = "function A.init 0\npush constant 1\nreturn\n";
    let b = "function B.init 0\npush constant 2\nreturn\n";
    let asm = translate_program(&[("A", a), ("B", b)]).unwrap();
    assert_eq!(asm.matches("@256").count(), 1);
    assert_eq!(asm.matches("@Sys.init").count(), 1);
    let sp = asm.find("@256").unwrap();
    let first_fn = asm.find("(A.init)").unwrap();
    assert!(sp < first_fn, "bootstrap precedes all translated commands");
}

#[test]
fn test_translate_keeps_statics_apart_per_file() {
    let a = "push static 0\n";
    let b = "pop static 0\n";
    let asm = translate_program(&[("A", a), ("B", b)]).unwrap();
    assert!(asm.contains("@A.0"));
    assert!(asm.contains("@B.0"));
}

#[test]
fn test_translate_reports_failing_file() {
    let good = "push constant 1\n";
    let bad = "push constant 1\nshove constant 2\n";
    let (position, diag) = translate_program(&[("A", good), ("B", bad)]).unwrap_err();
    assert_eq!(position, 1);
    assert!(diag.message.contains("malformed"));
}

#[test]
fn test_backend_comparison_scenario() {
    let source = "push constant 7\npush constant 8\nadd\npush constant 5\neq\npush constant 0\nlt\n";
    let asm = translate_program(&[("Test", source)]).unwrap();
    // the two comparisons own distinct label families, each defined once
    for label in ["(TRUE_0)", "(END_0)", "(TRUE_1)", "(END_1)"] {
        assert_eq!(asm.matches(label).count(), 1, "{} defined once", label);
    }
    assert!(asm.contains("M=-1"), "canonical true");
    assert!(asm.contains("D;JEQ"));
    assert!(asm.contains("D;JLT"));
}

#[test]
fn test_front_to_back_pipeline() {
    let vm = compile(
        "class Main { function void main() { do Output.printInt(1 + 2); return; } }",
    );
    let asm = translate_program(&[("Main", &vm)]).unwrap();
    assert!(asm.contains("(Main.main)"));
    assert!(asm.contains("@Output.printInt"));
    assert_eq!(asm.matches("@256").count(), 1);
}

// --- Filesystem drivers ---

#[test]
fn test_compile_path_writes_sibling_vm_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Main.jack"),
        "class Main { function void main() { return; } }",
    )
    .unwrap();
    fs::write(
        dir.path().join("Square.jack"),
        "class Square { field int size; method int size() { return size; } }",
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let outcome = compile_path(dir.path()).unwrap();
    assert_eq!(outcome.failures, 0);
    assert_eq!(
        outcome.compiled,
        vec![dir.path().join("Main.vm"), dir.path().join("Square.vm")],
        "lexicographic order, .jack files only"
    );
    let vm = fs::read_to_string(dir.path().join("Main.vm")).unwrap();
    assert!(vm.starts_with("function Main.main 0"));
}

#[test]
fn test_compile_path_continues_past_a_failing_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Bad.jack"), "class Bad { function }").unwrap();
    fs::write(
        dir.path().join("Good.jack"),
        "class Good { function void t() { return; } }",
    )
    .unwrap();

    let outcome = compile_path(dir.path()).unwrap();
    assert_eq!(outcome.failures, 1);
    assert!(dir.path().join("Good.vm").exists());
    assert!(!dir.path().join("Bad.vm").exists());
}

#[test]
fn test_check_path_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Main.jack");
    fs::write(&file, "class Main { function void main() { return; } }").unwrap();

    let outcome = check_path(&file).unwrap();
    assert_eq!(outcome.failures, 0);
    assert_eq!(outcome.compiled, vec![file]);
    assert!(!dir.path().join("Main.vm").exists());
}

#[test]
fn test_translate_path_produces_one_artifact() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("A.vm"), "function A.f 0\npush static 0\nreturn\n").unwrap();
    fs::write(dir.path().join("B.vm"), "function B.g 0\npop static 0\nreturn\n").unwrap();
    let out = dir.path().join("out.asm");

    assert!(translate_path(dir.path(), &out).unwrap());
    let asm = fs::read_to_string(&out).unwrap();
    assert_eq!(asm.matches("@256").count(), 1);
    assert!(asm.contains("@A.0"));
    assert!(asm.contains("@B.0"));
}

#[test]
fn test_translate_path_writes_nothing_on_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("A.vm"), "nonsense here\n").unwrap();
    let out = dir.path().join("out.asm");

    assert!(!translate_path(dir.path(), &out).unwrap());
    assert!(!out.exists());
}

#[test]
fn test_wrong_extension_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Main.txt");
    fs::write(&file, "class Main {}").unwrap();

    let err = compile_path(&file).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn test_empty_directory_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = compile_path(dir.path()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}
