use crate::vm::{Segment, VmCommand, VmOp};

/// Translates VM commands into Hack assembly.
///
/// One translator produces one `.asm` artifact, possibly from several `.vm`
/// files. Per-run state: the stem of the file currently being translated
/// (static variables are named `<stem>.<index>`), the enclosing function
/// (VM branch labels are scoped to it), and two monotonic counters for
/// comparison and return-address labels.
pub struct AsmTranslator {
    output: Vec<String>,
    file_stem: String,
    current_function: String,
    cmp_counter: u32,
    call_counter: u32,
}

impl Default for AsmTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl AsmTranslator {
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            file_stem: String::new(),
            current_function: String::new(),
            cmp_counter: 0,
            call_counter: 0,
        }
    }

    /// Emit the VM initialization: `SP = 256`, then `call Sys.init 0`.
    /// Must run exactly once, before any translated command.
    pub fn emit_bootstrap(&mut self) {
        self.comment("bootstrap");
        self.inst("@256");
        self.inst("D=A");
        self.inst("@SP");
        self.inst("M=D");
        self.emit_call("Sys.init", 0);
    }

    /// Announce the stem of the next input file so its static references
    /// do not alias another file's.
    pub fn set_file_stem(&mut self, stem: &str) {
        self.file_stem = stem.to_string();
    }

    pub fn translate(&mut self, cmd: &VmCommand) {
        self.comment(&cmd.to_string());
        match cmd {
            VmCommand::Push(segment, index) => self.emit_push(*segment, *index),
            VmCommand::Pop(segment, index) => self.emit_pop(*segment, *index),
            VmCommand::Arithmetic(op) => self.emit_arithmetic(*op),
            VmCommand::Label(name) => {
                let scoped = self.scoped_label(name);
                self.raw(&format!("({})", scoped));
            }
            VmCommand::Goto(name) => {
                let scoped = self.scoped_label(name);
                self.inst(&format!("@{}", scoped));
                self.inst("0;JMP");
            }
            VmCommand::IfGoto(name) => {
                let scoped = self.scoped_label(name);
                self.pop_to_d();
                self.inst(&format!("@{}", scoped));
                self.inst("D;JNE");
            }
            VmCommand::Call(function, n_args) => self.emit_call(function, *n_args),
            VmCommand::Function(function, n_locals) => self.emit_function(function, *n_locals),
            VmCommand::Return => self.emit_return(),
        }
    }

    pub fn finish(self) -> String {
        let mut text = self.output.join("\n");
        text.push('\n');
        text
    }

    fn emit_push(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Constant => {
                self.inst(&format!("@{}", index));
                self.inst("D=A");
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                self.inst(&format!("@{}", index));
                self.inst("D=A");
                self.inst(&format!("@{}", base_pointer(segment)));
                self.inst("A=D+M");
                self.inst("D=M");
            }
            Segment::Pointer => {
                self.inst(&format!("@{}", pointer_target(index)));
                self.inst("D=M");
            }
            Segment::Temp => {
                self.inst(&format!("@{}", 5 + index));
                self.inst("D=M");
            }
            Segment::Static => {
                self.inst(&format!("@{}.{}", self.file_stem, index));
                self.inst("D=M");
            }
        }
        self.push_d();
    }

    fn emit_pop(&mut self, segment: Segment, index: u16) {
        match segment {
            Segment::Constant => unreachable!("pop constant is rejected by the command parser"),
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                // target address into R13, then store the popped value there
                self.inst(&format!("@{}", base_pointer(segment)));
                self.inst("D=M");
                self.inst(&format!("@{}", index));
                self.inst("D=D+A");
                self.inst("@R13");
                self.inst("M=D");
                self.pop_to_d();
                self.inst("@R13");
                self.inst("A=M");
                self.inst("M=D");
            }
            Segment::Pointer => {
                self.pop_to_d();
                self.inst(&format!("@{}", pointer_target(index)));
                self.inst("M=D");
            }
            Segment::Temp => {
                self.pop_to_d();
                self.inst(&format!("@{}", 5 + index));
                self.inst("M=D");
            }
            Segment::Static => {
                self.pop_to_d();
                self.inst(&format!("@{}.{}", self.file_stem, index));
                self.inst("M=D");
            }
        }
    }

    fn emit_arithmetic(&mut self, op: VmOp) {
        match op {
            VmOp::Add => self.binary("M=M+D"),
            VmOp::Sub => self.binary("M=M-D"),
            VmOp::And => self.binary("M=M&D"),
            VmOp::Or => self.binary("M=M|D"),
            VmOp::Neg => self.unary("M=-M"),
            VmOp::Not => self.unary("M=!M"),
            VmOp::Eq => self.comparison("D;JEQ"),
            VmOp::Gt => self.comparison("D;JGT"),
            VmOp::Lt => self.comparison("D;JLT"),
        }
    }

    /// Two operands collapse into one result slot.
    fn binary(&mut self, store: &str) {
        self.inst("@SP");
        self.inst("AM=M-1");
        self.inst("D=M");
        self.inst("A=A-1");
        self.inst(store);
    }

    /// The top of the stack is rewritten in place.
    fn unary(&mut self, store: &str) {
        self.inst("@SP");
        self.inst("A=M-1");
        self.inst(store);
    }

    /// Compare the two top slots; true is all ones, false is zero. The
    /// counter value is captured once so every label in this comparison
    /// agrees, and advanced once so the next comparison gets fresh names.
    fn comparison(&mut self, jump: &str) {
        let k = self.cmp_counter;
        self.cmp_counter += 1;

        self.inst("@SP");
        self.inst("AM=M-1");
        self.inst("D=M");
        self.inst("A=A-1");
        self.inst("D=M-D");
        self.inst(&format!("@TRUE_{}", k));
        self.inst(jump);
        self.inst("@SP");
        self.inst("A=M-1");
        self.inst("M=0");
        self.inst(&format!("@END_{}", k));
        self.inst("0;JMP");
        self.raw(&format!("(TRUE_{})", k));
        self.inst("@SP");
        self.inst("A=M-1");
        self.inst("M=-1");
        self.raw(&format!("(END_{})", k));
    }

    /// Caller side: save the return address and the four frame pointers,
    /// reposition ARG and LCL, jump.
    fn emit_call(&mut self, function: &str, n_args: u16) {
        let ret = format!("RET_{}", self.call_counter);
        self.call_counter += 1;

        self.inst(&format!("@{}", ret));
        self.inst("D=A");
        self.push_d();
        for pointer in ["LCL", "ARG", "THIS", "THAT"] {
            self.inst(&format!("@{}", pointer));
            self.inst("D=M");
            self.push_d();
        }
        // ARG = SP - n_args - 5
        self.inst("@SP");
        self.inst("D=M");
        self.inst("@5");
        self.inst("D=D-A");
        self.inst(&format!("@{}", n_args));
        self.inst("D=D-A");
        self.inst("@ARG");
        self.inst("M=D");
        // LCL = SP
        self.inst("@SP");
        self.inst("D=M");
        self.inst("@LCL");
        self.inst("M=D");
        self.inst(&format!("@{}", function));
        self.inst("0;JMP");
        self.raw(&format!("({})", ret));
    }

    fn emit_function(&mut self, function: &str, n_locals: u16) {
        self.current_function = function.to_string();
        self.raw(&format!("({})", function));
        for _ in 0..n_locals {
            self.inst("@SP");
            self.inst("A=M");
            self.inst("M=0");
            self.inst("@SP");
            self.inst("M=M+1");
        }
    }

    /// Callee side. The return address is captured from FRAME-5 before the
    /// stack is rewritten: with zero arguments the saved address sits in
    /// the very slot `*ARG = pop()` overwrites.
    fn emit_return(&mut self) {
        // R13 = FRAME = LCL
        self.inst("@LCL");
        self.inst("D=M");
        self.inst("@R13");
        self.inst("M=D");
        // R14 = RET = *(FRAME-5)
        self.inst("@5");
        self.inst("A=D-A");
        self.inst("D=M");
        self.inst("@R14");
        self.inst("M=D");
        // *ARG = pop()
        self.pop_to_d();
        self.inst("@ARG");
        self.inst("A=M");
        self.inst("M=D");
        // SP = ARG + 1
        self.inst("@ARG");
        self.inst("D=M");
        self.inst("@SP");
        self.inst("M=D+1");
        // restore THAT, THIS, ARG, LCL from FRAME-1..FRAME-4
        for pointer in ["THAT", "THIS", "ARG", "LCL"] {
            self.inst("@R13");
            self.inst("AM=M-1");
            self.inst("D=M");
            self.inst(&format!("@{}", pointer));
            self.inst("M=D");
        }
        // goto RET
        self.inst("@R14");
        self.inst("A=M");
        self.inst("0;JMP");
    }

    /// Branch labels live in the namespace of their enclosing function.
    fn scoped_label(&self, name: &str) -> String {
        if self.current_function.is_empty() {
            name.to_string()
        } else {
            format!("{}${}", self.current_function, name)
        }
    }

    fn push_d(&mut self) {
        self.inst("@SP");
        self.inst("A=M");
        self.inst("M=D");
        self.inst("@SP");
        self.inst("M=M+1");
    }

    fn pop_to_d(&mut self) {
        self.inst("@SP");
        self.inst("AM=M-1");
        self.inst("D=M");
    }

    fn inst(&mut self, instruction: &str) {
        self.output.push(format!("    {}", instruction));
    }

    fn raw(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn comment(&mut self, text: &str) {
        self.output.push(format!("// {}", text));
    }
}

fn base_pointer(segment: Segment) -> &'static str {
    match segment {
        Segment::Local => "LCL",
        Segment::Argument => "ARG",
        Segment::This => "THIS",
        Segment::That => "THAT",
        _ => unreachable!("segment {} has no base pointer", segment.as_str()),
    }
}

fn pointer_target(index: u16) -> &'static str {
    if index == 0 {
        "THIS"
    } else {
        "THAT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::parse_program;

    fn translate(stem: &str, source: &str) -> String {
        let mut translator = AsmTranslator::new();
        translator.set_file_stem(stem);
        for cmd in parse_program(source).unwrap() {
            translator.translate(&cmd);
        }
        translator.finish()
    }

    fn code_lines(asm: &str) -> Vec<&str> {
        asm.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("//"))
            .collect()
    }

    #[test]
    fn test_push_constant() {
        let asm = translate("Test", "push constant 7");
        assert_eq!(
            code_lines(&asm),
            vec!["@7", "D=A", "@SP", "A=M", "M=D", "@SP", "M=M+1"]
        );
    }

    #[test]
    fn test_push_local_offsets_through_base_pointer() {
        let asm = translate("Test", "push local 2");
        assert_eq!(
            code_lines(&asm),
            vec!["@2", "D=A", "@LCL", "A=D+M", "D=M", "@SP", "A=M", "M=D", "@SP", "M=M+1"]
        );
    }

    #[test]
    fn test_pop_argument_uses_scratch_register() {
        let asm = translate("Test", "pop argument 3");
        assert_eq!(
            code_lines(&asm),
            vec![
                "@ARG", "D=M", "@3", "D=D+A", "@R13", "M=D", "@SP", "AM=M-1", "D=M", "@R13",
                "A=M", "M=D",
            ]
        );
    }

    #[test]
    fn test_pointer_and_temp_are_direct() {
        let asm = translate("Test", "push pointer 0\npush pointer 1\npush temp 3");
        let lines = code_lines(&asm);
        assert!(lines.contains(&"@THIS"));
        assert!(lines.contains(&"@THAT"));
        assert!(lines.contains(&"@8"));
    }

    #[test]
    fn test_static_uses_file_stem() {
        let asm = translate("Counter", "push static 2\npop static 5");
        let lines = code_lines(&asm);
        assert!(lines.contains(&"@Counter.2"));
        assert!(lines.contains(&"@Counter.5"));
    }

    #[test]
    fn test_static_stems_do_not_alias_across_files() {
        let mut translator = AsmTranslator::new();
        translator.set_file_stem("A");
        translator.translate(&VmCommand::Pop(Segment::Static, 0));
        translator.set_file_stem("B");
        translator.translate(&VmCommand::Pop(Segment::Static, 0));
        let asm = translator.finish();
        assert!(asm.contains("@A.0"));
        assert!(asm.contains("@B.0"));
    }

    #[test]
    fn test_binary_and_unary_ops() {
        let asm = translate("Test", "add");
        assert_eq!(code_lines(&asm), vec!["@SP", "AM=M-1", "D=M", "A=A-1", "M=M+D"]);

        let asm = translate("Test", "sub");
        assert!(code_lines(&asm).contains(&"M=M-D"));

        let asm = translate("Test", "neg");
        assert_eq!(code_lines(&asm), vec!["@SP", "A=M-1", "M=-M"]);

        let asm = translate("Test", "not");
        assert!(code_lines(&asm).contains(&"M=!M"));
    }

    #[test]
    fn test_comparison_uses_fresh_labels() {
        let asm = translate("Test", "eq\ngt\nlt");
        assert!(asm.contains("@TRUE_0"));
        assert!(asm.contains("(TRUE_0)"));
        assert!(asm.contains("@TRUE_1"));
        assert!(asm.contains("@TRUE_2"));
        assert!(asm.contains("(END_2)"));
        assert!(asm.contains("D;JEQ"));
        assert!(asm.contains("D;JGT"));
        assert!(asm.contains("D;JLT"));
        // each label is defined exactly once
        for label in ["(TRUE_0)", "(END_0)", "(TRUE_1)", "(END_1)"] {
            assert_eq!(asm.matches(label).count(), 1, "{} defined once", label);
        }
    }

    #[test]
    fn test_comparison_pushes_canonical_booleans() {
        let asm = translate("Test", "eq");
        let lines = code_lines(&asm);
        assert!(lines.contains(&"M=-1"), "true is all ones");
        assert!(lines.contains(&"M=0"), "false is zero");
    }

    #[test]
    fn test_labels_are_function_scoped() {
        let source = "function A.f 0\nlabel LOOP\ngoto LOOP\nfunction A.g 0\nlabel LOOP\nif-goto LOOP\n";
        let asm = translate("Test", source);
        assert!(asm.contains("(A.f$LOOP)"));
        assert!(asm.contains("(A.g$LOOP)"));
        assert_eq!(asm.matches("(A.f$LOOP)").count(), 1);
        // both branches target their own function's copy
        assert!(asm.contains("@A.f$LOOP"));
        assert!(asm.contains("@A.g$LOOP"));
    }

    #[test]
    fn test_if_goto_pops_the_condition() {
        let asm = translate("Test", "function A.f 0\nif-goto X");
        let lines = code_lines(&asm);
        let at = lines.iter().position(|l| *l == "@A.f$X").unwrap();
        assert_eq!(lines[at - 1], "D=M");
        assert_eq!(lines[at + 1], "D;JNE");
    }

    #[test]
    fn test_function_entry_zeroes_locals() {
        let asm = translate("Test", "function A.f 2");
        let lines = code_lines(&asm);
        assert_eq!(lines[0], "(A.f)");
        assert_eq!(lines.iter().filter(|l| **l == "M=0").count(), 2);
    }

    #[test]
    fn test_call_saves_frame_and_repositions_arg() {
        let asm = translate("Test", "call Main.run 2");
        let lines = code_lines(&asm);
        assert_eq!(lines[0], "@RET_0");
        for pointer in ["@LCL", "@ARG", "@THIS", "@THAT"] {
            assert!(lines.contains(&pointer), "{} is saved", pointer);
        }
        assert!(lines.contains(&"@Main.run"));
        assert_eq!(*lines.last().unwrap(), "(RET_0)");
    }

    #[test]
    fn test_call_counter_is_translator_global() {
        let asm = translate("Test", "call A.f 0\ncall A.f 0");
        assert!(asm.contains("(RET_0)"));
        assert!(asm.contains("(RET_1)"));
    }

    #[test]
    fn test_return_captures_ret_before_unwinding() {
        let asm = translate("Test", "return");
        let lines = code_lines(&asm);
        let ret_saved = lines.iter().position(|l| *l == "@R14").unwrap();
        let arg_store = lines
            .iter()
            .position(|l| *l == "@ARG")
            .unwrap();
        assert!(
            ret_saved < arg_store,
            "return address must be read before *ARG is overwritten"
        );
        // frame pointers are restored in reverse save order
        let that = lines.iter().position(|l| *l == "@THAT").unwrap();
        let this = lines.iter().position(|l| *l == "@THIS").unwrap();
        let lcl = lines.iter().rposition(|l| *l == "@LCL").unwrap();
        assert!(that < this && this < lcl);
        assert_eq!(*lines.last().unwrap(), "0;JMP");
    }

    #[test]
    fn test_bootstrap_sets_sp_then_calls_sys_init() {
        let mut translator = AsmTranslator::new();
        translator.emit_bootstrap();
        let asm = translator.finish();
        let lines = code_lines(&asm);
        assert_eq!(lines[0], "@256");
        assert_eq!(lines[1], "D=A");
        assert_eq!(lines[2], "@SP");
        assert_eq!(lines[3], "M=D");
        assert!(asm.contains("@Sys.init"));
        assert!(asm.contains("(RET_0)"));
    }

    #[test]
    fn test_add_then_compare_scenario() {
        let asm = translate(
            "Test",
            "push constant 7\npush constant 8\nadd\npush constant 5\neq\nlt",
        );
        // the eq and the lt get distinct label families
        assert!(asm.contains("(TRUE_0)"));
        assert!(asm.contains("(TRUE_1)"));
        assert_eq!(asm.matches("(END_0)").count(), 1);
        assert_eq!(asm.matches("(END_1)").count(), 1);
    }
}
