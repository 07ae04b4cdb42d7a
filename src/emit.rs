use crate::vm::{Segment, VmCommand, VmOp};

/// Append-only writer of VM commands.
///
/// The compilation engine drives this; `finish` renders one command per line
/// in the canonical textual grammar.
pub struct VmEmitter {
    output: Vec<VmCommand>,
}

impl Default for VmEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl VmEmitter {
    pub fn new() -> Self {
        Self { output: Vec::new() }
    }

    pub fn push(&mut self, segment: Segment, index: u16) {
        self.output.push(VmCommand::Push(segment, index));
    }

    pub fn pop(&mut self, segment: Segment, index: u16) {
        self.output.push(VmCommand::Pop(segment, index));
    }

    /// Emit the VM command for a binary source operator.
    ///
    /// `*` and `/` have no VM instruction and lower to runtime calls.
    pub fn binary_op(&mut self, op: char) {
        match op {
            '+' => self.arithmetic(VmOp::Add),
            '-' => self.arithmetic(VmOp::Sub),
            '=' => self.arithmetic(VmOp::Eq),
            '>' => self.arithmetic(VmOp::Gt),
            '<' => self.arithmetic(VmOp::Lt),
            '&' => self.arithmetic(VmOp::And),
            '|' => self.arithmetic(VmOp::Or),
            '~' => self.arithmetic(VmOp::Not),
            '*' => self.call("Math.multiply", 2),
            '/' => self.call("Math.divide", 2),
            other => unreachable!("'{}' is not an operator", other),
        }
    }

    pub fn arithmetic(&mut self, op: VmOp) {
        self.output.push(VmCommand::Arithmetic(op));
    }

    pub fn label(&mut self, name: &str) {
        self.output.push(VmCommand::Label(name.to_string()));
    }

    pub fn goto(&mut self, name: &str) {
        self.output.push(VmCommand::Goto(name.to_string()));
    }

    pub fn if_goto(&mut self, name: &str) {
        self.output.push(VmCommand::IfGoto(name.to_string()));
    }

    pub fn call(&mut self, function: &str, n_args: u16) {
        self.output
            .push(VmCommand::Call(function.to_string(), n_args));
    }

    pub fn function(&mut self, function: &str, n_locals: u16) {
        self.output
            .push(VmCommand::Function(function.to_string(), n_locals));
    }

    pub fn ret(&mut self) {
        self.output.push(VmCommand::Return);
    }

    /// Render the emitted commands, one per line.
    pub fn finish(self) -> String {
        let mut text = String::new();
        for cmd in &self.output {
            text.push_str(&cmd.to_string());
            text.push('\n');
        }
        text
    }
}
