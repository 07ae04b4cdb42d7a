use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// The eight memory segments of the VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub fn from_name(s: &str) -> Option<Segment> {
        match s {
            "constant" => Some(Segment::Constant),
            "argument" => Some(Segment::Argument),
            "local" => Some(Segment::Local),
            "static" => Some(Segment::Static),
            "this" => Some(Segment::This),
            "that" => Some(Segment::That),
            "pointer" => Some(Segment::Pointer),
            "temp" => Some(Segment::Temp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The nine arithmetic/logical stack operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl VmOp {
    pub fn from_name(s: &str) -> Option<VmOp> {
        match s {
            "add" => Some(VmOp::Add),
            "sub" => Some(VmOp::Sub),
            "neg" => Some(VmOp::Neg),
            "eq" => Some(VmOp::Eq),
            "gt" => Some(VmOp::Gt),
            "lt" => Some(VmOp::Lt),
            "and" => Some(VmOp::And),
            "or" => Some(VmOp::Or),
            "not" => Some(VmOp::Not),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VmOp::Add => "add",
            VmOp::Sub => "sub",
            VmOp::Neg => "neg",
            VmOp::Eq => "eq",
            VmOp::Gt => "gt",
            VmOp::Lt => "lt",
            VmOp::And => "and",
            VmOp::Or => "or",
            VmOp::Not => "not",
        }
    }
}

impl fmt::Display for VmOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One VM command. `Display` renders the canonical one-line form.
#[derive(Clone, Debug, PartialEq)]
pub enum VmCommand {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(VmOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Call(String, u16),
    Function(String, u16),
    Return,
}

impl fmt::Display for VmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmCommand::Push(seg, i) => write!(f, "push {} {}", seg, i),
            VmCommand::Pop(seg, i) => write!(f, "pop {} {}", seg, i),
            VmCommand::Arithmetic(op) => write!(f, "{}", op),
            VmCommand::Label(name) => write!(f, "label {}", name),
            VmCommand::Goto(name) => write!(f, "goto {}", name),
            VmCommand::IfGoto(name) => write!(f, "if-goto {}", name),
            VmCommand::Call(func, n) => write!(f, "call {} {}", func, n),
            VmCommand::Function(func, n) => write!(f, "function {} {}", func, n),
            VmCommand::Return => write!(f, "return"),
        }
    }
}

/// Parse one line of VM text. Blank lines and `// ...` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<VmCommand>, String> {
    let code = line.split("//").next().unwrap_or("").trim();
    if code.is_empty() {
        return Ok(None);
    }

    let words: Vec<&str> = code.split_whitespace().collect();
    let cmd = match words.as_slice() {
        [op] if VmOp::from_name(op).is_some() => {
            VmCommand::Arithmetic(VmOp::from_name(op).unwrap_or(VmOp::Add))
        }
        ["return"] => VmCommand::Return,
        ["push", seg, index] => VmCommand::Push(parse_segment(seg)?, parse_index(seg, index)?),
        ["pop", seg, index] => {
            if *seg == "constant" {
                return Err("cannot pop to the constant segment".to_string());
            }
            VmCommand::Pop(parse_segment(seg)?, parse_index(seg, index)?)
        }
        ["label", name] => VmCommand::Label(name.to_string()),
        ["goto", name] => VmCommand::Goto(name.to_string()),
        ["if-goto", name] => VmCommand::IfGoto(name.to_string()),
        ["call", func, n] => VmCommand::Call(func.to_string(), parse_count(n)?),
        ["function", func, n] => VmCommand::Function(func.to_string(), parse_count(n)?),
        _ => return Err(format!("malformed VM command '{}'", code)),
    };
    Ok(Some(cmd))
}

fn parse_segment(s: &str) -> Result<Segment, String> {
    Segment::from_name(s).ok_or_else(|| format!("unknown segment '{}'", s))
}

fn parse_index(seg: &str, s: &str) -> Result<u16, String> {
    let index: u16 = s
        .parse()
        .map_err(|_| format!("invalid index '{}'", s))?;
    match seg {
        "temp" if index > 7 => Err(format!("temp index {} out of range 0..=7", index)),
        "pointer" if index > 1 => Err(format!("pointer index {} must be 0 or 1", index)),
        _ => Ok(index),
    }
}

fn parse_count(s: &str) -> Result<u16, String> {
    s.parse().map_err(|_| format!("invalid count '{}'", s))
}

/// Parse a whole `.vm` file, attaching the offending line's span to errors.
pub fn parse_program(source: &str) -> Result<Vec<VmCommand>, Diagnostic> {
    let mut commands = Vec::new();
    let mut offset = 0u32;
    for line in source.lines() {
        match parse_line(line) {
            Ok(Some(cmd)) => commands.push(cmd),
            Ok(None) => {}
            Err(msg) => {
                let span = Span::new(offset, offset + line.len() as u32);
                return Err(Diagnostic::syntax(msg, span)
                    .with_help("expected a stack, branch, or function command".to_string()));
            }
        }
        offset += line.len() as u32 + 1;
    }
    Ok(commands)
}
