use crate::span::Span;

/// A compiler diagnostic: what went wrong, where, and optionally how to fix it.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

/// The phase a diagnostic originates from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed token: stray character, unterminated string, oversized integer.
    Lexical,
    /// Grammar violation: an unexpected token where a production required another.
    Syntax,
    /// Well-formed but meaningless: undefined names, wrong constructor type.
    Semantic,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Semantic => "semantic error",
        }
    }
}

impl Diagnostic {
    pub fn lexical(message: String, span: Span) -> Self {
        Self::new(ErrorKind::Lexical, message, span)
    }

    pub fn syntax(message: String, span: Span) -> Self {
        Self::new(ErrorKind::Syntax, message, span)
    }

    pub fn semantic(message: String, span: Span) -> Self {
        Self::new(ErrorKind::Semantic, message, span)
    }

    fn new(kind: ErrorKind, message: String, span: Span) -> Self {
        Self {
            kind,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let mut report = Report::build(
            ReportKind::Custom(self.kind.label(), Color::Red),
            filename,
            self.span.start as usize,
        )
        .with_message(&self.message)
        .with_label(
            Label::new((filename, self.span.start as usize..self.span.end as usize))
                .with_message(&self.message)
                .with_color(Color::Red),
        );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report
            .finish()
            .eprint((filename, Source::from(source)))
            .ok();
    }
}

/// Render a list of diagnostics against one source file.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}
