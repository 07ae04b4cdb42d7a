use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};
use crate::token::{Keyword, Token, MAX_INT, SYMBOLS};

/// Breaks one `.jack` source file into tokens.
///
/// Comments are recognized only while scanning ordinary code; a `//` or `/*`
/// inside a string literal is part of the string. The token stream always
/// ends with a single `Eof` token.
pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Token>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Token> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Token::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            if ch.is_ascii_digit() {
                return self.scan_number();
            }

            if ch == b'"' {
                return self.scan_string();
            }

            if SYMBOLS.contains(&(ch as char)) {
                self.pos += 1;
                return self.make_token(Token::Symbol(ch as char), start, self.pos);
            }

            self.diagnostics.push(
                Diagnostic::lexical(
                    format!("unexpected character '{}' (U+{:04X})", ch as char, ch),
                    Span::new(start as u32, self.pos as u32 + 1),
                )
                .with_help("this character is not part of the Jack grammar".to_string()),
            );
            self.pos += 1;
            // error recorded, try again from the next character
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            // Line comment: // to end of line
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'/'
            {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            // Block comment: /* to the nearest */ (covers /** api doc */ too)
            if self.pos + 1 < self.source.len()
                && self.source[self.pos] == b'/'
                && self.source[self.pos + 1] == b'*'
            {
                let start = self.pos;
                self.pos += 2;
                loop {
                    if self.pos + 1 >= self.source.len() {
                        self.diagnostics.push(
                            Diagnostic::lexical(
                                "unterminated block comment".to_string(),
                                Span::new(start as u32, self.source.len() as u32),
                            )
                            .with_help(
                                "every '/*' comment must be closed with '*/'".to_string(),
                            ),
                        );
                        self.pos = self.source.len();
                        break;
                    }
                    if self.source[self.pos] == b'*' && self.source[self.pos + 1] == b'/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }

            break;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        let token = match Keyword::from_ident(text) {
            Some(kw) => Token::Keyword(kw),
            None => Token::Ident(text.to_string()),
        };
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        match text.parse::<u32>() {
            Ok(n) if n <= MAX_INT => self.make_token(Token::IntConst(n as u16), start, self.pos),
            _ => {
                self.diagnostics.push(
                    Diagnostic::lexical(
                        format!("integer constant '{}' is out of range", text),
                        Span::new(start as u32, self.pos as u32),
                    )
                    .with_help(format!("integer constants must be 0..{}", MAX_INT)),
                );
                self.make_token(Token::IntConst(0), start, self.pos)
            }
        }
    }

    fn scan_string(&mut self) -> Spanned<Token> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let body_start = self.pos;
        while self.pos < self.source.len()
            && self.source[self.pos] != b'"'
            && self.source[self.pos] != b'\n'
        {
            self.pos += 1;
        }

        let body = std::str::from_utf8(&self.source[body_start..self.pos])
            .unwrap_or_default()
            .to_string();

        if self.pos >= self.source.len() || self.source[self.pos] == b'\n' {
            self.diagnostics.push(
                Diagnostic::lexical(
                    "unterminated string constant".to_string(),
                    Span::new(start as u32, self.pos as u32),
                )
                .with_help("string constants must close with '\"' on the same line".to_string()),
            );
        } else {
            self.pos += 1; // closing quote
        }

        self.make_token(Token::StrConst(body), start, self.pos)
    }

    fn make_token(&self, token: Token, start: usize, end: usize) -> Spanned<Token> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
