use crate::diagnostic::Diagnostic;
use crate::emit::VmEmitter;
use crate::span::{Span, Spanned};
use crate::symtab::{Kind, SymbolTable};
use crate::token::{Keyword, Token};
use crate::vm::{Segment, VmOp};

/// Binary operators of the expression grammar, applied strictly left to
/// right with no precedence.
const BINARY_OPS: &[char] = &['+', '-', '*', '/', '&', '|', '<', '>', '='];

/// Recursive-descent parser and single-pass code generator.
///
/// Consumes the token stream of one class file and drives the VM emitter
/// directly; there is no AST. At most one token of look-ahead is used, to
/// tell apart variables, array accesses, and subroutine calls. The first
/// violation aborts the file.
pub struct CompilationEngine {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
    symbols: SymbolTable,
    emitter: VmEmitter,
    class_name: String,
    if_counter: u32,
    while_counter: u32,
}

impl CompilationEngine {
    pub fn new(tokens: Vec<Spanned<Token>>) -> Self {
        Self {
            tokens,
            pos: 0,
            symbols: SymbolTable::new(),
            emitter: VmEmitter::new(),
            class_name: String::new(),
            if_counter: 0,
            while_counter: 0,
        }
    }

    /// Compile `'class' className '{' classVarDec* subroutineDec* '}'` and
    /// return the emitted VM text.
    pub fn compile_class(mut self) -> Result<String, Diagnostic> {
        self.expect_keyword(Keyword::Class)?;
        self.class_name = self.expect_ident()?.node;
        self.expect_symbol('{')?;

        while self.at_keyword(Keyword::Static) || self.at_keyword(Keyword::Field) {
            self.compile_class_var_dec()?;
        }

        while self.at_keyword(Keyword::Constructor)
            || self.at_keyword(Keyword::Function)
            || self.at_keyword(Keyword::Method)
        {
            self.compile_subroutine()?;
        }

        self.expect_symbol('}')?;

        if *self.peek() != Token::Eof {
            return Err(self.syntax_error("end of file after class body"));
        }

        Ok(self.emitter.finish())
    }

    /// `('static'|'field') type varName (',' varName)* ';'`
    fn compile_class_var_dec(&mut self) -> Result<(), Diagnostic> {
        let kind = if self.at_keyword(Keyword::Static) {
            Kind::Static
        } else {
            Kind::Field
        };
        self.advance();

        let ty = self.compile_type()?;
        let name = self.expect_ident()?;
        self.symbols.define(&name.node, &ty.node, kind);

        while self.eat_symbol(',') {
            let name = self.expect_ident()?;
            self.symbols.define(&name.node, &ty.node, kind);
        }

        self.expect_symbol(';')?;
        Ok(())
    }

    /// `type: 'int' | 'char' | 'boolean' | className`
    fn compile_type(&mut self) -> Result<Spanned<String>, Diagnostic> {
        let span = self.current_span();
        let text = match self.peek() {
            Token::Keyword(Keyword::Int) => "int".to_string(),
            Token::Keyword(Keyword::Char) => "char".to_string(),
            Token::Keyword(Keyword::Boolean) => "boolean".to_string(),
            Token::Ident(name) => name.clone(),
            _ => return Err(self.syntax_error("a type ('int', 'char', 'boolean', or a class name)")),
        };
        self.advance();
        Ok(Spanned::new(text, span))
    }

    /// `('constructor'|'function'|'method') ('void'|type) subroutineName
    ///  '(' parameterList ')' subroutineBody`
    fn compile_subroutine(&mut self) -> Result<(), Diagnostic> {
        let kind = match self.peek() {
            Token::Keyword(Keyword::Constructor) => Keyword::Constructor,
            Token::Keyword(Keyword::Method) => Keyword::Method,
            _ => Keyword::Function,
        };
        self.advance();

        let return_ty = if self.at_keyword(Keyword::Void) {
            let span = self.current_span();
            self.advance();
            Spanned::new("void".to_string(), span)
        } else {
            self.compile_type()?
        };

        let name = self.expect_ident()?;
        let full_name = format!("{}.{}", self.class_name, name.node);

        if kind == Keyword::Constructor && return_ty.node != self.class_name {
            return Err(Diagnostic::semantic(
                format!(
                    "constructor must return its own class '{}', found '{}'",
                    self.class_name, return_ty.node
                ),
                return_ty.span,
            )
            .with_help(format!(
                "declare it as `constructor {} {}(...)`",
                self.class_name, name.node
            )));
        }

        self.symbols.start_subroutine();
        self.if_counter = 0;
        self.while_counter = 0;

        // The receiver occupies argument 0 of every method.
        if kind == Keyword::Method {
            let class_name = self.class_name.clone();
            self.symbols.define("this", &class_name, Kind::Arg);
        }

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;

        self.compile_subroutine_body(&full_name, kind)
    }

    /// `((type varName) (',' type varName)*)?`
    fn compile_parameter_list(&mut self) -> Result<(), Diagnostic> {
        if self.at_symbol(')') {
            return Ok(());
        }
        loop {
            let ty = self.compile_type()?;
            let name = self.expect_ident()?;
            self.symbols.define(&name.node, &ty.node, Kind::Arg);
            if !self.eat_symbol(',') {
                break;
            }
        }
        Ok(())
    }

    /// `'{' varDec* statements '}'`
    ///
    /// The `function` directive is emitted only after all locals are known,
    /// so its count is final. Methods then bind the receiver, constructors
    /// allocate the object.
    fn compile_subroutine_body(&mut self, full_name: &str, kind: Keyword) -> Result<(), Diagnostic> {
        self.expect_symbol('{')?;

        while self.at_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        self.emitter.function(full_name, self.symbols.local_count());
        match kind {
            Keyword::Method => {
                self.emitter.push(Segment::Argument, 0);
                self.emitter.pop(Segment::Pointer, 0);
            }
            Keyword::Constructor => {
                self.emitter.push(Segment::Constant, self.symbols.field_count());
                self.emitter.call("Memory.alloc", 1);
                self.emitter.pop(Segment::Pointer, 0);
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')?;
        Ok(())
    }

    /// `'var' type varName (',' varName)* ';'`
    fn compile_var_dec(&mut self) -> Result<(), Diagnostic> {
        self.expect_keyword(Keyword::Var)?;
        let ty = self.compile_type()?;
        let name = self.expect_ident()?;
        self.symbols.define(&name.node, &ty.node, Kind::Local);

        while self.eat_symbol(',') {
            let name = self.expect_ident()?;
            self.symbols.define(&name.node, &ty.node, Kind::Local);
        }

        self.expect_symbol(';')?;
        Ok(())
    }

    fn compile_statements(&mut self) -> Result<(), Diagnostic> {
        loop {
            match self.peek() {
                Token::Keyword(Keyword::Let) => self.compile_let()?,
                Token::Keyword(Keyword::If) => self.compile_if()?,
                Token::Keyword(Keyword::While) => self.compile_while()?,
                Token::Keyword(Keyword::Do) => self.compile_do()?,
                Token::Keyword(Keyword::Return) => self.compile_return()?,
                _ => return Ok(()),
            }
        }
    }

    /// `'let' varName ('[' expression ']')? '=' expression ';'`
    fn compile_let(&mut self) -> Result<(), Diagnostic> {
        self.expect_keyword(Keyword::Let)?;
        let name = self.expect_ident()?;
        let entry = self.resolve_variable(&name)?;

        if self.eat_symbol('[') {
            // Destination address: base + index, committed to `pointer 1`
            // only after the right-hand side is evaluated. The detour
            // through `temp 0` lets the right-hand side contain array
            // accesses of its own.
            self.emitter.push(entry.kind.segment(), entry.index);
            self.compile_expression()?;
            self.expect_symbol(']')?;
            self.emitter.arithmetic(VmOp::Add);

            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;

            self.emitter.pop(Segment::Temp, 0);
            self.emitter.pop(Segment::Pointer, 1);
            self.emitter.push(Segment::Temp, 0);
            self.emitter.pop(Segment::That, 0);
        } else {
            self.expect_symbol('=')?;
            self.compile_expression()?;
            self.expect_symbol(';')?;
            self.emitter.pop(entry.kind.segment(), entry.index);
        }
        Ok(())
    }

    /// `'if' '(' expression ')' '{' statements '}' ('else' '{' statements '}')?`
    ///
    /// The counter value is captured up front so nested statements get their
    /// own labels.
    fn compile_if(&mut self) -> Result<(), Diagnostic> {
        let n = self.if_counter;
        self.if_counter += 1;

        self.expect_keyword(Keyword::If)?;
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;

        self.emitter.arithmetic(VmOp::Not);
        self.emitter.if_goto(&format!("IF_FALSE_{}", n));

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;

        self.emitter.goto(&format!("IF_END_{}", n));
        self.emitter.label(&format!("IF_FALSE_{}", n));

        if self.at_keyword(Keyword::Else) {
            self.advance();
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
        }

        self.emitter.label(&format!("IF_END_{}", n));
        Ok(())
    }

    /// `'while' '(' expression ')' '{' statements '}'`
    fn compile_while(&mut self) -> Result<(), Diagnostic> {
        let n = self.while_counter;
        self.while_counter += 1;

        self.expect_keyword(Keyword::While)?;
        self.emitter.label(&format!("WHILE_EXP_{}", n));

        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;

        self.emitter.arithmetic(VmOp::Not);
        self.emitter.if_goto(&format!("WHILE_END_{}", n));

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;

        self.emitter.goto(&format!("WHILE_EXP_{}", n));
        self.emitter.label(&format!("WHILE_END_{}", n));
        Ok(())
    }

    /// `'do' subroutineCall ';'` — the ignored return value is drained to
    /// `temp 0`.
    fn compile_do(&mut self) -> Result<(), Diagnostic> {
        self.expect_keyword(Keyword::Do)?;
        let name = self.expect_ident()?;
        self.compile_subroutine_call(name)?;
        self.emitter.pop(Segment::Temp, 0);
        self.expect_symbol(';')?;
        Ok(())
    }

    /// `'return' expression? ';'` — void subroutines return constant 0.
    fn compile_return(&mut self) -> Result<(), Diagnostic> {
        self.expect_keyword(Keyword::Return)?;
        if self.at_symbol(';') {
            self.emitter.push(Segment::Constant, 0);
        } else {
            self.compile_expression()?;
        }
        self.expect_symbol(';')?;
        self.emitter.ret();
        Ok(())
    }

    /// `term (op term)*` — flat left fold, each operator emitted right
    /// after its second operand. `1 + 2 * 3` multiplies the sum by 3.
    fn compile_expression(&mut self) -> Result<(), Diagnostic> {
        self.compile_term()?;
        loop {
            let op = match self.peek() {
                Token::Symbol(c) if BINARY_OPS.contains(c) => *c,
                _ => break,
            };
            self.advance();
            self.compile_term()?;
            self.emitter.binary_op(op);
        }
        Ok(())
    }

    fn compile_term(&mut self) -> Result<(), Diagnostic> {
        match self.peek().clone() {
            Token::IntConst(n) => {
                self.advance();
                self.emitter.push(Segment::Constant, n);
            }
            Token::StrConst(text) => {
                self.advance();
                self.emitter.push(Segment::Constant, text.chars().count() as u16);
                self.emitter.call("String.new", 1);
                for ch in text.chars() {
                    self.emitter.push(Segment::Constant, ch as u16);
                    self.emitter.call("String.appendChar", 2);
                }
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                self.emitter.push(Segment::Constant, 0);
                self.emitter.arithmetic(VmOp::Not);
            }
            Token::Keyword(Keyword::False) | Token::Keyword(Keyword::Null) => {
                self.advance();
                self.emitter.push(Segment::Constant, 0);
            }
            Token::Keyword(Keyword::This) => {
                self.advance();
                self.emitter.push(Segment::Pointer, 0);
            }
            Token::Symbol('(') => {
                self.advance();
                self.compile_expression()?;
                self.expect_symbol(')')?;
            }
            Token::Symbol('-') => {
                self.advance();
                self.compile_term()?;
                self.emitter.arithmetic(VmOp::Neg);
            }
            Token::Symbol('~') => {
                self.advance();
                self.compile_term()?;
                self.emitter.arithmetic(VmOp::Not);
            }
            Token::Ident(_) => {
                let name = self.expect_ident()?;
                match self.peek() {
                    Token::Symbol('(') | Token::Symbol('.') => {
                        self.compile_subroutine_call(name)?;
                    }
                    Token::Symbol('[') => {
                        let entry = self.resolve_variable(&name)?;
                        self.advance();
                        self.emitter.push(entry.kind.segment(), entry.index);
                        self.compile_expression()?;
                        self.expect_symbol(']')?;
                        self.emitter.arithmetic(VmOp::Add);
                        self.emitter.pop(Segment::Pointer, 1);
                        self.emitter.push(Segment::That, 0);
                    }
                    _ => {
                        let entry = self.resolve_variable(&name)?;
                        self.emitter.push(entry.kind.segment(), entry.index);
                    }
                }
            }
            _ => return Err(self.syntax_error("a term")),
        }
        Ok(())
    }

    /// `subroutineName '(' expressionList ')'
    ///  | (className | varName) '.' subroutineName '(' expressionList ')'`
    ///
    /// The caller has already consumed the leading identifier. Which of the
    /// three call shapes this is depends on the next symbol and on whether
    /// the identifier names a variable in scope.
    fn compile_subroutine_call(&mut self, first: Spanned<String>) -> Result<(), Diagnostic> {
        if self.eat_symbol('.') {
            let method = self.expect_ident()?;
            self.expect_symbol('(')?;

            let (callee, receiver_args) = match self.symbols.lookup(&first.node).cloned() {
                Some(entry) => {
                    // Method call on a variable: the object itself is the
                    // hidden first argument.
                    self.emitter.push(entry.kind.segment(), entry.index);
                    (format!("{}.{}", entry.ty, method.node), 1)
                }
                None => (format!("{}.{}", first.node, method.node), 0),
            };

            let n_args = receiver_args + self.compile_expression_list()?;
            self.expect_symbol(')')?;
            self.emitter.call(&callee, n_args);
        } else {
            // Bare `name(...)` is a method call on the current object.
            self.expect_symbol('(')?;
            self.emitter.push(Segment::Pointer, 0);
            let n_args = self.compile_expression_list()? + 1;
            self.expect_symbol(')')?;
            let callee = format!("{}.{}", self.class_name, first.node);
            self.emitter.call(&callee, n_args);
        }
        Ok(())
    }

    /// `(expression (',' expression)*)?` — returns the expression count.
    fn compile_expression_list(&mut self) -> Result<u16, Diagnostic> {
        if self.at_symbol(')') {
            return Ok(0);
        }
        let mut count = 1;
        self.compile_expression()?;
        while self.eat_symbol(',') {
            self.compile_expression()?;
            count += 1;
        }
        Ok(count)
    }

    fn resolve_variable(
        &self,
        name: &Spanned<String>,
    ) -> Result<crate::symtab::Entry, Diagnostic> {
        match self.symbols.lookup(&name.node) {
            Some(entry) => Ok(entry.clone()),
            None => Err(Diagnostic::semantic(
                format!("undefined variable '{}'", name.node),
                name.span,
            )
            .with_help(
                "declare it with 'var', 'field', or 'static', or as a parameter".to_string(),
            )),
        }
    }

    // --- Token cursor ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        *self.peek() == Token::Keyword(keyword)
    }

    fn at_symbol(&self, symbol: char) -> bool {
        *self.peek() == Token::Symbol(symbol)
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        if self.at_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<Span, Diagnostic> {
        if self.at_symbol(symbol) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.syntax_error(&format!("'{}'", symbol)))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Span, Diagnostic> {
        if self.at_keyword(keyword) {
            let span = self.current_span();
            self.advance();
            Ok(span)
        } else {
            Err(self.syntax_error(&format!("'{}'", keyword.as_str())))
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, Diagnostic> {
        if let Token::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Ok(Spanned::new(name, span))
        } else {
            Err(self.syntax_error("an identifier"))
        }
    }

    fn syntax_error(&self, expected: &str) -> Diagnostic {
        Diagnostic::syntax(
            format!("expected {}, found {}", expected, self.peek().description()),
            self.current_span(),
        )
    }
}
