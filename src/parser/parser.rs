//! Recursive descent parser for spx
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST.
//!
//! Newlines follow Go's automatic semicolon rule: a newline terminates a
//! statement when the previous significant token could end one. Such
//! newlines are visible to the grammar, all others are trivia.

use super::lexer::{Lexer, Token, is_terminated_string};
use super::syntax_kind::SyntaxKind;
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse spx source code into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens, TextSize::of(input));
    parser.parse_source_file();
    parser.finish()
}

/// Binding power of a binary operator (Go precedence, higher binds tighter).
fn binary_power(kind: SyntaxKind) -> Option<u8> {
    let power = match kind {
        SyntaxKind::PIPE_PIPE => 1,
        SyntaxKind::AMP_AMP => 2,
        SyntaxKind::EQ_EQ
        | SyntaxKind::BANG_EQ
        | SyntaxKind::LT
        | SyntaxKind::LT_EQ
        | SyntaxKind::GT
        | SyntaxKind::GT_EQ => 3,
        SyntaxKind::PLUS | SyntaxKind::MINUS | SyntaxKind::PIPE | SyntaxKind::CARET => 4,
        SyntaxKind::STAR
        | SyntaxKind::SLASH
        | SyntaxKind::PERCENT
        | SyntaxKind::SHL
        | SyntaxKind::SHR
        | SyntaxKind::AMP => 5,
        _ => return None,
    };
    Some(power)
}

const UNARY_OPS: &[SyntaxKind] = &[
    SyntaxKind::PLUS,
    SyntaxKind::MINUS,
    SyntaxKind::BANG,
    SyntaxKind::CARET,
    SyntaxKind::ARROW,
];

const ASSIGN_OPS: &[SyntaxKind] = &[
    SyntaxKind::EQ,
    SyntaxKind::PLUS_EQ,
    SyntaxKind::MINUS_EQ,
    SyntaxKind::STAR_EQ,
    SyntaxKind::SLASH_EQ,
    SyntaxKind::PERCENT_EQ,
];

const TYPE_START: &[SyntaxKind] = &[
    SyntaxKind::IDENT,
    SyntaxKind::STAR,
    SyntaxKind::L_BRACKET,
    SyntaxKind::MAP_KW,
    SyntaxKind::CHAN_KW,
    SyntaxKind::FUNC_KW,
    SyntaxKind::STRUCT_KW,
    SyntaxKind::INTERFACE_KW,
];

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    /// Whether the newline at each index terminates a statement.
    significant: Vec<bool>,
    pos: usize,
    end: TextSize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
    /// Set while parsing `if`/`for`/`switch` headers where `Name{` opens the body.
    no_composite: bool,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], end: TextSize) -> Self {
        let mut significant = vec![false; tokens.len()];
        let mut last = None;
        for (idx, token) in tokens.iter().enumerate() {
            if token.kind == SyntaxKind::NEWLINE {
                if last.is_some_and(SyntaxKind::ends_statement) {
                    significant[idx] = true;
                    last = Some(SyntaxKind::NEWLINE);
                }
            } else if !token.kind.is_trivia() {
                last = Some(token.kind);
            }
        }
        Self {
            tokens,
            significant,
            pos: 0,
            end,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            no_composite: false,
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn skippable(&self, idx: usize) -> bool {
        let kind = self.tokens[idx].kind;
        kind.is_trivia() && !(kind == SyntaxKind::NEWLINE && self.significant[idx])
    }

    /// Index of the n-th non-trivia token at or after `from`.
    fn nth_index_from(&self, from: usize, n: usize) -> Option<usize> {
        let mut count = 0;
        let mut idx = from;
        while idx < self.tokens.len() {
            if !self.skippable(idx) {
                if count == n {
                    return Some(idx);
                }
                count += 1;
            }
            idx += 1;
        }
        None
    }

    fn current_index(&self) -> Option<usize> {
        self.nth_index_from(self.pos, 0)
    }

    fn current(&self) -> Option<&Token<'a>> {
        self.current_index().map(|idx| &self.tokens[idx])
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::__LAST)
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_index_from(self.pos, n)
            .map(|idx| self.tokens[idx].kind)
            .unwrap_or(SyntaxKind::__LAST)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.current_index().is_none()
    }

    /// At a statement terminator: significant newline, `;`, `}`, `)` or EOF.
    fn at_stmt_end(&self) -> bool {
        self.at_eof()
            || self.at_any(&[
                SyntaxKind::NEWLINE,
                SyntaxKind::SEMICOLON,
                SyntaxKind::R_BRACE,
                SyntaxKind::R_PAREN,
            ])
    }

    /// Whether whitespace or a comment separates the current token from the previous one.
    fn space_before(&self) -> bool {
        match self.current_index() {
            Some(idx) if idx > 0 => self.tokens[idx - 1].kind.is_trivia(),
            _ => false,
        }
    }

    /// Whether whitespace follows the current token.
    fn space_after(&self) -> bool {
        match self.current_index() {
            Some(idx) => self
                .tokens
                .get(idx + 1)
                .is_none_or(|t| t.kind.is_trivia()),
            None => false,
        }
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    /// Emit pending trivia into the currently open node.
    fn flush_trivia(&mut self) {
        while self.pos < self.tokens.len() && self.skippable(self.pos) {
            let token = &self.tokens[self.pos];
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn bump(&mut self) {
        self.flush_trivia();
        if let Some(token) = self.tokens.get(self.pos) {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {what}"));
            false
        }
    }

    /// Skip significant newlines where the grammar tolerates them.
    fn eat_newlines(&mut self) {
        while self.eat(SyntaxKind::NEWLINE) {}
    }

    fn eat_separators(&mut self) {
        while self.eat(SyntaxKind::NEWLINE) || self.eat(SyntaxKind::SEMICOLON) {}
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn current_range(&self) -> TextRange {
        self.current()
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .unwrap_or_else(|| TextRange::empty(self.end))
    }

    fn error(&mut self, message: impl Into<String>) {
        let range = self.current_range();
        self.errors.push(SyntaxError::new(message, range));
    }

    fn error_at(&mut self, message: impl Into<String>, range: TextRange) {
        self.errors.push(SyntaxError::new(message, range));
    }

    fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.start_node(SyntaxKind::ERROR);
        let mut consumed = false;
        while !self.at_eof() && !self.at_any(recovery) {
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_eof() {
            self.bump();
        }
        self.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.flush_trivia();
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.flush_trivia();
        self.builder.checkpoint()
    }

    fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    // =========================================================================
    // File level
    // =========================================================================

    /// SourceFile = PackageClause? (ImportDecl | TopLevelDecl | Statement)*
    fn parse_source_file(&mut self) {
        self.builder.start_node(SyntaxKind::SOURCE_FILE.into());
        self.eat_separators();
        if self.at(SyntaxKind::PACKAGE_KW) {
            self.parse_package_clause();
            self.expect_stmt_end();
        }

        loop {
            self.eat_separators();
            if self.at_eof() {
                break;
            }
            let pos_before = self.pos;
            match self.current_kind() {
                SyntaxKind::IMPORT_KW => self.parse_import_decl(),
                SyntaxKind::TYPE_KW => self.parse_type_decl(),
                SyntaxKind::FUNC_KW if self.at_func_decl() => self.parse_func_decl(),
                SyntaxKind::R_BRACE | SyntaxKind::R_PAREN => {
                    self.error_recover("unexpected closing delimiter", &[]);
                }
                _ => self.parse_statement(),
            }
            self.expect_stmt_end();
            // Safety: if we didn't make progress, force-skip a token
            if self.pos == pos_before && !self.at_eof() {
                self.error_recover(format!("unexpected {:?}", self.current_kind()), &[]);
            }
        }

        self.flush_trivia();
        self.builder.finish_node();
    }

    fn expect_stmt_end(&mut self) {
        if self.at_eof() || self.at(SyntaxKind::R_BRACE) {
            return;
        }
        if self.eat(SyntaxKind::NEWLINE) || self.eat(SyntaxKind::SEMICOLON) {
            return;
        }
        self.error_recover(
            "expected newline or ';' after statement",
            &[SyntaxKind::NEWLINE, SyntaxKind::SEMICOLON, SyntaxKind::R_BRACE],
        );
    }

    /// PackageClause = 'package' Name
    fn parse_package_clause(&mut self) {
        self.start_node(SyntaxKind::PACKAGE_CLAUSE);
        self.bump();
        self.parse_name("package name");
        self.finish_node();
    }

    /// ImportDecl = 'import' (ImportSpec | '(' ImportSpec* ')')
    fn parse_import_decl(&mut self) {
        self.start_node(SyntaxKind::IMPORT_DECL);
        self.bump();
        if self.eat(SyntaxKind::L_PAREN) {
            self.eat_separators();
            while !self.at_eof() && !self.at(SyntaxKind::R_PAREN) {
                let before = self.pos;
                self.parse_import_spec();
                self.eat_separators();
                if self.pos == before {
                    self.error_recover("expected import path", &[SyntaxKind::R_PAREN]);
                }
            }
            self.expect(SyntaxKind::R_PAREN, "')'");
        } else {
            self.parse_import_spec();
        }
        self.finish_node();
    }

    /// ImportSpec = Name? STRING
    fn parse_import_spec(&mut self) {
        self.start_node(SyntaxKind::IMPORT_SPEC);
        if self.at(SyntaxKind::IDENT) {
            self.parse_name("import name");
        }
        if self.at(SyntaxKind::STRING) {
            self.bump_string();
        } else {
            self.error("expected import path");
        }
        self.finish_node();
    }

    fn parse_name(&mut self, what: &str) {
        if self.at(SyntaxKind::IDENT) {
            self.start_node(SyntaxKind::NAME);
            self.bump();
            self.finish_node();
        } else {
            self.error(format!("expected {what}"));
        }
    }

    /// VarDecl = 'var' (VarSpec | '(' VarSpec* ')')
    fn parse_var_decl(&mut self) {
        self.parse_spec_group(SyntaxKind::VAR_DECL, SyntaxKind::VAR_SPEC);
    }

    /// ConstDecl = 'const' (ConstSpec | '(' ConstSpec* ')')
    fn parse_const_decl(&mut self) {
        self.parse_spec_group(SyntaxKind::CONST_DECL, SyntaxKind::CONST_SPEC);
    }

    fn parse_spec_group(&mut self, decl: SyntaxKind, spec: SyntaxKind) {
        self.start_node(decl);
        self.bump();
        if self.eat(SyntaxKind::L_PAREN) {
            self.eat_separators();
            while !self.at_eof() && !self.at(SyntaxKind::R_PAREN) {
                let before = self.pos;
                self.parse_value_spec(spec);
                if !self.at(SyntaxKind::R_PAREN) {
                    self.expect_stmt_end();
                }
                self.eat_separators();
                if self.pos == before {
                    self.error_recover(
                        "expected declaration",
                        &[SyntaxKind::NEWLINE, SyntaxKind::R_PAREN],
                    );
                }
            }
            self.expect(SyntaxKind::R_PAREN, "')'");
        } else {
            self.parse_value_spec(spec);
        }
        self.finish_node();
    }

    /// ValueSpec = Name (',' Name)* Type? ('=' ExprList)?
    fn parse_value_spec(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        self.parse_name("name");
        while self.eat(SyntaxKind::COMMA) {
            self.parse_name("name");
        }
        if self.at_any(TYPE_START) {
            self.parse_type();
        }
        if self.eat(SyntaxKind::EQ) {
            self.parse_expr_list();
        }
        self.finish_node();
    }

    /// TypeDecl = 'type' Name '='? Type
    fn parse_type_decl(&mut self) {
        self.start_node(SyntaxKind::TYPE_DECL);
        self.bump();
        self.parse_name("type name");
        self.eat(SyntaxKind::EQ);
        if self.at_any(TYPE_START) {
            self.parse_type();
        } else {
            self.error("expected type");
        }
        self.finish_node();
    }

    /// `func Name(` or `func (recv T) Name(`, as opposed to a function literal.
    fn at_func_decl(&self) -> bool {
        match self.nth(1) {
            SyntaxKind::IDENT => true,
            SyntaxKind::L_PAREN => self
                .matching_paren(1)
                .and_then(|close| self.nth_index_from(close + 1, 0))
                .is_some_and(|idx| self.tokens[idx].kind == SyntaxKind::IDENT),
            _ => false,
        }
    }

    /// Token index of the `)` matching the `(` that is the n-th upcoming token.
    fn matching_paren(&self, n: usize) -> Option<usize> {
        let open = self.nth_index_from(self.pos, n)?;
        let mut depth = 0usize;
        for idx in open..self.tokens.len() {
            match self.tokens[idx].kind {
                SyntaxKind::L_PAREN => depth += 1,
                SyntaxKind::R_PAREN => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                SyntaxKind::L_BRACE | SyntaxKind::R_BRACE => return None,
                _ => {}
            }
        }
        None
    }

    /// FuncDecl = 'func' Receiver? Name Signature Block?
    fn parse_func_decl(&mut self) {
        self.start_node(SyntaxKind::FUNC_DECL);
        self.bump();
        if self.at(SyntaxKind::L_PAREN) {
            self.start_node(SyntaxKind::RECEIVER);
            self.bump();
            self.parse_param();
            self.expect(SyntaxKind::R_PAREN, "')'");
            self.finish_node();
        }
        self.parse_name("function name");
        self.parse_signature();
        if self.at(SyntaxKind::L_BRACE) {
            self.parse_block();
        }
        self.finish_node();
    }

    /// Signature = ParamList Result?
    fn parse_signature(&mut self) {
        if self.at(SyntaxKind::L_PAREN) {
            self.parse_param_list();
        } else {
            self.error("expected '('");
        }
        if self.at(SyntaxKind::L_PAREN) {
            self.start_node(SyntaxKind::RESULT);
            self.parse_param_list();
            self.finish_node();
        } else if self.at_any(TYPE_START) {
            self.start_node(SyntaxKind::RESULT);
            self.parse_type();
            self.finish_node();
        }
    }

    /// ParamList = '(' (Param (',' Param)*)? ')'
    fn parse_param_list(&mut self) {
        self.start_node(SyntaxKind::PARAM_LIST);
        self.bump();
        self.eat_newlines();
        while !self.at_eof() && !self.at(SyntaxKind::R_PAREN) {
            let before = self.pos;
            self.parse_param();
            self.eat_newlines();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
            self.eat_newlines();
            if self.pos == before {
                break;
            }
        }
        self.expect(SyntaxKind::R_PAREN, "')'");
        self.finish_node();
    }

    /// Param = Name ('...'? Type)? | '...'? Type
    fn parse_param(&mut self) {
        self.start_node(SyntaxKind::PARAM);
        let named = self.at(SyntaxKind::IDENT)
            && !matches!(self.nth(1), SyntaxKind::DOT)
            && (matches!(
                self.nth(1),
                SyntaxKind::COMMA | SyntaxKind::R_PAREN | SyntaxKind::ELLIPSIS
            ) || TYPE_START.contains(&self.nth(1)));
        if named {
            self.parse_name("parameter name");
        }
        self.eat(SyntaxKind::ELLIPSIS);
        if self.at_any(TYPE_START) {
            self.parse_type();
        } else if !named {
            self.error("expected parameter");
        }
        self.finish_node();
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn parse_type(&mut self) {
        match self.current_kind() {
            SyntaxKind::IDENT => {
                self.start_node(SyntaxKind::TYPE_REF);
                self.bump();
                if self.at(SyntaxKind::DOT) && self.nth(1) == SyntaxKind::IDENT {
                    self.bump();
                    self.bump();
                }
                self.finish_node();
            }
            SyntaxKind::STAR => {
                self.start_node(SyntaxKind::POINTER_TYPE);
                self.bump();
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::L_BRACKET => {
                self.start_node(SyntaxKind::SLICE_TYPE);
                self.bump();
                self.expect(SyntaxKind::R_BRACKET, "']'");
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::MAP_KW => {
                self.start_node(SyntaxKind::MAP_TYPE);
                self.bump();
                self.expect(SyntaxKind::L_BRACKET, "'['");
                self.parse_type();
                self.expect(SyntaxKind::R_BRACKET, "']'");
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::CHAN_KW => {
                self.start_node(SyntaxKind::CHAN_TYPE);
                self.bump();
                self.parse_type();
                self.finish_node();
            }
            SyntaxKind::FUNC_KW => {
                self.start_node(SyntaxKind::FUNC_TYPE);
                self.bump();
                self.parse_signature();
                self.finish_node();
            }
            SyntaxKind::STRUCT_KW => self.parse_struct_type(),
            SyntaxKind::INTERFACE_KW => self.parse_interface_type(),
            _ => self.error("expected type"),
        }
    }

    /// StructType = 'struct' '{' FieldDecl* '}'
    fn parse_struct_type(&mut self) {
        self.start_node(SyntaxKind::STRUCT_TYPE);
        self.bump();
        if self.expect(SyntaxKind::L_BRACE, "'{'") {
            self.eat_separators();
            while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
                let before = self.pos;
                self.parse_field_decl();
                self.expect_stmt_end();
                self.eat_separators();
                if self.pos == before {
                    self.error_recover("expected field", &[SyntaxKind::R_BRACE]);
                }
            }
            self.expect(SyntaxKind::R_BRACE, "'}'");
        }
        self.finish_node();
    }

    /// FieldDecl = Name (',' Name)* Type | '*'? TypeName
    fn parse_field_decl(&mut self) {
        self.start_node(SyntaxKind::FIELD_DECL);
        let embedded = self.at(SyntaxKind::STAR)
            || (self.at(SyntaxKind::IDENT)
                && matches!(
                    self.nth(1),
                    SyntaxKind::DOT | SyntaxKind::NEWLINE | SyntaxKind::SEMICOLON | SyntaxKind::R_BRACE
                ));
        if embedded {
            self.parse_type();
        } else {
            self.parse_name("field name");
            while self.eat(SyntaxKind::COMMA) {
                self.parse_name("field name");
            }
            self.parse_type();
        }
        self.finish_node();
    }

    /// InterfaceType = 'interface' '{' MethodSpec* '}'
    fn parse_interface_type(&mut self) {
        self.start_node(SyntaxKind::INTERFACE_TYPE);
        self.bump();
        if self.expect(SyntaxKind::L_BRACE, "'{'") {
            self.eat_separators();
            while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
                let before = self.pos;
                self.start_node(SyntaxKind::METHOD_SPEC);
                self.parse_name("method name");
                self.parse_signature();
                self.finish_node();
                self.expect_stmt_end();
                self.eat_separators();
                if self.pos == before {
                    self.error_recover("expected method", &[SyntaxKind::R_BRACE]);
                }
            }
            self.expect(SyntaxKind::R_BRACE, "'}'");
        }
        self.finish_node();
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Block = '{' Statement* '}'
    fn parse_block(&mut self) {
        self.start_node(SyntaxKind::BLOCK);
        self.expect(SyntaxKind::L_BRACE, "'{'");
        let saved = std::mem::replace(&mut self.no_composite, false);
        self.parse_statement_list(&[SyntaxKind::R_BRACE]);
        self.no_composite = saved;
        self.expect(SyntaxKind::R_BRACE, "'}'");
        self.finish_node();
    }

    fn parse_statement_list(&mut self, stop: &[SyntaxKind]) {
        loop {
            self.eat_separators();
            if self.at_eof() || self.at_any(stop) {
                break;
            }
            let before = self.pos;
            self.parse_statement();
            if !self.at_any(stop) {
                self.expect_stmt_end();
            }
            if self.pos == before && !self.at_eof() {
                self.error_recover(format!("unexpected {:?}", self.current_kind()), &[]);
            }
        }
    }

    fn parse_statement(&mut self) {
        match self.current_kind() {
            SyntaxKind::VAR_KW => self.parse_var_decl(),
            SyntaxKind::CONST_KW => self.parse_const_decl(),
            SyntaxKind::RETURN_KW => self.parse_return(),
            SyntaxKind::IF_KW => self.parse_if(),
            SyntaxKind::FOR_KW => self.parse_for(),
            SyntaxKind::SWITCH_KW => self.parse_switch(),
            SyntaxKind::SELECT_KW => self.parse_select(),
            SyntaxKind::BREAK_KW | SyntaxKind::CONTINUE_KW => {
                self.start_node(SyntaxKind::BRANCH_STMT);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::L_BRACE => self.parse_block(),
            SyntaxKind::IMPORT_KW | SyntaxKind::TYPE_KW | SyntaxKind::PACKAGE_KW => {
                self.error_recover(
                    "declaration not allowed here",
                    &[SyntaxKind::NEWLINE, SyntaxKind::R_BRACE],
                );
            }
            _ => self.parse_simple_stmt(true),
        }
    }

    /// SimpleStmt = ExprStmt | CommandCall | Assign | Define | IncDec | Send
    fn parse_simple_stmt(&mut self, allow_command: bool) {
        let stmt = self.checkpoint();
        let list = self.checkpoint();

        if allow_command && self.at(SyntaxKind::IDENT) {
            // Head of a possible command call: a name followed by selectors.
            let head = self.checkpoint();
            self.parse_command_head();
            if self.at_command_arg_start() {
                self.start_node_at(head, SyntaxKind::COMMAND_CALL);
                self.parse_command_args();
                self.finish_node();
                self.start_node_at(stmt, SyntaxKind::EXPR_STMT);
                self.finish_node();
                return;
            }
            self.parse_postfix_from(head);
            self.parse_binary_from(head, 0);
        } else {
            self.parse_expr();
        }

        let kind = self.current_kind();
        if kind == SyntaxKind::COMMA || kind == SyntaxKind::COLON_EQ || ASSIGN_OPS.contains(&kind) {
            while self.eat(SyntaxKind::COMMA) {
                self.parse_expr();
            }
            self.start_node_at(list, SyntaxKind::EXPR_LIST);
            self.finish_node();
            let node = if self.at(SyntaxKind::COLON_EQ) {
                SyntaxKind::DEFINE_STMT
            } else {
                SyntaxKind::ASSIGN_STMT
            };
            self.start_node_at(stmt, node);
            if self.at(SyntaxKind::COLON_EQ) || self.at_any(ASSIGN_OPS) {
                self.bump();
                if self.at(SyntaxKind::RANGE_KW) {
                    self.error("unexpected range");
                }
                self.parse_expr_list();
            } else {
                self.error("expected ':=' or '='");
            }
            self.finish_node();
        } else if self.at(SyntaxKind::PLUS_PLUS) || self.at(SyntaxKind::MINUS_MINUS) {
            self.start_node_at(stmt, SyntaxKind::INC_DEC_STMT);
            self.bump();
            self.finish_node();
        } else if self.at(SyntaxKind::ARROW) {
            self.start_node_at(stmt, SyntaxKind::SEND_STMT);
            self.bump();
            self.parse_expr();
            self.finish_node();
        } else {
            self.start_node_at(stmt, SyntaxKind::EXPR_STMT);
            self.finish_node();
        }
    }

    /// Name ('.' Name)*, the callee of a command call.
    fn parse_command_head(&mut self) {
        let head = self.checkpoint();
        self.start_node(SyntaxKind::NAME_REF);
        self.bump();
        self.finish_node();
        while self.at(SyntaxKind::DOT) && self.nth(1) == SyntaxKind::IDENT {
            self.start_node_at(head, SyntaxKind::SELECTOR_EXPR);
            self.bump();
            self.bump();
            self.finish_node();
        }
    }

    /// Whether the current token begins the first argument of a command call.
    fn at_command_arg_start(&self) -> bool {
        match self.current_kind() {
            SyntaxKind::IDENT
            | SyntaxKind::INT
            | SyntaxKind::FLOAT
            | SyntaxKind::STRING
            | SyntaxKind::RAW_STRING
            | SyntaxKind::FAT_ARROW
            | SyntaxKind::FUNC_KW => true,
            SyntaxKind::L_BRACKET => self.space_before(),
            SyntaxKind::MINUS
            | SyntaxKind::PLUS
            | SyntaxKind::BANG
            | SyntaxKind::CARET
            | SyntaxKind::ARROW => self.space_before() && !self.space_after(),
            _ => false,
        }
    }

    /// CommandArgs = Expr (',' Expr)*
    fn parse_command_args(&mut self) {
        self.start_node(SyntaxKind::ARG_LIST);
        self.parse_expr();
        while self.eat(SyntaxKind::COMMA) {
            self.eat_newlines();
            self.parse_expr();
        }
        self.finish_node();
    }

    fn parse_expr_list(&mut self) {
        self.start_node(SyntaxKind::EXPR_LIST);
        self.parse_expr();
        while self.eat(SyntaxKind::COMMA) {
            self.eat_newlines();
            self.parse_expr();
        }
        self.finish_node();
    }

    /// ReturnStmt = 'return' ExprList?
    fn parse_return(&mut self) {
        self.start_node(SyntaxKind::RETURN_STMT);
        self.bump();
        if !self.at_stmt_end() && !self.at_any(&[SyntaxKind::CASE_KW, SyntaxKind::DEFAULT_KW]) {
            self.parse_expr_list();
        }
        self.finish_node();
    }

    /// Scan the header of a control statement up to its `{` at depth zero.
    ///
    /// Returns (has `;`, has `range`).
    fn scan_header(&self) -> (bool, bool) {
        let mut depth = 0i32;
        let mut semicolon = false;
        let mut range = false;
        let mut idx = self.pos;
        while idx < self.tokens.len() {
            match self.tokens[idx].kind {
                SyntaxKind::L_PAREN | SyntaxKind::L_BRACKET => depth += 1,
                SyntaxKind::R_PAREN | SyntaxKind::R_BRACKET => depth -= 1,
                SyntaxKind::L_BRACE if depth <= 0 => break,
                SyntaxKind::L_BRACE => depth += 1,
                SyntaxKind::R_BRACE => depth -= 1,
                SyntaxKind::SEMICOLON if depth <= 0 => semicolon = true,
                SyntaxKind::RANGE_KW if depth <= 0 => range = true,
                SyntaxKind::NEWLINE if self.significant[idx] && depth <= 0 => break,
                _ => {}
            }
            idx += 1;
        }
        (semicolon, range)
    }

    /// IfStmt = 'if' (SimpleStmt ';')? Expr Block ('else' (IfStmt | Block))?
    fn parse_if(&mut self) {
        self.start_node(SyntaxKind::IF_STMT);
        self.bump();
        let saved = std::mem::replace(&mut self.no_composite, true);
        let (has_init, _) = self.scan_header();
        if has_init {
            if !self.at(SyntaxKind::SEMICOLON) {
                self.parse_simple_stmt(false);
            }
            self.expect(SyntaxKind::SEMICOLON, "';'");
        }
        if self.at(SyntaxKind::L_BRACE) {
            self.error("missing condition in if statement");
        } else {
            self.parse_expr();
        }
        self.no_composite = saved;
        self.parse_block();
        if self.eat(SyntaxKind::ELSE_KW) {
            if self.at(SyntaxKind::IF_KW) {
                self.parse_if();
            } else {
                self.parse_block();
            }
        }
        self.finish_node();
    }

    /// ForStmt = 'for' (Expr | ForClause | RangeClause)? Block
    fn parse_for(&mut self) {
        self.start_node(SyntaxKind::FOR_STMT);
        self.bump();
        let saved = std::mem::replace(&mut self.no_composite, true);
        if !self.at(SyntaxKind::L_BRACE) {
            let (has_semicolon, has_range) = self.scan_header();
            if has_range {
                self.start_node(SyntaxKind::RANGE_CLAUSE);
                if !self.at(SyntaxKind::RANGE_KW) {
                    let list = self.checkpoint();
                    self.parse_expr();
                    while self.eat(SyntaxKind::COMMA) {
                        self.parse_expr();
                    }
                    self.start_node_at(list, SyntaxKind::EXPR_LIST);
                    self.finish_node();
                    if !self.eat(SyntaxKind::COLON_EQ) && !self.eat(SyntaxKind::EQ) {
                        self.error("expected ':=' or '='");
                    }
                }
                self.expect(SyntaxKind::RANGE_KW, "range");
                self.parse_expr();
                self.finish_node();
            } else if has_semicolon {
                self.start_node(SyntaxKind::FOR_CLAUSE);
                if !self.at(SyntaxKind::SEMICOLON) {
                    self.parse_simple_stmt(false);
                }
                self.expect(SyntaxKind::SEMICOLON, "';'");
                if !self.at(SyntaxKind::SEMICOLON) {
                    self.parse_expr();
                }
                self.expect(SyntaxKind::SEMICOLON, "';'");
                if !self.at(SyntaxKind::L_BRACE) {
                    self.parse_simple_stmt(false);
                }
                self.finish_node();
            } else {
                self.parse_expr();
            }
        }
        self.no_composite = saved;
        self.parse_block();
        self.finish_node();
    }

    /// SwitchStmt = 'switch' (SimpleStmt ';')? Expr? '{' CaseClause* '}'
    fn parse_switch(&mut self) {
        self.start_node(SyntaxKind::SWITCH_STMT);
        self.bump();
        let saved = std::mem::replace(&mut self.no_composite, true);
        let (has_init, _) = self.scan_header();
        if has_init {
            if !self.at(SyntaxKind::SEMICOLON) {
                self.parse_simple_stmt(false);
            }
            self.expect(SyntaxKind::SEMICOLON, "';'");
        }
        if !self.at(SyntaxKind::L_BRACE) {
            self.parse_expr();
        }
        self.no_composite = saved;
        self.parse_clause_body(SyntaxKind::CASE_CLAUSE);
        self.finish_node();
    }

    /// SelectStmt = 'select' '{' CommClause* '}'
    fn parse_select(&mut self) {
        self.start_node(SyntaxKind::SELECT_STMT);
        self.bump();
        self.parse_clause_body(SyntaxKind::COMM_CLAUSE);
        self.finish_node();
    }

    fn parse_clause_body(&mut self, clause: SyntaxKind) {
        if !self.expect(SyntaxKind::L_BRACE, "'{'") {
            return;
        }
        self.eat_separators();
        while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
            let before = self.pos;
            if self.at(SyntaxKind::CASE_KW) || self.at(SyntaxKind::DEFAULT_KW) {
                self.parse_clause(clause);
            } else {
                self.error_recover(
                    "expected case or default",
                    &[SyntaxKind::CASE_KW, SyntaxKind::DEFAULT_KW, SyntaxKind::R_BRACE],
                );
            }
            self.eat_separators();
            if self.pos == before {
                break;
            }
        }
        self.expect(SyntaxKind::R_BRACE, "'}'");
    }

    /// CaseClause = ('case' ExprList | 'default') ':' Statement*
    /// CommClause = ('case' SimpleStmt | 'default') ':' Statement*
    fn parse_clause(&mut self, clause: SyntaxKind) {
        self.start_node(clause);
        if self.eat(SyntaxKind::CASE_KW) {
            if clause == SyntaxKind::COMM_CLAUSE {
                self.parse_simple_stmt(false);
            } else {
                self.parse_expr_list();
            }
        } else {
            self.bump();
        }
        self.expect(SyntaxKind::COLON, "':'");
        self.parse_statement_list(&[SyntaxKind::CASE_KW, SyntaxKind::DEFAULT_KW, SyntaxKind::R_BRACE]);
        self.finish_node();
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expr(&mut self) {
        let start = self.checkpoint();
        self.parse_unary();
        self.parse_binary_from(start, 0);
    }

    /// Continue a binary expression whose left operand started at `start`.
    fn parse_binary_from(&mut self, start: Checkpoint, min_power: u8) {
        while let Some(power) = binary_power(self.current_kind()) {
            if power <= min_power {
                break;
            }
            self.start_node_at(start, SyntaxKind::BINARY_EXPR);
            self.bump();
            let rhs = self.checkpoint();
            self.parse_unary();
            self.parse_binary_from(rhs, power);
            self.finish_node();
        }
    }

    fn parse_unary(&mut self) {
        if self.at_any(UNARY_OPS) {
            self.start_node(SyntaxKind::UNARY_EXPR);
            self.bump();
            self.parse_unary();
            self.finish_node();
        } else {
            let start = self.checkpoint();
            self.parse_primary();
            self.parse_postfix_from(start);
        }
    }

    fn parse_postfix_from(&mut self, start: Checkpoint) {
        loop {
            match self.current_kind() {
                SyntaxKind::DOT => {
                    self.start_node_at(start, SyntaxKind::SELECTOR_EXPR);
                    self.bump();
                    if self.at(SyntaxKind::IDENT) {
                        self.bump();
                    } else {
                        self.error("expected selector");
                    }
                    self.finish_node();
                }
                SyntaxKind::L_PAREN => {
                    self.start_node_at(start, SyntaxKind::CALL_EXPR);
                    self.parse_call_args();
                    self.finish_node();
                }
                SyntaxKind::L_BRACKET => {
                    self.start_node_at(start, SyntaxKind::INDEX_EXPR);
                    self.bump();
                    let saved = std::mem::replace(&mut self.no_composite, false);
                    self.parse_expr();
                    self.no_composite = saved;
                    self.expect(SyntaxKind::R_BRACKET, "']'");
                    self.finish_node();
                }
                SyntaxKind::L_BRACE if !self.no_composite && self.last_is_type_like() => {
                    self.start_node_at(start, SyntaxKind::COMPOSITE_LIT);
                    self.parse_lit_body();
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    /// Whether the expression just parsed can name a composite literal type.
    fn last_is_type_like(&self) -> bool {
        let Some(prev) = self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|t| !t.kind.is_trivia())
        else {
            return false;
        };
        prev.kind == SyntaxKind::IDENT
    }

    /// ArgList = '(' (Expr (',' Expr)* '...'? ','?)? ')'
    fn parse_call_args(&mut self) {
        self.start_node(SyntaxKind::ARG_LIST);
        self.bump();
        let saved = std::mem::replace(&mut self.no_composite, false);
        self.eat_newlines();
        while !self.at_eof() && !self.at(SyntaxKind::R_PAREN) {
            let before = self.pos;
            self.parse_expr();
            self.eat(SyntaxKind::ELLIPSIS);
            self.eat_newlines();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
            self.eat_newlines();
            if self.pos == before {
                break;
            }
        }
        self.no_composite = saved;
        self.expect(SyntaxKind::R_PAREN, "')'");
        self.finish_node();
    }

    fn parse_primary(&mut self) {
        match self.current_kind() {
            SyntaxKind::IDENT if self.nth(1) == SyntaxKind::FAT_ARROW => {
                self.start_node(SyntaxKind::LAMBDA_EXPR);
                self.start_node(SyntaxKind::LAMBDA_PARAMS);
                self.parse_name("parameter");
                self.finish_node();
                self.parse_lambda_body();
                self.finish_node();
            }
            SyntaxKind::IDENT => {
                self.start_node(SyntaxKind::NAME_REF);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::INT | SyntaxKind::FLOAT | SyntaxKind::RAW_STRING => {
                self.start_node(SyntaxKind::LITERAL);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::STRING => {
                self.start_node(SyntaxKind::LITERAL);
                self.bump_string();
                self.finish_node();
            }
            SyntaxKind::L_PAREN => {
                let is_lambda = self
                    .matching_paren(0)
                    .and_then(|close| self.nth_index_from(close + 1, 0))
                    .is_some_and(|idx| self.tokens[idx].kind == SyntaxKind::FAT_ARROW);
                if is_lambda {
                    self.start_node(SyntaxKind::LAMBDA_EXPR);
                    self.start_node(SyntaxKind::LAMBDA_PARAMS);
                    self.bump();
                    while self.at(SyntaxKind::IDENT) {
                        self.parse_name("parameter");
                        if !self.eat(SyntaxKind::COMMA) {
                            break;
                        }
                    }
                    self.expect(SyntaxKind::R_PAREN, "')'");
                    self.finish_node();
                    self.parse_lambda_body();
                    self.finish_node();
                } else {
                    self.start_node(SyntaxKind::PAREN_EXPR);
                    self.bump();
                    let saved = std::mem::replace(&mut self.no_composite, false);
                    self.eat_newlines();
                    self.parse_expr();
                    self.eat_newlines();
                    self.no_composite = saved;
                    self.expect(SyntaxKind::R_PAREN, "')'");
                    self.finish_node();
                }
            }
            SyntaxKind::FAT_ARROW => {
                self.start_node(SyntaxKind::LAMBDA_EXPR);
                self.parse_lambda_body();
                self.finish_node();
            }
            SyntaxKind::FUNC_KW => {
                self.start_node(SyntaxKind::FUNC_LIT);
                self.bump();
                self.parse_signature();
                if self.at(SyntaxKind::L_BRACE) {
                    self.parse_block();
                } else {
                    self.error("expected function body");
                }
                self.finish_node();
            }
            SyntaxKind::L_BRACKET if self.nth(1) == SyntaxKind::R_BRACKET => {
                self.start_node(SyntaxKind::COMPOSITE_LIT);
                self.parse_type();
                if self.at(SyntaxKind::L_BRACE) {
                    self.parse_lit_body();
                } else {
                    self.error("expected '{'");
                }
                self.finish_node();
            }
            SyntaxKind::L_BRACKET => {
                self.start_node(SyntaxKind::LIST_LIT);
                self.bump();
                let saved = std::mem::replace(&mut self.no_composite, false);
                self.eat_newlines();
                while !self.at_eof() && !self.at(SyntaxKind::R_BRACKET) {
                    let before = self.pos;
                    self.parse_expr();
                    self.eat_newlines();
                    if !self.eat(SyntaxKind::COMMA) {
                        break;
                    }
                    self.eat_newlines();
                    if self.pos == before {
                        break;
                    }
                }
                self.no_composite = saved;
                self.expect(SyntaxKind::R_BRACKET, "']'");
                self.finish_node();
            }
            SyntaxKind::MAP_KW => {
                self.start_node(SyntaxKind::COMPOSITE_LIT);
                self.parse_type();
                if self.at(SyntaxKind::L_BRACE) {
                    self.parse_lit_body();
                } else {
                    self.error("expected '{'");
                }
                self.finish_node();
            }
            SyntaxKind::L_BRACE => {
                self.start_node(SyntaxKind::MAP_LIT);
                self.parse_lit_body();
                self.finish_node();
            }
            _ => {
                self.error("expected expression");
            }
        }
    }

    fn bump_string(&mut self) {
        let range = self.current_range();
        let terminated = self.current().is_some_and(|t| is_terminated_string(t.text));
        self.bump();
        if !terminated {
            self.error_at("string literal not terminated", range);
        }
    }

    /// LambdaBody = '=>' (Block | Expr)
    fn parse_lambda_body(&mut self) {
        self.expect(SyntaxKind::FAT_ARROW, "'=>'");
        let saved = std::mem::replace(&mut self.no_composite, false);
        if self.at(SyntaxKind::L_BRACE) {
            self.parse_block();
        } else {
            self.parse_expr();
        }
        self.no_composite = saved;
    }

    /// LitBody = '{' (Element (',' Element)* ','?)? '}'
    fn parse_lit_body(&mut self) {
        self.start_node(SyntaxKind::LIT_BODY);
        self.bump();
        let saved = std::mem::replace(&mut self.no_composite, false);
        self.eat_newlines();
        while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
            let before = self.pos;
            let element = self.checkpoint();
            self.parse_expr();
            if self.eat(SyntaxKind::COLON) {
                self.eat_newlines();
                if self.at(SyntaxKind::COMMA) || self.at(SyntaxKind::R_BRACE) {
                    self.error("expected value");
                } else {
                    self.parse_expr();
                }
                self.start_node_at(element, SyntaxKind::KEYED_ELEMENT);
                self.finish_node();
            }
            self.eat_newlines();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
            self.eat_newlines();
            if self.pos == before {
                break;
            }
        }
        self.no_composite = saved;
        self.expect(SyntaxKind::R_BRACE, "'}'");
        self.finish_node();
    }
}
