//! Typed AST wrappers over the untyped rowan CST.
//!
//! This module provides strongly-typed accessors for spx syntax nodes.
//! Each struct wraps a SyntaxNode and provides methods to access children.

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};
use smol_str::SmolStr;

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

/// Closed enum over several node kinds, one variant per kind.
macro_rules! ast_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident($ty:ident) = $kind:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant($ty)),*
        }

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                matches!(kind, $(SyntaxKind::$kind)|*)
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                match node.kind() {
                    $(SyntaxKind::$kind => Some(Self::$variant($ty(node))),)*
                    _ => None,
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                match self {
                    $(Self::$variant(n) => n.syntax(),)*
                }
            }
        }
    };
}

fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
    node.children().find_map(N::cast)
}

fn children<N: AstNode>(node: &SyntaxNode) -> impl Iterator<Item = N> + use<N> {
    node.children().filter_map(N::cast)
}

fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

fn ident_text(node: &SyntaxNode) -> Option<SmolStr> {
    token(node, SyntaxKind::IDENT).map(|t| SmolStr::new(t.text()))
}

/// Expressions of the `EXPR_LIST` child, or an empty list.
fn expr_list(node: Option<ExprList>) -> Vec<Expr> {
    node.map(|list| list.exprs().collect()).unwrap_or_default()
}

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    pub fn package(&self) -> Option<PackageClause> {
        child(&self.0)
    }

    pub fn items(&self) -> impl Iterator<Item = Item> + use<> {
        children(&self.0)
    }
}

/// A top-level member of a source file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    Import(ImportDecl),
    Var(VarDecl),
    Const(ConstDecl),
    Type(TypeDecl),
    Func(FuncDecl),
    Stmt(Stmt),
}

impl AstNode for Item {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::IMPORT_DECL | SyntaxKind::TYPE_DECL | SyntaxKind::FUNC_DECL
        ) || Stmt::can_cast(kind)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::IMPORT_DECL => Some(Self::Import(ImportDecl(node))),
            SyntaxKind::VAR_DECL => Some(Self::Var(VarDecl(node))),
            SyntaxKind::CONST_DECL => Some(Self::Const(ConstDecl(node))),
            SyntaxKind::TYPE_DECL => Some(Self::Type(TypeDecl(node))),
            SyntaxKind::FUNC_DECL => Some(Self::Func(FuncDecl(node))),
            _ => Stmt::cast(node).map(Self::Stmt),
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Import(n) => n.syntax(),
            Self::Var(n) => n.syntax(),
            Self::Const(n) => n.syntax(),
            Self::Type(n) => n.syntax(),
            Self::Func(n) => n.syntax(),
            Self::Stmt(n) => n.syntax(),
        }
    }
}

// ============================================================================
// Names
// ============================================================================

ast_node!(Name, NAME);

impl Name {
    pub fn ident(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn text(&self) -> Option<SmolStr> {
        ident_text(&self.0)
    }
}

ast_node!(NameRef, NAME_REF);

impl NameRef {
    pub fn ident(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn text(&self) -> Option<SmolStr> {
        ident_text(&self.0)
    }
}

// ============================================================================
// Declarations
// ============================================================================

ast_node!(PackageClause, PACKAGE_CLAUSE);

impl PackageClause {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }
}

ast_node!(ImportDecl, IMPORT_DECL);

impl ImportDecl {
    pub fn specs(&self) -> impl Iterator<Item = ImportSpec> + use<> {
        children(&self.0)
    }
}

ast_node!(ImportSpec, IMPORT_SPEC);

impl ImportSpec {
    pub fn alias(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn path_token(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }

    /// The unquoted import path
    pub fn path(&self) -> Option<String> {
        self.path_token().and_then(|t| unquote(t.text()))
    }
}

ast_node!(VarDecl, VAR_DECL);

impl VarDecl {
    pub fn specs(&self) -> impl Iterator<Item = ValueSpec> + use<> {
        children(&self.0)
    }

    /// Whether the declaration uses the parenthesized block form.
    pub fn is_grouped(&self) -> bool {
        token(&self.0, SyntaxKind::L_PAREN).is_some()
    }
}

ast_node!(ConstDecl, CONST_DECL);

impl ConstDecl {
    pub fn specs(&self) -> impl Iterator<Item = ValueSpec> + use<> {
        children(&self.0)
    }
}

/// A `VAR_SPEC` or `CONST_SPEC`: names, optional type, optional values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueSpec(SyntaxNode);

impl AstNode for ValueSpec {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::VAR_SPEC | SyntaxKind::CONST_SPEC)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        if Self::can_cast(node.kind()) {
            Some(Self(node))
        } else {
            None
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

impl ValueSpec {
    pub fn names(&self) -> impl Iterator<Item = Name> + use<> {
        children(&self.0)
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        child(&self.0)
    }

    pub fn values(&self) -> Vec<Expr> {
        expr_list(child(&self.0))
    }
}

ast_node!(TypeDecl, TYPE_DECL);

impl TypeDecl {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        child(&self.0)
    }

    pub fn is_alias(&self) -> bool {
        token(&self.0, SyntaxKind::EQ).is_some()
    }
}

ast_node!(FuncDecl, FUNC_DECL);

impl FuncDecl {
    pub fn receiver(&self) -> Option<Receiver> {
        child(&self.0)
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn params(&self) -> Option<ParamList> {
        child(&self.0)
    }

    pub fn result(&self) -> Option<ResultClause> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(Receiver, RECEIVER);

impl Receiver {
    pub fn param(&self) -> Option<Param> {
        child(&self.0)
    }
}

ast_node!(ParamList, PARAM_LIST);

impl ParamList {
    pub fn params(&self) -> impl Iterator<Item = Param> + use<> {
        children(&self.0)
    }
}

ast_node!(Param, PARAM);

impl Param {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        child(&self.0)
    }

    pub fn is_variadic(&self) -> bool {
        token(&self.0, SyntaxKind::ELLIPSIS).is_some()
    }
}

ast_node!(ResultClause, RESULT);

impl ResultClause {
    /// A single unparenthesized result type
    pub fn ty(&self) -> Option<TypeExpr> {
        child(&self.0)
    }

    /// A parenthesized result list
    pub fn params(&self) -> Option<ParamList> {
        child(&self.0)
    }
}

// ============================================================================
// Types
// ============================================================================

ast_enum!(
    /// Any type expression
    TypeExpr {
        Ref(TypeRef) = TYPE_REF,
        Pointer(PointerType) = POINTER_TYPE,
        Slice(SliceType) = SLICE_TYPE,
        Map(MapType) = MAP_TYPE,
        Chan(ChanType) = CHAN_TYPE,
        Func(FuncType) = FUNC_TYPE,
        Struct(StructType) = STRUCT_TYPE,
        Interface(InterfaceType) = INTERFACE_TYPE,
    }
);

ast_node!(TypeRef, TYPE_REF);

impl TypeRef {
    fn idents(&self) -> Vec<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::IDENT)
            .collect()
    }

    /// Package qualifier of `pkg.Name`
    pub fn qualifier(&self) -> Option<SyntaxToken> {
        let idents = self.idents();
        (idents.len() == 2).then(|| idents[0].clone())
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        self.idents().pop()
    }
}

ast_node!(PointerType, POINTER_TYPE);

impl PointerType {
    pub fn elem(&self) -> Option<TypeExpr> {
        child(&self.0)
    }
}

ast_node!(SliceType, SLICE_TYPE);

impl SliceType {
    pub fn elem(&self) -> Option<TypeExpr> {
        child(&self.0)
    }
}

ast_node!(MapType, MAP_TYPE);

impl MapType {
    pub fn key(&self) -> Option<TypeExpr> {
        child(&self.0)
    }

    pub fn value(&self) -> Option<TypeExpr> {
        children(&self.0).nth(1)
    }
}

ast_node!(ChanType, CHAN_TYPE);

impl ChanType {
    pub fn elem(&self) -> Option<TypeExpr> {
        child(&self.0)
    }
}

ast_node!(FuncType, FUNC_TYPE);

impl FuncType {
    pub fn params(&self) -> Option<ParamList> {
        child(&self.0)
    }

    pub fn result(&self) -> Option<ResultClause> {
        child(&self.0)
    }
}

ast_node!(StructType, STRUCT_TYPE);

impl StructType {
    pub fn fields(&self) -> impl Iterator<Item = FieldDecl> + use<> {
        children(&self.0)
    }
}

ast_node!(FieldDecl, FIELD_DECL);

impl FieldDecl {
    pub fn names(&self) -> impl Iterator<Item = Name> + use<> {
        children(&self.0)
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        child(&self.0)
    }

    pub fn is_embedded(&self) -> bool {
        self.names().next().is_none()
    }
}

ast_node!(InterfaceType, INTERFACE_TYPE);

impl InterfaceType {
    pub fn methods(&self) -> impl Iterator<Item = MethodSpec> + use<> {
        children(&self.0)
    }
}

ast_node!(MethodSpec, METHOD_SPEC);

impl MethodSpec {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn params(&self) -> Option<ParamList> {
        child(&self.0)
    }

    pub fn result(&self) -> Option<ResultClause> {
        child(&self.0)
    }
}

// ============================================================================
// Statements
// ============================================================================

ast_enum!(
    /// Any statement
    Stmt {
        Var(VarDecl) = VAR_DECL,
        Const(ConstDecl) = CONST_DECL,
        Expr(ExprStmt) = EXPR_STMT,
        Assign(AssignStmt) = ASSIGN_STMT,
        Define(DefineStmt) = DEFINE_STMT,
        IncDec(IncDecStmt) = INC_DEC_STMT,
        Send(SendStmt) = SEND_STMT,
        Return(ReturnStmt) = RETURN_STMT,
        If(IfStmt) = IF_STMT,
        For(ForStmt) = FOR_STMT,
        Switch(SwitchStmt) = SWITCH_STMT,
        Select(SelectStmt) = SELECT_STMT,
        Branch(BranchStmt) = BRANCH_STMT,
        Block(Block) = BLOCK,
    }
);

/// Whether `kind` is a simple statement usable as an init or post clause.
fn is_simple_stmt(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::EXPR_STMT
            | SyntaxKind::ASSIGN_STMT
            | SyntaxKind::DEFINE_STMT
            | SyntaxKind::INC_DEC_STMT
            | SyntaxKind::SEND_STMT
    )
}

ast_node!(Block, BLOCK);

impl Block {
    pub fn statements(&self) -> impl Iterator<Item = Stmt> + use<> {
        children(&self.0)
    }

    pub fn r_brace(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::R_BRACE)
    }
}

ast_node!(ExprStmt, EXPR_STMT);

impl ExprStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(ExprList, EXPR_LIST);

impl ExprList {
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + use<> {
        children(&self.0)
    }
}

ast_node!(AssignStmt, ASSIGN_STMT);

impl AssignStmt {
    pub fn lhs(&self) -> Vec<Expr> {
        expr_list(child(&self.0))
    }

    pub fn rhs(&self) -> Vec<Expr> {
        expr_list(children(&self.0).nth(1))
    }

    pub fn op_token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::EQ
                        | SyntaxKind::PLUS_EQ
                        | SyntaxKind::MINUS_EQ
                        | SyntaxKind::STAR_EQ
                        | SyntaxKind::SLASH_EQ
                        | SyntaxKind::PERCENT_EQ
                )
            })
    }

    /// `+=`, `-=` and friends, as opposed to plain `=`.
    pub fn is_compound(&self) -> bool {
        self.op_token().is_some_and(|t| t.kind() != SyntaxKind::EQ)
    }
}

ast_node!(DefineStmt, DEFINE_STMT);

impl DefineStmt {
    pub fn lhs(&self) -> Vec<Expr> {
        expr_list(child(&self.0))
    }

    pub fn rhs(&self) -> Vec<Expr> {
        expr_list(children(&self.0).nth(1))
    }
}

ast_node!(IncDecStmt, INC_DEC_STMT);

impl IncDecStmt {
    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(SendStmt, SEND_STMT);

impl SendStmt {
    pub fn channel(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn value(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

ast_node!(ReturnStmt, RETURN_STMT);

impl ReturnStmt {
    pub fn values(&self) -> Vec<Expr> {
        expr_list(child(&self.0))
    }
}

ast_node!(IfStmt, IF_STMT);

/// The `else` part of an if statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElseBranch {
    If(IfStmt),
    Block(Block),
}

impl IfStmt {
    pub fn init(&self) -> Option<Stmt> {
        self.0
            .children()
            .filter(|n| is_simple_stmt(n.kind()))
            .find_map(Stmt::cast)
    }

    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn then_branch(&self) -> Option<Block> {
        child(&self.0)
    }

    pub fn else_branch(&self) -> Option<ElseBranch> {
        if let Some(nested) = child::<IfStmt>(&self.0) {
            return Some(ElseBranch::If(nested));
        }
        children::<Block>(&self.0).nth(1).map(ElseBranch::Block)
    }
}

ast_node!(ForStmt, FOR_STMT);

impl ForStmt {
    pub fn for_clause(&self) -> Option<ForClause> {
        child(&self.0)
    }

    pub fn range_clause(&self) -> Option<RangeClause> {
        child(&self.0)
    }

    /// Bare condition of `for cond {}`
    pub fn condition(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(ForClause, FOR_CLAUSE);

impl ForClause {
    /// The node in each `;`-separated segment of the clause.
    fn segment(&self, index: usize) -> Option<SyntaxNode> {
        let mut current = 0;
        for element in self.0.children_with_tokens() {
            match element {
                rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::SEMICOLON => current += 1,
                rowan::NodeOrToken::Node(n) if current == index => return Some(n),
                _ => {}
            }
        }
        None
    }

    pub fn init(&self) -> Option<Stmt> {
        self.segment(0).and_then(Stmt::cast)
    }

    pub fn condition(&self) -> Option<Expr> {
        self.segment(1).and_then(Expr::cast)
    }

    pub fn post(&self) -> Option<Stmt> {
        self.segment(2).and_then(Stmt::cast)
    }
}

ast_node!(RangeClause, RANGE_CLAUSE);

impl RangeClause {
    pub fn lhs(&self) -> Vec<Expr> {
        expr_list(child(&self.0))
    }

    pub fn is_define(&self) -> bool {
        token(&self.0, SyntaxKind::COLON_EQ).is_some()
    }

    pub fn expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(SwitchStmt, SWITCH_STMT);

impl SwitchStmt {
    pub fn init(&self) -> Option<Stmt> {
        self.0
            .children()
            .filter(|n| is_simple_stmt(n.kind()))
            .find_map(Stmt::cast)
    }

    pub fn tag(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn clauses(&self) -> impl Iterator<Item = CaseClause> + use<> {
        children(&self.0)
    }
}

ast_node!(CaseClause, CASE_CLAUSE);

impl CaseClause {
    pub fn is_default(&self) -> bool {
        token(&self.0, SyntaxKind::DEFAULT_KW).is_some()
    }

    pub fn values(&self) -> Vec<Expr> {
        expr_list(child(&self.0))
    }

    pub fn statements(&self) -> Vec<Stmt> {
        statements_after_colon(&self.0)
    }
}

ast_node!(SelectStmt, SELECT_STMT);

impl SelectStmt {
    pub fn clauses(&self) -> impl Iterator<Item = CommClause> + use<> {
        children(&self.0)
    }
}

ast_node!(CommClause, COMM_CLAUSE);

impl CommClause {
    pub fn is_default(&self) -> bool {
        token(&self.0, SyntaxKind::DEFAULT_KW).is_some()
    }

    /// The send or receive statement after `case`
    pub fn comm(&self) -> Option<Stmt> {
        let colon = token(&self.0, SyntaxKind::COLON)?;
        self.0
            .children()
            .filter(|n| n.text_range().end() <= colon.text_range().start())
            .find(|n| is_simple_stmt(n.kind()))
            .and_then(Stmt::cast)
    }

    pub fn statements(&self) -> Vec<Stmt> {
        statements_after_colon(&self.0)
    }
}

fn statements_after_colon(node: &SyntaxNode) -> Vec<Stmt> {
    let Some(colon) = token(node, SyntaxKind::COLON) else {
        return Vec::new();
    };
    let start = colon.text_range().end();
    node.children()
        .filter(|n| n.text_range().start() >= start)
        .filter_map(Stmt::cast)
        .collect()
}

ast_node!(BranchStmt, BRANCH_STMT);

// ============================================================================
// Expressions
// ============================================================================

ast_enum!(
    /// Any expression
    Expr {
        NameRef(NameRef) = NAME_REF,
        Literal(Literal) = LITERAL,
        Paren(ParenExpr) = PAREN_EXPR,
        Selector(SelectorExpr) = SELECTOR_EXPR,
        Call(CallExpr) = CALL_EXPR,
        Command(CommandCall) = COMMAND_CALL,
        Index(IndexExpr) = INDEX_EXPR,
        Composite(CompositeLit) = COMPOSITE_LIT,
        Unary(UnaryExpr) = UNARY_EXPR,
        Binary(BinaryExpr) = BINARY_EXPR,
        FuncLit(FuncLit) = FUNC_LIT,
        Lambda(LambdaExpr) = LAMBDA_EXPR,
        List(ListLit) = LIST_LIT,
        Map(MapLit) = MAP_LIT,
    }
);

impl Expr {
    /// Strip redundant parentheses.
    pub fn unparen(self) -> Expr {
        match self {
            Expr::Paren(p) => match p.inner() {
                Some(inner) => inner.unparen(),
                None => Expr::Paren(p),
            },
            other => other,
        }
    }

    /// A call expression in either parenthesized or command form.
    pub fn as_call(&self) -> Option<CallLike> {
        match self {
            Expr::Call(c) => Some(CallLike::Call(c.clone())),
            Expr::Command(c) => Some(CallLike::Command(c.clone())),
            _ => None,
        }
    }
}

/// Literal token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Float,
    String,
}

ast_node!(Literal, LITERAL);

impl Literal {
    pub fn token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| t.kind().is_literal())
    }

    pub fn kind(&self) -> Option<LiteralKind> {
        match self.token()?.kind() {
            SyntaxKind::INT => Some(LiteralKind::Int),
            SyntaxKind::FLOAT => Some(LiteralKind::Float),
            SyntaxKind::STRING | SyntaxKind::RAW_STRING => Some(LiteralKind::String),
            _ => None,
        }
    }

    /// Decoded value of a string literal
    pub fn string_value(&self) -> Option<String> {
        let token = self.token()?;
        match token.kind() {
            SyntaxKind::STRING | SyntaxKind::RAW_STRING => unquote(token.text()),
            _ => None,
        }
    }
}

/// Decode a quoted or raw string literal, tolerating a missing closing quote.
pub fn unquote(text: &str) -> Option<String> {
    if let Some(raw) = text.strip_prefix('`') {
        return Some(raw.strip_suffix('`').unwrap_or(raw).to_string());
    }
    let body = text.strip_prefix('"')?;
    let body = if super::lexer::is_terminated_string(text) {
        &body[..body.len() - 1]
    } else {
        body
    };
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Some(out)
}

ast_node!(ParenExpr, PAREN_EXPR);

impl ParenExpr {
    pub fn inner(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(SelectorExpr, SELECTOR_EXPR);

impl SelectorExpr {
    pub fn base(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn dot(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::DOT)
    }

    /// The selected member name; absent while the user is still typing `x.`
    pub fn name_token(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }
}

ast_node!(ArgList, ARG_LIST);

impl ArgList {
    pub fn args(&self) -> impl Iterator<Item = Expr> + use<> {
        children(&self.0)
    }

    pub fn has_spread(&self) -> bool {
        token(&self.0, SyntaxKind::ELLIPSIS).is_some()
    }

    pub fn l_paren(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::L_PAREN)
    }

    pub fn r_paren(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::R_PAREN)
    }

    /// Commas separating arguments, in source order
    pub fn commas(&self) -> Vec<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::COMMA)
            .collect()
    }
}

ast_node!(CallExpr, CALL_EXPR);

impl CallExpr {
    pub fn callee(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

ast_node!(CommandCall, COMMAND_CALL);

impl CommandCall {
    pub fn callee(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        child(&self.0)
    }
}

/// A call in either `f(x)` or command `f x` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallLike {
    Call(CallExpr),
    Command(CommandCall),
}

impl CallLike {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::CALL_EXPR => Some(Self::Call(CallExpr(node))),
            SyntaxKind::COMMAND_CALL => Some(Self::Command(CommandCall(node))),
            _ => None,
        }
    }

    pub fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Call(c) => c.syntax(),
            Self::Command(c) => c.syntax(),
        }
    }

    pub fn callee(&self) -> Option<Expr> {
        match self {
            Self::Call(c) => c.callee(),
            Self::Command(c) => c.callee(),
        }
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        match self {
            Self::Call(c) => c.arg_list(),
            Self::Command(c) => c.arg_list(),
        }
    }

    pub fn args(&self) -> Vec<Expr> {
        self.arg_list()
            .map(|list| list.args().collect())
            .unwrap_or_default()
    }
}

ast_node!(IndexExpr, INDEX_EXPR);

impl IndexExpr {
    pub fn base(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn index(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

ast_node!(CompositeLit, COMPOSITE_LIT);

/// The type named by a composite literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompositeType {
    /// `Name{}` or `pkg.Name{}`
    Named(Expr),
    /// `[]T{}` or `map[K]V{}`
    Type(TypeExpr),
}

impl CompositeLit {
    pub fn composite_type(&self) -> Option<CompositeType> {
        let first = self.0.first_child()?;
        if let Some(ty) = TypeExpr::cast(first.clone()) {
            return Some(CompositeType::Type(ty));
        }
        Expr::cast(first).map(CompositeType::Named)
    }

    pub fn body(&self) -> Option<LitBody> {
        child(&self.0)
    }
}

ast_node!(LitBody, LIT_BODY);

/// An element of a composite or map literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Keyed(KeyedElement),
    Value(Expr),
}

impl LitBody {
    pub fn elements(&self) -> impl Iterator<Item = Element> + use<> {
        self.0.children().filter_map(|n| {
            if let Some(keyed) = KeyedElement::cast(n.clone()) {
                Some(Element::Keyed(keyed))
            } else {
                Expr::cast(n).map(Element::Value)
            }
        })
    }
}

ast_node!(KeyedElement, KEYED_ELEMENT);

impl KeyedElement {
    pub fn key(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn value(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }
}

ast_node!(UnaryExpr, UNARY_EXPR);

impl UnaryExpr {
    pub fn op_kind(&self) -> Option<SyntaxKind> {
        self.0.first_token().map(|t| t.kind())
    }

    pub fn operand(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(BinaryExpr, BINARY_EXPR);

impl BinaryExpr {
    pub fn lhs(&self) -> Option<Expr> {
        child(&self.0)
    }

    pub fn rhs(&self) -> Option<Expr> {
        children(&self.0).nth(1)
    }

    pub fn op_token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| t.kind().is_punct())
    }

    pub fn op_kind(&self) -> Option<SyntaxKind> {
        self.op_token().map(|t| t.kind())
    }
}

ast_node!(FuncLit, FUNC_LIT);

impl FuncLit {
    pub fn params(&self) -> Option<ParamList> {
        child(&self.0)
    }

    pub fn result(&self) -> Option<ResultClause> {
        child(&self.0)
    }

    pub fn body(&self) -> Option<Block> {
        child(&self.0)
    }
}

ast_node!(LambdaExpr, LAMBDA_EXPR);

impl LambdaExpr {
    pub fn params(&self) -> Vec<Name> {
        child::<LambdaParams>(&self.0)
            .map(|p| children(&p.0).collect())
            .unwrap_or_default()
    }

    pub fn body_block(&self) -> Option<Block> {
        child(&self.0)
    }

    pub fn body_expr(&self) -> Option<Expr> {
        child(&self.0)
    }
}

ast_node!(LambdaParams, LAMBDA_PARAMS);

ast_node!(ListLit, LIST_LIT);

impl ListLit {
    pub fn elements(&self) -> impl Iterator<Item = Expr> + use<> {
        children(&self.0)
    }
}

ast_node!(MapLit, MAP_LIT);

impl MapLit {
    pub fn body(&self) -> Option<LitBody> {
        child(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn source(input: &str) -> SourceFile {
        let parsed = parse(input);
        assert!(parsed.ok(), "{:?}", parsed.errors);
        SourceFile::cast(parsed.syntax()).unwrap()
    }

    #[test]
    fn test_ast_var_block() {
        let file = source("var (\n\tFido Fido\n\tscore, lives int = 0, 3\n)\n");
        let items: Vec<_> = file.items().collect();
        assert_eq!(items.len(), 1);
        let Item::Var(decl) = &items[0] else {
            panic!("expected var");
        };
        assert!(decl.is_grouped());
        let specs: Vec<_> = decl.specs().collect();
        assert_eq!(specs.len(), 2);
        let names: Vec<_> = specs[1].names().filter_map(|n| n.text()).collect();
        assert_eq!(names, vec!["score", "lives"]);
        assert_eq!(specs[1].values().len(), 2);
    }

    #[test]
    fn test_ast_func_decl() {
        let file = source("func (p *Sprite) turn(dir Direction) float64 {\n\treturn 0\n}\n");
        let Some(Item::Func(func)) = file.items().next() else {
            panic!("expected func");
        };
        assert_eq!(func.name().and_then(|n| n.text()).as_deref(), Some("turn"));
        let recv = func.receiver().and_then(|r| r.param()).unwrap();
        assert!(matches!(recv.ty(), Some(TypeExpr::Pointer(_))));
        assert_eq!(func.params().unwrap().params().count(), 1);
        assert!(matches!(func.result().and_then(|r| r.ty()), Some(TypeExpr::Ref(_))));
        assert_eq!(func.body().unwrap().statements().count(), 1);
    }

    #[test]
    fn test_ast_command_call() {
        let file = source("Fido.turn Right, 2\n");
        let Some(Item::Stmt(Stmt::Expr(stmt))) = file.items().next() else {
            panic!("expected statement");
        };
        let call = stmt.expr().and_then(|e| e.as_call()).unwrap();
        assert!(matches!(call, CallLike::Command(_)));
        let Some(Expr::Selector(sel)) = call.callee() else {
            panic!("expected selector callee");
        };
        assert_eq!(sel.name_token().unwrap().text(), "turn");
        assert_eq!(call.args().len(), 2);
    }

    #[test]
    fn test_ast_if_else_chain() {
        let file = source("if x := 1; x > 0 {\n} else if x < 0 {\n} else {\n}\n");
        let Some(Item::Stmt(Stmt::If(stmt))) = file.items().next() else {
            panic!("expected if");
        };
        assert!(matches!(stmt.init(), Some(Stmt::Define(_))));
        assert!(matches!(stmt.condition(), Some(Expr::Binary(_))));
        let Some(ElseBranch::If(nested)) = stmt.else_branch() else {
            panic!("expected else if");
        };
        assert!(matches!(nested.else_branch(), Some(ElseBranch::Block(_))));
    }

    #[test]
    fn test_ast_for_clause_segments() {
        let file = source("for i := 0; i < 3; i++ {\n}\n");
        let Some(Item::Stmt(Stmt::For(stmt))) = file.items().next() else {
            panic!("expected for");
        };
        let clause = stmt.for_clause().unwrap();
        assert!(matches!(clause.init(), Some(Stmt::Define(_))));
        assert!(matches!(clause.condition(), Some(Expr::Binary(_))));
        assert!(matches!(clause.post(), Some(Stmt::IncDec(_))));
    }

    #[test]
    fn test_ast_lambda_forms() {
        let file = source("onKey Key, (k) => {\n}\nonStart => {\n}\n");
        let lambdas: Vec<_> = file
            .syntax()
            .descendants()
            .filter_map(LambdaExpr::cast)
            .collect();
        assert_eq!(lambdas.len(), 2);
        assert_eq!(lambdas[0].params().len(), 1);
        assert!(lambdas[1].params().is_empty());
        assert!(lambdas[1].body_block().is_some());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""a\"b\n""#).as_deref(), Some("a\"b\n"));
        assert_eq!(unquote("`raw\\n`").as_deref(), Some("raw\\n"));
        assert_eq!(unquote("\"open").as_deref(), Some("open"));
    }
}
