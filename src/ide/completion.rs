//! Completion suggestions.
//!
//! The cursor context comes from one walk outwards from the token before the
//! cursor. The innermost recognized construct decides what is offered; a call
//! argument list only wins when nothing nested inside it matched.

use rustc_hash::FxHashSet;
use serde::Serialize;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::document;
use super::docs::{DocProvider, doc_key};
use crate::base::Position;
use crate::base::text_utils::word_range_before;
use crate::error::RequestError;
use crate::hir::prelude::prelude_files;
use crate::hir::{
    ClassKind, Model, NamedId, ProgramUnit, Symbol, SymbolId, SymbolKind, Type, UnitFile,
    is_handler_name,
};
use crate::parser::{
    AstNode, CallLike, Expr, KEYWORDS, SelectorExpr, SyntaxKind, SyntaxNode, SyntaxToken,
    is_terminated_string,
};
use crate::resource::{ResourceId, sprite_context};

// ============================================================================
// ITEMS
// ============================================================================

/// Kind of completion item, in ranking order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionKind {
    /// A resource name such as a sound or costume
    Resource,
    Variable,
    Field,
    Method,
    Function,
    Constant,
    Class,
    Interface,
    Module,
    Keyword,
}

impl CompletionKind {
    /// Convert to LSP completion item kind number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            CompletionKind::Resource => 12, // Value
            CompletionKind::Variable => 6,
            CompletionKind::Field => 5,
            CompletionKind::Method => 2,
            CompletionKind::Function => 3,
            CompletionKind::Constant => 21,
            CompletionKind::Class => 7,
            CompletionKind::Interface => 8,
            CompletionKind::Module => 9,
            CompletionKind::Keyword => 14,
        }
    }

    /// Sort priority (lower = higher priority).
    pub fn priority(&self) -> u32 {
        *self as u32
    }

    fn of_symbol(model: &Model, symbol: &Symbol) -> Self {
        match symbol.kind {
            SymbolKind::Var | SymbolKind::Param => CompletionKind::Variable,
            SymbolKind::Field => CompletionKind::Field,
            SymbolKind::Method => CompletionKind::Method,
            SymbolKind::Func | SymbolKind::Builtin => CompletionKind::Function,
            SymbolKind::Const => CompletionKind::Constant,
            SymbolKind::TypeName if model.is_interface(&symbol.ty) => CompletionKind::Interface,
            SymbolKind::TypeName => CompletionKind::Class,
            SymbolKind::Package => CompletionKind::Module,
        }
    }
}

/// A completion suggestion.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// Detail text (shown after label).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    /// Text to insert (if different from label).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<String>,
    /// Resource named by a resource candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceId>,
    #[serde(skip)]
    pub symbol: Option<SymbolId>,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
            insert_text: None,
            resource: None,
            symbol: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_documentation(mut self, doc: impl Into<String>) -> Self {
        self.documentation = Some(doc.into());
        self
    }

    pub fn with_insert_text(mut self, text: impl Into<String>) -> Self {
        self.insert_text = Some(text.into());
        self
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// What the cursor is in the middle of
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionContextKind {
    /// An import path
    Import,
    /// Member access after `.`
    Dot,
    /// An argument of a call
    Call,
    /// A key of a struct literal
    StructLiteral,
    /// The right-hand side of `=` or `:=`
    AssignOrDefine,
    /// The value of a `var` or `const` spec
    Decl,
    Return,
    SwitchCase,
    Select,
    Comment,
    StringLiteral,
    /// A bare identifier or the start of a line
    General,
}

/// Base of a member access
#[derive(Clone, Debug)]
enum DotBase {
    Package(SmolStr),
    Value(Type),
}

#[derive(Clone, Debug)]
struct Context {
    kind: CompletionContextKind,
    /// Types a candidate must be assignable to; empty accepts anything
    expected: Vec<Type>,
    /// Symbols assigned by the statement under the cursor
    targets: FxHashSet<SymbolId>,
    /// Node the cursor belongs to, used to find enclosing calls
    anchor: Option<SyntaxNode>,
    dot: Option<DotBase>,
    /// Struct type and the keys already written
    struct_lit: Option<(NamedId, FxHashSet<SmolStr>)>,
    in_string: bool,
    statement_start: bool,
}

impl Context {
    fn new(kind: CompletionContextKind) -> Self {
        Self {
            kind,
            expected: Vec::new(),
            targets: FxHashSet::default(),
            anchor: None,
            dot: None,
            struct_lit: None,
            in_string: false,
            statement_start: false,
        }
    }

    fn with_anchor(mut self, anchor: SyntaxNode) -> Self {
        self.anchor = Some(anchor);
        self
    }

    fn with_expected(mut self, expected: Vec<Type>) -> Self {
        self.expected = expected;
        self
    }
}

/// Kind of completion context at `position`; `None` when the position lies
/// outside the document.
pub fn completion_context(
    unit: &ProgramUnit,
    path: &str,
    position: Position,
) -> Result<Option<CompletionContextKind>, RequestError> {
    let file = document(unit, path)?;
    Ok(cursor_offset(file, position).map(|offset| classify(unit, file, offset).kind))
}

fn cursor_offset(file: &UnitFile, position: Position) -> Option<TextSize> {
    (position.line < file.line_index.line_count()).then(|| file.line_index.offset(position))
}

fn classify(unit: &ProgramUnit, file: &UnitFile, offset: TextSize) -> Context {
    let root = file.syntax();
    if let Some(token) = root.token_at_offset(offset).left_biased()
        && token.text_range().start() < offset
    {
        if token.kind().is_comment() && inside_comment(&token, offset) {
            return Context::new(CompletionContextKind::Comment);
        }
        if matches!(token.kind(), SyntaxKind::STRING | SyntaxKind::RAW_STRING)
            && inside_string(&token, offset)
        {
            return string_context(unit, file, &token);
        }
    }

    let word = word_range_before(&file.text, offset);
    let prev = previous_token(&root, word.start());
    if let Some(dot) = prev.as_ref().filter(|t| t.kind() == SyntaxKind::DOT) {
        return dot_context(unit, file, dot);
    }

    let start = if word.is_empty() {
        prev.as_ref().and_then(|t| t.parent())
    } else {
        root.token_at_offset(word.start())
            .right_biased()
            .and_then(|t| t.parent())
    }
    .unwrap_or_else(|| root.clone());

    for node in start.ancestors() {
        let found = match node.kind() {
            SyntaxKind::ARG_LIST => call_context(unit, file, &node, offset),
            SyntaxKind::LIT_BODY => struct_context(unit, file, &node, offset),
            SyntaxKind::ASSIGN_STMT | SyntaxKind::DEFINE_STMT => assign_context(unit, file, &node, offset),
            SyntaxKind::VAR_SPEC | SyntaxKind::CONST_SPEC => decl_context(unit, file, &node, offset),
            SyntaxKind::RETURN_STMT => return_context(unit, file, &node, offset),
            SyntaxKind::CASE_CLAUSE => case_context(unit, file, &node, offset),
            SyntaxKind::COMM_CLAUSE => clause_header(&node, offset)
                .then(|| Context::new(CompletionContextKind::Select).with_anchor(node.clone())),
            SyntaxKind::IMPORT_DECL | SyntaxKind::IMPORT_SPEC => {
                Some(Context::new(CompletionContextKind::Import))
            }
            SyntaxKind::BLOCK
            | SyntaxKind::FUNC_DECL
            | SyntaxKind::FUNC_LIT
            | SyntaxKind::LAMBDA_EXPR
            | SyntaxKind::SOURCE_FILE => break,
            _ => None,
        };
        if let Some(ctx) = found {
            tracing::trace!(kind = ?ctx.kind, "completion context");
            return ctx;
        }
    }

    if word.is_empty()
        && let Some(prev) = &prev
        && let Some(ctx) = command_context(unit, file, prev, offset)
    {
        return ctx;
    }

    let line_start = file.line_index.line_range(file.line_index.position(offset).line);
    let mut ctx = Context::new(CompletionContextKind::General).with_anchor(start);
    ctx.statement_start = line_start.is_some_and(|line| {
        line.start() <= word.start()
            && file.text[TextRange::new(line.start(), word.start())]
                .chars()
                .all(char::is_whitespace)
    });
    ctx
}

fn inside_comment(token: &SyntaxToken, offset: TextSize) -> bool {
    let range = token.text_range();
    if token.kind() == SyntaxKind::BLOCK_COMMENT && token.text().ends_with("*/") {
        return offset < range.end();
    }
    offset <= range.end()
}

fn inside_string(token: &SyntaxToken, offset: TextSize) -> bool {
    let range = token.text_range();
    let closed = match token.kind() {
        SyntaxKind::RAW_STRING => token.text().len() >= 2 && token.text().ends_with('`'),
        _ => is_terminated_string(token.text()),
    };
    if closed {
        offset < range.end()
    } else {
        offset <= range.end()
    }
}

/// Last non-trivia token ending at or before `offset`.
fn previous_token(root: &SyntaxNode, offset: TextSize) -> Option<SyntaxToken> {
    let mut token = root.token_at_offset(offset).left_biased()?;
    if token.text_range().end() > offset {
        token = token.prev_token()?;
    }
    while token.kind().is_trivia() {
        token = token.prev_token()?;
    }
    Some(token)
}

fn push_unique(types: &mut Vec<Type>, ty: Type) {
    if !ty.is_invalid() && !types.contains(&ty) {
        types.push(ty);
    }
}

/// Symbol named by a callee expression.
fn callee_symbol(unit: &ProgramUnit, file: &UnitFile, callee: &Expr) -> Option<SymbolId> {
    let token = match callee.clone().unparen() {
        Expr::NameRef(name) => name.ident()?,
        Expr::Selector(selector) => selector.name_token()?,
        _ => return None,
    };
    unit.info().use_at(file.id, token.text_range())
}

/// Parameter types at `index` across every overload of the callee.
fn param_types_at(unit: &ProgramUnit, file: &UnitFile, callee: &Expr, index: usize) -> Vec<Type> {
    let mut types = Vec::new();
    if let Some(symbol) = callee_symbol(unit, file, callee) {
        for sig in &unit.model().symbol(symbol).signatures {
            if let Some(ty) = sig.param_type_at(index) {
                push_unique(&mut types, ty);
            }
        }
    } else if let Some(sig) = unit
        .info()
        .type_of(file.id, callee.syntax())
        .and_then(|tv| tv.ty.as_func().cloned())
        && let Some(ty) = sig.param_type_at(index)
    {
        push_unique(&mut types, ty);
    }
    types
}

fn string_context(unit: &ProgramUnit, file: &UnitFile, token: &SyntaxToken) -> Context {
    let mut ctx = Context::new(CompletionContextKind::StringLiteral);
    ctx.in_string = true;
    // Import paths are bare STRING tokens under IMPORT_SPEC.
    if token.parent_ancestors().any(|n| n.kind() == SyntaxKind::IMPORT_SPEC) {
        ctx.kind = CompletionContextKind::Import;
        return ctx;
    }
    let Some(lit) = token.parent().filter(|p| p.kind() == SyntaxKind::LITERAL) else {
        return ctx;
    };
    let info = unit.info();
    if let Some(tv) = info.type_of(file.id, &lit) {
        push_unique(&mut ctx.expected, tv.ty.clone());
    }
    if let Some(ty) = info.expected_type(file.id, &lit) {
        push_unique(&mut ctx.expected, ty.clone());
    }
    if let Some(list) = lit.parent().filter(|p| p.kind() == SyntaxKind::ARG_LIST)
        && let Some(call) = list.parent().and_then(CallLike::cast)
        && let Some(callee) = call.callee()
    {
        let index = list.children().position(|n| n == lit).unwrap_or(0);
        for ty in param_types_at(unit, file, &callee, index) {
            push_unique(&mut ctx.expected, ty);
        }
    }
    ctx.with_anchor(lit)
}

fn dot_context(unit: &ProgramUnit, file: &UnitFile, dot: &SyntaxToken) -> Context {
    let mut ctx = Context::new(CompletionContextKind::Dot);
    let Some(selector) = dot.parent().and_then(SelectorExpr::cast) else {
        return ctx;
    };
    let Some(base) = selector.base() else {
        return ctx;
    };
    let (model, info) = (unit.model(), unit.info());
    let package = match &base {
        Expr::NameRef(name) => name
            .ident()
            .and_then(|ident| info.use_at(file.id, ident.text_range()))
            .map(|symbol| model.symbol(symbol))
            .filter(|symbol| symbol.kind == SymbolKind::Package)
            .map(|symbol| symbol.package.clone()),
        _ => None,
    };
    ctx.dot = match package {
        Some(path) => Some(DotBase::Package(path)),
        None => info
            .type_of(file.id, base.syntax())
            .map(|tv| DotBase::Value(tv.ty.clone())),
    };
    ctx.with_anchor(selector.syntax().clone())
}

fn call_context(unit: &ProgramUnit, file: &UnitFile, node: &SyntaxNode, offset: TextSize) -> Option<Context> {
    let list = crate::parser::ArgList::cast(node.clone())?;
    let call = CallLike::cast(node.parent()?)?;
    let callee = call.callee()?;
    match list.l_paren() {
        Some(l_paren) if offset < l_paren.text_range().end() => return None,
        None if offset <= callee.syntax().text_range().end() => return None,
        _ => {}
    }
    if let Some(r_paren) = list.r_paren()
        && offset > r_paren.text_range().start()
    {
        return None;
    }
    let index = list
        .commas()
        .iter()
        .filter(|comma| comma.text_range().end() <= offset)
        .count();
    let expected = param_types_at(unit, file, &callee, index);
    Some(
        Context::new(CompletionContextKind::Call)
            .with_expected(expected)
            .with_anchor(call.syntax().clone()),
    )
}

/// `play |`: a callee written as a statement, arguments not started yet.
fn command_context(unit: &ProgramUnit, file: &UnitFile, prev: &SyntaxToken, offset: TextSize) -> Option<Context> {
    if prev.kind() != SyntaxKind::IDENT {
        return None;
    }
    let gap = TextRange::new(prev.text_range().end(), offset);
    let gap_text = file.text.get(std::ops::Range::<usize>::from(gap))?;
    if gap_text.is_empty() || !gap_text.chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }
    let mut expr = prev.parent()?;
    if let Some(selector) = expr.parent().filter(|p| p.kind() == SyntaxKind::SELECTOR_EXPR) {
        expr = selector;
    }
    if expr.parent()?.kind() != SyntaxKind::EXPR_STMT {
        return None;
    }
    let callee = Expr::cast(expr.clone())?;
    let symbol = callee_symbol(unit, file, &callee)?;
    if !unit.model().symbol(symbol).kind.is_callable() {
        return None;
    }
    Some(
        Context::new(CompletionContextKind::Call)
            .with_expected(param_types_at(unit, file, &callee, 0))
            .with_anchor(expr),
    )
}

fn struct_context(unit: &ProgramUnit, file: &UnitFile, body: &SyntaxNode, offset: TextSize) -> Option<Context> {
    let lit = body.parent().filter(|p| p.kind() == SyntaxKind::COMPOSITE_LIT)?;
    let body_range = body.text_range();
    if offset <= body_range.start() {
        return None;
    }
    let model = unit.model();
    let named = unit.info().type_of(file.id, &lit)?.ty.as_named()?;
    if !model.named(named).is_struct() {
        return None;
    }
    let mut present = FxHashSet::default();
    for element in body.children().filter(|n| n.kind() == SyntaxKind::KEYED_ELEMENT) {
        let colon = element
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| t.kind() == SyntaxKind::COLON);
        if let Some(colon) = &colon
            && element.text_range().contains_inclusive(offset)
            && offset >= colon.text_range().end()
        {
            // Value position: completes like any expression.
            return None;
        }
        if let Some(key) = element.first_child() {
            present.insert(SmolStr::new(key.text().to_string()));
        }
    }
    let mut ctx = Context::new(CompletionContextKind::StructLiteral).with_anchor(lit);
    ctx.struct_lit = Some((named, present));
    Some(ctx)
}

fn operator_token(node: &SyntaxNode, kinds: &[SyntaxKind]) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| kinds.contains(&t.kind()))
}

fn commas_before(list: Option<SyntaxNode>, offset: TextSize) -> usize {
    list.map_or(0, |list| {
        list.children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::COMMA && t.text_range().end() <= offset)
            .count()
    })
}

/// Symbol bound to the identifier of `node`, defined or used.
fn bound_symbol(unit: &ProgramUnit, file: &UnitFile, node: &SyntaxNode) -> Option<SymbolId> {
    let ident = node
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == SyntaxKind::IDENT)?;
    let info = unit.info();
    info.def_at(file.id, ident.text_range())
        .or_else(|| info.use_at(file.id, ident.text_range()))
}

const ASSIGN_OPS: &[SyntaxKind] = &[
    SyntaxKind::COLON_EQ,
    SyntaxKind::EQ,
    SyntaxKind::PLUS_EQ,
    SyntaxKind::MINUS_EQ,
    SyntaxKind::STAR_EQ,
    SyntaxKind::SLASH_EQ,
    SyntaxKind::PERCENT_EQ,
];

fn assign_context(unit: &ProgramUnit, file: &UnitFile, stmt: &SyntaxNode, offset: TextSize) -> Option<Context> {
    let op = operator_token(stmt, ASSIGN_OPS)?;
    if offset < op.text_range().end() {
        return None;
    }
    let mut lists = stmt.children().filter(|n| n.kind() == SyntaxKind::EXPR_LIST);
    let lhs = lists.next()?;
    let index = commas_before(lists.next(), offset);
    let lhs: Vec<SyntaxNode> = lhs.children().collect();

    let mut ctx = Context::new(CompletionContextKind::AssignOrDefine).with_anchor(stmt.clone());
    for target in &lhs {
        if target.kind() == SyntaxKind::NAME_REF
            && let Some(symbol) = bound_symbol(unit, file, target)
        {
            ctx.targets.insert(symbol);
        }
    }
    if stmt.kind() == SyntaxKind::ASSIGN_STMT
        && let Some(target) = lhs.get(index)
        && let Some(tv) = unit.info().type_of(file.id, target)
    {
        push_unique(&mut ctx.expected, tv.ty.clone());
    }
    Some(ctx)
}

fn decl_context(unit: &ProgramUnit, file: &UnitFile, spec: &SyntaxNode, offset: TextSize) -> Option<Context> {
    let eq = operator_token(spec, &[SyntaxKind::EQ])?;
    if offset < eq.text_range().end() {
        return None;
    }
    let mut ctx = Context::new(CompletionContextKind::Decl).with_anchor(spec.clone());
    let names: Vec<SyntaxNode> = spec.children().filter(|n| n.kind() == SyntaxKind::NAME).collect();
    let model = unit.model();
    for name in &names {
        if let Some(symbol) = bound_symbol(unit, file, name) {
            ctx.targets.insert(symbol);
        }
    }
    let declares_type = spec.children().any(|n| {
        n.kind() != SyntaxKind::NAME && n.kind() != SyntaxKind::EXPR_LIST
    });
    if declares_type {
        let index = commas_before(
            spec.children().find(|n| n.kind() == SyntaxKind::EXPR_LIST),
            offset,
        );
        if let Some(symbol) = names.get(index).and_then(|n| bound_symbol(unit, file, n)) {
            push_unique(&mut ctx.expected, model.symbol(symbol).ty.clone());
        }
    }
    Some(ctx)
}

fn return_context(unit: &ProgramUnit, file: &UnitFile, stmt: &SyntaxNode, offset: TextSize) -> Option<Context> {
    let keyword = operator_token(stmt, &[SyntaxKind::RETURN_KW])?;
    if offset < keyword.text_range().end() {
        return None;
    }
    let index = commas_before(
        stmt.children().find(|n| n.kind() == SyntaxKind::EXPR_LIST),
        offset,
    );
    let mut ctx = Context::new(CompletionContextKind::Return).with_anchor(stmt.clone());
    let model = unit.model();
    let func = stmt.ancestors().find(|n| {
        matches!(
            n.kind(),
            SyntaxKind::FUNC_DECL | SyntaxKind::FUNC_LIT | SyntaxKind::LAMBDA_EXPR
        )
    })?;
    let signature = if func.kind() == SyntaxKind::FUNC_DECL {
        let name = func.children().find(|n| n.kind() == SyntaxKind::NAME)?;
        let symbol = bound_symbol(unit, file, &name)?;
        model.symbol(symbol).signatures.first().cloned()
    } else {
        unit.info()
            .type_of(file.id, &func)
            .and_then(|tv| model.underlying(&tv.ty).as_func().cloned())
    };
    if let Some(ty) = signature.and_then(|sig| sig.results.get(index).cloned()) {
        push_unique(&mut ctx.expected, ty);
    }
    Some(ctx)
}

/// Whether `offset` lies between `case` and the clause's colon.
fn clause_header(clause: &SyntaxNode, offset: TextSize) -> bool {
    let Some(case) = operator_token(clause, &[SyntaxKind::CASE_KW]) else {
        return false;
    };
    if offset < case.text_range().end() {
        return false;
    }
    operator_token(clause, &[SyntaxKind::COLON]).is_none_or(|colon| offset <= colon.text_range().start())
}

fn case_context(unit: &ProgramUnit, file: &UnitFile, clause: &SyntaxNode, offset: TextSize) -> Option<Context> {
    if !clause_header(clause, offset) {
        return None;
    }
    let switch = clause.parent().filter(|p| p.kind() == SyntaxKind::SWITCH_STMT)?;
    let mut ctx = Context::new(CompletionContextKind::SwitchCase).with_anchor(clause.clone());
    let tag = crate::parser::SwitchStmt::cast(switch).and_then(|s| s.tag());
    match tag {
        Some(tag) => {
            if let Some(tv) = unit.info().type_of(file.id, tag.syntax()) {
                push_unique(&mut ctx.expected, tv.ty.clone());
            }
        }
        None => push_unique(&mut ctx.expected, Type::BOOL),
    }
    Some(ctx)
}

// ============================================================================
// CANDIDATES
// ============================================================================

/// Get completion suggestions at a position.
///
/// Positions outside the document yield no items; only requests naming an
/// unknown or non-source document fail.
pub fn completions(
    unit: &ProgramUnit,
    docs: &dyn DocProvider,
    path: &str,
    position: Position,
) -> Result<Vec<CompletionItem>, RequestError> {
    let file = document(unit, path)?;
    let Some(offset) = cursor_offset(file, position) else {
        return Ok(Vec::new());
    };
    let ctx = classify(unit, file, offset);
    let mut items = Vec::new();
    match ctx.kind {
        CompletionContextKind::Comment => {}
        CompletionContextKind::StringLiteral => resource_candidates(unit, file, &ctx, &mut items),
        CompletionContextKind::Import => import_candidates(&ctx, &mut items),
        CompletionContextKind::Dot => member_candidates(unit, docs, &ctx, &mut items),
        CompletionContextKind::StructLiteral => field_candidates(unit, docs, &ctx, &mut items),
        CompletionContextKind::Call
        | CompletionContextKind::AssignOrDefine
        | CompletionContextKind::Decl
        | CompletionContextKind::Return
        | CompletionContextKind::SwitchCase
        | CompletionContextKind::Select
        | CompletionContextKind::General => {
            scope_candidates(unit, file, docs, &ctx, offset, &mut items);
            resource_candidates(unit, file, &ctx, &mut items);
            if ctx.kind == CompletionContextKind::General && ctx.statement_start {
                items.extend(
                    KEYWORDS
                        .iter()
                        .map(|kw| CompletionItem::new(*kw, CompletionKind::Keyword)),
                );
            }
        }
    }
    items.sort_by(|a, b| {
        a.kind
            .priority()
            .cmp(&b.kind.priority())
            .then_with(|| a.label.cmp(&b.label))
    });
    tracing::debug!(kind = ?ctx.kind, items = items.len(), "completions");
    Ok(items)
}

fn symbol_item(model: &Model, docs: &dyn DocProvider, id: SymbolId) -> CompletionItem {
    let symbol = model.symbol(id);
    let mut item = CompletionItem::new(symbol.name.to_string(), CompletionKind::of_symbol(model, symbol));
    item.detail = match symbol.kind {
        SymbolKind::Func | SymbolKind::Method => symbol.signatures.first().map(|sig| {
            let mut detail = model.display(&Type::Func(sig.clone()));
            if symbol.signatures.len() > 1 {
                detail.push_str(&format!(" (+{} overloads)", symbol.signatures.len() - 1));
            }
            detail
        }),
        SymbolKind::Package => Some(format!("package {}", symbol.package)),
        SymbolKind::Builtin => Some("builtin".to_string()),
        _ if symbol.ty.is_invalid() => None,
        _ => Some(model.display(&symbol.ty)),
    };
    item.documentation = doc_key(model, symbol)
        .and_then(|(package, name)| docs.documentation(&package, &name))
        .map(|doc| doc.to_string());
    item.symbol = Some(id);
    item
}

/// Unexported declarations of the bundled packages.
pub(super) fn is_hidden(symbol: &Symbol) -> bool {
    symbol.is_builtin()
        && symbol.owner.is_none()
        && symbol.kind != SymbolKind::Builtin
        && !symbol.package.is_empty()
        && symbol.name.starts_with(|c: char| c.is_lowercase())
}

/// Whether a candidate can produce a value of one of the `expected` types.
pub(super) fn fits_expected(model: &Model, symbol: &Symbol, expected: &[Type]) -> bool {
    match symbol.kind {
        SymbolKind::Var | SymbolKind::Param | SymbolKind::Field | SymbolKind::Const => {
            expected.iter().any(|ty| model.assignable(&symbol.ty, ty))
        }
        SymbolKind::Func | SymbolKind::Method => symbol.signatures.iter().any(|sig| {
            sig.results.len() == 1 && expected.iter().any(|ty| model.assignable(&sig.results[0], ty))
        }),
        SymbolKind::Package => true,
        SymbolKind::TypeName | SymbolKind::Builtin => false,
    }
}

/// Whether `node` sits in the body of an event handler such as `onStart`.
fn in_handler_body(unit: &ProgramUnit, file: &UnitFile, node: &SyntaxNode) -> bool {
    let model = unit.model();
    node.ancestors().any(|n| match n.kind() {
        SyntaxKind::LAMBDA_EXPR | SyntaxKind::FUNC_LIT => n
            .parent()
            .filter(|p| p.kind() == SyntaxKind::ARG_LIST)
            .and_then(|list| list.parent())
            .and_then(CallLike::cast)
            .and_then(|call| call.callee())
            .and_then(|callee| callee_symbol(unit, file, &callee))
            .is_some_and(|symbol| model.symbol(symbol).is_event_handler()),
        SyntaxKind::FUNC_DECL => n
            .children()
            .find(|c| c.kind() == SyntaxKind::NAME)
            .is_some_and(|name| is_handler_name(&name.text().to_string())),
        _ => false,
    })
}

fn scope_candidates(
    unit: &ProgramUnit,
    file: &UnitFile,
    docs: &dyn DocProvider,
    ctx: &Context,
    offset: TextSize,
    items: &mut Vec<CompletionItem>,
) {
    let model = unit.model();
    let scope = model
        .innermost_scope_at(file.id, offset)
        .unwrap_or_else(|| model.unit_scope());
    let in_handler = ctx
        .anchor
        .as_ref()
        .is_some_and(|anchor| in_handler_body(unit, file, anchor));
    for id in model.visible_symbols(scope, Some(offset)) {
        if ctx.targets.contains(&id) {
            continue;
        }
        let symbol = model.symbol(id);
        if is_hidden(symbol) {
            continue;
        }
        if in_handler && symbol.kind == SymbolKind::Method && is_handler_name(&symbol.name) {
            continue;
        }
        if !ctx.expected.is_empty() && !fits_expected(model, symbol, &ctx.expected) {
            continue;
        }
        items.push(symbol_item(model, docs, id));
    }
}

fn member_candidates(unit: &ProgramUnit, docs: &dyn DocProvider, ctx: &Context, items: &mut Vec<CompletionItem>) {
    let model = unit.model();
    match &ctx.dot {
        Some(DotBase::Package(path)) => {
            let Some(scope) = model.package_scope(path) else {
                return;
            };
            for entry in model.scope(scope).entries.values() {
                let symbol = model.symbol(entry.symbol);
                if symbol.name.starts_with(|c: char| c.is_uppercase()) {
                    items.push(symbol_item(model, docs, entry.symbol));
                }
            }
        }
        Some(DotBase::Value(ty)) => {
            let Some(named) = ty.as_named() else {
                return;
            };
            for member in model.member_walk(named).iter() {
                items.push(symbol_item(model, docs, member.symbol));
            }
        }
        None => {}
    }
}

fn field_candidates(unit: &ProgramUnit, docs: &dyn DocProvider, ctx: &Context, items: &mut Vec<CompletionItem>) {
    let model = unit.model();
    let Some((named, present)) = &ctx.struct_lit else {
        return;
    };
    for field in model.named(*named).fields() {
        if !field.embedded && !present.contains(&field.name) {
            items.push(symbol_item(model, docs, field.symbol));
        }
    }
}

fn import_candidates(ctx: &Context, items: &mut Vec<CompletionItem>) {
    for file in prelude_files() {
        let mut item = CompletionItem::new(file.package, CompletionKind::Module)
            .with_detail(format!("package {}", file.package));
        if !ctx.in_string {
            item = item.with_insert_text(format!("\"{}\"", file.package));
        }
        items.push(item);
    }
}

/// Sprite whose costumes and animations a resource candidate names.
pub(super) fn resource_sprite(unit: &ProgramUnit, file: &UnitFile, anchor: &SyntaxNode) -> Option<SmolStr> {
    let (model, info) = (unit.model(), unit.info());
    // An explicit `Sprite.method` receiver on the innermost call wins.
    let callee = anchor.ancestors().find_map(|n| match n.kind() {
        SyntaxKind::CALL_EXPR | SyntaxKind::COMMAND_CALL => CallLike::cast(n).and_then(|c| c.callee()),
        SyntaxKind::SELECTOR_EXPR if n.parent().is_some_and(|p| p.kind() == SyntaxKind::EXPR_STMT) => {
            Expr::cast(n)
        }
        _ => None,
    });
    if let Some(Expr::Selector(selector)) = callee.map(Expr::unparen)
        && let Some(base) = selector.base()
        && let Some(tv) = info.type_of(file.id, base.syntax())
        && model.is_sprite_class(&tv.ty)
        && let Some(named) = tv.ty.as_named()
    {
        return Some(model.named(named).name.clone());
    }
    if let Some(sprite) = sprite_context(model, info, file.id, anchor) {
        return Some(sprite);
    }
    let class = model.scope(model.file_scope(file.id)?).class?;
    (model.named(class).class == Some(ClassKind::Sprite)).then(|| model.named(class).name.clone())
}

fn resource_candidates(unit: &ProgramUnit, file: &UnitFile, ctx: &Context, items: &mut Vec<CompletionItem>) {
    let model = unit.model();
    let mut seen = FxHashSet::default();
    for ty in &ctx.expected {
        let Some(kind) = model.resource_name_kind(ty) else {
            continue;
        };
        let sprite = if kind.is_sprite_scoped() {
            match ctx.anchor.as_ref().and_then(|a| resource_sprite(unit, file, a)) {
                Some(sprite) => Some(sprite),
                None => continue,
            }
        } else {
            None
        };
        for id in unit.catalog().ids(kind, sprite.as_deref()) {
            if !seen.insert(id.clone()) {
                continue;
            }
            let mut item = CompletionItem::new(id.name.to_string(), CompletionKind::Resource)
                .with_detail(format!("{} resource", kind.display()));
            if !ctx.in_string {
                item = item.with_insert_text(format!("\"{}\"", id.name));
            }
            item.resource = Some(id);
            items.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::AnalysisConfig;
    use crate::hir::compile;
    use crate::ide::NoDocs;
    use crate::resource::{MemoryAssetReader, ResourceKind};

    fn assets() -> MemoryAssetReader {
        MemoryAssetReader::new()
            .with_file("assets/sounds/Meow/index.json", "{}")
            .with_file(
                "assets/sprites/Fido/index.json",
                r#"{"costumes":[{"name":"jump"},{"name":"walk"}]}"#,
            )
    }

    fn unit(files: &[(&str, &str)]) -> ProgramUnit {
        let files: Vec<(String, String)> = files
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();
        compile(files, &assets(), &AnalysisConfig::default(), &CancellationToken::new()).unwrap()
    }

    fn complete(unit: &ProgramUnit, path: &str, line: u32, column: u32) -> Vec<CompletionItem> {
        completions(unit, &NoDocs, path, Position::new(line, column)).unwrap()
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    fn context(unit: &ProgramUnit, path: &str, line: u32, column: u32) -> CompletionContextKind {
        completion_context(unit, path, Position::new(line, column))
            .unwrap()
            .expect("position inside document")
    }

    #[test]
    fn test_general_in_handler_body() {
        let unit = unit(&[("main.spx", "var (\n\tscore int\n)\n\nonStart => {\n\t\n}\n")]);
        assert_eq!(context(&unit, "main.spx", 5, 1), CompletionContextKind::General);
        let items = complete(&unit, "main.spx", 5, 1);
        let labels = labels(&items);
        assert!(labels.contains(&"score"));
        assert!(labels.contains(&"play"));
        assert!(labels.contains(&"if"));
        assert!(!labels.contains(&"onClick"), "other handlers are not offered inside a handler");
    }

    #[test]
    fn test_handlers_offered_at_top_level() {
        let unit = unit(&[("main.spx", "\n")]);
        let items = complete(&unit, "main.spx", 0, 0);
        assert!(labels(&items).contains(&"onClick"));
    }

    #[test]
    fn test_member_access() {
        let unit = unit(&[
            ("main.spx", "var (\n\tFido Fido\n)\n\nonStart => {\n\tFido.\n}\n"),
            ("Fido.spx", "func jump() {\n}\n"),
        ]);
        assert_eq!(context(&unit, "main.spx", 5, 6), CompletionContextKind::Dot);
        let items = complete(&unit, "main.spx", 5, 6);
        let labels = labels(&items);
        assert!(labels.contains(&"jump"));
        assert!(labels.contains(&"setCostume"));
    }

    #[test]
    fn test_package_members() {
        let unit = unit(&[("main.spx", "import \"math\"\n\nx := math.\n")]);
        let items = complete(&unit, "main.spx", 2, 10);
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.label.starts_with(|c: char| c.is_uppercase())));
    }

    #[test]
    fn test_call_argument_offers_resources_and_compatible_values() {
        let unit = unit(&[(
            "main.spx",
            "var (\n\tcount int\n\ttitle string\n)\n\nonStart => {\n\tplay \n}\n",
        )]);
        assert_eq!(context(&unit, "main.spx", 6, 6), CompletionContextKind::Call);
        let items = complete(&unit, "main.spx", 6, 6);
        let labels = labels(&items);
        assert!(labels.contains(&"title"));
        assert!(!labels.contains(&"count"));

        let meow = items.iter().find(|i| i.label == "Meow").expect("sound candidate");
        assert_eq!(meow.kind, CompletionKind::Resource);
        assert_eq!(meow.insert_text.as_deref(), Some("\"Meow\""));
        assert_eq!(meow.resource, Some(ResourceId::sound("Meow")));
    }

    #[test]
    fn test_candidate_types_are_assignable() {
        let unit = unit(&[(
            "main.spx",
            "var (\n\tcount int\n\tratio float64\n\ttitle string\n)\n\nonStart => {\n\tplay \n}\n",
        )]);
        let model = unit.model();
        let sound_name = model
            .package_type("spx", "SoundName")
            .map(Type::Named)
            .unwrap();
        let sound = model.package_type("spx", "Sound").map(Type::Named).unwrap();
        let items = complete(&unit, "main.spx", 7, 6);
        for item in &items {
            if !matches!(item.kind, CompletionKind::Variable | CompletionKind::Constant) {
                continue;
            }
            let ty = &model.symbol(item.symbol.unwrap()).ty;
            assert!(
                model.assignable(ty, &sound_name) || model.assignable(ty, &sound),
                "{} is not assignable",
                item.label
            );
        }
    }

    #[test]
    fn test_overloads_union_expected_types() {
        let unit = unit(&[("main.spx", ""), ("Fido.spx", "onClick => {\n\tturnTo \n}\n")]);
        let items = complete(&unit, "Fido.spx", 1, 8);
        let labels = labels(&items);
        assert!(labels.contains(&"Right"), "direction overload");
        assert!(labels.contains(&"Fido"), "sprite name overload");
    }

    #[test]
    fn test_costume_names_inside_string() {
        let unit = unit(&[("main.spx", ""), ("Fido.spx", "onClick => {\n\tsetCostume \"\"\n}\n")]);
        assert_eq!(context(&unit, "Fido.spx", 1, 13), CompletionContextKind::StringLiteral);
        let items = complete(&unit, "Fido.spx", 1, 13);
        assert_eq!(labels(&items), vec!["jump", "walk"]);
        assert!(items.iter().all(|i| i.insert_text.is_none()));
        assert_eq!(
            items[0].resource.as_ref().map(|id| id.kind),
            Some(ResourceKind::SpriteCostume)
        );
    }

    #[test]
    fn test_no_duplicate_resources() {
        let unit = unit(&[("main.spx", "onStart => {\n\tplay \n}\n")]);
        let items = complete(&unit, "main.spx", 1, 6);
        let ids: Vec<_> = items.iter().filter_map(|i| i.resource.clone()).collect();
        let unique: FxHashSet<_> = ids.iter().cloned().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_comment_suppresses_candidates() {
        let unit = unit(&[("main.spx", "// play a sound\n")]);
        assert_eq!(context(&unit, "main.spx", 0, 5), CompletionContextKind::Comment);
        assert!(complete(&unit, "main.spx", 0, 5).is_empty());
    }

    #[test]
    fn test_struct_literal_keys() {
        let unit = unit(&[(
            "main.spx",
            "type Point struct {\n\tX int\n\tY int\n}\n\np := Point{X: 1, }\n",
        )]);
        assert_eq!(context(&unit, "main.spx", 5, 17), CompletionContextKind::StructLiteral);
        let items = complete(&unit, "main.spx", 5, 17);
        assert_eq!(labels(&items), vec!["Y"]);
    }

    #[test]
    fn test_assignment_excludes_target() {
        let unit = unit(&[("main.spx", "onStart => {\n\tx := 1\n\ty := 2\n\tx = \n}\n")]);
        assert_eq!(context(&unit, "main.spx", 3, 5), CompletionContextKind::AssignOrDefine);
        let items = complete(&unit, "main.spx", 3, 5);
        let labels = labels(&items);
        assert!(labels.contains(&"y"));
        assert!(!labels.contains(&"x"));
    }

    #[test]
    fn test_import_paths() {
        let unit = unit(&[("main.spx", "import \"\"\n")]);
        assert_eq!(context(&unit, "main.spx", 0, 8), CompletionContextKind::Import);
        let items = complete(&unit, "main.spx", 0, 8);
        let labels = labels(&items);
        assert!(labels.contains(&"math"));
        assert!(labels.contains(&"fmt"));
    }

    #[rstest]
    #[case::return_value(
        "func f() int {\n\tn := 1\n\ts := \"a\"\n\treturn x\n}\n",
        3, 9, CompletionContextKind::Return, "n", Some("s")
    )]
    #[case::switch_case(
        "func f() {\n\tn := 1\n\ts := \"a\"\n\tswitch n {\n\tcase x:\n\t}\n}\n",
        4, 7, CompletionContextKind::SwitchCase, "n", Some("s")
    )]
    #[case::typed_var(
        "func f() {\n\tn := 1\n\ts := \"a\"\n\tvar v int = x\n}\n",
        3, 14, CompletionContextKind::Decl, "n", Some("s")
    )]
    #[case::select_clause(
        "func f(ch chan int) {\n\tselect {\n\tcase x:\n\t}\n}\n",
        2, 7, CompletionContextKind::Select, "ch", None
    )]
    fn test_statement_contexts(
        #[case] source: &str,
        #[case] line: u32,
        #[case] column: u32,
        #[case] kind: CompletionContextKind,
        #[case] offered: &str,
        #[case] filtered: Option<&str>,
    ) {
        let unit = unit(&[("main.spx", source)]);
        assert_eq!(context(&unit, "main.spx", line, column), kind);
        let items = complete(&unit, "main.spx", line, column);
        let labels = labels(&items);
        assert!(labels.contains(&offered), "{offered} missing from {labels:?}");
        if let Some(filtered) = filtered {
            assert!(!labels.contains(&filtered), "{filtered} should not fit");
        }
    }

    #[rstest]
    #[case::fixed_parameter(8, "s", "n")]
    #[case::variadic_tail(14, "n", "s")]
    #[case::past_variadic_tail(17, "n", "s")]
    fn test_variadic_arguments(#[case] column: u32, #[case] offered: &str, #[case] filtered: &str) {
        let source = "func total(base string, nums ...int) int {\n\treturn 0\n}\n\nfunc f() {\n\tn := 1\n\ts := \"a\"\n\ttotal s, 2, x, y\n}\n";
        let unit = unit(&[("main.spx", source)]);
        assert_eq!(context(&unit, "main.spx", 7, column), CompletionContextKind::Call);
        let items = complete(&unit, "main.spx", 7, column);
        let labels = labels(&items);
        assert!(labels.contains(&offered), "{offered} missing from {labels:?}");
        assert!(!labels.contains(&filtered), "{filtered} should not fit");
    }

    #[rstest]
    #[case::handler_method("onMsg", false)]
    #[case::plain_method("helper", true)]
    fn test_handlers_hidden_in_handler_methods(#[case] method: &str, #[case] offers_handlers: bool) {
        let source = format!("func {method}() {{\n\tx\n}}\n");
        let unit = unit(&[("main.spx", ""), ("Fido.spx", &source)]);
        assert_eq!(context(&unit, "Fido.spx", 1, 2), CompletionContextKind::General);
        let items = complete(&unit, "Fido.spx", 1, 2);
        let labels = labels(&items);
        assert!(labels.contains(&"say"));
        assert_eq!(labels.contains(&"onClick"), offers_handlers, "{labels:?}");
    }

    #[rstest]
    #[case("import \"ma\"\n", 0, 9)]
    #[case("import (\n\t\"fmt\"\n\t\"\"\n)\n", 2, 2)]
    fn test_partial_import_path(#[case] source: &str, #[case] line: u32, #[case] column: u32) {
        let unit = unit(&[("main.spx", source)]);
        assert_eq!(context(&unit, "main.spx", line, column), CompletionContextKind::Import);
        let items = complete(&unit, "main.spx", line, column);
        assert!(labels(&items).contains(&"math"));
        assert!(items.iter().all(|i| i.kind == CompletionKind::Module && i.insert_text.is_none()));
    }

    #[test]
    fn test_ranking_follows_kind_then_label() {
        let unit = unit(&[("main.spx", "var (\n\tzeta int\n\talpha int\n)\n\n")]);
        let items = complete(&unit, "main.spx", 4, 0);
        assert!(items.windows(2).all(|w| {
            (w[0].kind.priority(), &w[0].label) <= (w[1].kind.priority(), &w[1].label)
        }));
        let labels = labels(&items);
        let alpha = labels.iter().position(|l| *l == "alpha").unwrap();
        let zeta = labels.iter().position(|l| *l == "zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_unmappable_position_is_empty() {
        let unit = unit(&[("main.spx", "x := 1\n")]);
        assert!(complete(&unit, "main.spx", 40, 0).is_empty());
        assert!(completion_context(&unit, "main.spx", Position::new(40, 0)).unwrap().is_none());
        assert!(completions(&unit, &NoDocs, "Ghost.spx", Position::new(0, 0)).is_err());
    }
}
