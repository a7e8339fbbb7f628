//! Statement checking: method bodies and top-level statements.

use std::sync::Arc;

use text_size::TextSize;

use super::decls::param_idents;
use super::{Checker, Context, Mode, Operand, SourceInput};
use crate::hir::diagnostics::codes;
use crate::hir::scope::ScopeKind;
use crate::hir::symbols::SymbolKind;
use crate::hir::types::{BasicKind, Signature, Type};
use crate::parser::{
    AssignStmt, AstNode, Block, DefineStmt, ElseBranch, Expr, ExprStmt, ForStmt, FuncDecl, IfStmt,
    Item, ReturnStmt, SelectStmt, SourceFile, Stmt, SwitchStmt, SyntaxKind, SyntaxNode, ValueSpec,
};

impl Checker {
    pub(super) fn check_bodies(&mut self, inputs: &[SourceInput]) {
        let package = smol_str::SmolStr::new(&self.config.package_name);
        for input in inputs {
            let (Some(root), Some(scope)) = (
                SourceFile::cast(input.root.clone()),
                self.model.file_scope(input.id),
            ) else {
                continue;
            };
            let ctx = Context {
                file: input.id,
                scope,
                class: self.classes.get(&input.id).copied(),
                results: None,
                package: package.clone(),
            };
            self.with_context(ctx, |this| {
                for item in root.items() {
                    match item {
                        Item::Func(decl) => this.check_func_body(&decl),
                        Item::Stmt(stmt) => this.check_stmt(&stmt),
                        Item::Import(_) | Item::Var(_) | Item::Const(_) | Item::Type(_) => {}
                    }
                }
            });
        }
        tracing::debug!(files = inputs.len(), "bodies checked");
    }

    fn check_func_body(&mut self, decl: &FuncDecl) {
        let Some(body) = decl.body() else {
            return;
        };
        let symbol = decl
            .name()
            .and_then(|n| n.ident())
            .and_then(|ident| self.info.def_at(self.ctx.file, ident.text_range()));
        let (signature, owner) = match symbol {
            Some(symbol) => {
                let symbol = self.model.symbol(symbol);
                (
                    symbol.signatures.first().cloned().unwrap_or_default(),
                    symbol.owner,
                )
            }
            None => (Arc::new(Signature::default()), None),
        };

        let previous = self.ctx.scope;
        self.open_scope(ScopeKind::Func, decl.syntax().text_range(), false);
        let saved = self.ctx.results.replace(signature.results.clone());

        if let Some(param) = decl.receiver().and_then(|r| r.param())
            && param.ty().is_some()
            && let Some(ident) = param.name().and_then(|n| n.ident())
        {
            let ty = owner.map(Type::Named).unwrap_or_default();
            self.declare_local(&ident, SymbolKind::Param, ty, TextSize::new(0));
        }
        if let Some(list) = decl.params() {
            for (ident, ty) in param_idents(&list).into_iter().zip(signature.params.iter()) {
                if let Some(ident) = ident {
                    self.declare_local(&ident, SymbolKind::Param, ty.clone(), TextSize::new(0));
                }
            }
        }
        if let Some(list) = decl.result().and_then(|r| r.params()) {
            for (ident, ty) in param_idents(&list).into_iter().zip(signature.results.iter()) {
                if let Some(ident) = ident {
                    self.declare_local(&ident, SymbolKind::Var, ty.clone(), TextSize::new(0));
                }
            }
        }
        for stmt in body.statements() {
            self.check_stmt(&stmt);
        }

        self.ctx.results = saved;
        self.close_scope(previous);
    }

    pub(crate) fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => {
                for spec in decl.specs() {
                    self.check_local_spec(&spec, false);
                }
            }
            Stmt::Const(decl) => {
                for spec in decl.specs() {
                    self.check_local_spec(&spec, true);
                }
            }
            Stmt::Expr(stmt) => self.check_expr_stmt(stmt),
            Stmt::Assign(stmt) => self.check_assign(stmt),
            Stmt::Define(stmt) => self.check_define(stmt),
            Stmt::IncDec(stmt) => {
                if let Some(expr) = stmt.expr() {
                    let operand = self.check_expr(&expr, None);
                    if !operand.is_invalid() && !self.model.basic_of(&operand.ty).is_some_and(BasicKind::is_numeric) {
                        let description = self.describe(expr.syntax(), &operand);
                        self.error(
                            stmt.syntax().text_range(),
                            codes::INVALID_OPERATION,
                            format!("invalid operation: {} (non-numeric {description})", stmt.syntax().text()),
                        );
                    }
                }
            }
            Stmt::Send(stmt) => {
                let channel = stmt.channel().map(|c| (self.check_expr(&c, None), c));
                let elem = match &channel {
                    Some((operand, _)) if operand.is_invalid() => None,
                    Some((operand, expr)) => match self.model.underlying(&operand.ty) {
                        Type::Chan(elem) => Some((*elem).clone()),
                        _ => {
                            let description = self.describe(expr.syntax(), operand);
                            self.error(
                                stmt.syntax().text_range(),
                                codes::INVALID_OPERATION,
                                format!("invalid operation: cannot send to non-channel {description}"),
                            );
                            None
                        }
                    },
                    None => None,
                };
                if let Some(value) = stmt.value() {
                    let operand = self.check_expr(&value, elem.as_ref());
                    if let Some(elem) = &elem {
                        self.assign_to(value.syntax(), &operand, elem, "send");
                    }
                }
            }
            Stmt::Return(stmt) => self.check_return(stmt),
            Stmt::If(stmt) => self.check_if(stmt),
            Stmt::For(stmt) => self.check_for(stmt),
            Stmt::Switch(stmt) => self.check_switch(stmt),
            Stmt::Select(stmt) => self.check_select(stmt),
            Stmt::Branch(_) => {}
            Stmt::Block(block) => self.check_block(block),
        }
    }

    fn check_block(&mut self, block: &Block) {
        let previous = self.ctx.scope;
        self.open_scope(ScopeKind::Block, block.syntax().text_range(), false);
        for stmt in block.statements() {
            self.check_stmt(&stmt);
        }
        self.close_scope(previous);
    }

    fn check_local_spec(&mut self, spec: &ValueSpec, is_const: bool) {
        let names: Vec<_> = spec.names().collect();
        let resolved = self.resolve_value_spec(spec, names.len(), is_const);
        let visible_from = spec.syntax().text_range().end();
        let kind = if is_const {
            SymbolKind::Const
        } else {
            SymbolKind::Var
        };
        for (name, (ty, value)) in names.iter().zip(resolved) {
            let Some(ident) = name.ident() else {
                continue;
            };
            let id = self.declare_local(&ident, kind, ty, visible_from);
            if is_const {
                self.model.symbol_mut(id).value = value;
            }
        }
    }

    fn check_expr_stmt(&mut self, stmt: &ExprStmt) {
        let Some(expr) = stmt.expr() else {
            return;
        };
        let operand = self.check_expr(&expr, None);
        if operand.is_invalid() || operand.mode == Mode::NoValue {
            return;
        }
        match expr.clone().unparen() {
            Expr::Call(_) | Expr::Command(_) => {}
            // `nextCostume` on its own calls it.
            Expr::NameRef(_) | Expr::Selector(_)
                if operand
                    .symbol
                    .is_some_and(|s| matches!(self.model.symbol(s).kind, SymbolKind::Func | SymbolKind::Method)) =>
            {
                self.check_bare_call(&expr, &operand);
            }
            Expr::Unary(unary) if unary.op_kind() == Some(SyntaxKind::ARROW) => {}
            _ => {
                let message = match operand.mode {
                    Mode::Builtin => format!("{} (built-in function) must be called", expr.syntax().text()),
                    _ => format!("{} is not used", self.describe(expr.syntax(), &operand)),
                };
                self.error(expr.syntax().text_range(), codes::INVALID_OPERATION, message);
            }
        }
    }

    /// Type of an assignment target; `None` for the blank identifier.
    fn check_target(&mut self, target: &Expr) -> Option<Type> {
        if let Expr::NameRef(name) = target
            && name.text().as_deref() == Some("_")
        {
            return None;
        }
        let operand = self.check_expr(target, None);
        if operand.is_invalid() {
            return Some(Type::Invalid);
        }
        let assignable = operand.mode == Mode::Value
            && operand.symbol.is_none_or(|s| {
                matches!(
                    self.model.symbol(s).kind,
                    SymbolKind::Var | SymbolKind::Param | SymbolKind::Field
                )
            });
        if !assignable {
            let description = self.describe(target.syntax(), &operand);
            self.error(
                target.syntax().text_range(),
                codes::INVALID_ASSIGNMENT,
                format!("cannot assign to {description}"),
            );
            return Some(Type::Invalid);
        }
        Some(operand.ty)
    }

    fn check_assign(&mut self, stmt: &AssignStmt) {
        let lhs = stmt.lhs();
        let rhs = stmt.rhs();
        if stmt.is_compound() {
            let (Some(target), Some(value)) = (lhs.first(), rhs.first()) else {
                return;
            };
            let ty = self.check_target(target).unwrap_or_default();
            let operand = self.check_expr(value, Some(&ty));
            if !self.assign_to(value.syntax(), &operand, &ty, "assignment") || ty.is_invalid() {
                return;
            }
            let is_plus = stmt
                .op_token()
                .is_some_and(|t| t.kind() == SyntaxKind::PLUS_EQ);
            let kind = self.model.basic_of(&ty);
            let ok = kind.is_some_and(|k| k.is_numeric() || (is_plus && k.is_string()));
            if !ok {
                self.error(
                    stmt.syntax().text_range(),
                    codes::INVALID_OPERATION,
                    format!(
                        "invalid operation: operator {} not defined on {} (variable of type {})",
                        stmt.op_token().map(|t| t.text().to_string()).unwrap_or_default(),
                        target.syntax().text(),
                        self.display(&ty)
                    ),
                );
            }
            return;
        }

        let targets: Vec<Option<Type>> = lhs.iter().map(|t| self.check_target(t)).collect();
        if rhs.len() == lhs.len() {
            for (target, value) in targets.iter().zip(&rhs) {
                let operand = self.check_expr(value, target.as_ref());
                match target {
                    Some(ty) => {
                        self.assign_to(value.syntax(), &operand, ty, "assignment");
                    }
                    None => {
                        self.default_type(value.syntax(), &operand);
                    }
                }
            }
            return;
        }
        if let [value] = rhs.as_slice() {
            let operand = self.check_expr(value, None);
            if operand.is_invalid() {
                return;
            }
            if let Type::Tuple(items) = &operand.ty
                && items.len() == targets.len()
            {
                for (target, item) in targets.iter().zip(items.iter()) {
                    if let Some(ty) = target {
                        self.assign_to(value.syntax(), &Operand::value(item.clone()), ty, "assignment");
                    }
                }
                return;
            }
        } else {
            for value in &rhs {
                self.check_expr(value, None);
            }
        }
        self.assignment_mismatch(stmt.syntax(), lhs.len(), rhs.len());
    }

    fn assignment_mismatch(&mut self, node: &SyntaxNode, variables: usize, values: usize) {
        self.error(
            node.text_range(),
            codes::INVALID_ASSIGNMENT,
            format!(
                "assignment mismatch: {variables} variable{} but {values} value{}",
                if variables == 1 { "" } else { "s" },
                if values == 1 { "" } else { "s" }
            ),
        );
    }

    fn check_define(&mut self, stmt: &DefineStmt) {
        let lhs = stmt.lhs();
        let rhs = stmt.rhs();
        let visible_from = stmt.syntax().text_range().end();
        let types = self.define_types(stmt.syntax(), lhs.len(), &rhs);
        self.bind_defined(stmt.syntax(), &lhs, types, visible_from);
    }

    /// Types taken by the `count` names on the left of `:=`.
    fn define_types(&mut self, node: &SyntaxNode, count: usize, rhs: &[Expr]) -> Vec<Type> {
        if rhs.len() == count {
            return rhs
                .iter()
                .map(|value| {
                    let operand = self.check_expr(value, None);
                    self.default_type(value.syntax(), &operand)
                })
                .collect();
        }
        if let [value] = rhs {
            let operand = self.check_expr(value, None);
            if operand.is_invalid() {
                return vec![Type::Invalid; count];
            }
            if let Type::Tuple(items) = &operand.ty
                && items.len() == count
            {
                return items.to_vec();
            }
        } else {
            for value in rhs {
                self.check_expr(value, None);
            }
        }
        self.assignment_mismatch(node, count, rhs.len());
        vec![Type::Invalid; count]
    }

    /// Declare the names on the left of `:=`; names already bound in the
    /// same scope are assigned instead.
    fn bind_defined(&mut self, node: &SyntaxNode, lhs: &[Expr], types: Vec<Type>, visible_from: TextSize) {
        let mut any_new = false;
        let mut any_error = false;
        for (target, ty) in lhs.iter().zip(types) {
            let Some(ident) = (match target {
                Expr::NameRef(name) => name.ident(),
                _ => None,
            }) else {
                self.error(
                    target.syntax().text_range(),
                    codes::INVALID_ASSIGNMENT,
                    format!("non-name {} on left side of :=", target.syntax().text()),
                );
                any_error = true;
                continue;
            };
            if ident.text() == "_" {
                continue;
            }
            if let Some(entry) = self.model.scope(self.ctx.scope).entry(ident.text(), None) {
                self.info.record_use(self.ctx.file, ident.text_range(), entry.symbol);
                let existing = self.model.symbol(entry.symbol).ty.clone();
                if !self.model.assignable(&ty, &existing) {
                    self.error(
                        ident.text_range(),
                        codes::TYPE_MISMATCH,
                        format!(
                            "cannot use value of type {} as {} value in assignment",
                            self.display(&ty),
                            self.display(&existing)
                        ),
                    );
                }
                continue;
            }
            any_new = true;
            self.declare_local(&ident, SymbolKind::Var, ty, visible_from);
        }
        if !any_new && !any_error && !lhs.is_empty() {
            self.error(
                node.text_range(),
                codes::INVALID_ASSIGNMENT,
                "no new variables on left side of :=",
            );
        }
    }

    fn check_return(&mut self, stmt: &ReturnStmt) {
        let values = stmt.values();
        let Some(results) = self.ctx.results.clone() else {
            for value in &values {
                self.check_expr(value, None);
            }
            return;
        };
        if values.is_empty() {
            return;
        }
        if values.len() == results.len() {
            for (value, result) in values.iter().zip(&results) {
                let operand = self.check_expr(value, Some(result));
                self.assign_to(value.syntax(), &operand, result, "return statement");
            }
            return;
        }
        if let [value] = values.as_slice() {
            let operand = self.check_expr(value, None);
            if operand.is_invalid() {
                return;
            }
            if let Type::Tuple(items) = &operand.ty
                && items.len() == results.len()
            {
                return;
            }
        } else {
            for value in &values {
                self.check_expr(value, None);
            }
        }
        let message = if values.len() > results.len() {
            "too many return values"
        } else {
            "not enough return values"
        };
        self.error(stmt.syntax().text_range(), codes::INVALID_ASSIGNMENT, message);
    }

    fn check_condition(&mut self, condition: &Expr, context: &str) {
        let operand = self.check_expr(condition, None);
        if operand.is_invalid() {
            return;
        }
        if self.model.basic_of(&operand.ty).is_some_and(BasicKind::is_boolean) {
            if operand.ty.is_untyped() {
                self.convert_recorded(condition.syntax(), &operand, &Type::BOOL);
            }
            return;
        }
        let description = self.describe(condition.syntax(), &operand);
        self.error(
            condition.syntax().text_range(),
            codes::TYPE_MISMATCH,
            format!("non-boolean condition in {context} statement: {description}"),
        );
    }

    fn check_if(&mut self, stmt: &IfStmt) {
        let previous = self.ctx.scope;
        self.open_scope(ScopeKind::Block, stmt.syntax().text_range(), false);
        if let Some(init) = stmt.init() {
            self.check_stmt(&init);
        }
        if let Some(condition) = stmt.condition() {
            self.check_condition(&condition, "if");
        }
        if let Some(then) = stmt.then_branch() {
            self.check_block(&then);
        }
        match stmt.else_branch() {
            Some(ElseBranch::If(nested)) => self.check_if(&nested),
            Some(ElseBranch::Block(block)) => self.check_block(&block),
            None => {}
        }
        self.close_scope(previous);
    }

    fn check_for(&mut self, stmt: &ForStmt) {
        let previous = self.ctx.scope;
        self.open_scope(ScopeKind::Block, stmt.syntax().text_range(), false);
        if let Some(clause) = stmt.for_clause() {
            if let Some(init) = clause.init() {
                self.check_stmt(&init);
            }
            if let Some(condition) = clause.condition() {
                self.check_condition(&condition, "for");
            }
            if let Some(post) = clause.post() {
                self.check_stmt(&post);
            }
        } else if let Some(clause) = stmt.range_clause() {
            let (key, value) = match clause.expr() {
                Some(expr) => {
                    let operand = self.check_expr(&expr, None);
                    self.range_types(&expr, &operand)
                }
                None => (Type::Invalid, Type::Invalid),
            };
            let lhs = clause.lhs();
            let types: Vec<Type> = [key, value].into_iter().take(lhs.len()).collect();
            if lhs.len() > 2 {
                self.error(
                    clause.syntax().text_range(),
                    codes::INVALID_ASSIGNMENT,
                    "range clause permits at most two iteration variables",
                );
            }
            if clause.is_define() {
                let visible_from = clause.syntax().text_range().end();
                self.bind_defined(clause.syntax(), &lhs, types, visible_from);
            } else {
                for (target, ty) in lhs.iter().zip(types) {
                    if let Some(target_ty) = self.check_target(target)
                        && !self.model.assignable(&ty, &target_ty)
                    {
                        self.error(
                            target.syntax().text_range(),
                            codes::TYPE_MISMATCH,
                            format!(
                                "cannot use {} (value of type {}) as {} value in range",
                                target.syntax().text(),
                                self.display(&ty),
                                self.display(&target_ty)
                            ),
                        );
                    }
                }
            }
        } else if let Some(condition) = stmt.condition() {
            self.check_condition(&condition, "for");
        }
        if let Some(body) = stmt.body() {
            self.check_block(&body);
        }
        self.close_scope(previous);
    }

    /// Key and value types when ranging over `operand`.
    fn range_types(&mut self, expr: &Expr, operand: &Operand) -> (Type, Type) {
        if operand.is_invalid() {
            return (Type::Invalid, Type::Invalid);
        }
        match self.model.underlying(&operand.ty) {
            Type::Slice(elem) => (Type::INT, (*elem).clone()),
            Type::Map(key, value) => ((*key).clone(), (*value).clone()),
            Type::Chan(elem) => ((*elem).clone(), Type::Invalid),
            Type::Basic(kind) if kind.is_string() => (Type::INT, Type::INT),
            Type::Basic(kind) if kind.is_integer() => (Type::INT, Type::Invalid),
            _ => {
                let description = self.describe(expr.syntax(), operand);
                self.error(
                    expr.syntax().text_range(),
                    codes::INVALID_OPERATION,
                    format!("cannot range over {description}"),
                );
                (Type::Invalid, Type::Invalid)
            }
        }
    }

    fn check_switch(&mut self, stmt: &SwitchStmt) {
        let previous = self.ctx.scope;
        self.open_scope(ScopeKind::Block, stmt.syntax().text_range(), false);
        if let Some(init) = stmt.init() {
            self.check_stmt(&init);
        }
        let tag = stmt.tag().map(|tag| {
            let operand = self.check_expr(&tag, None);
            let ty = self.default_type(tag.syntax(), &operand);
            (tag, ty)
        });
        for clause in stmt.clauses() {
            for value in clause.values() {
                match &tag {
                    Some((tag, tag_ty)) => {
                        let operand = self.check_expr(&value, Some(tag_ty));
                        if operand.is_invalid() || tag_ty.is_invalid() {
                            continue;
                        }
                        if self.model.assignable(&operand.ty, tag_ty) {
                            if operand.ty.is_untyped() {
                                self.convert_recorded(value.syntax(), &operand, tag_ty);
                            }
                        } else if !self.model.assignable(tag_ty, &operand.ty) {
                            self.error(
                                value.syntax().text_range(),
                                codes::TYPE_MISMATCH,
                                format!(
                                    "invalid case {} in switch on {} (mismatched types {} and {})",
                                    value.syntax().text(),
                                    tag.syntax().text(),
                                    self.display(&operand.ty),
                                    self.display(tag_ty)
                                ),
                            );
                        }
                    }
                    None => self.check_condition(&value, "case"),
                }
            }
            let scope = self.ctx.scope;
            self.open_scope(ScopeKind::Block, clause.syntax().text_range(), true);
            for stmt in clause.statements() {
                self.check_stmt(&stmt);
            }
            self.close_scope(scope);
        }
        self.close_scope(previous);
    }

    fn check_select(&mut self, stmt: &SelectStmt) {
        for clause in stmt.clauses() {
            let previous = self.ctx.scope;
            self.open_scope(ScopeKind::Block, clause.syntax().text_range(), true);
            if let Some(comm) = clause.comm() {
                self.check_stmt(&comm);
            }
            for stmt in clause.statements() {
                self.check_stmt(&stmt);
            }
            self.close_scope(previous);
        }
    }
}
