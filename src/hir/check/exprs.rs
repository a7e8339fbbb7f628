//! Expression checking.

use std::sync::Arc;

use text_size::TextSize;

use super::consts::{self, Folded};
use super::{Checker, Mode, Operand};
use crate::hir::diagnostics::codes;
use crate::hir::info::NodeKey;
use crate::hir::scope::ScopeKind;
use crate::hir::symbols::{SymbolId, SymbolKind};
use crate::hir::types::{BasicKind, ConstValue, Signature, Type};
use crate::parser::{
    AstNode, BinaryExpr, CompositeLit, CompositeType, Element, Expr, FuncLit, IndexExpr, LambdaExpr,
    ListLit, LitBody, Literal, LiteralKind, MapLit, NameRef, SelectorExpr, SyntaxKind, SyntaxNode,
    UnaryExpr,
};

impl Checker {
    /// Check `expr`, optionally against the type its use site imposes.
    pub(crate) fn check_expr(&mut self, expr: &Expr, expected: Option<&Type>) -> Operand {
        let operand = match expr {
            Expr::NameRef(name) => self.check_name(name),
            Expr::Literal(lit) => self.check_literal(lit),
            Expr::Paren(paren) => match paren.inner() {
                Some(inner) => self.check_expr(&inner, expected),
                None => Operand::invalid(),
            },
            Expr::Selector(selector) => self.check_selector(selector),
            Expr::Call(_) | Expr::Command(_) => match expr.as_call() {
                Some(call) => self.check_call(&call, expected),
                None => Operand::invalid(),
            },
            Expr::Index(index) => self.check_index(index),
            Expr::Composite(lit) => self.check_composite(lit, expected),
            Expr::Unary(unary) => self.check_unary(unary),
            Expr::Binary(binary) => self.check_binary(binary),
            Expr::FuncLit(func) => self.check_func_lit(func),
            Expr::Lambda(lambda) => self.check_lambda(lambda, expected),
            Expr::List(list) => self.check_list(list, expected),
            Expr::Map(map) => self.check_map(map, expected),
        };
        self.record(expr.syntax(), &operand);
        if let Some(expected) = expected {
            self.record_expected(expr.syntax(), expected);
        }
        operand
    }

    /// Operand for a reference to `symbol`.
    pub(crate) fn symbol_operand(&self, symbol: SymbolId) -> Operand {
        let sym = self.model.symbol(symbol);
        let (mode, ty) = match sym.kind {
            SymbolKind::TypeName => (Mode::Type, sym.ty.clone()),
            SymbolKind::Package => (Mode::Package, Type::Invalid),
            SymbolKind::Builtin => (Mode::Builtin, Type::Invalid),
            _ => (Mode::Value, sym.ty.clone()),
        };
        let value = (sym.kind == SymbolKind::Const).then(|| sym.value.clone()).flatten();
        Operand {
            mode,
            ty,
            value,
            symbol: Some(symbol),
        }
    }

    fn check_name(&mut self, name: &NameRef) -> Operand {
        let Some(ident) = name.ident() else {
            return Operand::invalid();
        };
        let text = ident.text();
        if text == "_" {
            self.error(
                ident.text_range(),
                codes::INVALID_OPERATION,
                "cannot use _ as value",
            );
            return Operand::invalid();
        }
        let range = ident.text_range();
        let Some(symbol) = self.model.lookup(self.ctx.scope, text, Some(range.start())) else {
            self.error(range, codes::UNDEFINED_REFERENCE, format!("undefined: {text}"));
            return Operand::invalid();
        };
        self.info.record_use(self.ctx.file, range, symbol);
        self.ensure_resolved(symbol);
        self.symbol_operand(symbol)
    }

    fn check_literal(&mut self, lit: &Literal) -> Operand {
        let (Some(kind), Some(token)) = (lit.kind(), lit.token()) else {
            return Operand::invalid();
        };
        match kind {
            LiteralKind::Int => match consts::parse_int(token.text()) {
                Some(value) => Operand::constant(Type::Basic(BasicKind::UntypedInt), ConstValue::Int(value)),
                None => {
                    self.error(
                        token.text_range(),
                        codes::INVALID_OPERATION,
                        format!("integer constant overflow: {}", token.text()),
                    );
                    Operand::value(Type::Basic(BasicKind::UntypedInt))
                }
            },
            LiteralKind::Float => match consts::parse_float(token.text()) {
                Some(value) => Operand::constant(Type::Basic(BasicKind::UntypedFloat), ConstValue::Float(value)),
                None => Operand::value(Type::Basic(BasicKind::UntypedFloat)),
            },
            LiteralKind::String => {
                let value = lit.string_value().unwrap_or_default();
                Operand::constant(
                    Type::Basic(BasicKind::UntypedString),
                    ConstValue::String(Arc::from(value)),
                )
            }
        }
    }

    fn check_selector(&mut self, selector: &SelectorExpr) -> Operand {
        let Some(base) = selector.base() else {
            return Operand::invalid();
        };
        let Some(name) = selector.name_token() else {
            self.check_expr(&base, None);
            return Operand::invalid();
        };

        if let Expr::NameRef(package_ref) = &base
            && let Some(ident) = package_ref.ident()
            && let Some(symbol) = self
                .model
                .lookup(self.ctx.scope, ident.text(), Some(ident.text_range().start()))
            && self.model.symbol(symbol).kind == SymbolKind::Package
        {
            self.info.record_use(self.ctx.file, ident.text_range(), symbol);
            let path = self.model.symbol(symbol).package.clone();
            let member = self
                .model
                .package_scope(&path)
                .and_then(|scope| self.model.scope(scope).entry(name.text(), None));
            return match member {
                Some(entry) => {
                    self.info.record_use(self.ctx.file, name.text_range(), entry.symbol);
                    self.ensure_resolved(entry.symbol);
                    self.symbol_operand(entry.symbol)
                }
                None => {
                    self.error(
                        name.text_range(),
                        codes::UNDEFINED_REFERENCE,
                        format!("undefined: {}.{}", ident.text(), name.text()),
                    );
                    Operand::invalid()
                }
            };
        }

        let base_operand = self.check_expr(&base, None);
        if base_operand.is_invalid() {
            return Operand::invalid();
        }
        match self.model.lookup_member_of(&base_operand.ty, name.text()) {
            Some(member) => {
                self.info.record_use(self.ctx.file, name.text_range(), member);
                self.ensure_resolved(member);
                self.symbol_operand(member)
            }
            None => {
                let ty = self.display(&base_operand.ty);
                self.error(
                    name.text_range(),
                    codes::UNDEFINED_REFERENCE,
                    format!(
                        "{}.{} undefined (type {ty} has no field or method {})",
                        base.syntax().text(),
                        name.text(),
                        name.text()
                    ),
                );
                Operand::invalid()
            }
        }
    }

    fn check_index(&mut self, index: &IndexExpr) -> Operand {
        let Some(base) = index.base() else {
            return Operand::invalid();
        };
        let base_operand = self.check_expr(&base, None);
        let key = index.index();
        if base_operand.is_invalid() {
            if let Some(key) = &key {
                self.check_expr(key, None);
            }
            return Operand::invalid();
        }
        let (key_type, elem) = match self.model.underlying(&base_operand.ty) {
            Type::Slice(elem) => (Type::INT, (*elem).clone()),
            Type::Map(key, value) => ((*key).clone(), (*value).clone()),
            Type::Basic(kind) if kind.is_string() => (Type::INT, Type::INT),
            _ => {
                let description = self.describe(base.syntax(), &base_operand);
                self.error(
                    index.syntax().text_range(),
                    codes::INVALID_OPERATION,
                    format!("invalid operation: cannot index {description}"),
                );
                if let Some(key) = &key {
                    self.check_expr(key, None);
                }
                return Operand::invalid();
            }
        };
        if let Some(key) = &key {
            let operand = self.check_expr(key, Some(&key_type));
            self.assign_to(key.syntax(), &operand, &key_type, "index");
        }
        Operand::value(elem)
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn check_composite(&mut self, lit: &CompositeLit, expected: Option<&Type>) -> Operand {
        let ty = match lit.composite_type() {
            Some(CompositeType::Named(expr)) => {
                let operand = self.check_expr(&expr, None);
                match operand.mode {
                    Mode::Type => operand.ty,
                    Mode::Invalid => Type::Invalid,
                    _ => {
                        self.error(
                            expr.syntax().text_range(),
                            codes::INVALID_TYPE,
                            format!("{} is not a type", expr.syntax().text()),
                        );
                        Type::Invalid
                    }
                }
            }
            Some(CompositeType::Type(type_expr)) => self.resolve_type(&type_expr),
            None => expected.cloned().unwrap_or_default(),
        };
        self.check_lit_body(lit.body(), &ty);
        Operand::value(ty)
    }

    /// Check the elements of a braced literal of type `ty`.
    fn check_lit_body(&mut self, body: Option<LitBody>, ty: &Type) {
        let Some(body) = body else {
            return;
        };
        let elements: Vec<Element> = body.elements().collect();
        match self.model.underlying(ty) {
            Type::Named(id) if self.model.named(id).is_struct() => {
                let fields = self.model.named(id).fields().to_vec();
                for (position, element) in elements.iter().enumerate() {
                    match element {
                        Element::Keyed(keyed) => {
                            let mut field_type = None;
                            if let Some(Expr::NameRef(key)) = keyed.key()
                                && let Some(ident) = key.ident()
                            {
                                match fields.iter().find(|f| f.name == ident.text()) {
                                    Some(field) => {
                                        self.info.record_use(self.ctx.file, ident.text_range(), field.symbol);
                                        field_type = Some(field.ty.clone());
                                    }
                                    None => {
                                        let message = format!(
                                            "unknown field {} in struct literal of type {}",
                                            ident.text(),
                                            self.display(ty)
                                        );
                                        self.error(ident.text_range(), codes::UNDEFINED_REFERENCE, message);
                                    }
                                }
                            }
                            if let Some(value) = keyed.value() {
                                self.check_element(&value, field_type.as_ref());
                            }
                        }
                        Element::Value(value) => {
                            let field = fields.get(position).map(|f| f.ty.clone());
                            if field.is_none() {
                                self.error(
                                    value.syntax().text_range(),
                                    codes::INVALID_OPERATION,
                                    format!("too many values in struct literal of type {}", self.display(ty)),
                                );
                            }
                            self.check_element(value, field.as_ref());
                        }
                    }
                }
            }
            Type::Slice(elem) => {
                for element in &elements {
                    match element {
                        Element::Keyed(keyed) => {
                            if let Some(key) = keyed.key() {
                                self.check_element(&key, Some(&Type::INT));
                            }
                            if let Some(value) = keyed.value() {
                                self.check_element(&value, Some(&elem));
                            }
                        }
                        Element::Value(value) => self.check_element(value, Some(&elem)),
                    }
                }
            }
            Type::Map(key_type, value_type) => {
                for element in &elements {
                    match element {
                        Element::Keyed(keyed) => {
                            if let Some(key) = keyed.key() {
                                self.check_element(&key, Some(&key_type));
                            }
                            if let Some(value) = keyed.value() {
                                self.check_element(&value, Some(&value_type));
                            }
                        }
                        Element::Value(value) => {
                            self.error(
                                value.syntax().text_range(),
                                codes::INVALID_OPERATION,
                                "missing key in map literal",
                            );
                            self.check_element(value, Some(&value_type));
                        }
                    }
                }
            }
            Type::Invalid => {
                for element in &elements {
                    match element {
                        Element::Keyed(keyed) => {
                            if let Some(value) = keyed.value() {
                                self.check_expr(&value, None);
                            }
                        }
                        Element::Value(value) => {
                            self.check_expr(value, None);
                        }
                    }
                }
            }
            other => {
                self.error(
                    body.syntax().text_range(),
                    codes::INVALID_TYPE,
                    format!("invalid composite literal type {}", self.display(&other)),
                );
            }
        }
    }

    fn check_element(&mut self, value: &Expr, ty: Option<&Type>) {
        let operand = self.check_expr(value, ty);
        if let Some(ty) = ty {
            self.assign_to(value.syntax(), &operand, ty, "struct literal");
        }
    }

    /// `[a, b, c]`
    fn check_list(&mut self, list: &ListLit, expected: Option<&Type>) -> Operand {
        let elements: Vec<Expr> = list.elements().collect();
        let (ty, elem) = match expected.map(|t| (t.clone(), self.model.underlying(t))) {
            Some((ty, Type::Slice(elem))) => (ty, Some((*elem).clone())),
            _ => (Type::Invalid, None),
        };
        match elem {
            Some(elem) => {
                for element in &elements {
                    let operand = self.check_expr(element, Some(&elem));
                    self.assign_to(element.syntax(), &operand, &elem, "list literal");
                }
                Operand::value(ty)
            }
            None => {
                let mut elem = None;
                for element in &elements {
                    let operand = self.check_expr(element, elem.as_ref());
                    match &elem {
                        Some(elem) => {
                            self.assign_to(element.syntax(), &operand, elem, "list literal");
                        }
                        None => elem = Some(self.default_type(element.syntax(), &operand)),
                    }
                }
                Operand::value(Type::slice(elem.unwrap_or(Type::Any)))
            }
        }
    }

    /// `{key: value}`: a map, or a struct when the use site wants one.
    fn check_map(&mut self, map: &MapLit, expected: Option<&Type>) -> Operand {
        if let Some(expected) = expected {
            match self.model.underlying(expected) {
                Type::Map(..) => {
                    self.check_lit_body(map.body(), expected);
                    return Operand::value(expected.clone());
                }
                Type::Named(id) if self.model.named(id).is_struct() => {
                    self.check_lit_body(map.body(), expected);
                    return Operand::value(expected.clone());
                }
                _ => {}
            }
        }
        let ty = Type::map(Type::STRING, Type::Any);
        if let Some(body) = map.body() {
            for element in body.elements() {
                let Element::Keyed(keyed) = element else {
                    continue;
                };
                match keyed.key() {
                    // Bare identifiers name string keys.
                    Some(Expr::NameRef(key)) => {
                        let text = key.text().unwrap_or_default();
                        self.info.record_type(
                            NodeKey::new(self.ctx.file, key.syntax()),
                            Type::STRING,
                            Some(ConstValue::String(Arc::from(text.as_str()))),
                        );
                    }
                    Some(key) => {
                        let operand = self.check_expr(&key, Some(&Type::STRING));
                        self.assign_to(key.syntax(), &operand, &Type::STRING, "map literal");
                    }
                    None => {}
                }
                if let Some(value) = keyed.value() {
                    let operand = self.check_expr(&value, None);
                    self.default_type(value.syntax(), &operand);
                }
            }
        }
        Operand::value(ty)
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn check_unary(&mut self, unary: &UnaryExpr) -> Operand {
        let (Some(op), Some(inner)) = (unary.op_kind(), unary.operand()) else {
            return Operand::invalid();
        };
        let operand = self.check_expr(&inner, None);
        if operand.is_invalid() {
            return Operand::invalid();
        }
        let kind = self.model.basic_of(&operand.ty);
        let valid = match op {
            SyntaxKind::PLUS | SyntaxKind::MINUS => kind.is_some_and(BasicKind::is_numeric),
            SyntaxKind::BANG => kind.is_some_and(BasicKind::is_boolean),
            SyntaxKind::CARET => kind.is_some_and(BasicKind::is_integer),
            SyntaxKind::AMP | SyntaxKind::STAR => return Operand::value(operand.ty),
            SyntaxKind::ARROW => {
                return match self.model.underlying(&operand.ty) {
                    Type::Chan(elem) => Operand::value((*elem).clone()),
                    _ => {
                        let description = self.describe(inner.syntax(), &operand);
                        self.error(
                            unary.syntax().text_range(),
                            codes::INVALID_OPERATION,
                            format!("invalid operation: cannot receive from non-channel {description}"),
                        );
                        Operand::invalid()
                    }
                };
            }
            _ => false,
        };
        if !valid {
            let description = self.describe(inner.syntax(), &operand);
            self.error(
                unary.syntax().text_range(),
                codes::INVALID_OPERATION,
                format!(
                    "invalid operation: operator {} not defined on {description}",
                    op_text(op)
                ),
            );
            return Operand::invalid();
        }
        match operand.value.as_ref().and_then(|v| consts::fold_unary(op, v)) {
            Some(value) => Operand::constant(operand.ty, value),
            None => Operand::value(operand.ty),
        }
    }

    fn check_binary(&mut self, binary: &BinaryExpr) -> Operand {
        let (Some(lhs), Some(rhs), Some(op)) = (binary.lhs(), binary.rhs(), binary.op_kind()) else {
            if let Some(lhs) = binary.lhs() {
                self.check_expr(&lhs, None);
            }
            return Operand::invalid();
        };
        let left = self.check_expr(&lhs, None);
        let right = self.check_expr(&rhs, None);
        if left.is_invalid() || right.is_invalid() {
            return Operand::invalid();
        }
        let range = binary.syntax().text_range();

        if matches!(op, SyntaxKind::SHL | SyntaxKind::SHR) {
            let integers = self.model.basic_of(&left.ty).is_some_and(BasicKind::is_integer)
                && self.model.basic_of(&right.ty).is_some_and(BasicKind::is_integer);
            if !integers {
                self.error(range, codes::INVALID_OPERATION, "invalid operation: shift of non-integer operand");
                return Operand::invalid();
            }
            return self.folded(range, op, &left, &right, left.ty.clone());
        }

        let Some((left, right, ty)) = self.match_operands(binary, &lhs, left, &rhs, right) else {
            return Operand::invalid();
        };
        let kind = self.model.basic_of(&ty);
        match op {
            SyntaxKind::EQ_EQ | SyntaxKind::BANG_EQ => {
                self.folded(range, op, &left, &right, Type::Basic(BasicKind::UntypedBool))
            }
            SyntaxKind::LT | SyntaxKind::LT_EQ | SyntaxKind::GT | SyntaxKind::GT_EQ => {
                if !kind.is_some_and(|k| k.is_numeric() || k.is_string()) {
                    self.undefined_operator(range, op, &lhs, &left);
                    return Operand::invalid();
                }
                self.folded(range, op, &left, &right, Type::Basic(BasicKind::UntypedBool))
            }
            SyntaxKind::AMP_AMP | SyntaxKind::PIPE_PIPE => {
                if !kind.is_some_and(BasicKind::is_boolean) {
                    self.undefined_operator(range, op, &lhs, &left);
                    return Operand::invalid();
                }
                self.folded(range, op, &left, &right, ty)
            }
            _ => {
                let valid = match op {
                    SyntaxKind::PLUS => kind.is_some_and(|k| k.is_numeric() || k.is_string()),
                    SyntaxKind::MINUS | SyntaxKind::STAR | SyntaxKind::SLASH => {
                        kind.is_some_and(BasicKind::is_numeric)
                    }
                    SyntaxKind::PERCENT | SyntaxKind::AMP | SyntaxKind::PIPE | SyntaxKind::CARET => {
                        kind.is_some_and(BasicKind::is_integer)
                    }
                    _ => false,
                };
                if !valid {
                    self.undefined_operator(range, op, &lhs, &left);
                    return Operand::invalid();
                }
                self.folded(range, op, &left, &right, ty)
            }
        }
    }

    /// Bring both operands of a binary expression to a common type.
    fn match_operands(
        &mut self,
        binary: &BinaryExpr,
        lhs: &Expr,
        left: Operand,
        rhs: &Expr,
        right: Operand,
    ) -> Option<(Operand, Operand, Type)> {
        match (left.ty.is_untyped(), right.ty.is_untyped()) {
            (true, true) => {
                let (Some(a), Some(b)) = (left.ty.basic(), right.ty.basic()) else {
                    return None;
                };
                let ty = Type::Basic(consts::untyped_result_kind(a, b));
                Some((left, right, ty))
            }
            (true, false) => {
                let ty = right.ty.clone();
                let left = self.convert_operand(binary, lhs, left, &right, &ty)?;
                Some((left, right, ty))
            }
            (false, true) => {
                let ty = left.ty.clone();
                let right = self.convert_operand(binary, rhs, right, &left, &ty)?;
                Some((left, right, ty))
            }
            (false, false) => {
                if left.ty != right.ty
                    && !(self.model.assignable(&left.ty, &right.ty) && self.model.assignable(&right.ty, &left.ty))
                {
                    self.error(
                        binary.syntax().text_range(),
                        codes::TYPE_MISMATCH,
                        format!(
                            "invalid operation: {} (mismatched types {} and {})",
                            binary.syntax().text(),
                            self.display(&left.ty),
                            self.display(&right.ty)
                        ),
                    );
                    return None;
                }
                let ty = left.ty.clone();
                Some((left, right, ty))
            }
        }
    }

    fn convert_operand(
        &mut self,
        binary: &BinaryExpr,
        node: &Expr,
        operand: Operand,
        other: &Operand,
        target: &Type,
    ) -> Option<Operand> {
        if !self.model.assignable(&operand.ty, target) {
            self.error(
                binary.syntax().text_range(),
                codes::TYPE_MISMATCH,
                format!(
                    "invalid operation: {} (mismatched types {} and {})",
                    binary.syntax().text(),
                    self.display(&operand.ty),
                    self.display(&other.ty)
                ),
            );
            return None;
        }
        Some(self.convert_recorded(node.syntax(), &operand, target))
    }

    fn folded(
        &mut self,
        range: text_size::TextRange,
        op: SyntaxKind,
        left: &Operand,
        right: &Operand,
        ty: Type,
    ) -> Operand {
        let (Some(a), Some(b)) = (&left.value, &right.value) else {
            return Operand::value(ty);
        };
        let integer = self
            .model
            .basic_of(&left.ty)
            .is_some_and(BasicKind::is_integer)
            && self.model.basic_of(&right.ty).is_some_and(BasicKind::is_integer);
        match consts::fold_binary(op, a, b, integer) {
            Folded::Value(value) => {
                let value = match self.model.basic_of(&ty) {
                    Some(kind) if !kind.is_untyped() => consts::convert(&value, kind).unwrap_or(value),
                    _ => value,
                };
                Operand::constant(ty, value)
            }
            Folded::Unknown => Operand::value(ty),
            Folded::DivisionByZero => {
                self.error(range, codes::INVALID_OPERATION, "invalid operation: division by zero");
                Operand::invalid()
            }
        }
    }

    fn undefined_operator(&mut self, range: text_size::TextRange, op: SyntaxKind, node: &Expr, operand: &Operand) {
        let description = self.describe(node.syntax(), operand);
        self.error(
            range,
            codes::INVALID_OPERATION,
            format!(
                "invalid operation: operator {} not defined on {description}",
                op_text(op)
            ),
        );
    }

    // ========================================================================
    // Function literals
    // ========================================================================

    fn check_func_lit(&mut self, func: &FuncLit) -> Operand {
        let signature = Arc::new(self.signature_of(func.params(), func.result()));
        let previous = self.ctx.scope;
        self.open_scope(ScopeKind::Lambda, func.syntax().text_range(), false);
        if let Some(list) = func.params() {
            let idents = super::decls::param_idents(&list);
            for (ident, ty) in idents.into_iter().zip(signature.params.iter()) {
                if let Some(ident) = ident {
                    self.declare_local(&ident, SymbolKind::Param, ty.clone(), TextSize::new(0));
                }
            }
        }
        let saved = self.ctx.results.replace(signature.results.clone());
        if let Some(body) = func.body() {
            for stmt in body.statements() {
                self.check_stmt(&stmt);
            }
        }
        self.ctx.results = saved;
        self.close_scope(previous);
        Operand::value(Type::Func(signature))
    }

    /// `(a, b) => expr` and `=> { ... }`, typed by the function type the use
    /// site expects.
    fn check_lambda(&mut self, lambda: &LambdaExpr, expected: Option<&Type>) -> Operand {
        let expected_sig = expected.and_then(|t| match self.model.underlying(t) {
            Type::Func(sig) => Some(sig),
            _ => None,
        });
        let params = lambda.params();
        let block = lambda.body_block();
        let previous = self.ctx.scope;
        self.open_scope(ScopeKind::Lambda, lambda.syntax().text_range(), block.is_none());
        let mut param_types = Vec::with_capacity(params.len());
        for (index, name) in params.iter().enumerate() {
            let ty = expected_sig
                .as_ref()
                .and_then(|sig| sig.params.get(index).cloned())
                .unwrap_or_default();
            if let Some(ident) = name.ident() {
                self.declare_local(&ident, SymbolKind::Param, ty.clone(), TextSize::new(0));
            }
            param_types.push(ty);
        }
        let results = expected_sig.as_ref().map(|s| s.results.clone()).unwrap_or_default();
        let saved = self.ctx.results.replace(results.clone());
        match (block, lambda.body_expr()) {
            (Some(block), _) => {
                for stmt in block.statements() {
                    self.check_stmt(&stmt);
                }
            }
            (None, Some(body)) => {
                let operand = self.check_expr(&body, results.first());
                if let Some(result) = results.first() {
                    self.assign_to(body.syntax(), &operand, result, "return statement");
                }
            }
            (None, None) => {}
        }
        self.ctx.results = saved;
        self.close_scope(previous);
        let signature = match expected_sig {
            Some(sig) if sig.params.len() == params.len() => sig,
            _ => Arc::new(Signature::new(param_types, results)),
        };
        Operand::value(Type::Func(signature))
    }

    // ========================================================================
    // Assignability and conversion
    // ========================================================================

    /// Report an operand that cannot be used as a value.
    fn check_value(&mut self, node: &SyntaxNode, operand: &Operand) -> bool {
        let text = node.text();
        let message = match operand.mode {
            Mode::Invalid => return false,
            Mode::Value => match &operand.ty {
                Type::Tuple(items) if !items.is_empty() => format!(
                    "multiple-value {text} (value of type {}) in single-value context",
                    self.display(&operand.ty)
                ),
                _ => return true,
            },
            Mode::NoValue => format!("{text} (no value) used as value"),
            Mode::Type => format!("{text} (type) is not an expression"),
            Mode::Package => format!("use of package {text} without selector"),
            Mode::Builtin => format!("{text} (built-in function) must be called"),
        };
        self.error(node.text_range(), codes::INVALID_OPERATION, message);
        false
    }

    /// Check that `operand` may be assigned to `target`, converting untyped
    /// constants to the target type.
    pub(crate) fn assign_to(&mut self, node: &SyntaxNode, operand: &Operand, target: &Type, context: &str) -> bool {
        if !self.check_value(node, operand) {
            return operand.is_invalid();
        }
        if target.is_invalid() {
            return true;
        }
        if !self.model.assignable(&operand.ty, target) {
            let description = self.describe(node, operand);
            self.error(
                node.text_range(),
                codes::TYPE_MISMATCH,
                format!(
                    "cannot use {description} as {} value in {context}",
                    self.display(target)
                ),
            );
            return false;
        }
        if operand.ty.is_untyped() {
            self.convert_recorded(node, operand, target);
        }
        true
    }

    /// Re-record an untyped operand at `node` with the type it takes in `target`.
    pub(crate) fn convert_recorded(&mut self, node: &SyntaxNode, operand: &Operand, target: &Type) -> Operand {
        let ty = if self.model.is_interface(target) {
            operand.ty.defaulted()
        } else {
            target.clone()
        };
        if ty.basic() == Some(BasicKind::UntypedNil) {
            return operand.clone();
        }
        let value = operand.value.as_ref().and_then(|v| match self.model.basic_of(&ty) {
            Some(kind) => consts::convert(v, kind),
            None => Some(v.clone()),
        });
        self.info
            .record_type(NodeKey::new(self.ctx.file, node), ty.clone(), value.clone());
        Operand {
            mode: operand.mode,
            ty,
            value,
            symbol: operand.symbol,
        }
    }

    /// Type a variable takes from its initializer.
    pub(crate) fn default_type(&mut self, node: &SyntaxNode, operand: &Operand) -> Type {
        if !self.check_value(node, operand) {
            return Type::Invalid;
        }
        match operand.ty.basic() {
            Some(BasicKind::UntypedNil) => {
                self.error(node.text_range(), codes::INVALID_ASSIGNMENT, "use of untyped nil in assignment");
                Type::Invalid
            }
            Some(kind) if kind.is_untyped() => {
                let ty = Type::Basic(kind.default_kind());
                self.convert_recorded(node, operand, &ty);
                ty
            }
            _ => operand.ty.clone(),
        }
    }

    /// `x (variable of type T)` and friends, as used in messages.
    pub(crate) fn describe(&self, node: &SyntaxNode, operand: &Operand) -> String {
        let text = node.text();
        let what = match operand.ty.basic() {
            Some(BasicKind::UntypedNil) => "untyped nil".to_string(),
            Some(kind) if kind.is_untyped() => format!("{} constant", kind.name()),
            _ if operand.value.is_some() => format!("constant of type {}", self.display(&operand.ty)),
            _ if operand.symbol.is_some_and(|s| {
                matches!(
                    self.model.symbol(s).kind,
                    SymbolKind::Var | SymbolKind::Param | SymbolKind::Field
                )
            }) =>
            {
                format!("variable of type {}", self.display(&operand.ty))
            }
            _ => format!("value of type {}", self.display(&operand.ty)),
        };
        format!("{text} ({what})")
    }
}

/// Source spelling of an operator token.
pub(crate) fn op_text(op: SyntaxKind) -> &'static str {
    match op {
        SyntaxKind::PLUS => "+",
        SyntaxKind::MINUS => "-",
        SyntaxKind::STAR => "*",
        SyntaxKind::SLASH => "/",
        SyntaxKind::PERCENT => "%",
        SyntaxKind::AMP => "&",
        SyntaxKind::PIPE => "|",
        SyntaxKind::CARET => "^",
        SyntaxKind::SHL => "<<",
        SyntaxKind::SHR => ">>",
        SyntaxKind::AMP_AMP => "&&",
        SyntaxKind::PIPE_PIPE => "||",
        SyntaxKind::BANG => "!",
        SyntaxKind::EQ_EQ => "==",
        SyntaxKind::BANG_EQ => "!=",
        SyntaxKind::LT => "<",
        SyntaxKind::LT_EQ => "<=",
        SyntaxKind::GT => ">",
        SyntaxKind::GT_EQ => ">=",
        SyntaxKind::ARROW => "<-",
        _ => "?",
    }
}
