//! Calls: overload resolution, builtins and conversions.

use std::sync::Arc;

use super::{Checker, Mode, Operand};
use crate::hir::diagnostics::codes;
use crate::hir::info::{CallInfo, NodeKey};
use crate::hir::symbols::{SymbolId, SymbolKind};
use crate::hir::types::{ConstValue, NamedId, Signature, Type};
use crate::parser::{AstNode, CallLike, Expr, SyntaxNode};

/// Arguments whose type depends on the parameter they are passed to.
fn is_deferred(arg: &Expr) -> bool {
    matches!(
        arg.clone().unparen(),
        Expr::Lambda(_) | Expr::FuncLit(_) | Expr::Map(_) | Expr::List(_)
    )
}

/// An argument list being matched against candidate signatures
struct Args {
    exprs: Vec<Expr>,
    /// Operands of arguments checked up front; `None` for deferred ones
    checked: Vec<Option<Operand>>,
    spread: bool,
}

impl Args {
    fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Parameter type argument `index` is matched against.
    fn param_type(&self, sig: &Signature, index: usize) -> Option<Type> {
        if self.spread && index + 1 == self.len() {
            return sig.params.last().cloned();
        }
        sig.param_type_at(index)
    }
}

impl Checker {
    pub(crate) fn check_call(&mut self, call: &CallLike, expected: Option<&Type>) -> Operand {
        let exprs = call.args();
        let Some(callee) = call.callee() else {
            for arg in &exprs {
                self.check_expr(arg, None);
            }
            return Operand::invalid();
        };
        let callee_operand = self.check_expr(&callee, None);
        let name = callee.syntax().text().to_string();
        match callee_operand.mode {
            Mode::Invalid => {
                for arg in &exprs {
                    self.check_expr(arg, None);
                }
                return Operand::invalid();
            }
            Mode::Type => return self.check_conversion(call, &callee_operand.ty, &exprs),
            Mode::Builtin => return self.check_builtin(call, &callee_operand, &exprs, expected),
            Mode::Package => {
                self.error(
                    callee.syntax().text_range(),
                    codes::INVALID_CALL,
                    format!("use of package {name} without selector"),
                );
                return Operand::invalid();
            }
            Mode::NoValue | Mode::Value => {}
        }

        let callee_symbol = callee_operand.symbol;
        let declared = callee_symbol
            .map(|s| self.model.symbol(s))
            .filter(|s| s.kind.is_callable() && !s.signatures.is_empty())
            .map(|s| s.signatures.clone());
        let signatures = match declared {
            Some(signatures) => signatures,
            None => match self.model.underlying(&callee_operand.ty) {
                Type::Func(sig) => vec![sig],
                _ => {
                    let description = self.describe(callee.syntax(), &callee_operand);
                    self.error(
                        callee.syntax().text_range(),
                        codes::INVALID_CALL,
                        format!("invalid operation: cannot call non-function {description}"),
                    );
                    for arg in &exprs {
                        self.check_expr(arg, None);
                    }
                    return Operand::invalid();
                }
            },
        };
        let (receiver, implicit_receiver) = self.receiver_of(&callee, callee_symbol);

        let checked = exprs
            .iter()
            .map(|arg| (!is_deferred(arg)).then(|| self.check_expr(arg, None)))
            .collect();
        let args = Args {
            exprs,
            checked,
            spread: call.arg_list().is_some_and(|l| l.has_spread()),
        };

        let chosen = signatures
            .iter()
            .find(|sig| self.signature_fits(sig, &args))
            .cloned();
        let signature = match chosen {
            Some(sig) => sig,
            None if signatures.len() == 1 => signatures[0].clone(),
            None => {
                let types: Vec<String> = args
                    .checked
                    .iter()
                    .map(|op| match op {
                        Some(op) => self.display(&op.ty),
                        None => "func".to_string(),
                    })
                    .collect();
                self.error(
                    call.syntax().text_range(),
                    codes::INVALID_CALL,
                    format!(
                        "no overload of {name} matches arguments ({})",
                        types.join(", ")
                    ),
                );
                for (arg, checked) in args.exprs.iter().zip(&args.checked) {
                    if checked.is_none() {
                        self.check_expr(arg, None);
                    }
                }
                return Operand::invalid();
            }
        };

        self.apply_signature(call, &name, &signature, &args);
        self.info.record_call(
            NodeKey::new(self.ctx.file, call.syntax()),
            CallInfo {
                callee: callee_symbol,
                signature: Some(signature.clone()),
                receiver,
                implicit_receiver,
            },
        );
        result_operand(&signature)
    }

    /// Explicit receiver type, or the class a bare method is invoked on.
    fn receiver_of(&self, callee: &Expr, symbol: Option<SymbolId>) -> (Option<Type>, Option<NamedId>) {
        let is_method = symbol.is_some_and(|s| self.model.symbol(s).kind == SymbolKind::Method);
        if !is_method {
            return (None, None);
        }
        match callee.clone().unparen() {
            Expr::Selector(selector) => {
                let receiver = selector
                    .base()
                    .and_then(|base| self.info.type_of(self.ctx.file, base.syntax()))
                    .map(|tv| tv.ty.clone());
                (receiver, None)
            }
            Expr::NameRef(_) => (None, self.ctx.class),
            _ => (None, None),
        }
    }

    /// Whether `args` can be passed to `sig` without errors.
    fn signature_fits(&self, sig: &Signature, args: &Args) -> bool {
        let count_ok = if args.spread {
            sig.variadic && args.len() == sig.params.len()
        } else {
            sig.accepts_count(args.len())
        };
        if !count_ok {
            return false;
        }
        args.exprs.iter().enumerate().all(|(index, arg)| {
            let Some(param) = args.param_type(sig, index) else {
                return false;
            };
            match &args.checked[index] {
                Some(operand) if operand.is_invalid() => true,
                Some(operand) => operand.mode == Mode::Value && self.model.assignable(&operand.ty, &param),
                None => self.deferred_fits(arg, &param),
            }
        })
    }

    /// Shape check for arguments typed by their parameter.
    fn deferred_fits(&self, arg: &Expr, param: &Type) -> bool {
        if param.is_invalid() {
            return true;
        }
        let underlying = self.model.underlying(param);
        match arg.clone().unparen() {
            Expr::Lambda(lambda) => match underlying {
                Type::Func(sig) => sig.params.len() == lambda.params().len(),
                _ => false,
            },
            Expr::FuncLit(func) => match underlying {
                Type::Func(sig) => {
                    let count = func.params().map_or(0, |list| list.params().count());
                    sig.params.len() == count
                }
                _ => false,
            },
            Expr::Map(_) => match underlying {
                Type::Map(..) | Type::Any => true,
                Type::Named(id) => self.model.named(id).is_struct(),
                _ => false,
            },
            Expr::List(_) => matches!(underlying, Type::Slice(_) | Type::Any),
            _ => true,
        }
    }

    /// Check every argument against the chosen signature, reporting
    /// mismatches and fixing the types of untyped arguments.
    fn apply_signature(&mut self, call: &CallLike, name: &str, sig: &Signature, args: &Args) {
        let fits = if args.spread {
            args.len() == sig.params.len()
        } else {
            sig.accepts_count(args.len())
        };
        if !fits {
            let (range, message) = if args.len() < sig.fixed_count() {
                let range = call
                    .arg_list()
                    .and_then(|l| l.r_paren())
                    .map_or(call.syntax().text_range(), |t| t.text_range());
                (range, format!("not enough arguments in call to {name}"))
            } else {
                let index = sig.params.len().min(args.len().saturating_sub(1));
                (
                    args.exprs[index].syntax().text_range(),
                    format!("too many arguments in call to {name}"),
                )
            };
            self.error(range, codes::INVALID_CALL, message);
        }
        let context = format!("argument to {name}");
        for (index, arg) in args.exprs.iter().enumerate() {
            let param = args.param_type(sig, index);
            let operand = match &args.checked[index] {
                Some(operand) => {
                    if let Some(param) = &param {
                        self.record_expected(arg.syntax(), param);
                    }
                    operand.clone()
                }
                None => self.check_expr(arg, param.as_ref()),
            };
            if let Some(param) = &param {
                self.assign_to(arg.syntax(), &operand, param, &context);
            }
        }
    }

    /// A function named by an expression statement without arguments.
    pub(crate) fn check_bare_call(&mut self, expr: &Expr, operand: &Operand) {
        let Some(symbol) = operand.symbol else {
            return;
        };
        let signatures = self.model.symbol(symbol).signatures.clone();
        let name = expr.syntax().text().to_string();
        let Some(signature) = signatures.iter().find(|s| s.accepts_count(0)).cloned() else {
            self.error(
                expr.syntax().text_range(),
                codes::INVALID_CALL,
                format!("not enough arguments in call to {name}"),
            );
            return;
        };
        let (receiver, implicit_receiver) = self.receiver_of(expr, Some(symbol));
        let key = NodeKey::new(self.ctx.file, expr.syntax());
        self.info.record_call(
            key,
            CallInfo {
                callee: Some(symbol),
                signature: Some(signature.clone()),
                receiver,
                implicit_receiver,
            },
        );
        self.info.record_type(key, signature.result_type(), None);
    }

    fn check_conversion(&mut self, call: &CallLike, target: &Type, exprs: &[Expr]) -> Operand {
        let target_name = self.display(target);
        let [arg] = exprs else {
            let message = if exprs.is_empty() {
                format!("missing argument in conversion to {target_name}")
            } else {
                format!("too many arguments in conversion to {target_name}")
            };
            self.error(call.syntax().text_range(), codes::INVALID_CALL, message);
            for arg in exprs {
                self.check_expr(arg, None);
            }
            return Operand::value(target.clone());
        };
        let operand = self.check_expr(arg, Some(target));
        if operand.is_invalid() {
            return Operand::value(target.clone());
        }
        if !self.convertible(&operand.ty, target) {
            let description = self.describe(arg.syntax(), &operand);
            self.error(
                call.syntax().text_range(),
                codes::TYPE_MISMATCH,
                format!("cannot convert {description} to type {target_name}"),
            );
            return Operand::value(target.clone());
        }
        let converted = if operand.ty.is_untyped() {
            self.convert_recorded(arg.syntax(), &operand, target)
        } else {
            operand
        };
        let value = converted.value.and_then(|v| match self.model.basic_of(target) {
            Some(kind) => super::consts::convert(&v, kind),
            None => Some(v),
        });
        Operand {
            mode: Mode::Value,
            ty: target.clone(),
            value,
            symbol: None,
        }
    }

    fn convertible(&self, from: &Type, to: &Type) -> bool {
        if self.model.assignable(from, to) {
            return true;
        }
        match (self.model.basic_of(from), self.model.basic_of(to)) {
            (Some(a), Some(b)) => {
                (a.is_numeric() && b.is_numeric())
                    || (a.is_string() && b.is_string())
                    || (a.is_integer() && b.is_string())
            }
            _ => self.model.underlying(from) == self.model.underlying(to),
        }
    }

    fn check_builtin(
        &mut self,
        call: &CallLike,
        callee: &Operand,
        exprs: &[Expr],
        expected: Option<&Type>,
    ) -> Operand {
        let Some(symbol) = callee.symbol else {
            return Operand::invalid();
        };
        let name = self.model.symbol(symbol).name.clone();
        let node = call.syntax().clone();
        let result = match name.as_str() {
            "len" => self.check_len(&node, exprs),
            "append" => self.check_append(call, exprs, expected),
            _ => {
                for arg in exprs {
                    let operand = self.check_expr(arg, None);
                    self.default_type(arg.syntax(), &operand);
                }
                Operand::no_value()
            }
        };
        self.info.record_call(
            NodeKey::new(self.ctx.file, call.syntax()),
            CallInfo {
                callee: Some(symbol),
                ..CallInfo::default()
            },
        );
        result
    }

    fn check_len(&mut self, node: &SyntaxNode, exprs: &[Expr]) -> Operand {
        let [arg] = exprs else {
            self.error(
                node.text_range(),
                codes::INVALID_CALL,
                format!(
                    "{} arguments for len (expected 1, found {})",
                    if exprs.is_empty() { "not enough" } else { "too many" },
                    exprs.len()
                ),
            );
            for arg in exprs {
                self.check_expr(arg, None);
            }
            return Operand::value(Type::INT);
        };
        let operand = self.check_expr(arg, None);
        if operand.is_invalid() {
            return Operand::value(Type::INT);
        }
        if let Some(ConstValue::String(text)) = &operand.value {
            let value = ConstValue::Int(text.chars().count() as i64);
            return Operand::constant(Type::INT, value);
        }
        let ok = match self.model.underlying(&operand.ty) {
            Type::Slice(_) | Type::Map(..) | Type::Chan(_) => true,
            Type::Basic(kind) => kind.is_string(),
            _ => false,
        };
        if !ok {
            let description = self.describe(arg.syntax(), &operand);
            self.error(
                arg.syntax().text_range(),
                codes::INVALID_CALL,
                format!("invalid argument: {description} for built-in len"),
            );
        }
        Operand::value(Type::INT)
    }

    fn check_append(&mut self, call: &CallLike, exprs: &[Expr], expected: Option<&Type>) -> Operand {
        let Some((first, rest)) = exprs.split_first() else {
            self.error(
                call.syntax().text_range(),
                codes::INVALID_CALL,
                "not enough arguments for append",
            );
            return Operand::invalid();
        };
        let slice = self.check_expr(first, expected);
        if slice.is_invalid() {
            for arg in rest {
                self.check_expr(arg, None);
            }
            return Operand::invalid();
        }
        let Type::Slice(elem) = self.model.underlying(&slice.ty) else {
            let description = self.describe(first.syntax(), &slice);
            self.error(
                first.syntax().text_range(),
                codes::INVALID_CALL,
                format!("invalid argument: {description} is not a slice"),
            );
            for arg in rest {
                self.check_expr(arg, None);
            }
            return Operand::invalid();
        };
        let spread = call.arg_list().is_some_and(|l| l.has_spread());
        for (index, arg) in rest.iter().enumerate() {
            let target = if spread && index + 1 == rest.len() {
                slice.ty.clone()
            } else {
                (*elem).clone()
            };
            let operand = self.check_expr(arg, Some(&target));
            self.assign_to(arg.syntax(), &operand, &target, "argument to append");
        }
        Operand::value(slice.ty)
    }
}

fn result_operand(sig: &Arc<Signature>) -> Operand {
    let ty = sig.result_type();
    if ty.is_void() {
        Operand::no_value()
    } else {
        Operand::value(ty)
    }
}
