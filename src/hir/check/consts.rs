//! Constant folding for untyped and typed constants.

use std::sync::Arc;

use super::super::types::{BasicKind, ConstValue};
use crate::parser::SyntaxKind;

/// Parse an integer literal (`42`, `0x2a`, `0o17`, `0b101`, `1_000`).
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(oct) = lower.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8).ok();
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return i64::from_str_radix(bin, 2).ok();
    }
    if lower.len() > 1 && lower.starts_with('0') && lower.chars().all(|c| c.is_ascii_digit()) {
        return i64::from_str_radix(&lower[1..], 8).ok();
    }
    lower.parse().ok()
}

pub(crate) fn parse_float(text: &str) -> Option<f64> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    clean.parse().ok()
}

/// Kind of the result of a binary operation between two untyped constants.
pub(crate) fn untyped_result_kind(a: BasicKind, b: BasicKind) -> BasicKind {
    if a == b {
        return a;
    }
    match (a, b) {
        (BasicKind::UntypedFloat, BasicKind::UntypedInt)
        | (BasicKind::UntypedInt, BasicKind::UntypedFloat) => BasicKind::UntypedFloat,
        _ => a,
    }
}

/// Outcome of folding
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Folded {
    Value(ConstValue),
    /// Not representable, e.g. integer overflow
    Unknown,
    DivisionByZero,
}

/// Fold `lhs op rhs`; `integer` selects integer division.
pub(crate) fn fold_binary(op: SyntaxKind, lhs: &ConstValue, rhs: &ConstValue, integer: bool) -> Folded {
    use ConstValue::*;
    use SyntaxKind as K;

    let value = match (lhs, rhs) {
        (Int(a), Int(b)) if integer => {
            let (a, b) = (*a, *b);
            match op {
                K::PLUS => a.checked_add(b).map(Int),
                K::MINUS => a.checked_sub(b).map(Int),
                K::STAR => a.checked_mul(b).map(Int),
                K::SLASH | K::PERCENT if b == 0 => return Folded::DivisionByZero,
                K::SLASH => a.checked_div(b).map(Int),
                K::PERCENT => a.checked_rem(b).map(Int),
                K::AMP => Some(Int(a & b)),
                K::PIPE => Some(Int(a | b)),
                K::CARET => Some(Int(a ^ b)),
                K::SHL => u32::try_from(b).ok().and_then(|s| a.checked_shl(s)).map(Int),
                K::SHR => u32::try_from(b).ok().and_then(|s| a.checked_shr(s)).map(Int),
                _ => compare(op, &a, &b),
            }
        }
        (String(a), String(b)) => match op {
            K::PLUS => Some(String(Arc::from(format!("{a}{b}")))),
            _ => compare(op, a, b),
        },
        (Bool(a), Bool(b)) => match op {
            K::AMP_AMP => Some(Bool(*a && *b)),
            K::PIPE_PIPE => Some(Bool(*a || *b)),
            K::EQ_EQ => Some(Bool(a == b)),
            K::BANG_EQ => Some(Bool(a != b)),
            _ => None,
        },
        _ => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return Folded::Unknown;
            };
            match op {
                K::PLUS => Some(Float(a + b)),
                K::MINUS => Some(Float(a - b)),
                K::STAR => Some(Float(a * b)),
                K::SLASH if b == 0.0 => return Folded::DivisionByZero,
                K::SLASH => Some(Float(a / b)),
                _ => compare(op, &a, &b),
            }
        }
    };
    value.map_or(Folded::Unknown, Folded::Value)
}

fn compare<T: PartialOrd + ?Sized>(op: SyntaxKind, a: &T, b: &T) -> Option<ConstValue> {
    let result = match op {
        SyntaxKind::EQ_EQ => a == b,
        SyntaxKind::BANG_EQ => a != b,
        SyntaxKind::LT => a < b,
        SyntaxKind::LT_EQ => a <= b,
        SyntaxKind::GT => a > b,
        SyntaxKind::GT_EQ => a >= b,
        _ => return None,
    };
    Some(ConstValue::Bool(result))
}

pub(crate) fn fold_unary(op: SyntaxKind, value: &ConstValue) -> Option<ConstValue> {
    match (op, value) {
        (SyntaxKind::PLUS, ConstValue::Int(_) | ConstValue::Float(_)) => Some(value.clone()),
        (SyntaxKind::MINUS, ConstValue::Int(v)) => v.checked_neg().map(ConstValue::Int),
        (SyntaxKind::MINUS, ConstValue::Float(v)) => Some(ConstValue::Float(-v)),
        (SyntaxKind::CARET, ConstValue::Int(v)) => Some(ConstValue::Int(!v)),
        (SyntaxKind::BANG, ConstValue::Bool(v)) => Some(ConstValue::Bool(!v)),
        _ => None,
    }
}

/// Value of a constant after conversion to a type of kind `target`.
pub(crate) fn convert(value: &ConstValue, target: BasicKind) -> Option<ConstValue> {
    match (value, target.default_kind()) {
        (ConstValue::Int(v), BasicKind::Float64) => Some(ConstValue::Float(*v as f64)),
        (ConstValue::Float(v), BasicKind::Int) if v.fract() == 0.0 => Some(ConstValue::Int(*v as i64)),
        (ConstValue::Float(_), BasicKind::Int) => None,
        _ => Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", Some(42))]
    #[case("0x2a", Some(42))]
    #[case("0b101", Some(5))]
    #[case("0o17", Some(15))]
    #[case("017", Some(15))]
    #[case("1_000", Some(1000))]
    #[case("0", Some(0))]
    #[case("99999999999999999999", None)]
    fn test_parse_int(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_int(text), expected);
    }

    #[test]
    fn test_fold_integer_arithmetic() {
        let a = ConstValue::Int(7);
        let b = ConstValue::Int(2);
        assert_eq!(fold_binary(SyntaxKind::SLASH, &a, &b, true), Folded::Value(ConstValue::Int(3)));
        assert_eq!(fold_binary(SyntaxKind::PERCENT, &a, &b, true), Folded::Value(ConstValue::Int(1)));
        assert_eq!(
            fold_binary(SyntaxKind::SLASH, &a, &ConstValue::Int(0), true),
            Folded::DivisionByZero
        );
        assert_eq!(
            fold_binary(SyntaxKind::PLUS, &ConstValue::Int(i64::MAX), &b, true),
            Folded::Unknown
        );
    }

    #[test]
    fn test_fold_mixed_and_strings() {
        assert_eq!(
            fold_binary(SyntaxKind::SLASH, &ConstValue::Int(7), &ConstValue::Float(2.0), false),
            Folded::Value(ConstValue::Float(3.5))
        );
        let hi = ConstValue::String(Arc::from("hi"));
        let there = ConstValue::String(Arc::from(" there"));
        assert_eq!(
            fold_binary(SyntaxKind::PLUS, &hi, &there, false),
            Folded::Value(ConstValue::String(Arc::from("hi there")))
        );
        assert_eq!(
            fold_binary(SyntaxKind::LT, &ConstValue::Int(1), &ConstValue::Int(2), true),
            Folded::Value(ConstValue::Bool(true))
        );
    }

    #[test]
    fn test_fold_unary_and_convert() {
        assert_eq!(fold_unary(SyntaxKind::MINUS, &ConstValue::Int(5)), Some(ConstValue::Int(-5)));
        assert_eq!(fold_unary(SyntaxKind::CARET, &ConstValue::Int(0)), Some(ConstValue::Int(-1)));
        assert_eq!(fold_unary(SyntaxKind::BANG, &ConstValue::Int(0)), None);
        assert_eq!(convert(&ConstValue::Int(2), BasicKind::Float64), Some(ConstValue::Float(2.0)));
        assert_eq!(convert(&ConstValue::Float(2.5), BasicKind::Int), None);
    }
}
