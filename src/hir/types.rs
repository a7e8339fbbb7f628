//! Semantic types.
//!
//! Named types live in an arena owned by the [`Model`](super::Model) and are
//! referred to by [`NamedId`]. Everything else is a plain value.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

use super::symbols::SymbolId;

/// Index of a named type in the model's type arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedId(pub(crate) u32);

impl NamedId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Predeclared basic types and the kinds of untyped constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Int,
    Float64,
    String,
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            Self::UntypedBool
                | Self::UntypedInt
                | Self::UntypedFloat
                | Self::UntypedString
                | Self::UntypedNil
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Float64 | Self::UntypedInt | Self::UntypedFloat
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::UntypedInt)
    }

    pub fn is_string(self) -> bool {
        matches!(self, Self::String | Self::UntypedString)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, Self::Bool | Self::UntypedBool)
    }

    /// The type an untyped constant takes when no other type is imposed.
    pub fn default_kind(self) -> BasicKind {
        match self {
            Self::UntypedBool => Self::Bool,
            Self::UntypedInt => Self::Int,
            Self::UntypedFloat => Self::Float64,
            Self::UntypedString => Self::String,
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::UntypedBool => "untyped bool",
            Self::UntypedInt => "untyped int",
            Self::UntypedFloat => "untyped float",
            Self::UntypedString => "untyped string",
            Self::UntypedNil => "untyped nil",
        }
    }
}

/// A static type
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Type {
    /// Result of an earlier error; compatible with everything.
    #[default]
    Invalid,
    Basic(BasicKind),
    /// The empty interface
    Any,
    Named(NamedId),
    Slice(Arc<Type>),
    Map(Arc<Type>, Arc<Type>),
    Chan(Arc<Type>),
    Func(Arc<Signature>),
    /// Multiple results of a call; the empty tuple means "no value".
    Tuple(Arc<[Type]>),
}

impl Type {
    pub const BOOL: Type = Type::Basic(BasicKind::Bool);
    pub const INT: Type = Type::Basic(BasicKind::Int);
    pub const FLOAT64: Type = Type::Basic(BasicKind::Float64);
    pub const STRING: Type = Type::Basic(BasicKind::String);

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Arc::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Arc::new(key), Arc::new(value))
    }

    pub fn void() -> Type {
        Type::Tuple(Arc::from(Vec::new()))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Tuple(items) if items.is_empty())
    }

    pub fn basic(&self) -> Option<BasicKind> {
        match self {
            Type::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_untyped(&self) -> bool {
        self.basic().is_some_and(BasicKind::is_untyped)
    }

    pub fn as_named(&self) -> Option<NamedId> {
        match self {
            Type::Named(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Arc<Signature>> {
        match self {
            Type::Func(sig) => Some(sig),
            _ => None,
        }
    }

    /// Replace an untyped constant type by its default type.
    pub fn defaulted(&self) -> Type {
        match self {
            Type::Basic(kind) => Type::Basic(kind.default_kind()),
            other => other.clone(),
        }
    }
}

/// A function signature
#[derive(Clone, Debug, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    pub param_names: Vec<Option<SmolStr>>,
    /// The last parameter is `...T` and has type `[]T`.
    pub variadic: bool,
    pub results: Vec<Type>,
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
            && self.variadic == other.variadic
            && self.results == other.results
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.params.hash(state);
        self.variadic.hash(state);
        self.results.hash(state);
    }
}

impl Signature {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        let param_names = vec![None; params.len()];
        Self {
            params,
            param_names,
            variadic: false,
            results,
        }
    }

    /// Number of parameters that must always be supplied.
    pub fn fixed_count(&self) -> usize {
        if self.variadic {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }

    /// Whether `count` arguments fit this signature.
    pub fn accepts_count(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.fixed_count()
        } else {
            count == self.params.len()
        }
    }

    /// Type expected for argument `index`, looking through a variadic tail.
    pub fn param_type_at(&self, index: usize) -> Option<Type> {
        if self.variadic && index + 1 >= self.params.len() {
            return match self.params.last()? {
                Type::Slice(elem) => Some((**elem).clone()),
                other => Some(other.clone()),
            };
        }
        self.params.get(index).cloned()
    }

    /// The call result: one type, a tuple, or void.
    pub fn result_type(&self) -> Type {
        match self.results.as_slice() {
            [single] => single.clone(),
            many => Type::Tuple(Arc::from(many.to_vec())),
        }
    }
}

/// Value of a compile-time constant
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
}

impl ConstValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v}"),
            ConstValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// The two kinds of class a source file declares
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Game,
    Sprite,
}

/// A struct field
#[derive(Clone, Debug)]
pub struct Field {
    pub symbol: SymbolId,
    pub name: SmolStr,
    pub ty: Type,
    pub embedded: bool,
}

/// What a named type stands for
#[derive(Clone, Debug, Default)]
pub enum Underlying {
    /// Declared but not yet resolved
    #[default]
    Pending,
    Type(Type),
    Struct(Vec<Field>),
    /// Method symbols required by the interface
    Interface(Vec<SymbolId>),
}

/// A declared type
#[derive(Clone, Debug)]
pub struct NamedType {
    pub name: SmolStr,
    pub package: SmolStr,
    pub underlying: Underlying,
    /// Methods declared on this type, in declaration order
    pub methods: Vec<SymbolId>,
    /// The type-name symbol
    pub symbol: Option<SymbolId>,
    pub class: Option<ClassKind>,
}

impl NamedType {
    pub fn new(name: impl Into<SmolStr>, package: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            underlying: Underlying::Pending,
            methods: Vec::new(),
            symbol: None,
            class: None,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.underlying, Underlying::Struct(_))
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.underlying, Underlying::Interface(_))
    }

    pub fn fields(&self) -> &[Field] {
        match &self.underlying {
            Underlying::Struct(fields) => fields,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variadic_param_type() {
        let sig = Signature {
            params: vec![Type::STRING, Type::slice(Type::Any)],
            param_names: vec![None, None],
            variadic: true,
            results: vec![],
        };
        assert_eq!(sig.param_type_at(0), Some(Type::STRING));
        assert_eq!(sig.param_type_at(1), Some(Type::Any));
        assert_eq!(sig.param_type_at(5), Some(Type::Any));
        assert!(sig.accepts_count(1));
        assert!(!sig.accepts_count(0));
        assert!(sig.result_type().is_void());
    }

    #[test]
    fn test_signature_equality_ignores_names() {
        let mut a = Signature::new(vec![Type::INT], vec![Type::BOOL]);
        let b = Signature::new(vec![Type::INT], vec![Type::BOOL]);
        a.param_names[0] = Some("x".into());
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_types() {
        assert_eq!(Type::Basic(BasicKind::UntypedFloat).defaulted(), Type::FLOAT64);
        assert_eq!(Type::Basic(BasicKind::UntypedNil).defaulted(), Type::Basic(BasicKind::UntypedNil));
    }
}
