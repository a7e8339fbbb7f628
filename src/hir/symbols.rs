//! Symbols: every named entity the checker knows about.

use std::sync::Arc;

use smol_str::SmolStr;
use text_size::TextRange;

use super::types::{ConstValue, NamedId, Signature, Type};
use crate::base::FileId;

/// Index of a symbol in the model's symbol arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of a symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Var,
    Param,
    Field,
    Const,
    TypeName,
    Func,
    Method,
    /// An imported package name
    Package,
    /// A universe function such as `len`
    Builtin,
}

impl SymbolKind {
    /// Human-readable kind, used in messages.
    pub fn display(&self) -> &'static str {
        match self {
            Self::Var => "variable",
            Self::Param => "parameter",
            Self::Field => "field",
            Self::Const => "constant",
            Self::TypeName => "type",
            Self::Func => "function",
            Self::Method => "method",
            Self::Package => "package",
            Self::Builtin => "builtin",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Func | Self::Method | Self::Builtin)
    }
}

/// Where a symbol is defined: the identifier range in a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DefSite {
    pub file: FileId,
    pub range: TextRange,
}

/// A named entity.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Type of the value; for type names the declared type itself.
    pub ty: Type,
    /// Overloads of a function or method, in declaration order.
    pub signatures: Vec<Arc<Signature>>,
    /// Declaring package (`main` for user code, empty for the universe).
    pub package: SmolStr,
    pub def: Option<DefSite>,
    /// Type declaring this field or method
    pub owner: Option<NamedId>,
    pub value: Option<ConstValue>,
    /// Declared inside the first `var` block of its file.
    pub in_first_var_block: bool,
}

impl Symbol {
    pub fn new(name: impl Into<SmolStr>, kind: SymbolKind, package: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: Type::Invalid,
            signatures: Vec::new(),
            package: package.into(),
            def: None,
            owner: None,
            value: None,
            in_first_var_block: false,
        }
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_def(mut self, file: FileId, range: TextRange) -> Self {
        self.def = Some(DefSite { file, range });
        self
    }

    pub fn with_owner(mut self, owner: NamedId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_value(mut self, value: ConstValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Whether the symbol comes from bundled packages or the universe.
    pub fn is_builtin(&self) -> bool {
        self.def.is_none_or(|d| d.file.is_prelude())
    }

    /// Whether the symbol is an event-handler method such as `onStart`.
    pub fn is_event_handler(&self) -> bool {
        self.kind == SymbolKind::Method && is_handler_name(&self.name)
    }
}

/// `on` followed by an uppercase letter.
pub fn is_handler_name(name: &str) -> bool {
    name.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextSize;

    #[test]
    fn test_handler_names() {
        assert!(is_handler_name("onStart"));
        assert!(is_handler_name("onKey"));
        assert!(!is_handler_name("once"));
        assert!(!is_handler_name("on"));
    }

    #[test]
    fn test_builtin_detection() {
        let builtin = Symbol::new("len", SymbolKind::Builtin, "");
        assert!(builtin.is_builtin());
        let user = Symbol::new("x", SymbolKind::Var, "main")
            .with_def(FileId::new(0), TextRange::empty(TextSize::new(0)));
        assert!(!user.is_builtin());
        let prelude = Symbol::new("say", SymbolKind::Method, "spx")
            .with_def(FileId::prelude(0), TextRange::empty(TextSize::new(0)));
        assert!(prelude.is_builtin());
    }
}
