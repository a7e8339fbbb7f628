//! Lexical scopes.
//!
//! Scopes form a tree: universe → bundled packages → unit → file → function
//! and lambda → block. File scopes additionally expose the members of the
//! file's class.

use indexmap::IndexMap;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::symbols::SymbolId;
use super::types::NamedId;
use crate::base::FileId;

/// Index of a scope in the model's scope arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Universe,
    /// A bundled package such as `spx`
    Package,
    /// Package-level declarations shared by every file of the unit
    Unit,
    File,
    /// Body of a declared function or method
    Func,
    /// Function literal or lambda
    Lambda,
    /// Block, or the implicit scope of an `if`/`for`/`switch` header or case clause
    Block,
}

/// A name bound in a scope
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeEntry {
    pub symbol: SymbolId,
    /// Offset from which the binding is in effect
    pub visible_from: TextSize,
    /// Bound by a top-level statement; invisible inside declared functions.
    pub body_local: bool,
}

#[derive(Clone, Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub file: Option<FileId>,
    pub range: TextRange,
    /// Whether an offset equal to the range end is still inside.
    pub inclusive_end: bool,
    pub entries: IndexMap<SmolStr, ScopeEntry>,
    /// Class whose members are visible here (file scopes only)
    pub class: Option<NamedId>,
    /// Name of a package scope
    pub package: Option<SmolStr>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            file: None,
            range: TextRange::default(),
            inclusive_end: true,
            entries: IndexMap::new(),
            class: None,
            package: None,
        }
    }

    pub fn with_range(mut self, file: FileId, range: TextRange, inclusive_end: bool) -> Self {
        self.file = Some(file);
        self.range = range;
        self.inclusive_end = inclusive_end;
        self
    }

    /// Whether `offset` in `file` lies inside this scope.
    pub fn contains(&self, file: FileId, offset: TextSize) -> bool {
        if self.file != Some(file) {
            return false;
        }
        let range = self.range;
        range.start() <= offset
            && (offset < range.end() || (self.inclusive_end && offset == range.end()))
    }

    /// Binding of `name` visible at `offset`, if any.
    ///
    /// `None` as offset ignores declaration order.
    pub fn entry(&self, name: &str, offset: Option<TextSize>) -> Option<ScopeEntry> {
        let entry = self.entries.get(name)?;
        match offset {
            Some(offset) if entry.visible_from > offset => None,
            _ => Some(*entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn test_exclusive_end_for_braced_scopes() {
        let file = FileId::new(0);
        let block = Scope::new(ScopeKind::Block, None).with_range(file, range(10, 20), false);
        assert!(block.contains(file, TextSize::new(10)));
        assert!(block.contains(file, TextSize::new(19)));
        assert!(!block.contains(file, TextSize::new(20)));
        assert!(!block.contains(FileId::new(1), TextSize::new(15)));

        let lambda = Scope::new(ScopeKind::Lambda, None).with_range(file, range(10, 20), true);
        assert!(lambda.contains(file, TextSize::new(20)));
    }

    #[test]
    fn test_entry_respects_visibility() {
        let mut scope = Scope::new(ScopeKind::Block, None);
        scope.entries.insert(
            "x".into(),
            ScopeEntry {
                symbol: SymbolId(3),
                visible_from: TextSize::new(8),
                body_local: false,
            },
        );
        assert!(scope.entry("x", Some(TextSize::new(4))).is_none());
        assert_eq!(scope.entry("x", Some(TextSize::new(8))).map(|e| e.symbol), Some(SymbolId(3)));
        assert!(scope.entry("x", None).is_some());
    }
}
