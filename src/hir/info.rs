//! Per-unit side tables recorded by the checker.
//!
//! Tables are keyed by file and syntax range, so they stay valid for any
//! `SyntaxNode` of the unit's trees without holding on to nodes.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use text_size::{TextRange, TextSize};

use super::symbols::SymbolId;
use super::types::{ConstValue, NamedId, Signature, Type};
use crate::base::FileId;
use crate::parser::{SyntaxKind, SyntaxNode};

/// Identity of a syntax node within the unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub file: FileId,
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl NodeKey {
    pub fn new(file: FileId, node: &SyntaxNode) -> Self {
        Self {
            file,
            kind: node.kind(),
            range: node.text_range(),
        }
    }
}

/// Static type of an expression and its value when constant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeAndValue {
    pub ty: Type,
    pub value: Option<ConstValue>,
}

/// How a call was resolved
#[derive(Clone, Debug, Default)]
pub struct CallInfo {
    /// Called function or method, when the callee names one
    pub callee: Option<SymbolId>,
    /// Signature chosen among the callee's overloads
    pub signature: Option<Arc<Signature>>,
    /// Type of the explicit receiver in `recv.method(...)`
    pub receiver: Option<Type>,
    /// Class whose member was called without a receiver
    pub implicit_receiver: Option<NamedId>,
}

impl CallInfo {
    /// Type of the value the method is invoked on.
    pub fn receiver_type(&self) -> Option<Type> {
        self.receiver
            .clone()
            .or_else(|| self.implicit_receiver.map(Type::Named))
    }
}

/// Everything the checker records about expressions and identifiers.
#[derive(Debug, Default)]
pub struct Info {
    pub(crate) types: FxHashMap<NodeKey, TypeAndValue>,
    /// Type imposed by the use site (parameter, assignment target, ...)
    pub(crate) expected: FxHashMap<NodeKey, Type>,
    pub(crate) defs: FxHashMap<(FileId, TextRange), SymbolId>,
    pub(crate) uses: FxHashMap<(FileId, TextRange), SymbolId>,
    pub(crate) calls: FxHashMap<NodeKey, CallInfo>,
    /// Use sites of each symbol in recording order
    pub(crate) use_sites: FxHashMap<SymbolId, Vec<(FileId, TextRange)>>,
}

impl Info {
    pub(crate) fn record_type(&mut self, key: NodeKey, ty: Type, value: Option<ConstValue>) {
        self.types.insert(key, TypeAndValue { ty, value });
    }

    pub(crate) fn record_expected(&mut self, key: NodeKey, ty: Type) {
        if !ty.is_invalid() {
            self.expected.insert(key, ty);
        }
    }

    pub(crate) fn record_def(&mut self, file: FileId, range: TextRange, symbol: SymbolId) {
        self.defs.insert((file, range), symbol);
    }

    pub(crate) fn record_use(&mut self, file: FileId, range: TextRange, symbol: SymbolId) {
        if self.uses.insert((file, range), symbol).is_none() {
            self.use_sites.entry(symbol).or_default().push((file, range));
        }
    }

    pub(crate) fn record_call(&mut self, key: NodeKey, info: CallInfo) {
        self.calls.insert(key, info);
    }

    pub fn type_of(&self, file: FileId, node: &SyntaxNode) -> Option<&TypeAndValue> {
        self.types.get(&NodeKey::new(file, node))
    }

    pub fn expected_type(&self, file: FileId, node: &SyntaxNode) -> Option<&Type> {
        self.expected.get(&NodeKey::new(file, node))
    }

    pub fn call(&self, file: FileId, node: &SyntaxNode) -> Option<&CallInfo> {
        self.calls.get(&NodeKey::new(file, node))
    }

    /// Symbol defined by the identifier at `range`.
    pub fn def_at(&self, file: FileId, range: TextRange) -> Option<SymbolId> {
        self.defs.get(&(file, range)).copied()
    }

    /// Symbol referenced by the identifier at `range`.
    pub fn use_at(&self, file: FileId, range: TextRange) -> Option<SymbolId> {
        self.uses.get(&(file, range)).copied()
    }

    /// Symbol defined or used by the identifier covering `offset`.
    pub fn symbol_at(&self, file: FileId, offset: TextSize) -> Option<(TextRange, SymbolId)> {
        let covers = |range: &TextRange| range.contains_inclusive(offset);
        self.defs
            .iter()
            .chain(self.uses.iter())
            .find(|((f, range), _)| *f == file && covers(range))
            .map(|((_, range), symbol)| (*range, *symbol))
    }

    /// Every referencing occurrence of `symbol`.
    pub fn use_sites(&self, symbol: SymbolId) -> &[(FileId, TextRange)] {
        self.use_sites.get(&symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every identifier definition in `file`.
    pub fn defs_in(&self, file: FileId) -> impl Iterator<Item = (TextRange, SymbolId)> + '_ {
        self.defs
            .iter()
            .filter(move |((f, _), _)| *f == file)
            .map(|((_, range), symbol)| (*range, *symbol))
    }

    /// Every identifier use in `file`.
    pub fn uses_in(&self, file: FileId) -> impl Iterator<Item = (TextRange, SymbolId)> + '_ {
        self.uses
            .iter()
            .filter(move |((f, _), _)| *f == file)
            .map(|((_, range), symbol)| (*range, *symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn test_use_sites_recorded_once() {
        let mut info = Info::default();
        let file = FileId::new(0);
        let symbol = SymbolId(7);
        info.record_use(file, range(0, 3), symbol);
        info.record_use(file, range(0, 3), symbol);
        info.record_use(file, range(10, 13), symbol);
        assert_eq!(info.use_sites(symbol).len(), 2);
        assert_eq!(info.use_at(file, range(10, 13)), Some(symbol));
        assert!(info.use_sites(SymbolId(8)).is_empty());
    }

    #[test]
    fn test_symbol_at_includes_identifier_end() {
        let mut info = Info::default();
        let file = FileId::new(0);
        info.record_def(file, range(4, 8), SymbolId(1));
        assert_eq!(info.symbol_at(file, TextSize::new(8)), Some((range(4, 8), SymbolId(1))));
        assert_eq!(info.symbol_at(file, TextSize::new(9)), None);
        assert_eq!(info.symbol_at(FileId::new(1), TextSize::new(5)), None);
    }
}
