/// Identifier of a source file inside one program unit.
///
/// Unit files are numbered densely from zero in unit order. Bundled prelude
/// sources live in a separate range at the top of the id space so that they
/// never collide with unit files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u32);

const PRELUDE_BASE: u32 = 1 << 31;

impl FileId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Id of the `index`-th bundled prelude source.
    pub const fn prelude(index: u32) -> Self {
        Self(PRELUDE_BASE + index)
    }

    pub fn is_prelude(self) -> bool {
        self.0 >= PRELUDE_BASE
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Position of a unit file in unit order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
