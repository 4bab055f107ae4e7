use indexmap::IndexMap;

/// Where each record of a seekable MGF source starts.
///
/// Maps a spectrum identifier to the byte offset of the `BEGIN IONS` line opening its
/// record, in file order.
#[derive(Debug, Default, Clone)]
pub struct OffsetIndex {
    offsets: IndexMap<Box<str>, u64>,
    built: bool,
}

impl OffsetIndex {
    #[inline]
    pub fn get(&self, spectrum_id: &str) -> Option<u64> {
        self.offsets.get(spectrum_id).copied()
    }

    /// Record `spectrum_id` at `offset`, returning the offset it replaced.
    /// A repeated identifier keeps its place in file order.
    pub fn insert(&mut self, spectrum_id: impl Into<Box<str>>, offset: u64) -> Option<u64> {
        self.offsets.insert(spectrum_id.into(), offset)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Whether a full scan of the source has completed. A built index may still be empty.
    pub fn is_built(&self) -> bool {
        self.built
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }
}
