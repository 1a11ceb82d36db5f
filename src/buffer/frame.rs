use std::fmt;

use crate::storage::page::PageId;

/// Handle for a page store registered with a buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable 0..N-1 identity of a pool slot.
pub type FrameId = usize;

/// Bookkeeping for one pool slot. The page bytes live in the pool's
/// payload array; the descriptor only carries metadata.
///
/// `file` and `page_id` are meaningful only while `valid` is set; `set`
/// and `clear` are the only mutators of the identity fields.
#[derive(Debug)]
pub struct FrameDesc {
    pub frame_id: FrameId,
    pub file: Option<FileId>,
    pub page_id: PageId,
    pub valid: bool,
    pub dirty: bool,
    pub pin_count: u32,
    pub ref_bit: bool,
}

impl FrameDesc {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            file: None,
            page_id: PageId(0),
            valid: false,
            dirty: false,
            pin_count: 0,
            ref_bit: false,
        }
    }

    /// Installs a fresh mapping. The caller that triggered the install
    /// holds the first pin.
    pub fn set(&mut self, file: FileId, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.valid = true;
        self.dirty = false;
        self.pin_count = 1;
        self.ref_bit = true;
    }

    /// Returns the frame to the empty state.
    pub fn clear(&mut self) {
        self.file = None;
        self.page_id = PageId(0);
        self.valid = false;
        self.dirty = false;
        self.pin_count = 0;
        self.ref_bit = false;
    }
}
