use std::collections::HashMap;

use crate::buffer::frame::{FileId, FrameId};
use crate::storage::page::PageId;

/// Directory mapping (file, page) to the frame currently holding that
/// page. A lookup miss is an ordinary value, not an error; the pool
/// turns it into the cache-miss path.
#[derive(Debug, Default)]
pub struct PageIndex {
    entries: HashMap<(FileId, PageId), FrameId>,
}

impl PageIndex {
    /// Capacity is sized proportionally to the pool.
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(frames + frames / 5),
        }
    }

    pub fn lookup(&self, file: FileId, page_id: PageId) -> Option<FrameId> {
        self.entries.get(&(file, page_id)).copied()
    }

    pub fn insert(&mut self, file: FileId, page_id: PageId, frame: FrameId) {
        self.entries.insert((file, page_id), frame);
    }

    pub fn remove(&mut self, file: FileId, page_id: PageId) -> Option<FrameId> {
        self.entries.remove(&(file, page_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
