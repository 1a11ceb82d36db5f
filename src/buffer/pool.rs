use std::collections::HashMap;
use std::fmt;

use log::{debug, error};

use crate::buffer::{
    errors::{BufferError, BufferResult},
    frame::{FileId, FrameDesc, FrameId},
    index::PageIndex,
};
use crate::storage::{
    file::PageStore,
    page::{Page, PageId},
};

#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool. Must be at least one.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Buffer pool: a bounded set of in-memory frames caching disk pages,
/// with clock (second-chance) replacement.
///
/// The pool owns the frame payloads and metadata outright; callers get a
/// borrowed page handle from `fetch_page`/`alloc_page` and must balance
/// every fetch with an `unpin_page`. A caller that never unpins exhausts
/// the pool permanently.
pub struct BufferPool {
    frames: Vec<FrameDesc>,
    pool: Vec<Page>,
    index: PageIndex,
    files: HashMap<FileId, Box<dyn PageStore>>,
    clock_hand: FrameId,
    next_file_id: u32,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig) -> Self {
        assert!(config.num_frames > 0, "buffer pool needs at least one frame");

        let num_frames = config.num_frames;
        Self {
            frames: (0..num_frames).map(FrameDesc::new).collect(),
            pool: (0..num_frames).map(|_| Page::new(PageId(0))).collect(),
            index: PageIndex::with_capacity(num_frames),
            files: HashMap::new(),
            // the first advance lands on frame 0
            clock_hand: num_frames - 1,
            next_file_id: 0,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Registers a page store; every other operation addresses it by the
    /// returned id. Stores stay registered for the pool's lifetime.
    pub fn add_file(&mut self, store: Box<dyn PageStore>) -> FileId {
        let id = FileId(self.next_file_id);
        self.next_file_id += 1;
        self.files.insert(id, store);
        id
    }

    pub fn store(&self, file: FileId) -> BufferResult<&dyn PageStore> {
        match self.files.get(&file) {
            Some(store) => Ok(store.as_ref()),
            None => Err(BufferError::UnknownFile(file)),
        }
    }

    pub fn store_mut(&mut self, file: FileId) -> BufferResult<&mut dyn PageStore> {
        match self.files.get_mut(&file) {
            Some(store) => Ok(store.as_mut()),
            None => Err(BufferError::UnknownFile(file)),
        }
    }

    /// Returns the resident page, pinning it. On a miss the page is read
    /// from its store into a clock-allocated frame; a hit touches no
    /// storage at all.
    pub fn fetch_page(&mut self, file: FileId, page_id: PageId) -> BufferResult<&mut Page> {
        if !self.files.contains_key(&file) {
            return Err(BufferError::UnknownFile(file));
        }

        if let Some(frame) = self.index.lookup(file, page_id) {
            let desc = &mut self.frames[frame];
            desc.ref_bit = true;
            desc.pin_count += 1;
            return Ok(&mut self.pool[frame]);
        }

        let frame = self.alloc_frame()?;
        let page = self
            .files
            .get_mut(&file)
            .ok_or(BufferError::UnknownFile(file))?
            .read_page(page_id)?;

        self.pool[frame] = page;
        self.frames[frame].set(file, page_id);
        self.index.insert(file, page_id, frame);
        Ok(&mut self.pool[frame])
    }

    /// Drops one pin. Unpinning a page that is no longer resident is a
    /// no-op: it may already have been evicted. The dirty mark is sticky;
    /// only a successful write-back clears it.
    pub fn unpin_page(&mut self, file: FileId, page_id: PageId, dirty: bool) -> BufferResult<()> {
        let frame = match self.index.lookup(file, page_id) {
            Some(frame) => frame,
            None => return Ok(()),
        };

        let desc = &mut self.frames[frame];
        if desc.pin_count == 0 {
            return Err(BufferError::NotPinned { file, page_id });
        }

        desc.pin_count -= 1;
        if dirty {
            desc.dirty = true;
        }
        Ok(())
    }

    /// Allocates a brand-new page in the file and installs it, pinned,
    /// into a clock-allocated frame.
    pub fn alloc_page(&mut self, file: FileId) -> BufferResult<(PageId, &mut Page)> {
        let page = self
            .files
            .get_mut(&file)
            .ok_or(BufferError::UnknownFile(file))?
            .allocate_page()?;
        let page_id = page.id;

        let frame = self.alloc_frame()?;
        self.pool[frame] = page;
        self.frames[frame].set(file, page_id);
        self.index.insert(file, page_id, frame);
        Ok((page_id, &mut self.pool[frame]))
    }

    /// Deletes a page from its file, dropping it from the pool first if
    /// resident. No write-back happens: deletion makes the content moot.
    /// A pinned page cannot be disposed, and the store deletion is not
    /// requested in that case.
    pub fn dispose_page(&mut self, file: FileId, page_id: PageId) -> BufferResult<()> {
        if let Some(frame) = self.index.lookup(file, page_id) {
            if self.frames[frame].pin_count > 0 {
                return Err(BufferError::PagePinned {
                    file,
                    page_id,
                    frame,
                });
            }
            self.frames[frame].clear();
            self.index.remove(file, page_id);
        }

        self.files
            .get_mut(&file)
            .ok_or(BufferError::UnknownFile(file))?
            .delete_page(page_id)?;
        Ok(())
    }

    /// Writes every dirty page of `file` back and drops all of the
    /// file's pages from the pool. Fails on the first pinned frame, in
    /// ascending frame order; frames processed before that stay flushed.
    pub fn flush_file(&mut self, file: FileId) -> BufferResult<()> {
        if !self.files.contains_key(&file) {
            return Err(BufferError::UnknownFile(file));
        }

        for frame in 0..self.frames.len() {
            if self.frames[frame].file != Some(file) {
                continue;
            }
            if !self.frames[frame].valid {
                return Err(BufferError::InconsistentFrame { frame });
            }

            let page_id = self.frames[frame].page_id;
            if self.frames[frame].pin_count > 0 {
                return Err(BufferError::PagePinned {
                    file,
                    page_id,
                    frame,
                });
            }

            if self.frames[frame].dirty {
                debug!("flushing page {page_id} of file {file} from frame {frame}");
                let page = &self.pool[frame];
                self.files
                    .get_mut(&file)
                    .ok_or(BufferError::UnknownFile(file))?
                    .write_page(page)?;
                self.frames[frame].dirty = false;
            }

            self.index.remove(file, page_id);
            self.frames[frame].clear();
        }
        Ok(())
    }

    /// Read-only dump of per-frame state plus the valid-frame count.
    pub fn snapshot(&self) -> PoolSnapshot {
        let frames: Vec<FrameInfo> = self
            .frames
            .iter()
            .map(|desc| FrameInfo {
                frame_id: desc.frame_id,
                valid: desc.valid,
                file: desc.file,
                file_name: desc
                    .file
                    .and_then(|file| self.files.get(&file))
                    .map(|store| store.filename().to_string()),
                page_id: desc.page_id,
                pin_count: desc.pin_count,
                dirty: desc.dirty,
                ref_bit: desc.ref_bit,
            })
            .collect();
        let valid_frames = frames.iter().filter(|info| info.valid).count();

        PoolSnapshot {
            frames,
            valid_frames,
        }
    }

    fn advance_clock(&mut self) {
        self.clock_hand = (self.clock_hand + 1) % self.frames.len();
    }

    /// Clock scan for a frame ready to receive a new page, evicting an
    /// unpinned resident page if necessary.
    ///
    /// Two laps may be needed: the first can spend itself clearing ref
    /// bits. Termination: a completed lap that observed no unpinned frame
    /// at all means every page is pinned, so the pool is exhausted.
    fn alloc_frame(&mut self) -> BufferResult<FrameId> {
        let start = self.clock_hand;
        let mut found_unpinned = false;

        loop {
            self.advance_clock();
            let hand = self.clock_hand;

            if !self.frames[hand].valid {
                return Ok(hand);
            }

            if self.frames[hand].pin_count == 0 {
                found_unpinned = true;
                if !self.frames[hand].ref_bit {
                    self.evict(hand)?;
                    return Ok(hand);
                }
                // second chance: the ref bit is cleared below
            }

            self.frames[hand].ref_bit = false;

            if hand == start {
                if !found_unpinned {
                    return Err(BufferError::PoolExhausted);
                }
                found_unpinned = false;
            }
        }
    }

    /// Unmaps the resident page of `frame`, writing it back first when
    /// dirty, and returns the frame to the empty state.
    fn evict(&mut self, frame: FrameId) -> BufferResult<()> {
        let desc = &self.frames[frame];
        let file = desc.file.expect("valid frame without an owner");
        let page_id = desc.page_id;

        if desc.dirty {
            debug!("evicting dirty page {page_id} of file {file} from frame {frame}");
            let page = &self.pool[frame];
            self.files
                .get_mut(&file)
                .ok_or(BufferError::UnknownFile(file))?
                .write_page(page)?;
        } else {
            debug!("evicting page {page_id} of file {file} from frame {frame}");
        }

        self.index.remove(file, page_id);
        self.frames[frame].clear();
        Ok(())
    }
}

impl Drop for BufferPool {
    /// Forced flush: every still-dirty resident page is written back.
    /// Pins are ignored at shutdown and failures are logged, not raised.
    fn drop(&mut self) {
        for frame in 0..self.frames.len() {
            if !self.frames[frame].valid || !self.frames[frame].dirty {
                continue;
            }
            let file = match self.frames[frame].file {
                Some(file) => file,
                None => continue,
            };

            let page = &self.pool[frame];
            match self.files.get_mut(&file) {
                Some(store) if store.is_open() => {
                    if let Err(e) = store.write_page(page) {
                        error!(
                            "shutdown write-back of page {} (file {file}) failed: {e}",
                            page.id
                        );
                    }
                }
                _ => {}
            }
            self.frames[frame].clear();
        }
    }
}

/// Per-frame state as reported by `BufferPool::snapshot`.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub valid: bool,
    pub file: Option<FileId>,
    pub file_name: Option<String>,
    pub page_id: PageId,
    pub pin_count: u32,
    pub dirty: bool,
    pub ref_bit: bool,
}

#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub frames: Vec<FrameInfo>,
    pub valid_frames: usize,
}

impl PoolSnapshot {
    /// The frame currently holding (file, page), if any.
    pub fn frame_for(&self, file: FileId, page_id: PageId) -> Option<&FrameInfo> {
        self.frames
            .iter()
            .find(|info| info.valid && info.file == Some(file) && info.page_id == page_id)
    }
}

impl fmt::Display for PoolSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for info in &self.frames {
            write!(f, "frame {}: ", info.frame_id)?;
            if info.valid {
                writeln!(
                    f,
                    "file {} page {} pin {} dirty {} ref {}",
                    info.file_name.as_deref().unwrap_or("?"),
                    info.page_id,
                    info.pin_count,
                    info.dirty,
                    info.ref_bit
                )?;
            } else {
                writeln!(f, "empty")?;
            }
        }
        writeln!(f, "valid frames: {}", self.valid_frames)
    }
}
