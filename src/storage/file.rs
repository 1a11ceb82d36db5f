use std::{
    collections::{HashMap, HashSet},
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::storage::{
    errors::{StorageError, StorageResult},
    page::{PAGE_SIZE, Page, PageId},
};

/// Durable home of pages. The buffer pool never touches storage except
/// through this trait.
pub trait PageStore {
    /// Reads an existing page. Fails if the page was never allocated or
    /// has been deleted.
    fn read_page(&mut self, id: PageId) -> StorageResult<Page>;

    /// Writes a page back; the page carries its own id.
    fn write_page(&mut self, page: &Page) -> StorageResult<()>;

    /// Allocates a brand-new zeroed page and assigns its id.
    fn allocate_page(&mut self) -> StorageResult<Page>;

    fn delete_page(&mut self, id: PageId) -> StorageResult<()>;

    /// Diagnostics only.
    fn filename(&self) -> &str;

    /// Diagnostics only.
    fn is_open(&self) -> bool;
}

/// File-backed page store. Pages live at `id * PAGE_SIZE` offsets; the
/// deleted set is kept in memory and deleted slots are reused by
/// `allocate_page` before the file grows.
#[derive(Debug)]
pub struct FilePageStore {
    file: File,
    name: String,
    next_page_id: u64,
    deleted: HashSet<PageId>,
}

impl FilePageStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let size = file.metadata()?.len();
        let next_page_id = size / PAGE_SIZE as u64;

        Ok(Self {
            file,
            name: path.display().to_string(),
            next_page_id,
            deleted: HashSet::new(),
        })
    }

    fn check_live(&self, id: PageId) -> StorageResult<()> {
        if id.0 >= self.next_page_id || self.deleted.contains(&id) {
            return Err(StorageError::PageNotFound { page_id: id.0 });
        }
        Ok(())
    }
}

impl PageStore for FilePageStore {
    fn read_page(&mut self, id: PageId) -> StorageResult<Page> {
        self.check_live(id)?;

        let mut page = Page::new(id);
        self.file.seek(SeekFrom::Start(id.0 * PAGE_SIZE as u64))?;
        self.file.read_exact(&mut page.data)?;
        Ok(page)
    }

    fn write_page(&mut self, page: &Page) -> StorageResult<()> {
        self.check_live(page.id)?;

        self.file
            .seek(SeekFrom::Start(page.id.0 * PAGE_SIZE as u64))?;
        self.file.write_all(&page.data)?;
        Ok(())
    }

    fn allocate_page(&mut self) -> StorageResult<Page> {
        let id = match self.deleted.iter().next().copied() {
            Some(id) => {
                self.deleted.remove(&id);
                id
            }
            None => {
                let id = PageId(self.next_page_id);
                self.next_page_id += 1;
                id
            }
        };

        let page = Page::new(id);
        self.file.seek(SeekFrom::Start(id.0 * PAGE_SIZE as u64))?;
        self.file.write_all(&page.data)?;
        Ok(page)
    }

    fn delete_page(&mut self, id: PageId) -> StorageResult<()> {
        if id.0 >= self.next_page_id || !self.deleted.insert(id) {
            return Err(StorageError::PageNotFound { page_id: id.0 });
        }
        Ok(())
    }

    fn filename(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        true
    }
}

/// In-memory page store, used by tests and embedders that do not need
/// durability.
#[derive(Debug, Default)]
pub struct MemPageStore {
    name: String,
    pages: HashMap<PageId, Page>,
    next_page_id: u64,
}

impl MemPageStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pages: HashMap::new(),
            next_page_id: 0,
        }
    }
}

impl PageStore for MemPageStore {
    fn read_page(&mut self, id: PageId) -> StorageResult<Page> {
        self.pages
            .get(&id)
            .cloned()
            .ok_or(StorageError::PageNotFound { page_id: id.0 })
    }

    fn write_page(&mut self, page: &Page) -> StorageResult<()> {
        match self.pages.get_mut(&page.id) {
            Some(slot) => {
                *slot = page.clone();
                Ok(())
            }
            None => Err(StorageError::PageNotFound { page_id: page.id.0 }),
        }
    }

    fn allocate_page(&mut self) -> StorageResult<Page> {
        let id = PageId(self.next_page_id);
        self.next_page_id += 1;

        let page = Page::new(id);
        self.pages.insert(id, page.clone());
        Ok(page)
    }

    fn delete_page(&mut self, id: PageId) -> StorageResult<()> {
        match self.pages.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StorageError::PageNotFound { page_id: id.0 }),
        }
    }

    fn filename(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        true
    }
}
