use thiserror::Error;

use crate::buffer::frame::{FileId, FrameId};
use crate::storage::errors::StorageError;
use crate::storage::page::PageId;

pub type BufferResult<T> = Result<T, BufferError>;

#[derive(Debug, Error)]
pub enum BufferError {
    /// A full clock lap observed no unpinned frame.
    #[error("buffer pool exhausted: all frames are pinned")]
    PoolExhausted,

    /// `unpin_page` targeted a resident page whose pin count is zero.
    #[error("page {page_id} of file {file} is not pinned")]
    NotPinned { file: FileId, page_id: PageId },

    /// The operation needs the page unpinned, but someone still holds it.
    #[error("page {page_id} of file {file} is still pinned in frame {frame}")]
    PagePinned {
        file: FileId,
        page_id: PageId,
        frame: FrameId,
    },

    /// A frame is tagged as owned by a file but marked invalid. This is
    /// a corruption signal, not a caller error.
    #[error("frame {frame} is owned by a file but marked invalid")]
    InconsistentFrame { frame: FrameId },

    #[error("file {0} is not registered with this buffer pool")]
    UnknownFile(FileId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
