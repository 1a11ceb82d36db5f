pub mod buffer;
pub mod storage;
