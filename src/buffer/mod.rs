pub mod errors;
pub mod frame;
pub mod index;
pub mod pool;
