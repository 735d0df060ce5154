pub mod allocator;
pub mod models;

pub use allocator::SATOSHI_PRECISION;
