pub mod cancel;
pub mod core;
pub mod error;
pub(crate) mod fs;
pub(crate) mod lru;
pub(crate) mod math;
