#[cfg(feature = "memory-storage")]
mod memory;
mod traits;

#[cfg(feature = "disk-storage")]
mod disk;

#[cfg(feature = "memory-storage")]
pub use memory::*;
pub use traits::*;

#[cfg(feature = "disk-storage")]
pub use disk::*;
