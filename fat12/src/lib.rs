// FAT12 floppy image encoder
// Builds a complete, bootable 1.44MB disk image in memory: boot sector and
// kernel in the reserved area, mirrored 12-bit FATs, fixed root directory,
// and contiguously allocated file data.

pub mod builder;
pub mod directory;
pub mod fat;
pub mod geometry;

pub use builder::ImageBuilder;
pub use fat::{FAT12_EOC, FAT12_FREE, FAT12_MASK};
pub use geometry::Geometry;
