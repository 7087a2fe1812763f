mod address;
mod image;
mod reader;

pub use address::{format_hex_address, parse_hex_address};
pub use image::{MemoryImage, MemoryImageBuilder, MemoryRegion};
pub use reader::{MemoryProvider, Primitive, ReadMemory, ReadMemoryExt};
