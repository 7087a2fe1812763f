//! Memory access contract consumed by the scanner.
//!
//! The raw access channel (driver, bus protocol, address translation) lives
//! behind [`MemoryProvider`]. Reads are potentially blocking cross-boundary
//! I/O; a provider instance is owned by exactly one scheduler thread.

use crate::error::{Error, Result};

/// Raw byte access to a target's address space.
pub trait ReadMemory {
    /// Read exactly `size` bytes starting at `address`.
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;
}

/// Attachment lifecycle of a memory provider.
pub trait MemoryProvider: ReadMemory + Send {
    fn is_attached(&self) -> bool;

    /// Attach to `target`. Returns `false` without partially attaching when
    /// the target is absent or the access channel is not ready.
    fn attach(&mut self, target: &str) -> bool;

    /// Detach from the current target. Calling it while detached is a no-op.
    fn detach(&mut self);

    /// Process id of the attached target.
    fn process_id(&self) -> Option<u32>;

    /// Base address of the attached target's main module.
    fn base_address(&self) -> u64;
}

/// Fixed-size little-endian value that can be decoded from target memory.
pub trait Primitive: Sized + Copy {
    const SIZE: usize;

    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($t:ty),* $(,)?) => {
        $(
            impl Primitive for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Typed helpers layered over [`ReadMemory::read_bytes`].
///
/// Implemented for every reader, including `dyn MemoryProvider`.
pub trait ReadMemoryExt: ReadMemory {
    fn read<T: Primitive>(&self, address: u64) -> Result<T> {
        let bytes = self.read_bytes(address, T::SIZE)?;
        if bytes.len() < T::SIZE {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("short read: {} of {} bytes", bytes.len(), T::SIZE),
            });
        }
        Ok(T::from_le_slice(&bytes))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        self.read(address)
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        self.read(address)
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        self.read(address)
    }

    fn read_f32(&self, address: u64) -> Result<f32> {
        self.read(address)
    }

    /// Read a string truncated at the first NUL byte or `max_len` bytes.
    fn read_string(&self, address: u64, max_len: usize) -> Result<String> {
        let bytes = self.read_bytes(address, max_len)?;
        let end = memchr::memchr(0, &bytes).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

impl<R: ReadMemory + ?Sized> ReadMemoryExt for R {}
