//! Sparse memory image of a target process.
//!
//! An image is a set of byte regions captured from (or constructed to
//! resemble) a target's address space. It implements the full provider
//! contract, so it drives offline runs and tests without a live target.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{MemoryProvider, ReadMemory};
use crate::error::{Error, Result};

/// A contiguous run of bytes at a fixed address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub address: u64,
    pub bytes: Vec<u8>,
}

impl MemoryRegion {
    fn end(&self) -> u64 {
        self.address.saturating_add(self.bytes.len() as u64)
    }

    /// Whether `size` bytes at `address` lie inside this region; a range
    /// wrapping past the top of the address space never does.
    fn contains(&self, address: u64, size: usize) -> bool {
        address >= self.address
            && address
                .checked_add(size as u64)
                .is_some_and(|end| end <= self.end())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryImage {
    pub process_name: String,
    pub process_id: u32,
    pub base_address: u64,
    pub regions: Vec<MemoryRegion>,
    #[serde(skip)]
    attached: bool,
}

impl MemoryImage {
    pub fn new(process_name: impl Into<String>, process_id: u32, base_address: u64) -> Self {
        Self {
            process_name: process_name.into(),
            process_id,
            base_address,
            regions: Vec::new(),
            attached: false,
        }
    }

    /// Load an image from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let image: MemoryImage = serde_json::from_str(&content)?;
        info!(
            "Loaded memory image of {} (pid {}, {} regions)",
            image.process_name,
            image.process_id,
            image.regions.len()
        );
        Ok(image)
    }

    /// Save the image to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Write bytes into the image, extending a region that already covers
    /// or directly precedes `address`.
    pub fn write(&mut self, address: u64, bytes: &[u8]) {
        let existing = self
            .regions
            .iter_mut()
            .rev()
            .find(|r| address >= r.address && address <= r.end());

        match existing {
            Some(region) => {
                let offset = (address - region.address) as usize;
                let end = offset + bytes.len();
                if region.bytes.len() < end {
                    region.bytes.resize(end, 0);
                }
                region.bytes[offset..end].copy_from_slice(bytes);
            }
            None => self.regions.push(MemoryRegion {
                address,
                bytes: bytes.to_vec(),
            }),
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.regions.iter().map(|r| r.bytes.len()).sum()
    }
}

impl ReadMemory for MemoryImage {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let region = self
            .regions
            .iter()
            .rev()
            .find(|r| r.contains(address, size))
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: format!("{} bytes not mapped in image", size),
            })?;

        let offset = (address - region.address) as usize;
        Ok(region.bytes[offset..offset + size].to_vec())
    }
}

impl MemoryProvider for MemoryImage {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn attach(&mut self, target: &str) -> bool {
        if self.attached {
            return true;
        }
        if !self.process_name.eq_ignore_ascii_case(target) {
            warn!(
                "Target '{}' not present in image (image holds '{}')",
                target, self.process_name
            );
            return false;
        }
        if self.regions.is_empty() {
            warn!("Memory image for '{}' has no mapped regions", target);
            return false;
        }
        debug!("Attached to image of {} (pid {})", target, self.process_id);
        self.attached = true;
        true
    }

    fn detach(&mut self) {
        if self.attached {
            debug!("Detached from image of {}", self.process_name);
            self.attached = false;
        }
    }

    fn process_id(&self) -> Option<u32> {
        self.attached.then_some(self.process_id)
    }

    fn base_address(&self) -> u64 {
        self.base_address
    }
}

/// Builder for constructing memory images in code
#[derive(Debug)]
pub struct MemoryImageBuilder {
    image: MemoryImage,
}

impl MemoryImageBuilder {
    pub fn new() -> Self {
        Self {
            image: MemoryImage::new("target.exe", 1, 0),
        }
    }

    pub fn process(mut self, name: &str, pid: u32) -> Self {
        self.image.process_name = name.to_string();
        self.image.process_id = pid;
        self
    }

    pub fn base_address(mut self, base: u64) -> Self {
        self.image.base_address = base;
        self
    }

    pub fn write_bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        self.image.write(address, bytes);
        self
    }

    pub fn write_i32(self, address: u64, value: i32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u32(self, address: u64, value: u32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_u64(self, address: u64, value: u64) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    pub fn write_f32(self, address: u64, value: f32) -> Self {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Write a NUL-padded string occupying exactly `len` bytes
    pub fn write_string(self, address: u64, value: &str, len: usize) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.resize(len, 0);
        self.write_bytes(address, &bytes)
    }

    pub fn build(self) -> MemoryImage {
        self.image
    }
}

impl Default for MemoryImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ReadMemoryExt;
    use tempfile::NamedTempFile;

    #[test]
    fn test_attach_requires_matching_target() {
        let mut image = MemoryImageBuilder::new()
            .process("game.exe", 4321)
            .write_u32(0x1000, 1)
            .build();

        assert!(!image.attach("other.exe"));
        assert!(!image.is_attached());
        assert_eq!(image.process_id(), None);

        assert!(image.attach("GAME.exe"));
        assert!(image.is_attached());
        assert_eq!(image.process_id(), Some(4321));
    }

    #[test]
    fn test_attach_fails_on_empty_image() {
        let mut image = MemoryImage::new("game.exe", 1, 0);
        assert!(!image.attach("game.exe"));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut image = MemoryImageBuilder::new().write_u32(0, 0).build();
        assert!(image.attach("target.exe"));
        image.detach();
        image.detach();
        assert!(!image.is_attached());
    }

    #[test]
    fn test_read_unmapped_fails() {
        let image = MemoryImageBuilder::new().write_u32(0x1000, 7).build();
        assert!(matches!(
            image.read_bytes(0x2000, 4),
            Err(Error::MemoryReadFailed { address: 0x2000, .. })
        ));
        // Read straddling the end of a region
        assert!(image.read_bytes(0x1002, 4).is_err());
    }

    #[test]
    fn test_adjacent_writes_extend_region() {
        let image = MemoryImageBuilder::new()
            .write_u32(0x1000, 1)
            .write_u32(0x1004, 2)
            .build();
        assert_eq!(image.regions.len(), 1);
        assert_eq!(image.read_bytes(0x1000, 8).unwrap().len(), 8);
        assert_eq!(image.read_u32(0x1004).unwrap(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let image = MemoryImageBuilder::new()
            .process("game.exe", 99)
            .base_address(0x140000000)
            .write_u64(0x140001000, 0xABCD)
            .build();
        image.save(temp_file.path()).unwrap();

        let loaded = MemoryImage::load(temp_file.path()).unwrap();
        assert_eq!(loaded.process_name, "game.exe");
        assert_eq!(loaded.base_address, 0x140000000);
        assert_eq!(loaded.read_u64(0x140001000).unwrap(), 0xABCD);
        assert!(!loaded.is_attached());
    }
}
