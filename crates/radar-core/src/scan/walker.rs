//! Discovery of entity records in a target's memory.

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MemoryProvider, ReadMemoryExt};

/// Result of walking the target's entity collection once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Walk {
    /// Addresses of discovered entity records, in collection order
    pub records: Vec<u64>,
    /// Record address the target identifies as the local player
    pub local_record: Option<u64>,
    pub session_id: Option<i32>,
}

/// Target-specific strategy for locating entity records.
pub trait EntityWalker: Send {
    fn walk(&self, memory: &dyn MemoryProvider) -> Result<Walk>;
}

/// Walks a fixed-capacity array of record pointers.
///
/// The pointer stored at `base + entity_list` points to `max_entities`
/// consecutive u64 slots; null slots are empty. All offsets are relative to
/// the target's base address, and an offset of 0 disables that lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerListWalker {
    pub entity_list: u64,
    pub local_player: u64,
    pub session_id: u64,
    pub max_entities: usize,
}

impl PointerListWalker {
    const SLOT_SIZE: usize = 8;

    pub fn new(entity_list: u64, max_entities: usize) -> Self {
        Self {
            entity_list,
            local_player: 0,
            session_id: 0,
            max_entities,
        }
    }

    pub fn with_local_player(mut self, offset: u64) -> Self {
        self.local_player = offset;
        self
    }

    pub fn with_session_id(mut self, offset: u64) -> Self {
        self.session_id = offset;
        self
    }
}

impl EntityWalker for PointerListWalker {
    fn walk(&self, memory: &dyn MemoryProvider) -> Result<Walk> {
        if !memory.is_attached() {
            return Err(Error::NotAttached);
        }
        let base = memory.base_address();
        let at = |offset: u64| {
            base.checked_add(offset).ok_or_else(|| {
                Error::InvalidAddress(format!("base {:#x} + offset {:#x} overflows", base, offset))
            })
        };
        let mut walk = Walk::default();

        if self.local_player != 0 {
            let ptr = memory.read_u64(at(self.local_player)?)?;
            walk.local_record = (ptr != 0).then_some(ptr);
        }

        if self.session_id != 0 {
            walk.session_id = Some(memory.read_i32(at(self.session_id)?)?);
        }

        let list = memory.read_u64(at(self.entity_list)?)?;
        if list == 0 || self.max_entities == 0 {
            debug!("Entity list is empty (list pointer {:#x})", list);
            return Ok(walk);
        }

        let slots = memory.read_bytes(list, self.max_entities * Self::SLOT_SIZE)?;
        walk.records = slots
            .chunks_exact(Self::SLOT_SIZE)
            .filter_map(|chunk| {
                let mut buf = [0u8; Self::SLOT_SIZE];
                buf.copy_from_slice(chunk);
                let ptr = u64::from_le_bytes(buf);
                (ptr != 0).then_some(ptr)
            })
            .collect();

        Ok(walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryImage, MemoryImageBuilder};

    const BASE: u64 = 0x1_4000_0000;
    const LIST: u64 = 0x2000_0000;

    fn attached(mut image: MemoryImage) -> MemoryImage {
        assert!(image.attach("target.exe"));
        image
    }

    #[test]
    fn test_walk_skips_null_slots() {
        let mut builder = MemoryImageBuilder::new()
            .base_address(BASE)
            .write_u64(BASE + 0x100, LIST)
            .write_u64(BASE + 0x108, 0x3000_0020)
            .write_i32(BASE + 0x110, 12);
        for (i, ptr) in [0x3000_0000u64, 0, 0x3000_0020, 0].iter().enumerate() {
            builder = builder.write_u64(LIST + i as u64 * 8, *ptr);
        }
        let image = attached(builder.build());

        let walker = PointerListWalker::new(0x100, 4)
            .with_local_player(0x108)
            .with_session_id(0x110);
        let walk = walker.walk(&image).unwrap();

        assert_eq!(walk.records, vec![0x3000_0000, 0x3000_0020]);
        assert_eq!(walk.local_record, Some(0x3000_0020));
        assert_eq!(walk.session_id, Some(12));
    }

    #[test]
    fn test_walk_null_list_is_empty() {
        let image = attached(
            MemoryImageBuilder::new()
                .base_address(BASE)
                .write_u64(BASE + 0x100, 0)
                .build(),
        );
        let walk = PointerListWalker::new(0x100, 64).walk(&image).unwrap();
        assert_eq!(walk, Walk::default());
    }

    #[test]
    fn test_walk_unreadable_list_fails() {
        let image = attached(
            MemoryImageBuilder::new()
                .base_address(BASE)
                .write_u64(BASE + 0x100, LIST)
                .build(),
        );
        assert!(PointerListWalker::new(0x100, 4).walk(&image).is_err());
    }

    #[test]
    fn test_walk_offset_past_address_space_fails() {
        let image = attached(
            MemoryImageBuilder::new()
                .base_address(u64::MAX - 0x10)
                .write_u64(u64::MAX - 0x10, 0)
                .build(),
        );
        assert!(matches!(
            PointerListWalker::new(0x100, 4).walk(&image),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_walk_requires_attachment() {
        let image = MemoryImageBuilder::new()
            .base_address(BASE)
            .write_u64(BASE + 0x100, 0)
            .build();
        assert!(matches!(
            PointerListWalker::new(0x100, 4).walk(&image),
            Err(Error::NotAttached)
        ));
    }
}
