//! Binary layout of an entity record in target memory.
//!
//! All offsets are relative to the record's address. A layout carries a
//! version so a stored configuration written for one record format is never
//! silently decoded with another.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Vector3};
use crate::error::{Error, Result};
use crate::memory::{ReadMemory, ReadMemoryExt};

/// Word size (4 bytes / 32-bit value)
const WORD: u64 = 4;

/// Longest name a layout may declare
const MAX_NAME_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntityLayout {
    pub version: u32,
    /// i32 entity id
    pub id: u64,
    /// i32 team identifier
    pub team: u64,
    /// u32 flag word
    pub flags: u64,
    /// f32 current health
    pub health: u64,
    /// f32 maximum health
    pub max_health: u64,
    /// Three consecutive f32 (x, y, z)
    pub position: u64,
    /// NUL-terminated name
    pub name: u64,
    pub name_len: usize,
    /// Bit in `flags` marking the local player; 0 disables the rule
    pub local_flag_mask: u32,
}

impl Default for EntityLayout {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            id: 0,
            team: WORD,
            flags: WORD * 2,
            health: WORD * 4,
            max_health: WORD * 5,
            position: WORD * 8,
            name: WORD * 16,
            name_len: 32,
            local_flag_mask: 0x1,
        }
    }
}

/// One decoded record together with its raw flag word
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    pub address: u64,
    pub entity: Entity,
    pub flags: u32,
}

impl DecodedRecord {
    pub fn is_flagged_local(&self, mask: u32) -> bool {
        mask != 0 && self.flags & mask != 0
    }
}

impl EntityLayout {
    pub const CURRENT_VERSION: u32 = 1;
    pub const SUPPORTED_VERSIONS: &'static [u32] = &[1];

    /// Reject layouts this build cannot decode
    pub fn validate(&self) -> Result<()> {
        if !Self::SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(Error::UnsupportedLayout(self.version));
        }
        if self.name_len > MAX_NAME_LEN {
            return Err(Error::InvalidLayout(format!(
                "name length {} exceeds {}",
                self.name_len, MAX_NAME_LEN
            )));
        }
        Ok(())
    }

    /// Decode the record at `address` and apply sanity checks.
    pub fn decode<R: ReadMemory + ?Sized>(&self, memory: &R, address: u64) -> Result<DecodedRecord> {
        let at = |offset: u64| field_address(address, offset);

        let id = memory.read_i32(at(self.id)?)?;
        let team = memory.read_i32(at(self.team)?)?;
        let flags = memory.read_u32(at(self.flags)?)?;
        let health = memory.read_f32(at(self.health)?)?;
        let max_health = memory.read_f32(at(self.max_health)?)?;
        let position = Vector3::new(
            memory.read_f32(at(self.position)?)?,
            memory.read_f32(at(self.position.saturating_add(WORD))?)?,
            memory.read_f32(at(self.position.saturating_add(WORD * 2))?)?,
        );
        let name = if self.name_len > 0 {
            memory.read_string(at(self.name)?, self.name_len)?
        } else {
            String::new()
        };

        let entity = Entity {
            id,
            name,
            position,
            health,
            max_health,
            team,
            is_valid: true,
        };
        check_plausible(&entity).map_err(|reason| Error::invalid_record(address, reason))?;

        Ok(DecodedRecord {
            address,
            entity,
            flags,
        })
    }
}

/// Address of a field, rejecting records whose fields would wrap past the
/// end of the address space.
fn field_address(record: u64, offset: u64) -> Result<u64> {
    record.checked_add(offset).ok_or_else(|| {
        Error::invalid_record(record, format!("field offset {:#x} overflows", offset))
    })
}

/// Sanity checks a decoded entity must pass before publication
fn check_plausible(entity: &Entity) -> std::result::Result<(), String> {
    if entity.id < 0 {
        return Err(format!("negative id {}", entity.id));
    }
    if !entity.position.is_finite() {
        return Err(format!("non-finite position {}", entity.position));
    }
    if !entity.max_health.is_finite() || entity.max_health <= 0.0 {
        return Err(format!("implausible max health {}", entity.max_health));
    }
    if !entity.health.is_finite() || entity.health < 0.0 || entity.health > entity.max_health {
        return Err(format!(
            "implausible health {}/{}",
            entity.health, entity.max_health
        ));
    }
    Ok(())
}
