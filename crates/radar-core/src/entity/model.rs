use std::fmt;

use serde::{Deserialize, Serialize};

use super::Vector3;

pub type EntityId = i32;
pub type TeamId = i32;

/// A tracked in-world object decoded from one scan tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub position: Vector3,
    pub health: f32,
    pub max_health: f32,
    pub team: TeamId,
    pub is_valid: bool,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, position: Vector3) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            health: 100.0,
            max_health: 100.0,
            team: 0,
            is_valid: true,
        }
    }

    pub fn with_team(mut self, team: TeamId) -> Self {
        self.team = team;
        self
    }

    pub fn with_health(mut self, health: f32, max_health: f32) -> Self {
        self.health = health;
        self.max_health = max_health;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn distance_to(&self, other: &Entity) -> f32 {
        self.position.distance_to(&other.position)
    }

    pub fn is_ally_of(&self, other: &Entity) -> bool {
        self.team == other.team
    }

    /// Health as a fraction of max health, clamped to [0, 1]
    pub fn health_ratio(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entity {}: {} at {} (HP: {}/{})",
            self.id, self.name, self.position, self.health, self.max_health
        )
    }
}
