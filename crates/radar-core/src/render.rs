//! Renderer boundary.

use crate::entity::{Entity, EntitySnapshot};

/// Consumer of published snapshots, called once per display frame.
///
/// Inputs are read-only; a renderer never mutates scan state.
pub trait Renderer {
    fn render(&mut self, local_player: Option<&Entity>, entities: &[Entity]);
}

/// Render one snapshot
pub fn render_snapshot<R: Renderer + ?Sized>(renderer: &mut R, snapshot: &EntitySnapshot) {
    renderer.render(snapshot.local_player(), snapshot.entities());
}
