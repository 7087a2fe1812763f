//! Distance, ordering and filtering over a snapshot.
//!
//! Entity counts are bounded by the scan limit, so every query is a linear
//! pass without a spatial index.

use std::cmp::Ordering;

use crate::entity::Entity;

/// Euclidean distance between two entities
pub fn distance(a: &Entity, b: &Entity) -> f32 {
    a.position.distance_to(&b.position)
}

/// Ascending distance to `reference`, ties broken by ascending id.
pub fn compare_by_distance(reference: &Entity, a: &Entity, b: &Entity) -> Ordering {
    distance(reference, a)
        .total_cmp(&distance(reference, b))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort entities for presentation relative to `reference`.
pub fn sort_by_distance<'a>(reference: &Entity, entities: &mut [&'a Entity]) {
    entities.sort_by(|a, b| compare_by_distance(reference, a, b));
}

/// Entities within `max_distance` of `reference` (boundary inclusive).
pub fn within<'a>(
    reference: &Entity,
    entities: &'a [Entity],
    max_distance: f32,
) -> impl Iterator<Item = &'a Entity> {
    let origin = reference.position;
    entities
        .iter()
        .filter(move |e| e.position.distance_to(&origin) <= max_distance)
}

/// Valid, living entities other than `local` within `max_distance` of it,
/// ordered nearest first.
pub fn nearby<'a>(local: &Entity, entities: &'a [Entity], max_distance: f32) -> Vec<&'a Entity> {
    let mut result: Vec<&Entity> = within(local, entities, max_distance)
        .filter(|e| e.id != local.id && e.is_valid && e.is_alive())
        .collect();
    sort_by_distance(local, &mut result);
    result
}

/// Valid entities other than `local`, nearest first, regardless of range.
pub fn ordered_others<'a>(local: &Entity, entities: &'a [Entity]) -> Vec<&'a Entity> {
    let mut result: Vec<&Entity> = entities
        .iter()
        .filter(|e| e.id != local.id && e.is_valid)
        .collect();
    sort_by_distance(local, &mut result);
    result
}
