use crate::entities::{Entity, Rect};

/// Strict AABB overlap. Rectangles that only share an edge do not collide.
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Whether two entities' bounding boxes overlap.
pub fn collides(a: &impl Entity, b: &impl Entity) -> bool {
    rects_overlap(&a.bounds(), &b.bounds())
}

/// Index of the first live entity in `candidates` that overlaps `target`.
/// Iteration order decides ties.
pub fn first_hit<E: Entity>(target: &Rect, candidates: &[E]) -> Option<usize> {
    candidates
        .iter()
        .position(|e| !e.is_consumed() && rects_overlap(target, &e.bounds()))
}
