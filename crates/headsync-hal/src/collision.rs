//! Generic `CollisionWorld` trait for read-only physics queries.

use glam::Vec3;
use headsync_types::{LayerMask, RaycastHit};

/// Read-only access to the host physics world.
///
/// Implementations must not mutate simulation state from a query.
pub trait CollisionWorld: Send {
    /// Cast a ray from `origin` along `direction` (need not be normalised)
    /// and return the closest collider on a layer in `mask` within
    /// `max_distance`, or `None`.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RaycastHit>;
}
