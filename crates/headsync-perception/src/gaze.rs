//! Gaze ray and aim-point resolution.
//!
//! The gaze ray starts at the entity's world position and points along its
//! world forward axis.  The aim point is where that ray first hits a
//! collider on the configured layers, or a point `range` metres out when
//! nothing is hit.

use glam::Vec3;
use headsync_types::{AimResult, LayerMask, RaycastHit, SyncError};
use serde::{Deserialize, Serialize};

use crate::transform::EntityTransform;

/// Default gaze range in metres.
pub const DEFAULT_GAZE_RANGE: f32 = 100.0;

/// Raycast parameters for the gaze query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSettings {
    pub range: f32,
    pub mask: LayerMask,
}

impl GazeSettings {
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when `range` is not a positive,
    /// finite number.
    pub fn new(range: f32, mask: LayerMask) -> Result<Self, SyncError> {
        if !range.is_finite() || range <= 0.0 {
            return Err(SyncError::InvalidConfig(format!(
                "gaze range must be positive and finite, got {range}"
            )));
        }
        Ok(Self { range, mask })
    }
}

impl Default for GazeSettings {
    fn default() -> Self {
        Self {
            range: DEFAULT_GAZE_RANGE,
            mask: LayerMask::ALL,
        }
    }
}

/// A world-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeRay {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl GazeRay {
    /// Build a ray, normalising `direction`.  A zero direction falls back to
    /// world forward.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(crate::transform::FORWARD),
        }
    }

    /// The ray the given entity is looking along.
    pub fn from_transform(transform: &EntityTransform) -> Self {
        Self::new(transform.position(), transform.forward())
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Turn a raycast answer into an aim result.  A miss aims at
    /// `origin + direction * range`.
    pub fn resolve(&self, hit: Option<RaycastHit>, range: f32) -> AimResult {
        match hit {
            Some(h) => AimResult {
                hit: true,
                point: h.point,
                distance: h.distance,
                collider: Some(h.collider),
            },
            None => AimResult {
                hit: false,
                point: self.point_at(range),
                distance: range,
                collider: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn miss_aims_at_full_range() {
        let ray = GazeRay::new(Vec3::new(0.0, 1.6, 0.0), Vec3::Z);
        let aim = ray.resolve(None, DEFAULT_GAZE_RANGE);
        assert!(!aim.hit);
        assert_eq!(aim.point, Vec3::new(0.0, 1.6, 100.0));
        assert_eq!(aim.collider, None);
    }

    #[test]
    fn hit_reports_collider_point() {
        let ray = GazeRay::new(Vec3::ZERO, Vec3::Z);
        let aim = ray.resolve(
            Some(RaycastHit {
                point: Vec3::new(0.0, 0.0, 4.0),
                distance: 4.0,
                collider: "barrel".to_string(),
            }),
            DEFAULT_GAZE_RANGE,
        );
        assert!(aim.hit);
        assert_eq!(aim.point, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(aim.collider.as_deref(), Some("barrel"));
    }

    #[test]
    fn ray_follows_entity_forward() {
        let mut t = EntityTransform::new();
        t.set_local_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        t.set_local_position(Vec3::new(0.0, 2.0, 0.0));
        let ray = GazeRay::from_transform(&t);
        assert!(ray.direction.abs_diff_eq(Vec3::X, 1e-5));
        assert!(ray.point_at(10.0).abs_diff_eq(Vec3::new(10.0, 2.0, 0.0), 1e-4));
    }

    #[test]
    fn zero_direction_falls_back_to_forward() {
        let ray = GazeRay::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(ray.direction, Vec3::Z);
    }

    #[test]
    fn settings_reject_bad_range() {
        assert!(GazeSettings::new(0.0, LayerMask::ALL).is_err());
        assert!(GazeSettings::new(f32::NAN, LayerMask::ALL).is_err());
        assert!(GazeSettings::new(f32::INFINITY, LayerMask::ALL).is_err());
        assert_eq!(GazeSettings::new(25.0, LayerMask::NONE).unwrap().range, 25.0);
    }
}
