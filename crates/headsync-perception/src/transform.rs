//! The owning entity's transform.
//!
//! The camera (or the camera's parent) is a scene node with a local rotation
//! and position under an optional parent pose.  Reconciliation results are
//! written here in local space when no target frame is used, or in world
//! space (converted back to local through the parent) when one is.

use glam::{Quat, Vec3};
use headsync_types::{Pose, ReconcileOutput, TransformSpace};

/// Local forward axis of every entity.
pub const FORWARD: Vec3 = Vec3::Z;

/// Local transform of a scene node under a fixed parent pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityTransform {
    parent: Pose,
    local: Pose,
}

impl EntityTransform {
    /// A root-level entity at the origin.
    pub fn new() -> Self {
        Self::with_parent(Pose::identity())
    }

    /// An entity at the parent's origin.
    pub fn with_parent(parent: Pose) -> Self {
        Self {
            parent,
            local: Pose::identity(),
        }
    }

    pub fn parent(&self) -> &Pose {
        &self.parent
    }

    pub fn set_parent(&mut self, parent: Pose) {
        self.parent = parent;
    }

    pub fn local_rotation(&self) -> Quat {
        self.local.orientation
    }

    pub fn local_position(&self) -> Vec3 {
        self.local.position
    }

    pub fn set_local_rotation(&mut self, rotation: Quat) {
        self.local.orientation = rotation;
    }

    pub fn set_local_position(&mut self, position: Vec3) {
        self.local.position = position;
    }

    /// World pose (parent composed with local).
    pub fn world(&self) -> Pose {
        self.parent.compose(&self.local)
    }

    pub fn rotation(&self) -> Quat {
        self.world().orientation
    }

    pub fn position(&self) -> Vec3 {
        self.world().position
    }

    /// Set the world rotation, keeping the parent fixed.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.local.orientation = self.parent.orientation.inverse() * rotation;
    }

    /// Set the world position, keeping the parent fixed.
    pub fn set_position(&mut self, position: Vec3) {
        self.local.position = self.parent.inverse().transform_point(position);
    }

    /// World-space forward vector.
    pub fn forward(&self) -> Vec3 {
        self.rotation() * FORWARD
    }

    /// Write a reconciliation result.  Absent components are left as they
    /// are.
    pub fn apply(&mut self, output: &ReconcileOutput) {
        match output.space {
            TransformSpace::Local => {
                if let Some(r) = output.rotation {
                    self.set_local_rotation(r);
                }
                if let Some(p) = output.position {
                    self.set_local_position(p);
                }
            }
            TransformSpace::World => {
                if let Some(r) = output.rotation {
                    self.set_rotation(r);
                }
                if let Some(p) = output.position {
                    self.set_position(p);
                }
            }
        }
    }
}

impl Default for EntityTransform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn root_entity_world_equals_local() {
        let mut t = EntityTransform::new();
        t.set_local_position(Vec3::new(1.0, 2.0, 3.0));
        t.set_local_rotation(Quat::from_rotation_y(0.5));
        assert_eq!(t.position(), Vec3::new(1.0, 2.0, 3.0));
        assert!(t.rotation().abs_diff_eq(Quat::from_rotation_y(0.5), 1e-6));
    }

    #[test]
    fn parent_offsets_world_pose() {
        let parent = Pose::new(Quat::from_rotation_y(FRAC_PI_2), Vec3::new(0.0, 1.5, 0.0));
        let mut t = EntityTransform::with_parent(parent);
        t.set_local_position(Vec3::Z);
        assert!(t.position().abs_diff_eq(Vec3::new(1.0, 1.5, 0.0), 1e-5));
        assert!(t.forward().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn world_setters_roundtrip_through_parent() {
        let parent = Pose::new(Quat::from_rotation_x(0.3), Vec3::new(2.0, 0.0, -1.0));
        let mut t = EntityTransform::with_parent(parent);
        let q = Quat::from_rotation_z(1.0);
        let p = Vec3::new(5.0, 5.0, 5.0);
        t.set_rotation(q);
        t.set_position(p);
        assert!(t.rotation().abs_diff_eq(q, 1e-5));
        assert!(t.position().abs_diff_eq(p, 1e-4));
    }

    #[test]
    fn apply_leaves_absent_components() {
        let mut t = EntityTransform::new();
        t.set_local_position(Vec3::X);
        let out = ReconcileOutput {
            rotation: Some(Quat::from_rotation_y(0.2)),
            ..ReconcileOutput::unchanged(TransformSpace::Local)
        };
        t.apply(&out);
        assert_eq!(t.local_position(), Vec3::X);
        assert_eq!(t.local_rotation(), Quat::from_rotation_y(0.2));
    }
}
