//! Head-pose reconciliation.
//!
//! Given one device [`Pose`] and the current [`ReconcilerConfig`], produce
//! the camera transform and the character rig's head and body rotations.
//!
//! Without a target frame the camera follows the device orientation
//! directly, and the same orientation is split into a yaw-locked head
//! rotation and a yaw-only body rotation through the rig's
//! [`RigCalibration`].  With a target the device motion is applied in the
//! target's frame and no rig rotations are produced.
//!
//! # Example
//!
//! ```rust
//! use glam::{Quat, Vec3};
//! use headsync_perception::reconcile;
//! use headsync_types::{Pose, ReconcilerConfig};
//!
//! let target = Pose::new(Quat::IDENTITY, Vec3::X);
//! let cfg = ReconcilerConfig::new(true, true, Some(target)).unwrap();
//! let out = reconcile(&Pose::new(Quat::IDENTITY, Vec3::Y), &cfg);
//! assert_eq!(out.position, Some(Vec3::new(1.0, 1.0, 0.0)));
//! ```

use headsync_types::{Pose, ReconcileOutput, ReconcilerConfig, TransformSpace};

use crate::euler::{EulerAngles, RigCalibration};

/// Reconcile with the stock rig calibration.
pub fn reconcile(pose: &Pose, config: &ReconcilerConfig) -> ReconcileOutput {
    reconcile_with(pose, config, &RigCalibration::default())
}

/// Reconcile with an explicit rig calibration.
pub fn reconcile_with(
    pose: &Pose,
    config: &ReconcilerConfig,
    calibration: &RigCalibration,
) -> ReconcileOutput {
    let space = if config.has_target() {
        TransformSpace::World
    } else {
        TransformSpace::Local
    };
    let mut out = ReconcileOutput::unchanged(space);

    if config.track_rotation {
        match config.target() {
            None => {
                out.rotation = Some(pose.orientation);
                let euler = EulerAngles::from_quat(pose.orientation);
                out.head_local_rotation = Some(calibration.head.apply(euler).to_quat());
                out.body_rotation = Some(calibration.body.apply(euler).to_quat());
            }
            Some(target) => {
                out.rotation = Some(target.orientation * pose.orientation);
            }
        }
    }

    if config.track_position {
        out.position = Some(match config.target() {
            None => pose.position,
            Some(target) => target.transform_point(pose.position),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn sample_orientations() -> Vec<Quat> {
        vec![
            Quat::IDENTITY,
            Quat::from_rotation_x(0.6),
            Quat::from_rotation_y(-2.0),
            Quat::from_rotation_z(1.3),
            EulerAngles::new(0.4, 2.5, -1.0).to_quat(),
            EulerAngles::new(-1.2, -0.3, 3.0).to_quat(),
            Quat::from_xyzw(0.1, 0.2, 0.3, 0.9).normalize(),
        ]
    }

    #[test]
    fn no_target_rotation_is_device_orientation_exactly() {
        let cfg = ReconcilerConfig::tracking_all();
        for q in sample_orientations() {
            let out = reconcile(&Pose::new(q, Vec3::ZERO), &cfg);
            assert_eq!(out.rotation, Some(q));
            assert_eq!(out.space, TransformSpace::Local);
        }
    }

    #[test]
    fn head_output_has_zero_pitch() {
        let cfg = ReconcilerConfig::tracking_all();
        for q in sample_orientations() {
            let out = reconcile(&Pose::new(q, Vec3::ZERO), &cfg);
            let head = EulerAngles::from_quat(out.head_local_rotation.unwrap());
            assert!(head.pitch.abs() < 1e-4, "pitch {} for {q:?}", head.pitch);
        }
    }

    #[test]
    fn body_output_has_zero_pitch_and_roll() {
        let cfg = ReconcilerConfig::tracking_all();
        for q in sample_orientations() {
            let out = reconcile(&Pose::new(q, Vec3::ZERO), &cfg);
            let body = EulerAngles::from_quat(out.body_rotation.unwrap());
            assert!(body.pitch.abs() < 1e-4);
            assert!(body.roll.abs() < 1e-4);
        }
    }

    #[test]
    fn head_output_matches_remapped_device_angles() {
        let cfg = ReconcilerConfig::tracking_all();
        let device = EulerAngles::new(0.3, 1.0, -0.5);
        let out = reconcile(&Pose::new(device.to_quat(), Vec3::ZERO), &cfg);
        let expected = EulerAngles::new(0.0, -0.5, -0.3).to_quat();
        assert!(out.head_local_rotation.unwrap().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn target_composes_orientation() {
        let target = Pose::new(Quat::from_rotation_y(0.8), Vec3::new(3.0, 0.0, 0.0));
        let cfg = ReconcilerConfig::new(true, true, Some(target)).unwrap();
        let device = Quat::from_rotation_x(-0.4);
        let out = reconcile(&Pose::new(device, Vec3::ZERO), &cfg);
        assert_eq!(out.space, TransformSpace::World);
        assert!(out.rotation.unwrap().abs_diff_eq(target.orientation * device, 1e-6));
        assert!(out.head_local_rotation.is_none());
        assert!(out.body_rotation.is_none());
    }

    #[test]
    fn target_offsets_position() {
        let target = Pose::new(Quat::IDENTITY, Vec3::new(1.0, 0.0, 0.0));
        let cfg = ReconcilerConfig::new(true, true, Some(target)).unwrap();
        let out = reconcile(&Pose::new(Quat::IDENTITY, Vec3::new(0.0, 1.0, 0.0)), &cfg);
        assert!(out.position.unwrap().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn target_rotates_device_position() {
        let target = Pose::new(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let cfg = ReconcilerConfig::new(false, true, Some(target)).unwrap();
        let out = reconcile(&Pose::new(Quat::IDENTITY, Vec3::Z), &cfg);
        assert!(out.position.unwrap().abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert!(out.rotation.is_none());
    }

    #[test]
    fn no_target_position_is_device_position() {
        let cfg = ReconcilerConfig::tracking_all();
        let out = reconcile(&Pose::new(Quat::IDENTITY, Vec3::new(0.1, 0.2, 0.3)), &cfg);
        assert_eq!(out.position, Some(Vec3::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn disabled_tracking_leaves_everything_unset() {
        let cfg = ReconcilerConfig::new(false, false, None).unwrap();
        let out = reconcile(&Pose::new(Quat::from_rotation_y(1.0), Vec3::ONE), &cfg);
        assert_eq!(out, ReconcileOutput::unchanged(TransformSpace::Local));
    }

    #[test]
    fn custom_calibration_is_honoured() {
        let cfg = ReconcilerConfig::tracking_all();
        let cal = RigCalibration {
            head: crate::euler::AxisRemap::IDENTITY,
            body: crate::euler::AxisRemap::YAW_ONLY,
        };
        let q = EulerAngles::new(0.2, 0.4, 0.6).to_quat();
        let out = reconcile_with(&Pose::new(q, Vec3::ZERO), &cfg, &cal);
        assert!(out.head_local_rotation.unwrap().abs_diff_eq(q, 1e-4));
    }
}
