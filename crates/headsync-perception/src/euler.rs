//! Euler decomposition and per-rig axis calibration.
//!
//! Angles follow the engine convention: a rotation with Euler angles
//! `(pitch, yaw, roll)` about `(X, Y, Z)` is `Ry(yaw) · Rx(pitch) · Rz(roll)`,
//! i.e. roll is applied first and yaw last.
//!
//! A character rig's head bone rarely shares the tracking device's axes, so
//! the head and body rotations are produced by remapping the device's Euler
//! components through an [`AxisRemap`].  The defaults in [`RigCalibration`]
//! lock the head's pitch, feed device roll into head yaw and negated device
//! pitch into head roll, and give the body yaw only.
//!
//! # Example
//!
//! ```rust
//! use glam::Quat;
//! use headsync_perception::euler::{EulerAngles, RigCalibration};
//!
//! let device = Quat::from_rotation_x(0.4);
//! let cal = RigCalibration::default();
//! let head = cal.head.apply(EulerAngles::from_quat(device));
//! assert_eq!(head.pitch, 0.0);
//! assert!((head.roll + 0.4).abs() < 1e-5);
//! ```

use glam::{EulerRot, Quat};
use serde::{Deserialize, Serialize};

/// Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    /// Rotation about X.
    pub pitch: f32,
    /// Rotation about Y (vertical).
    pub yaw: f32,
    /// Rotation about Z (forward).
    pub roll: f32,
}

impl EulerAngles {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Decompose a unit quaternion.
    pub fn from_quat(q: Quat) -> Self {
        let (yaw, pitch, roll) = q.to_euler(EulerRot::YXZ);
        Self { pitch, yaw, roll }
    }

    /// Recompose into a quaternion.
    pub fn to_quat(self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    pub fn get(self, axis: Axis) -> f32 {
        match axis {
            Axis::Pitch => self.pitch,
            Axis::Yaw => self.yaw,
            Axis::Roll => self.roll,
        }
    }

    /// `(pitch, yaw, roll)` in degrees, each wrapped into `[0, 360)`.
    pub fn to_degrees(self) -> [f32; 3] {
        [self.pitch, self.yaw, self.roll].map(|r| r.to_degrees().rem_euclid(360.0))
    }
}

/// One of the three Euler axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[serde(alias = "x")]
    Pitch,
    #[serde(alias = "y")]
    Yaw,
    #[serde(alias = "z")]
    Roll,
}

/// Where an output Euler component comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AxisSource {
    /// Always zero.
    Locked,
    /// Copy (optionally negated) from an input component.
    From {
        axis: Axis,
        #[serde(default)]
        negate: bool,
    },
}

impl AxisSource {
    pub const fn copy(axis: Axis) -> Self {
        AxisSource::From {
            axis,
            negate: false,
        }
    }

    pub const fn negated(axis: Axis) -> Self {
        AxisSource::From { axis, negate: true }
    }

    fn resolve(self, input: EulerAngles) -> f32 {
        match self {
            AxisSource::Locked => 0.0,
            AxisSource::From { axis, negate } => {
                let v = input.get(axis);
                if negate { -v } else { v }
            }
        }
    }
}

/// Per-output-axis mapping from input Euler components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRemap {
    pub pitch: AxisSource,
    pub yaw: AxisSource,
    pub roll: AxisSource,
}

impl AxisRemap {
    /// Pass every axis through unchanged.
    pub const IDENTITY: AxisRemap = AxisRemap {
        pitch: AxisSource::copy(Axis::Pitch),
        yaw: AxisSource::copy(Axis::Yaw),
        roll: AxisSource::copy(Axis::Roll),
    };

    /// Head bone of the stock character rig: `(0, roll, -pitch)`.
    pub const HEAD_YAW_LOCKED: AxisRemap = AxisRemap {
        pitch: AxisSource::Locked,
        yaw: AxisSource::copy(Axis::Roll),
        roll: AxisSource::negated(Axis::Pitch),
    };

    /// Body root: `(0, yaw, 0)`, so the body never tilts with head nods.
    pub const YAW_ONLY: AxisRemap = AxisRemap {
        pitch: AxisSource::Locked,
        yaw: AxisSource::copy(Axis::Yaw),
        roll: AxisSource::Locked,
    };

    pub fn apply(&self, input: EulerAngles) -> EulerAngles {
        EulerAngles {
            pitch: self.pitch.resolve(input),
            yaw: self.yaw.resolve(input),
            roll: self.roll.resolve(input),
        }
    }

    /// Remap a quaternion: decompose, remap, recompose.
    pub fn apply_quat(&self, q: Quat) -> Quat {
        self.apply(EulerAngles::from_quat(q)).to_quat()
    }
}

/// Axis remaps for one character rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigCalibration {
    #[serde(default = "default_head")]
    pub head: AxisRemap,
    #[serde(default = "default_body")]
    pub body: AxisRemap,
}

fn default_head() -> AxisRemap {
    AxisRemap::HEAD_YAW_LOCKED
}

fn default_body() -> AxisRemap {
    AxisRemap::YAW_ONLY
}

impl Default for RigCalibration {
    fn default() -> Self {
        Self {
            head: default_head(),
            body: default_body(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Orientations spread over the sphere, avoiding exact gimbal lock.
    fn orientation_grid() -> Vec<Quat> {
        let mut out = Vec::new();
        for p in (-80..=80).step_by(20) {
            for y in (-170..=170).step_by(34) {
                for r in (-170..=170).step_by(34) {
                    out.push(
                        EulerAngles::new(
                            (p as f32).to_radians(),
                            (y as f32).to_radians(),
                            (r as f32).to_radians(),
                        )
                        .to_quat(),
                    );
                }
            }
        }
        out
    }

    #[test]
    fn decompose_recompose_matches_engine_order() {
        let e = EulerAngles::new(0.3, -1.1, 0.7);
        let expected =
            Quat::from_rotation_y(-1.1) * Quat::from_rotation_x(0.3) * Quat::from_rotation_z(0.7);
        assert!(e.to_quat().abs_diff_eq(expected, 1e-6));

        let back = EulerAngles::from_quat(expected);
        assert!((back.pitch - 0.3).abs() < 1e-4);
        assert!((back.yaw + 1.1).abs() < 1e-4);
        assert!((back.roll - 0.7).abs() < 1e-4);
    }

    #[test]
    fn head_remap_swaps_and_negates() {
        let e = EulerAngles::new(0.2, 0.5, -0.9);
        let head = AxisRemap::HEAD_YAW_LOCKED.apply(e);
        assert_eq!(head, EulerAngles::new(0.0, -0.9, -0.2));
    }

    #[test]
    fn head_rotation_pitch_is_always_zero() {
        for q in orientation_grid() {
            let head = AxisRemap::HEAD_YAW_LOCKED.apply_quat(q);
            let pitch = EulerAngles::from_quat(head).pitch;
            assert!(pitch.abs() < 1e-4, "pitch {pitch} for {q:?}");
        }
    }

    #[test]
    fn body_rotation_is_yaw_only() {
        for q in orientation_grid() {
            let body = AxisRemap::YAW_ONLY.apply_quat(q);
            let e = EulerAngles::from_quat(body);
            assert!(e.pitch.abs() < 1e-4, "pitch {} for {q:?}", e.pitch);
            assert!(e.roll.abs() < 1e-4, "roll {} for {q:?}", e.roll);
            // A pure yaw keeps the up axis vertical.
            assert!((body * glam::Vec3::Y).abs_diff_eq(glam::Vec3::Y, 1e-4));
        }
    }

    #[test]
    fn body_yaw_follows_device_yaw() {
        let q = EulerAngles::new(0.4, 1.2, -0.3).to_quat();
        let body = AxisRemap::YAW_ONLY.apply_quat(q);
        assert!(body.abs_diff_eq(Quat::from_rotation_y(1.2), 1e-4));
    }

    #[test]
    fn identity_remap_is_noop() {
        let q = EulerAngles::new(0.4, 1.2, -0.3).to_quat();
        assert!(AxisRemap::IDENTITY.apply_quat(q).abs_diff_eq(q, 1e-4));
    }

    #[test]
    fn to_degrees_wraps_into_positive_range() {
        let d = EulerAngles::new(-std::f32::consts::FRAC_PI_2, 0.0, std::f32::consts::PI).to_degrees();
        assert!((d[0] - 270.0).abs() < 1e-3);
        assert_eq!(d[1], 0.0);
        assert!((d[2] - 180.0).abs() < 1e-3);
    }

    #[test]
    fn calibration_parses_from_toml() {
        let raw = r#"
            [head]
            pitch = { mode = "locked" }
            yaw = { mode = "from", axis = "z" }
            roll = { mode = "from", axis = "pitch", negate = true }
        "#;
        let cal: RigCalibration = toml::from_str(raw).unwrap();
        assert_eq!(cal.head, AxisRemap::HEAD_YAW_LOCKED);
        assert_eq!(cal.body, AxisRemap::YAW_ONLY);
    }

    #[test]
    fn calibration_roundtrips_through_toml() {
        let cal = RigCalibration {
            head: AxisRemap::IDENTITY,
            body: AxisRemap::YAW_ONLY,
        };
        let raw = toml::to_string(&cal).unwrap();
        let back: RigCalibration = toml::from_str(&raw).unwrap();
        assert_eq!(back, cal);
    }
}
