//! `headsync-perception` – Head-pose math.
//!
//! Turns a raw device pose into the transforms the scene needs.  Everything
//! here is a pure function of its inputs; the per-frame state lives in
//! `headsync-runtime`.
//!
//! # Modules
//!
//! - [`euler`] – [`EulerAngles`][euler::EulerAngles] decomposition in the
//!   engine's `Y·X·Z` convention and the per-rig
//!   [`RigCalibration`][euler::RigCalibration] axis remaps.
//! - [`transform`] – [`EntityTransform`][transform::EntityTransform]: the
//!   owning entity's local transform under an optional parent.
//! - [`reconcile`] – [`reconcile`][reconcile::reconcile]: the head-pose
//!   reconciliation itself.
//! - [`gaze`] – [`GazeRay`][gaze::GazeRay] and aim-point resolution.

pub mod euler;
pub mod gaze;
pub mod reconcile;
pub mod transform;

pub use euler::{Axis, AxisRemap, AxisSource, EulerAngles, RigCalibration};
pub use gaze::{DEFAULT_GAZE_RANGE, GazeRay, GazeSettings};
pub use reconcile::{reconcile, reconcile_with};
pub use transform::{EntityTransform, FORWARD};
