//! `headsync-runtime` – the frame-driven head tracking component.
//!
//! # Modules
//!
//! - [`frame`] – [`FrameLatch`][frame::FrameLatch] (at most one computation
//!   per frame id), the [`FrameListener`][frame::FrameListener] lifecycle
//!   trait and the two-phase [`FrameDriver`][frame::FrameDriver].
//! - [`head`] – [`HeadPoseReconciler`][head::HeadPoseReconciler]: polls the
//!   head tracker, applies the reconciled pose to its own transform, drives
//!   the character rig's head bone and body root, and resolves the gaze aim
//!   point.  Falls back to camera-only tracking when the rig is unavailable.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP export
//!   (`OTEL_EXPORTER_OTLP_ENDPOINT`).

pub mod frame;
pub mod head;
pub mod telemetry;

pub use frame::{FrameDriver, FrameLatch, FrameListener};
pub use head::{CharacterRig, DEFAULT_BODY_TAG, DEFAULT_HEAD_TAG, HeadPoseReconciler};
pub use telemetry::{TracerProviderGuard, init_tracing};
