//! `headsync-hal` – Host-engine service boundary.
//!
//! Everything the reconciler reads from or writes to the host engine goes
//! through one of these traits, so the core never depends on a specific
//! engine, SDK or physics backend.
//!
//! # Modules
//!
//! - [`tracker`] – [`HeadTracker`][tracker::HeadTracker]: the head-tracking
//!   device (fresh read + orientation/position accessors).
//! - [`collision`] – [`CollisionWorld`][collision::CollisionWorld]: read-only
//!   raycast queries against the physics world.
//! - [`rig`] – [`RigTransform`][rig::RigTransform] for the character's head
//!   bone and body root, [`SceneLookup`][rig::SceneLookup] and the
//!   tag-indexed [`SceneRegistry`][rig::SceneRegistry].
//! - [`sim`] – in-process simulated drivers for tests and the demo binary.

pub mod collision;
pub mod rig;
pub mod sim;
pub mod tracker;

pub use collision::CollisionWorld;
pub use rig::{DEFAULT_BODY_TAG, DEFAULT_HEAD_TAG, RigTransform, SceneLookup, SceneRegistry};
pub use tracker::HeadTracker;
