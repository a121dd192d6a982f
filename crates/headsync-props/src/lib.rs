//! `headsync-props` – Gameplay objects that react to the viewer.
//!
//! # Modules
//!
//! - [`barrel`] – [`Barrel`][barrel::Barrel]: an exploding barrel that dents,
//!   tilts and leaks as it is shot, then detonates and applies a falloff
//!   blast to nearby rigid bodies.
//! - [`locomotion`] – [`Locomotion`][locomotion::Locomotion]: the character
//!   controller's velocity, jump, extra-gravity and collider-curve model, plus
//!   the follow-camera offset.

pub mod barrel;
pub mod locomotion;

pub use barrel::{Barrel, BarrelConfig, BarrelStage, BlastCandidate, BlastEffect, BlastImpact};
pub use locomotion::{
    AnimState, AnimatorSample, CapsuleCollider, FollowCamera, Locomotion, LocomotionConfig, LocomotionInput,
    LocomotionStep,
};
