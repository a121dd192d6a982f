//! Character rig transforms and tag-based scene lookup.
//!
//! The head-sync component writes to two transforms of a separately animated
//! character: the head bone (local rotation) and the body root (world
//! rotation).  Both are reached through [`RigTransform`].  Resolving them by
//! tag is the job of a [`SceneLookup`]; [`SceneRegistry`] is the plain
//! in-memory implementation.

use std::collections::HashMap;

use glam::Quat;
use headsync_types::SyncError;
use tracing::{debug, warn};

/// Tag of the character's head bone.
pub const DEFAULT_HEAD_TAG: &str = "CharacterHead";
/// Tag of the character's body root.
pub const DEFAULT_BODY_TAG: &str = "Player";

/// A writable transform owned by the host scene graph.
///
/// Implementations are *handles*: [`handle`][Self::handle] returns another
/// handle to the same underlying transform, so a lookup can hand one out
/// without giving up its own.
pub trait RigTransform: Send {
    /// Tag the transform was registered under, e.g. `"CharacterHead"`.
    fn tag(&self) -> &str;

    /// Set the rotation relative to the parent transform.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoneFault`] if the transform can no longer be
    /// written (e.g. the object was destroyed).
    fn set_local_rotation(&mut self, rotation: Quat) -> Result<(), SyncError>;

    /// Set the world-space rotation.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoneFault`] if the transform can no longer be
    /// written.
    fn set_rotation(&mut self, rotation: Quat) -> Result<(), SyncError>;

    fn local_rotation(&self) -> Quat;

    fn rotation(&self) -> Quat;

    /// Another handle to the same transform.
    fn handle(&self) -> Box<dyn RigTransform>;
}

/// Resolve scene objects by tag.
pub trait SceneLookup {
    /// Find the transform tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ReferenceNotFound`] when no object carries the tag.
    fn find_by_tag(&self, tag: &str) -> Result<Box<dyn RigTransform>, SyncError>;
}

/// In-memory tag → transform index.
#[derive(Default)]
pub struct SceneRegistry {
    transforms: HashMap<String, Box<dyn RigTransform>>,
}

impl SceneRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under its own tag.  Any previous transform with
    /// the same tag is replaced.
    pub fn register(&mut self, transform: Box<dyn RigTransform>) {
        debug!(tag = transform.tag(), "scene transform registered");
        self.transforms.insert(transform.tag().to_string(), transform);
    }

    /// Remove the transform with `tag`, returning whether one was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        self.transforms.remove(tag).is_some()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl SceneLookup for SceneRegistry {
    fn find_by_tag(&self, tag: &str) -> Result<Box<dyn RigTransform>, SyncError> {
        match self.transforms.get(tag) {
            Some(t) => Ok(t.handle()),
            None => {
                warn!(tag, "scene lookup failed");
                Err(SyncError::ReferenceNotFound {
                    tag: tag.to_string(),
                })
            }
        }
    }
}
