//! In-process simulation drivers for headless testing without a host engine.
//!
//! [`SimHeadTracker`] replays a scripted sequence of poses and counts device
//! reads.  [`SimCollisionWorld`] answers raycasts against simple analytic
//! shapes ([`SharedCollisionWorld`] wraps one for shared editing).
//! [`SimScene`] builds a [`SceneRegistry`] populated with [`SimRigBone`]s.
//!
//! # Example
//!
//! ```rust
//! use headsync_hal::sim::{SimHeadTracker, SimScene};
//! use headsync_hal::{HeadTracker, SceneLookup};
//! use headsync_types::Pose;
//!
//! let mut tracker = SimHeadTracker::fixed(Pose::identity());
//! let reads = tracker.read_counter();
//! tracker.update_state();
//! assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);
//!
//! let scene = SimScene::new().with_character_rig().build();
//! assert!(scene.find_by_tag("CharacterHead").is_ok());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use glam::{EulerRot, Quat, Vec3};
use headsync_types::{LayerMask, Pose, RaycastHit, SyncError};

use crate::collision::CollisionWorld;
use crate::rig::{DEFAULT_BODY_TAG, DEFAULT_HEAD_TAG, RigTransform, SceneRegistry};
use crate::tracker::HeadTracker;

// ────────────────────────────────────────────────────────────────────────────
// Head tracker
// ────────────────────────────────────────────────────────────────────────────

/// A simulated head tracker that replays a pose script, one entry per
/// [`update_state`][HeadTracker::update_state] call, wrapping at the end.
pub struct SimHeadTracker {
    id: String,
    script: Vec<Pose>,
    cursor: usize,
    current: Pose,
    reads: Arc<AtomicUsize>,
}

impl SimHeadTracker {
    /// Replay `script` in order.  An empty script behaves like
    /// [`fixed`][Self::fixed] at the identity pose.
    pub fn scripted(script: Vec<Pose>) -> Self {
        Self {
            id: "sim_tracker".to_string(),
            script,
            cursor: 0,
            current: Pose::identity(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always report `pose`.
    pub fn fixed(pose: Pose) -> Self {
        Self::scripted(vec![pose])
    }

    /// A head slowly looking around: yaw and pitch follow sine waves with the
    /// given amplitudes (degrees) over `frames` samples, head at `height`.
    pub fn sweeping(frames: usize, yaw_deg: f32, pitch_deg: f32, height: f32) -> Self {
        let n = frames.max(1);
        let script = (0..n)
            .map(|i| {
                let phase = i as f32 / n as f32 * std::f32::consts::TAU;
                let yaw = (yaw_deg * phase.sin()).to_radians();
                let pitch = (pitch_deg * (2.0 * phase).sin()).to_radians();
                Pose::new(
                    Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0),
                    Vec3::new(0.0, height, 0.0),
                )
            })
            .collect();
        Self::scripted(script)
    }

    /// Override the tracker id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Shared counter of [`update_state`][HeadTracker::update_state] calls.
    /// Stays valid after the tracker is boxed and moved.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl HeadTracker for SimHeadTracker {
    fn id(&self) -> &str {
        &self.id
    }

    fn update_state(&mut self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(pose) = self.script.get(self.cursor % self.script.len().max(1)) {
            self.current = *pose;
        }
        self.cursor += 1;
    }

    fn orientation(&self) -> Quat {
        self.current.orientation
    }

    fn position(&self) -> Vec3 {
        self.current.position
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Collision world
// ────────────────────────────────────────────────────────────────────────────

/// Analytic collider shapes understood by [`SimCollisionWorld`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimShape {
    Sphere { center: Vec3, radius: f32 },
    /// Infinite plane through `point` with the given `normal`.
    Plane { point: Vec3, normal: Vec3 },
}

/// A collider on a single layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SimCollider {
    pub id: String,
    pub layer: u8,
    pub shape: SimShape,
}

impl SimCollider {
    /// Distance along the normalised ray `dir` to the first intersection, if
    /// any, in front of `origin`.
    fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match self.shape {
            SimShape::Sphere { center, radius } => {
                let oc = origin - center;
                let b = oc.dot(dir);
                let c = oc.length_squared() - radius * radius;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let sqrt = disc.sqrt();
                let near = -b - sqrt;
                let far = -b + sqrt;
                if near >= 0.0 {
                    Some(near)
                } else if far >= 0.0 {
                    // Origin inside the sphere.
                    Some(0.0)
                } else {
                    None
                }
            }
            SimShape::Plane { point, normal } => {
                let denom = normal.dot(dir);
                if denom.abs() < 1e-6 {
                    return None;
                }
                let t = normal.dot(point - origin) / denom;
                (t >= 0.0).then_some(t)
            }
        }
    }
}

/// A simulated physics world holding a flat list of analytic colliders.
#[derive(Debug, Default)]
pub struct SimCollisionWorld {
    colliders: Vec<SimCollider>,
}

impl SimCollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sphere collider.
    pub fn with_sphere(mut self, id: impl Into<String>, layer: u8, center: Vec3, radius: f32) -> Self {
        self.colliders.push(SimCollider {
            id: id.into(),
            layer,
            shape: SimShape::Sphere { center, radius },
        });
        self
    }

    /// Add a plane collider.
    pub fn with_plane(mut self, id: impl Into<String>, layer: u8, point: Vec3, normal: Vec3) -> Self {
        self.colliders.push(SimCollider {
            id: id.into(),
            layer,
            shape: SimShape::Plane {
                point,
                normal: normal.normalize_or_zero(),
            },
        });
        self
    }

    /// Remove a collider by id, returning whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.colliders.len();
        self.colliders.retain(|c| c.id != id);
        self.colliders.len() != before
    }

    pub fn colliders(&self) -> &[SimCollider] {
        &self.colliders
    }
}

impl CollisionWorld for SimCollisionWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RaycastHit> {
        let dir = direction.try_normalize()?;
        self.colliders
            .iter()
            .filter(|c| mask.contains(c.layer))
            .filter_map(|c| c.intersect(origin, dir).map(|t| (t, c)))
            .filter(|(t, _)| *t <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, c)| RaycastHit {
                point: origin + dir * t,
                distance: t,
                collider: c.id.clone(),
            })
    }
}

/// A [`SimCollisionWorld`] that several owners can query and edit, e.g. a
/// prop removing its collider while the reconciler holds the world.
#[derive(Debug, Clone, Default)]
pub struct SharedCollisionWorld {
    inner: Arc<Mutex<SimCollisionWorld>>,
}

impl SharedCollisionWorld {
    pub fn new(world: SimCollisionWorld) -> Self {
        Self {
            inner: Arc::new(Mutex::new(world)),
        }
    }

    /// Run `edit` with exclusive access to the world.
    pub fn with_world<R>(&self, edit: impl FnOnce(&mut SimCollisionWorld) -> R) -> R {
        let mut world = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        edit(&mut world)
    }
}

impl CollisionWorld for SharedCollisionWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RaycastHit> {
        self.with_world(|w| w.raycast(origin, direction, max_distance, mask))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rig bone
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct BoneState {
    local_rotation: Quat,
    rotation: Quat,
    writes: usize,
    destroyed: bool,
}

/// A simulated rig transform.  Clones share state, so a test can keep a
/// handle while another is owned by the component under test.
#[derive(Debug, Clone)]
pub struct SimRigBone {
    tag: String,
    state: Arc<Mutex<BoneState>>,
}

impl SimRigBone {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            state: Arc::new(Mutex::new(BoneState {
                local_rotation: Quat::IDENTITY,
                rotation: Quat::IDENTITY,
                writes: 0,
                destroyed: false,
            })),
        }
    }

    /// Simulate the scene object being destroyed: subsequent writes fail.
    pub fn destroy(&self) {
        self.lock().destroyed = true;
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, BoneState> {
        // A poisoned lock only means a test panicked mid-write; the rotation
        // data itself is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, apply: impl FnOnce(&mut BoneState)) -> Result<(), SyncError> {
        let mut state = self.lock();
        if state.destroyed {
            return Err(SyncError::BoneFault {
                bone: self.tag.clone(),
                details: "transform has been destroyed".to_string(),
            });
        }
        apply(&mut state);
        state.writes += 1;
        Ok(())
    }
}

impl RigTransform for SimRigBone {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn set_local_rotation(&mut self, rotation: Quat) -> Result<(), SyncError> {
        self.write(|s| s.local_rotation = rotation)
    }

    fn set_rotation(&mut self, rotation: Quat) -> Result<(), SyncError> {
        self.write(|s| s.rotation = rotation)
    }

    fn local_rotation(&self) -> Quat {
        self.lock().local_rotation
    }

    fn rotation(&self) -> Quat {
        self.lock().rotation
    }

    fn handle(&self) -> Box<dyn RigTransform> {
        Box::new(self.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimScene builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for a [`SceneRegistry`] pre-populated with [`SimRigBone`]s.
#[derive(Default)]
pub struct SimScene {
    bones: Vec<SimRigBone>,
}

impl SimScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a head bone (`"CharacterHead"`) and body root (`"Player"`).
    pub fn with_character_rig(self) -> Self {
        self.with_bone(SimRigBone::new(DEFAULT_HEAD_TAG))
            .with_bone(SimRigBone::new(DEFAULT_BODY_TAG))
    }

    /// Register a custom bone.  Keep a clone to assert on it later.
    pub fn with_bone(mut self, bone: SimRigBone) -> Self {
        self.bones.push(bone);
        self
    }

    /// Consume the builder and return the populated registry.
    pub fn build(self) -> SceneRegistry {
        let mut registry = SceneRegistry::new();
        for bone in self.bones {
            registry.register(Box::new(bone));
        }
        registry
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
