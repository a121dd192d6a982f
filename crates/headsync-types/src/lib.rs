use chrono::{DateTime, Utc};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tolerance applied when checking that a quaternion is unit length.
pub const UNIT_TOLERANCE: f32 = 1e-3;

/// Maximum number of collision layers a [`LayerMask`] can address.
pub const MAX_LAYERS: usize = 32;

/// Index of the first layer free for project use.
pub const FIRST_USER_LAYER: usize = 8;

/// A rigid pose: unit orientation plus position.
///
/// Head-tracking devices report one of these per frame; it is treated as an
/// immutable snapshot for the remainder of that frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub orientation: Quat,
    pub position: Vec3,
}

impl Pose {
    pub fn new(orientation: Quat, position: Vec3) -> Self {
        Self {
            orientation,
            position,
        }
    }

    /// The identity pose (origin, no rotation).
    pub fn identity() -> Self {
        Self::new(Quat::IDENTITY, Vec3::ZERO)
    }

    /// Compose two poses: `self` is the parent frame, `child` is expressed in
    /// it.  The result is the child expressed in `self`'s parent frame.
    pub fn compose(&self, child: &Pose) -> Pose {
        Pose::new(
            self.orientation * child.orientation,
            self.transform_point(child.position),
        )
    }

    /// Map a point expressed in this frame into the parent frame.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    /// The pose that undoes this one.
    pub fn inverse(&self) -> Pose {
        let inv = self.orientation.inverse();
        Pose::new(inv, inv * -self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Validated reconciliation settings.
///
/// The optional `target` is the reference frame that head motion is applied
/// in.  Whether a target is present is derived from the option itself, so the
/// "has target" flag can never disagree with the target pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilerConfig {
    pub track_rotation: bool,
    pub track_position: bool,
    target: Option<Pose>,
}

impl ReconcilerConfig {
    /// Build a config, validating that the target orientation (if any) is a
    /// unit quaternion.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] when the target orientation is not
    /// unit length.
    pub fn new(
        track_rotation: bool,
        track_position: bool,
        target: Option<Pose>,
    ) -> Result<Self, SyncError> {
        if let Some(t) = &target {
            if (t.orientation.length() - 1.0).abs() > UNIT_TOLERANCE {
                return Err(SyncError::InvalidConfig(format!(
                    "target orientation must be a unit quaternion (length {})",
                    t.orientation.length()
                )));
            }
        }
        Ok(Self {
            track_rotation,
            track_position,
            target,
        })
    }

    /// Track both rotation and position with no reference target.
    pub fn tracking_all() -> Self {
        Self {
            track_rotation: true,
            track_position: true,
            target: None,
        }
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&Pose> {
        self.target.as_ref()
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::tracking_all()
    }
}

/// Serialisable form of [`ReconcilerConfig`] carrying an explicit
/// `has_target` flag, as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawReconcilerConfig {
    #[serde(default = "default_true")]
    pub track_rotation: bool,
    #[serde(default = "default_true")]
    pub track_position: bool,
    #[serde(default)]
    pub has_target: bool,
    #[serde(default)]
    pub target: Option<Pose>,
}

fn default_true() -> bool {
    true
}

impl TryFrom<RawReconcilerConfig> for ReconcilerConfig {
    type Error = SyncError;

    fn try_from(raw: RawReconcilerConfig) -> Result<Self, Self::Error> {
        if raw.has_target != raw.target.is_some() {
            return Err(SyncError::InvalidConfig(format!(
                "has_target = {} but target pose is {}",
                raw.has_target,
                if raw.target.is_some() { "present" } else { "absent" }
            )));
        }
        ReconcilerConfig::new(raw.track_rotation, raw.track_position, raw.target)
    }
}

impl From<ReconcilerConfig> for RawReconcilerConfig {
    fn from(cfg: ReconcilerConfig) -> Self {
        Self {
            track_rotation: cfg.track_rotation,
            track_position: cfg.track_position,
            has_target: cfg.has_target(),
            target: cfg.target,
        }
    }
}

/// Which space the rotation/position of a [`ReconcileOutput`] are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformSpace {
    /// Relative to the owning entity's parent (no target frame).
    Local,
    /// World space, because a target reference frame was applied.
    World,
}

/// Result of one reconciliation.
///
/// Every component is optional: `None` means the caller keeps whatever value
/// it had before (e.g. rotation tracking is disabled).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutput {
    pub space: TransformSpace,
    pub rotation: Option<Quat>,
    pub position: Option<Vec3>,
    /// Yaw-locked rotation for the character's head bone (local space).
    pub head_local_rotation: Option<Quat>,
    /// Yaw-only rotation for the character's body root (world space).
    pub body_rotation: Option<Quat>,
}

impl ReconcileOutput {
    /// An output that changes nothing.
    pub fn unchanged(space: TransformSpace) -> Self {
        Self {
            space,
            rotation: None,
            position: None,
            head_local_rotation: None,
            body_rotation: None,
        }
    }
}

/// Bit mask of collision layers a raycast should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Mask selecting exactly one layer.  Layers outside `0..32` yield
    /// [`LayerMask::NONE`].
    pub fn layer(index: u8) -> Self {
        if (index as usize) < MAX_LAYERS {
            LayerMask(1 << index)
        } else {
            LayerMask::NONE
        }
    }

    pub fn contains(self, index: u8) -> bool {
        (index as usize) < MAX_LAYERS && self.0 & (1 << index) != 0
    }

    pub fn union(self, other: Self) -> Self {
        LayerMask(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Named collision layers, indexed by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerTable {
    names: Vec<String>,
}

impl LayerTable {
    /// Build a table from layer names.  Names beyond the 32nd are ignored.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().take(MAX_LAYERS).map(Into::into).collect(),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.names.iter().position(|n| n == name).map(|i| i as u8)
    }

    /// Combine the named layers into a mask.  Unknown names contribute
    /// nothing.
    pub fn mask<S: AsRef<str>>(&self, names: &[S]) -> LayerMask {
        names
            .iter()
            .filter_map(|n| self.index_of(n.as_ref()))
            .fold(LayerMask::NONE, |m, i| m.union(LayerMask::layer(i)))
    }

    /// Append project layers after the eight built-in slots, the way engines
    /// number user layers from 8.
    pub fn with_user_layers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.resize(FIRST_USER_LAYER.max(self.names.len()), String::new());
        self.names.extend(names.into_iter().map(Into::into));
        self.names.truncate(MAX_LAYERS);
        self
    }
}

impl Default for LayerTable {
    fn default() -> Self {
        Self::new([
            "Default",
            "TransparentFX",
            "Ignore Raycast",
            "",
            "Water",
            "UI",
        ])
    }
}

/// A single collision reported by a raycast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaycastHit {
    pub point: Vec3,
    pub distance: f32,
    /// Identifier of the collider that was hit.
    pub collider: String,
}

/// Where the viewer is aiming this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimResult {
    pub hit: bool,
    pub point: Vec3,
    pub distance: f32,
    pub collider: Option<String>,
}

/// Gameplay events raised by an exploding barrel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BarrelEvent {
    /// Replace the barrel mesh with the variant at this index.
    SwapMesh(usize),
    /// Nudge the barrel toward its tilted resting rotation.
    Tilt,
    /// Tilt and reveal the leaking-slime decal.
    TiltAndLeak,
    /// Spawn the explosion effect and start the damage delay.
    Detonate,
    /// Apply blast damage and impulses to everything in range.
    ApplyBlast,
    /// Remove the explosion effect.
    EffectExpired,
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"headsync-runtime::head"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// A freshly reconciled head pose.
    FrameReport { frame: u64, output: ReconcileOutput },
    /// The gaze ray result for a frame.
    Aim { frame: u64, aim: AimResult },
    /// Head/body sync became unavailable; camera-only tracking continues.
    RigSyncLost { reason: String },
    /// Head/body sync was re-established.
    RigSyncRestored,
    Barrel { barrel_id: String, event: BarrelEvent },
}

/// Global error type for head tracking, rig sync and configuration.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncError {
    #[error("Reference Not Found: no scene object tagged '{tag}'")]
    ReferenceNotFound { tag: String },

    #[error("Invalid Config: {0}")]
    InvalidConfig(String),

    #[error("Bone Fault on {bone}: {details}")]
    BoneFault { bone: String, details: String },

    #[error("Event Bus Channel Error: {0}")]
    Channel(String),

    #[error("Config Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_applies_parent_rotation_to_child_offset() {
        // Parent at origin yawed 90° about +Y; child 1 m along parent +Z.
        let parent = Pose::new(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), Vec3::ZERO);
        let child = Pose::new(Quat::IDENTITY, Vec3::Z);
        let world = parent.compose(&child);
        assert!(world.position.abs_diff_eq(Vec3::X, 1e-5), "{:?}", world.position);
    }

    #[test]
    fn compose_with_inverse_is_identity() {
        let p = Pose::new(Quat::from_rotation_x(0.7), Vec3::new(1.0, -2.0, 3.0));
        let id = p.compose(&p.inverse());
        assert!(id.position.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(id.orientation.abs_diff_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn raw_config_with_consistent_target_converts() {
        let raw = RawReconcilerConfig {
            track_rotation: true,
            track_position: false,
            has_target: true,
            target: Some(Pose::new(Quat::from_rotation_y(0.5), Vec3::X)),
        };
        let cfg = ReconcilerConfig::try_from(raw).unwrap();
        assert!(cfg.has_target());
        assert!(!cfg.track_position);
    }

    #[test]
    fn raw_config_flag_without_target_is_rejected() {
        let raw = RawReconcilerConfig {
            track_rotation: true,
            track_position: true,
            has_target: true,
            target: None,
        };
        let err = ReconcilerConfig::try_from(raw).unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }

    #[test]
    fn raw_config_target_without_flag_is_rejected() {
        let raw = RawReconcilerConfig {
            track_rotation: true,
            track_position: true,
            has_target: false,
            target: Some(Pose::identity()),
        };
        assert!(ReconcilerConfig::try_from(raw).is_err());
    }

    #[test]
    fn non_unit_target_orientation_is_rejected() {
        let target = Pose::new(Quat::from_xyzw(0.0, 0.0, 0.0, 2.0), Vec3::ZERO);
        let err = ReconcilerConfig::new(true, true, Some(target)).unwrap_err();
        assert!(err.to_string().contains("unit quaternion"));
    }

    #[test]
    fn raw_config_defaults_track_everything() {
        let raw: RawReconcilerConfig = serde_json::from_str("{}").unwrap();
        let cfg = ReconcilerConfig::try_from(raw).unwrap();
        assert_eq!(cfg, ReconcilerConfig::tracking_all());
    }

    #[test]
    fn layer_table_builds_mask_from_names() {
        let table = LayerTable::new(["Default", "Enemy", "Props"]);
        let mask = table.mask(&["Enemy", "Props", "Missing"]);
        assert!(!mask.contains(0));
        assert!(mask.contains(1));
        assert!(mask.contains(2));
        assert_eq!(mask, LayerMask(0b110));
    }

    #[test]
    fn user_layers_start_at_eight() {
        let table = LayerTable::default().with_user_layers(["Ground", "Props"]);
        assert_eq!(table.index_of("Default"), Some(0));
        assert_eq!(table.index_of("Ground"), Some(8));
        assert_eq!(table.index_of("Props"), Some(9));
        assert_eq!(table.mask(&["Default", "Props"]), LayerMask(0b10_0000_0001));
    }

    #[test]
    fn layer_out_of_range_is_empty() {
        assert_eq!(LayerMask::layer(40), LayerMask::NONE);
        assert!(!LayerMask::ALL.contains(40));
    }

    #[test]
    fn event_roundtrip() {
        let event = Event::new(
            "headsync-runtime::head",
            EventPayload::Aim {
                frame: 7,
                aim: AimResult {
                    hit: false,
                    point: Vec3::new(0.0, 0.0, 100.0),
                    distance: 100.0,
                    collider: None,
                },
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert_eq!(event.source, back.source);
    }

    #[test]
    fn sync_error_display() {
        let err = SyncError::ReferenceNotFound {
            tag: "CharacterHead".to_string(),
        };
        assert!(err.to_string().contains("CharacterHead"));

        let err2 = SyncError::BoneFault {
            bone: "head".to_string(),
            details: "detached".to_string(),
        };
        assert!(err2.to_string().contains("Bone Fault on head"));
    }
}
