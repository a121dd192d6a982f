//! [`HeadPoseReconciler`] – per-frame head tracking for a camera entity and
//! the character rig it drives.
//!
//! Each frame the reconciler:
//!
//! 1. polls the [`HeadTracker`] once (guarded by a [`FrameLatch`]),
//! 2. runs [`reconcile_with`] and writes the result to its own
//!    [`EntityTransform`],
//! 3. if a [`CharacterRig`] is attached, rotates the head bone (local) and
//!    the body root (world),
//! 4. in the late phase, casts the gaze ray into the [`CollisionWorld`] and
//!    stores the [`AimResult`].
//!
//! # Degraded mode
//!
//! Without a rig the reconciler keeps tracking its own transform and simply
//! skips head/body sync.  A rig is lost when [`resync`][HeadPoseReconciler::resync]
//! cannot resolve both tags or when a bone rejects a write; either way a
//! `warn!` is logged and a `RigSyncLost` alert is published.  Nothing retries
//! on its own: the host decides when to call `resync` again.
//!
//! # Example
//!
//! ```rust
//! use headsync_hal::sim::{SimCollisionWorld, SimHeadTracker, SimScene};
//! use headsync_runtime::HeadPoseReconciler;
//! use headsync_types::Pose;
//!
//! let scene = SimScene::new().with_character_rig().build();
//! let mut head = HeadPoseReconciler::new(
//!     Box::new(SimHeadTracker::fixed(Pose::identity())),
//!     Box::new(SimCollisionWorld::new()),
//! );
//! head.resync(&scene).unwrap();
//! head.update_head(0);
//! assert!(head.rig_synced());
//! assert_eq!(head.aim(0).distance, 100.0);
//! ```

use headsync_hal::{CollisionWorld, HeadTracker, RigTransform, SceneLookup};
use headsync_middleware::{EventBus, Topic};
use headsync_perception::{
    EntityTransform, GazeRay, GazeSettings, RigCalibration, reconcile_with,
};
use headsync_types::{
    AimResult, Event, EventPayload, RawReconcilerConfig, ReconcileOutput, ReconcilerConfig,
    SyncError, TransformSpace,
};
use tracing::{debug, info, instrument, warn};

use crate::frame::{FrameLatch, FrameListener};

pub use headsync_hal::{DEFAULT_BODY_TAG, DEFAULT_HEAD_TAG};

const EVENT_SOURCE: &str = "headsync-runtime::head";

// ─────────────────────────────────────────────────────────────────────────────
// CharacterRig
// ─────────────────────────────────────────────────────────────────────────────

/// The two rig transforms driven by head tracking.
pub struct CharacterRig {
    head: Box<dyn RigTransform>,
    body: Box<dyn RigTransform>,
}

impl CharacterRig {
    pub fn new(head: Box<dyn RigTransform>, body: Box<dyn RigTransform>) -> Self {
        Self { head, body }
    }

    /// Look both transforms up by tag.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ReferenceNotFound`] for the first missing tag.
    pub fn resolve(
        scene: &dyn SceneLookup,
        head_tag: &str,
        body_tag: &str,
    ) -> Result<Self, SyncError> {
        let head = scene.find_by_tag(head_tag)?;
        let body = scene.find_by_tag(body_tag)?;
        Ok(Self::new(head, body))
    }

    pub fn head(&self) -> &dyn RigTransform {
        self.head.as_ref()
    }

    pub fn body(&self) -> &dyn RigTransform {
        self.body.as_ref()
    }

    /// Write the head and body rotations of `output`, if present.
    fn apply(&mut self, output: &ReconcileOutput) -> Result<(), SyncError> {
        if let Some(q) = output.head_local_rotation {
            self.head.set_local_rotation(q)?;
        }
        if let Some(q) = output.body_rotation {
            self.body.set_rotation(q)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HeadPoseReconciler
// ─────────────────────────────────────────────────────────────────────────────

/// Stateful head-tracking component.  See the [module docs][self].
pub struct HeadPoseReconciler {
    tracker: Box<dyn HeadTracker>,
    world: Box<dyn CollisionWorld>,
    config: ReconcilerConfig,
    calibration: RigCalibration,
    gaze: GazeSettings,
    update_early: bool,
    head_tag: String,
    body_tag: String,
    transform: EntityTransform,
    rig: Option<CharacterRig>,
    bus: Option<EventBus>,
    // ── Per-frame cache ───────────────────────────────────────────────────────
    latch: FrameLatch,
    current_frame: Option<u64>,
    output: Option<ReconcileOutput>,
    aim: Option<(u64, AimResult)>,
}

impl HeadPoseReconciler {
    /// A reconciler tracking rotation and position in its parent's frame,
    /// with no rig attached.
    pub fn new(tracker: Box<dyn HeadTracker>, world: Box<dyn CollisionWorld>) -> Self {
        Self {
            tracker,
            world,
            config: ReconcilerConfig::default(),
            calibration: RigCalibration::default(),
            gaze: GazeSettings::default(),
            update_early: false,
            head_tag: DEFAULT_HEAD_TAG.to_string(),
            body_tag: DEFAULT_BODY_TAG.to_string(),
            transform: EntityTransform::new(),
            rig: None,
            bus: None,
            latch: FrameLatch::new(),
            current_frame: None,
            output: None,
            aim: None,
        }
    }

    // ── Builder ───────────────────────────────────────────────────────────────

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_calibration(mut self, calibration: RigCalibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_gaze(mut self, gaze: GazeSettings) -> Self {
        self.gaze = gaze;
        self
    }

    /// Also reconcile in the early phase so gameplay code running in the
    /// same phase sees this frame's pose.
    pub fn with_update_early(mut self, update_early: bool) -> Self {
        self.update_early = update_early;
        self
    }

    /// Tags used by [`resync`][Self::resync].
    pub fn with_tags(mut self, head_tag: impl Into<String>, body_tag: impl Into<String>) -> Self {
        self.head_tag = head_tag.into();
        self.body_tag = body_tag.into();
        self
    }

    /// Start from `transform` (e.g. to place the camera under a parent).
    pub fn with_transform(mut self, transform: EntityTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_rig(mut self, rig: CharacterRig) -> Self {
        self.rig = Some(rig);
        self
    }

    /// Publish frame reports, aim results and rig alerts on `bus`.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Replace the configuration.  Takes effect from the next frame; a frame
    /// already computed keeps its result.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] (and keeps the old config) when
    /// `raw` is inconsistent.
    pub fn set_config(&mut self, raw: RawReconcilerConfig) -> Result<(), SyncError> {
        let config = ReconcilerConfig::try_from(raw)?;
        debug!(?config, "reconciler config replaced");
        self.config = config;
        Ok(())
    }

    /// Replace range and mask.  An aim already resolved this frame is
    /// dropped so the next [`aim`][Self::aim] casts again.
    pub fn set_gaze(&mut self, gaze: GazeSettings) {
        self.gaze = gaze;
        self.aim = None;
    }

    pub fn gaze_settings(&self) -> &GazeSettings {
        &self.gaze
    }

    pub fn calibration(&self) -> &RigCalibration {
        &self.calibration
    }

    pub fn update_early(&self) -> bool {
        self.update_early
    }

    // ── Rig management ────────────────────────────────────────────────────────

    /// Inject rig transforms directly.
    pub fn attach(&mut self, head: Box<dyn RigTransform>, body: Box<dyn RigTransform>) {
        info!(head = head.tag(), body = body.tag(), "character rig attached");
        self.rig = Some(CharacterRig::new(head, body));
        self.publish(Topic::SystemAlerts, EventPayload::RigSyncRestored);
    }

    /// Drop the rig; head/body sync stops until the next attach or resync.
    pub fn detach(&mut self) -> Option<CharacterRig> {
        self.rig.take()
    }

    /// Re-resolve the rig by tag.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ReferenceNotFound`] when either tag is missing.
    /// The reconciler is then in degraded mode (any previous rig is dropped)
    /// and keeps tracking its own transform.
    pub fn resync(&mut self, scene: &dyn SceneLookup) -> Result<(), SyncError> {
        match CharacterRig::resolve(scene, &self.head_tag, &self.body_tag) {
            Ok(rig) => {
                info!(head = %self.head_tag, body = %self.body_tag, "character rig resynced");
                self.rig = Some(rig);
                self.publish(Topic::SystemAlerts, EventPayload::RigSyncRestored);
                Ok(())
            }
            Err(e) => {
                self.lose_rig(&e);
                Err(e)
            }
        }
    }

    pub fn rig_synced(&self) -> bool {
        self.rig.is_some()
    }

    pub fn rig(&self) -> Option<&CharacterRig> {
        self.rig.as_ref()
    }

    // ── Per-frame work ────────────────────────────────────────────────────────

    /// Reconcile `frame`.  The device is read and the pose computed at most
    /// once per frame; later calls return the cached result.
    #[instrument(level = "debug", skip(self))]
    pub fn update_head(&mut self, frame: u64) -> ReconcileOutput {
        if !self.latch.claim(frame)
            && let Some(out) = self.output
        {
            return out;
        }

        self.tracker.update_state();
        let pose = self.tracker.pose();
        let output = reconcile_with(&pose, &self.config, &self.calibration);
        self.transform.apply(&output);

        if let Some(rig) = self.rig.as_mut()
            && let Err(e) = rig.apply(&output)
        {
            self.lose_rig(&e);
        }

        debug!(
            frame,
            tracker = self.tracker.id(),
            rotation = ?output.rotation,
            position = ?output.position,
            "head pose reconciled"
        );
        self.current_frame = Some(frame);
        self.output = Some(output);
        self.publish(Topic::HeadPose, EventPayload::FrameReport { frame, output });
        output
    }

    /// The gaze ray for `frame`, reconciling first if needed.
    pub fn gaze(&mut self, frame: u64) -> GazeRay {
        self.update_head(frame);
        GazeRay::from_transform(&self.transform)
    }

    /// Where the viewer is aiming in `frame`.  The raycast runs once per
    /// frame.
    pub fn aim(&mut self, frame: u64) -> AimResult {
        if let Some((f, aim)) = &self.aim
            && *f == frame
        {
            return aim.clone();
        }
        let ray = self.gaze(frame);
        let hit = self
            .world
            .raycast(ray.origin, ray.direction, self.gaze.range, self.gaze.mask);
        let aim = ray.resolve(hit, self.gaze.range);
        debug!(frame, hit = aim.hit, collider = ?aim.collider, "aim resolved");
        self.aim = Some((frame, aim.clone()));
        aim
    }

    /// Aim from the most recent frame, if any.
    pub fn last_aim(&self) -> Option<&AimResult> {
        self.aim.as_ref().map(|(_, a)| a)
    }

    /// Output of the most recently reconciled frame.
    pub fn last_output(&self) -> Option<&ReconcileOutput> {
        self.output.as_ref()
    }

    pub fn current_frame(&self) -> Option<u64> {
        self.current_frame
    }

    pub fn transform(&self) -> &EntityTransform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut EntityTransform {
        &mut self.transform
    }

    /// Space the last output was written in.
    pub fn output_space(&self) -> TransformSpace {
        self.output
            .map(|o| o.space)
            .unwrap_or(TransformSpace::Local)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn lose_rig(&mut self, error: &SyncError) {
        let was_synced = self.rig.take().is_some();
        warn!(error = %error, was_synced, "head/body sync disabled; tracking camera only");
        self.publish(
            Topic::SystemAlerts,
            EventPayload::RigSyncLost {
                reason: error.to_string(),
            },
        );
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        if let Some(bus) = &self.bus {
            // No subscribers is fine for a fire-and-forget publisher.
            let _ = bus.publish_to(topic, Event::new(EVENT_SOURCE, payload));
        }
    }
}

impl FrameListener for HeadPoseReconciler {
    fn on_init(&mut self) {
        info!(
            tracker = self.tracker.id(),
            rig_synced = self.rig_synced(),
            update_early = self.update_early,
            has_target = self.config.has_target(),
            "head pose reconciler started"
        );
        if !self.rig_synced() {
            warn!(head = %self.head_tag, body = %self.body_tag, "no character rig; head/body sync disabled");
        }
    }

    fn on_early_tick(&mut self, frame: u64) {
        if self.update_early {
            self.update_head(frame);
        }
    }

    fn on_late_tick(&mut self, frame: u64) {
        self.update_head(frame);
        let aim = self.aim(frame);
        self.publish(Topic::Aim, EventPayload::Aim { frame, aim });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
