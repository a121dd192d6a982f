//! Simulated viewing session.
//!
//! Wires a sweeping simulated head tracker, a character rig, a ground plane
//! and an exploding barrel into one [`FrameDriver`] loop.  The camera rides
//! at a fixed offset above the character; the viewer's gaze shoots the
//! barrel whenever it rests on it.

use std::time::Duration;

use glam::{Quat, Vec3};
use headsync_hal::sim::{
    SharedCollisionWorld, SimCollisionWorld, SimHeadTracker, SimRigBone, SimScene,
};
use headsync_hal::{DEFAULT_BODY_TAG, DEFAULT_HEAD_TAG, RigTransform};
use headsync_middleware::{EventBus, Topic, TopicReceiver};
use headsync_perception::EulerAngles;
use headsync_props::{
    AnimState, AnimatorSample, Barrel, BarrelStage, BlastCandidate, BlastImpact, CapsuleCollider,
    FollowCamera, Locomotion, LocomotionInput,
};
use headsync_runtime::{FrameDriver, FrameListener, HeadPoseReconciler};
use headsync_types::{AimResult, BarrelEvent, Event, EventPayload, Pose, SyncError};
use tracing::{debug, info};

use crate::config::Config;

pub const BARREL_ID: &str = "barrel-01";
const BARREL_CENTER: Vec3 = Vec3::new(0.0, 1.5, 4.0);
const BARREL_RADIUS: f32 = 0.6;
/// Camera offset above the character's feet.
const EYE_OFFSET: Vec3 = Vec3::new(0.0, 1.6, 0.0);
/// Minimum seconds between two shots at the barrel.
const FIRE_COOLDOWN: f32 = 0.25;
/// Frames per full look-around cycle of the simulated viewer.
const SWEEP_PERIOD_FRAMES: usize = 240;
const SWEEP_YAW_DEG: f32 = 35.0;
const SWEEP_PITCH_DEG: f32 = 8.0;

const EVENT_SOURCE: &str = "headsync-cli::range";

// ─────────────────────────────────────────────────────────────────────────────
// Barrel range
// ─────────────────────────────────────────────────────────────────────────────

/// Shoots the barrel when the viewer's aim rests on it.
struct BarrelRange {
    barrel: Barrel,
    aims: TopicReceiver,
    bus: EventBus,
    world: SharedCollisionWorld,
    dt: f32,
    cooldown: f32,
    player: Vec3,
    impacts: Vec<BlastImpact>,
}

impl BarrelRange {
    fn publish(&self, event: BarrelEvent) {
        let payload = EventPayload::Barrel {
            barrel_id: self.barrel.id().to_string(),
            event,
        };
        let _ = self.bus.publish_to(Topic::Props, Event::new(EVENT_SOURCE, payload));
    }
}

impl FrameListener for BarrelRange {
    fn on_late_tick(&mut self, frame: u64) {
        self.cooldown = (self.cooldown - self.dt).max(0.0);

        let barrel_id = self.barrel.id().to_string();
        let aimed = self.aims.drain().into_iter().any(|e| {
            matches!(&e.payload, EventPayload::Aim { aim, .. } if aim.collider.as_deref() == Some(barrel_id.as_str()))
        });
        if aimed
            && self.cooldown <= 0.0
            && let Some(event) = self.barrel.register_hit(self.dt)
        {
            debug!(frame, hits = self.barrel.hit_count(), "barrel shot");
            self.cooldown = FIRE_COOLDOWN;
            self.publish(event);
        }

        for event in self.barrel.tick(self.dt) {
            if event == BarrelEvent::ApplyBlast {
                self.impacts = self.barrel.blast_targets(&[BlastCandidate {
                    id: "player".to_string(),
                    position: self.player,
                    has_rigid_body: true,
                    takes_damage: true,
                }]);
                self.world.with_world(|w| w.remove(&barrel_id));
                info!(frame, impacts = self.impacts.len(), "blast applied");
            }
            self.publish(event);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// What one frame produced.
#[derive(Debug, Clone)]
pub struct FrameSummary {
    pub frame: u64,
    /// Camera `(pitch, yaw, roll)` in degrees.
    pub camera_degrees: [f32; 3],
    pub aim: Option<AimResult>,
    /// Prop events and rig alerts raised during the frame.
    pub events: Vec<Event>,
}

/// End-of-run totals.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub frames: u64,
    pub aim_hits: u64,
    pub barrel_hits: u32,
    pub barrel_stage: BarrelStage,
    pub impacts: Vec<BlastImpact>,
    pub rig_synced: bool,
    pub player_position: Vec3,
}

pub struct Session {
    head: HeadPoseReconciler,
    range: BarrelRange,
    player: Locomotion,
    camera: FollowCamera,
    body: SimRigBone,
    driver: FrameDriver,
    props: TopicReceiver,
    alerts: TopicReceiver,
    frame_time: Duration,
    dt: f32,
    frames: u64,
    aim_hits: u64,
}

impl Session {
    /// Build the simulated scene from `cfg`.
    ///
    /// A rig that cannot be resolved (e.g. custom tags) is not an error: the
    /// session runs in camera-only mode.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] for an invalid target, gaze range,
    /// raycast layer or frame rate.
    pub fn new(cfg: &Config) -> Result<Self, SyncError> {
        let frame_time = cfg.frame_time()?;
        let dt = frame_time.as_secs_f32();
        let gaze = cfg.gaze_settings()?;
        let reconciler_config = cfg.reconciler_config()?;

        let table = cfg.layer_table();
        let ground_layer = table.index_of("Ground").unwrap_or(0);
        let props_layer = table.index_of("Props").unwrap_or(0);
        let world = SharedCollisionWorld::new(
            SimCollisionWorld::new()
                .with_plane("ground", ground_layer, Vec3::ZERO, Vec3::Y)
                .with_sphere(BARREL_ID, props_layer, BARREL_CENTER, BARREL_RADIUS),
        );

        let body = SimRigBone::new(DEFAULT_BODY_TAG);
        let scene = SimScene::new()
            .with_bone(SimRigBone::new(DEFAULT_HEAD_TAG))
            .with_bone(body.clone())
            .build();

        let bus = EventBus::default();
        let props = bus.subscribe_to(Topic::Props);
        let alerts = bus.subscribe_to(Topic::SystemAlerts);
        let aims = bus.subscribe_to(Topic::Aim);

        let tracker = SimHeadTracker::sweeping(
            SWEEP_PERIOD_FRAMES,
            SWEEP_YAW_DEG,
            SWEEP_PITCH_DEG,
            0.0,
        )
        .with_id("sim_viewer");

        let mut head = HeadPoseReconciler::new(Box::new(tracker), Box::new(world.clone()))
            .with_config(reconciler_config)
            .with_calibration(cfg.calibration)
            .with_gaze(gaze)
            .with_update_early(cfg.update_early)
            .with_tags(cfg.head_tag.as_str(), cfg.body_tag.as_str())
            .with_bus(bus.clone());
        if head.resync(&scene).is_err() {
            info!("continuing with camera-only tracking");
        }

        let player = Locomotion::new(
            Vec3::ZERO,
            CapsuleCollider {
                height: 1.6,
                center: Vec3::new(0.0, 0.8, 0.0),
            },
            60.0,
        );
        let camera = FollowCamera::new(EYE_OFFSET, player.position());

        let range = BarrelRange {
            barrel: Barrel::new(BARREL_ID, BARREL_CENTER),
            aims,
            bus,
            world,
            dt,
            cooldown: 0.0,
            player: player.position(),
            impacts: Vec::new(),
        };

        Ok(Self {
            head,
            range,
            player,
            camera,
            body,
            driver: FrameDriver::new(),
            props,
            alerts,
            frame_time,
            dt,
            frames: 0,
            aim_hits: 0,
        })
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    /// Run one frame.
    pub fn step(&mut self) -> FrameSummary {
        // Fixed-step physics first: the character turns with the body yaw
        // from the previous frame and the camera follows it.
        self.player.set_rotation(self.body.rotation());
        self.player.step(
            LocomotionInput::default(),
            AnimatorSample::settled(AnimState::Idle),
            &self.range.world,
            self.dt,
        );
        self.range.player = self.player.position();
        let eye = self.camera.follow(self.player.position());
        self.head.transform_mut().set_parent(Pose::new(Quat::IDENTITY, eye));

        let frame = self.driver.run_frame(&mut [&mut self.head, &mut self.range]);
        self.frames += 1;

        let aim = self.head.last_aim().cloned();
        if aim.as_ref().is_some_and(|a| a.hit) {
            self.aim_hits += 1;
        }
        let mut events = self.alerts.drain();
        events.extend(self.props.drain());

        FrameSummary {
            frame,
            camera_degrees: EulerAngles::from_quat(self.head.transform().rotation()).to_degrees(),
            aim,
            events,
        }
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            frames: self.frames,
            aim_hits: self.aim_hits,
            barrel_hits: self.range.barrel.hit_count(),
            barrel_stage: self.range.barrel.stage(),
            impacts: self.range.impacts.clone(),
            rig_synced: self.head.rig_synced(),
            player_position: self.player.position(),
        }
    }
}
