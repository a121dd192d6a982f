//! Exploding barrel.
//!
//! A barrel takes five hits to blow up.  The first hit swaps in the dented
//! mesh, later hits nudge it toward a slightly turned resting rotation, and
//! the fourth also reveals a slime leak.  The fifth detonates it: an effect
//! spawns at once, the blast lands [`BarrelConfig::damage_delay`] seconds
//! later, and the effect fades out and is removed after
//! [`BarrelConfig::effect_lifetime`] seconds.
//!
//! ```rust
//! use headsync_props::barrel::{Barrel, BarrelStage};
//! use headsync_types::BarrelEvent;
//!
//! let mut barrel = Barrel::new("barrel-1", glam::Vec3::ZERO).with_seed(7);
//! assert_eq!(barrel.register_hit(0.016), Some(BarrelEvent::SwapMesh(1)));
//! for _ in 0..3 {
//!     barrel.register_hit(0.016);
//! }
//! assert_eq!(barrel.register_hit(0.016), Some(BarrelEvent::Detonate));
//! assert_eq!(barrel.stage(), BarrelStage::Detonating);
//! ```

use glam::{EulerRot, Quat, Vec3};
use headsync_types::BarrelEvent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Hits needed to detonate.
pub const DETONATION_HITS: u32 = 5;

/// Range of the creak sound's playback pitch.
const CREAK_PITCH: std::ops::Range<f32> = 0.4..0.7;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BarrelConfig {
    /// Blast radius in metres.
    pub blast_range: f32,
    /// Damage at the centre of the blast; also the explosion impulse.
    pub blast_damage: f32,
    /// Seconds between detonation and the blast landing.
    pub damage_delay: f32,
    /// Seconds the effect lingers after the blast.
    pub effect_lifetime: f32,
    /// Light intensity of a fresh explosion effect.
    pub effect_light: f32,
    /// Yaw (degrees) of the rotation a hit barrel tilts toward.
    pub tilt_yaw_deg: f32,
    /// Slerp rate toward the tilt rotation, per second.
    pub tilt_rate: f32,
    /// Register a hit automatically every this many seconds.
    pub auto_hit_interval: Option<f32>,
}

impl Default for BarrelConfig {
    fn default() -> Self {
        Self {
            blast_range: 4.5,
            blast_damage: 70.0,
            damage_delay: 0.21,
            effect_lifetime: 1.6,
            effect_light: 3.0,
            tilt_yaw_deg: 3.0,
            tilt_rate: 1.0,
            auto_hit_interval: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarrelStage {
    Intact,
    Dented,
    Leaking,
    /// Detonated; the blast has not landed yet.
    Detonating,
    /// Blast applied; the barrel is gone, the effect may still be fading.
    Destroyed,
}

/// The explosion effect spawned on detonation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastEffect {
    pub light_intensity: f32,
    pub particle_alpha: u8,
    /// Seconds since the blast landed; `None` until then.
    pub since_blast: Option<f32>,
}

impl BlastEffect {
    fn spawn(light: f32) -> Self {
        Self {
            light_intensity: light,
            particle_alpha: u8::MAX,
            since_blast: None,
        }
    }

    fn fade(&mut self) {
        self.light_intensity = (self.light_intensity - 1.0).max(0.0);
        self.particle_alpha = self.particle_alpha.saturating_sub(2);
    }
}

/// Something near the barrel that the blast might push or hurt.
#[derive(Debug, Clone, PartialEq)]
pub struct BlastCandidate {
    pub id: String,
    pub position: Vec3,
    pub has_rigid_body: bool,
    /// Whether the object has health (the player).
    pub takes_damage: bool,
}

/// The blast's effect on one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct BlastImpact {
    pub id: String,
    pub distance: f32,
    /// Damage dealt, for candidates that take damage.
    pub damage: Option<f32>,
    /// Explosion impulse, pointing away from the barrel.
    pub impulse: Vec3,
}

pub struct Barrel {
    id: String,
    config: BarrelConfig,
    position: Vec3,
    rotation: Quat,
    hit_count: u32,
    stage: BarrelStage,
    mesh_index: usize,
    slime_visible: bool,
    creak_pitch: f32,
    damage_timer: Option<f32>,
    effect: Option<BlastEffect>,
    auto_hit_timer: f32,
    rng: StdRng,
}

impl Barrel {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            config: BarrelConfig::default(),
            position,
            rotation: Quat::IDENTITY,
            hit_count: 0,
            stage: BarrelStage::Intact,
            mesh_index: 0,
            slime_visible: false,
            creak_pitch: 1.0,
            damage_timer: None,
            effect: None,
            auto_hit_timer: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_config(mut self, config: BarrelConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the creak-pitch generator for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    pub fn stage(&self) -> BarrelStage {
        self.stage
    }

    pub fn mesh_index(&self) -> usize {
        self.mesh_index
    }

    pub fn slime_visible(&self) -> bool {
        self.slime_visible
    }

    pub fn creak_pitch(&self) -> f32 {
        self.creak_pitch
    }

    pub fn effect(&self) -> Option<&BlastEffect> {
        self.effect.as_ref()
    }

    /// Whether the barrel can still be shot.
    pub fn is_standing(&self) -> bool {
        !matches!(self.stage, BarrelStage::Detonating | BarrelStage::Destroyed)
    }

    /// Record one hit.  `dt` is the frame time, used for the tilt slerp.
    ///
    /// Returns `None` once the barrel has detonated.
    pub fn register_hit(&mut self, dt: f32) -> Option<BarrelEvent> {
        if !self.is_standing() {
            return None;
        }
        self.hit_count += 1;
        self.creak_pitch = self.rng.gen_range(CREAK_PITCH);

        let event = match self.hit_count {
            n if n >= DETONATION_HITS => {
                self.detonate();
                BarrelEvent::Detonate
            }
            1 => {
                self.mesh_index = 1;
                self.stage = BarrelStage::Dented;
                BarrelEvent::SwapMesh(1)
            }
            4 => {
                self.tilt(dt);
                self.slime_visible = true;
                self.stage = BarrelStage::Leaking;
                BarrelEvent::TiltAndLeak
            }
            _ => {
                self.tilt(dt);
                BarrelEvent::Tilt
            }
        };
        debug!(barrel = %self.id, hits = self.hit_count, ?event, pitch = self.creak_pitch, "barrel hit");
        Some(event)
    }

    /// Advance timers by `dt` seconds and return what happened, in order.
    pub fn tick(&mut self, dt: f32) -> Vec<BarrelEvent> {
        let mut events = Vec::new();

        if let Some(interval) = self.config.auto_hit_interval
            && self.is_standing()
        {
            self.auto_hit_timer += dt;
            if self.auto_hit_timer >= interval {
                self.auto_hit_timer = 0.0;
                events.extend(self.register_hit(dt));
            }
        }

        if let Some(timer) = self.damage_timer.as_mut() {
            *timer += dt;
            if *timer >= self.config.damage_delay {
                self.damage_timer = None;
                self.stage = BarrelStage::Destroyed;
                if let Some(effect) = self.effect.as_mut() {
                    effect.since_blast = Some(0.0);
                }
                info!(barrel = %self.id, "barrel blast");
                events.push(BarrelEvent::ApplyBlast);
            }
        }

        let mut expired = false;
        if let Some(effect) = self.effect.as_mut() {
            effect.fade();
            if let Some(age) = effect.since_blast.as_mut() {
                *age += dt;
                expired = *age >= self.config.effect_lifetime;
            }
        }
        if expired {
            self.effect = None;
            events.push(BarrelEvent::EffectExpired);
        }

        events
    }

    /// Damage at `distance` from the barrel: linear falloff to zero at the
    /// blast range.
    pub fn blast_damage(&self, distance: f32) -> f32 {
        let range = self.config.blast_range;
        (self.config.blast_damage * (range - distance) / range).max(0.0)
    }

    /// Blast impacts on every candidate with a rigid body inside the range.
    pub fn blast_targets(&self, candidates: &[BlastCandidate]) -> Vec<BlastImpact> {
        let range = self.config.blast_range;
        candidates
            .iter()
            .filter(|c| c.has_rigid_body)
            .filter_map(|c| {
                let offset = c.position - self.position;
                let distance = offset.length();
                (distance <= range).then(|| BlastImpact {
                    id: c.id.clone(),
                    distance,
                    damage: c.takes_damage.then(|| self.blast_damage(distance)),
                    impulse: offset.try_normalize().unwrap_or(Vec3::Y)
                        * self.config.blast_damage
                        * (1.0 - distance / range),
                })
            })
            .collect()
    }

    fn detonate(&mut self) {
        info!(barrel = %self.id, "barrel detonated");
        self.stage = BarrelStage::Detonating;
        self.damage_timer = Some(0.0);
        self.effect = Some(BlastEffect::spawn(self.config.effect_light));
    }

    fn tilt(&mut self, dt: f32) {
        let target = Quat::from_euler(EulerRot::YXZ, self.config.tilt_yaw_deg.to_radians(), 0.0, 0.0);
        let t = (dt * self.config.tilt_rate).clamp(0.0, 1.0);
        self.rotation = self.rotation.slerp(target, t);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
