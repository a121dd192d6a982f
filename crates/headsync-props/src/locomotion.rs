//! Rigid-body character locomotion.
//!
//! One [`Locomotion::step`] per fixed physics tick turns axis input into a
//! displacement in the character's yaw frame, an optional jump impulse and
//! an extra downward force while airborne, and adjusts the capsule collider
//! from the jump animation's height curve.  Ground distance comes from a
//! downward raycast into the [`CollisionWorld`].
//!
//! The character's yaw normally comes from the head tracker's body
//! rotation, so walking "forward" follows where the viewer looks.

use glam::{Quat, Vec3};
use headsync_hal::CollisionWorld;
use headsync_types::LayerMask;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Standard gravity.
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocomotionConfig {
    pub forward_speed: f32,
    pub backward_speed: f32,
    pub side_speed: f32,
    /// Upward velocity change applied on jump.
    pub jump_power: f32,
    /// Dead zone for the vertical and fire axes.
    pub input_threshold: f32,
    /// Ground distance at which extra gravity kicks in.
    pub airborne_distance: f32,
    /// Multiplier on `gravity × mass` while airborne.
    pub extra_gravity: f32,
    /// Adjust the collider from the jump animation curves.
    pub use_curves: bool,
    /// Minimum ground distance for the curve adjustment.
    pub use_curves_height: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            forward_speed: 7.0,
            backward_speed: 2.0,
            side_speed: 4.0,
            jump_power: 3.0,
            input_threshold: 0.1,
            airborne_distance: 0.1,
            extra_gravity: 20.0,
            use_curves: true,
            use_curves_height: 0.5,
        }
    }
}

/// Axis and button input for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocomotionInput {
    /// Forward/backward axis in `[-1, 1]`.
    pub vertical: f32,
    /// Strafe axis in `[-1, 1]`.
    pub horizontal: f32,
    /// Aim trigger axis; above the threshold the character aims and slows.
    pub fire: f32,
    /// Jump pressed this tick.
    pub jump: bool,
}

/// Base-layer animator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimState {
    Idle,
    Locomotion,
    Jump,
    Rest,
}

/// What the animator reports for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatorSample {
    pub state: AnimState,
    pub in_transition: bool,
    /// `JumpHeight` curve value (0..1) while jumping.
    pub jump_height: f32,
    /// `GravityControl` curve value; positive means gravity is off.
    pub gravity_control: f32,
}

impl AnimatorSample {
    pub fn settled(state: AnimState) -> Self {
        Self {
            state,
            in_transition: false,
            jump_height: 0.0,
            gravity_control: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleCollider {
    pub height: f32,
    pub center: Vec3,
}

/// Forces and motion produced by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotionStep {
    pub velocity: Vec3,
    pub side_velocity: Vec3,
    /// Position change applied this tick.
    pub displacement: Vec3,
    /// Velocity change from a jump, if one started.
    pub jump_impulse: Option<Vec3>,
    /// Extra force while airborne.
    pub extra_force: Option<Vec3>,
    pub use_gravity: bool,
    pub aiming: bool,
}

pub struct Locomotion {
    config: LocomotionConfig,
    position: Vec3,
    rotation: Quat,
    mass: f32,
    collider: CapsuleCollider,
    original_collider: CapsuleCollider,
}

impl Locomotion {
    pub fn new(position: Vec3, collider: CapsuleCollider, mass: f32) -> Self {
        Self {
            config: LocomotionConfig::default(),
            position,
            rotation: Quat::IDENTITY,
            mass,
            collider,
            original_collider: collider,
        }
    }

    pub fn with_config(mut self, config: LocomotionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Turn the character, e.g. to the head tracker's body rotation.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    pub fn collider(&self) -> &CapsuleCollider {
        &self.collider
    }

    /// Advance one fixed tick of `dt` seconds.
    pub fn step(
        &mut self,
        input: LocomotionInput,
        anim: AnimatorSample,
        world: &dyn CollisionWorld,
        dt: f32,
    ) -> LocomotionStep {
        let cfg = &self.config;
        let aiming = input.fire > cfg.input_threshold;
        let slow = if aiming { 0.5 } else { 1.0 };

        let mut use_gravity = true;
        let extra_force = self
            .ground_distance(world, self.position)
            .filter(|d| *d >= cfg.airborne_distance)
            .map(|_| {
                use_gravity = false;
                GRAVITY * self.mass * cfg.extra_gravity
            });

        let mut velocity = self.rotation * Vec3::new(0.0, 0.0, input.vertical);
        if input.vertical > cfg.input_threshold {
            velocity *= cfg.forward_speed * slow;
        } else if input.vertical < -cfg.input_threshold {
            velocity *= cfg.backward_speed * slow;
        }
        let side_velocity =
            self.rotation * Vec3::new(input.horizontal, 0.0, 0.0) * cfg.side_speed * slow;

        let jump_impulse = (input.jump && !anim.in_transition).then(|| Vec3::Y * cfg.jump_power);

        let displacement = (velocity + side_velocity) * dt;
        self.position += displacement;

        match anim.state {
            AnimState::Idle | AnimState::Locomotion => {
                if self.config.use_curves {
                    self.reset_collider();
                }
            }
            AnimState::Jump => {
                if !anim.in_transition && self.config.use_curves {
                    if anim.gravity_control > 0.0 {
                        use_gravity = false;
                    }
                    self.adjust_jump_collider(world, anim.jump_height);
                }
            }
            AnimState::Rest => {}
        }

        trace!(?displacement, aiming, jump = jump_impulse.is_some(), "locomotion step");
        LocomotionStep {
            velocity,
            side_velocity,
            displacement,
            jump_impulse,
            extra_force,
            use_gravity,
            aiming,
        }
    }

    fn adjust_jump_collider(&mut self, world: &dyn CollisionWorld, jump_height: f32) {
        let Some(distance) = self.ground_distance(world, self.position + Vec3::Y) else {
            return;
        };
        if distance > self.config.use_curves_height {
            self.collider.height = self.original_collider.height - jump_height;
            self.collider.center = Vec3::new(0.0, self.original_collider.center.y + jump_height, 0.0);
        } else {
            self.reset_collider();
        }
    }

    fn reset_collider(&mut self) {
        self.collider = self.original_collider;
    }

    fn ground_distance(&self, world: &dyn CollisionWorld, origin: Vec3) -> Option<f32> {
        world
            .raycast(origin, Vec3::NEG_Y, f32::INFINITY, LayerMask::ALL)
            .map(|hit| hit.distance)
    }
}

/// Keeps a camera at a fixed offset from the character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowCamera {
    offset: Vec3,
}

impl FollowCamera {
    /// Remember the camera's offset from the character at start-up.
    pub fn new(camera: Vec3, character: Vec3) -> Self {
        Self {
            offset: camera - character,
        }
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn follow(&self, character: Vec3) -> Vec3 {
        character + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use headsync_hal::sim::SimCollisionWorld;

    fn grounded() -> SimCollisionWorld {
        SimCollisionWorld::new().with_plane("ground", 0, Vec3::ZERO, Vec3::Y)
    }

    fn capsule() -> CapsuleCollider {
        CapsuleCollider {
            height: 1.6,
            center: Vec3::new(0.0, 0.8, 0.0),
        }
    }

    fn walker() -> Locomotion {
        Locomotion::new(Vec3::ZERO, capsule(), 60.0)
    }

    fn input(vertical: f32, horizontal: f32, fire: f32) -> LocomotionInput {
        LocomotionInput {
            vertical,
            horizontal,
            fire,
            jump: false,
        }
    }

    #[test]
    fn forward_and_backward_speeds() {
        let world = grounded();
        let mut c = walker();
        let step = c.step(input(1.0, 0.0, 0.0), AnimatorSample::settled(AnimState::Locomotion), &world, 1.0);
        assert!(step.velocity.abs_diff_eq(Vec3::new(0.0, 0.0, 7.0), 1e-5));

        let step = c.step(input(-1.0, 0.0, 0.0), AnimatorSample::settled(AnimState::Locomotion), &world, 1.0);
        assert!(step.velocity.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), 1e-5));
        assert!(c.position().abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-4));
    }

    #[test]
    fn aiming_halves_speeds() {
        let world = grounded();
        let mut c = walker();
        let step = c.step(input(1.0, 1.0, 0.5), AnimatorSample::settled(AnimState::Locomotion), &world, 0.02);
        assert!(step.aiming);
        assert!((step.velocity.z - 3.5).abs() < 1e-5);
        assert!((step.side_velocity.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn dead_zone_leaves_velocity_unscaled() {
        let world = grounded();
        let mut c = walker();
        let step = c.step(input(0.05, 0.0, 0.0), AnimatorSample::settled(AnimState::Idle), &world, 1.0);
        assert!((step.velocity.z - 0.05).abs() < 1e-6);
    }

    #[test]
    fn velocity_follows_character_yaw() {
        let world = grounded();
        let mut c = walker();
        c.set_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let step = c.step(input(1.0, 0.0, 0.0), AnimatorSample::settled(AnimState::Locomotion), &world, 1.0);
        assert!(step.velocity.abs_diff_eq(Vec3::new(7.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn jump_only_outside_transition() {
        let world = grounded();
        let mut c = walker();
        let jump = LocomotionInput {
            jump: true,
            ..Default::default()
        };
        let step = c.step(jump, AnimatorSample::settled(AnimState::Locomotion), &world, 0.02);
        assert_eq!(step.jump_impulse, Some(Vec3::new(0.0, 3.0, 0.0)));

        let busy = AnimatorSample {
            in_transition: true,
            ..AnimatorSample::settled(AnimState::Locomotion)
        };
        assert_eq!(c.step(jump, busy, &world, 0.02).jump_impulse, None);
    }

    #[test]
    fn extra_gravity_when_airborne() {
        let world = grounded();
        let mut c = Locomotion::new(Vec3::new(0.0, 2.0, 0.0), capsule(), 2.0);
        let step = c.step(LocomotionInput::default(), AnimatorSample::settled(AnimState::Jump), &world, 0.02);
        assert!(!step.use_gravity);
        assert!(step.extra_force.unwrap().abs_diff_eq(GRAVITY * 40.0, 1e-3));

        let mut on_ground = walker();
        let step = on_ground.step(LocomotionInput::default(), AnimatorSample::settled(AnimState::Idle), &world, 0.02);
        assert!(step.use_gravity);
        assert_eq!(step.extra_force, None);
    }

    #[test]
    fn jump_curve_adjusts_collider_when_high_enough() {
        let world = grounded();
        let mut c = Locomotion::new(Vec3::new(0.0, 1.0, 0.0), capsule(), 60.0);
        let anim = AnimatorSample {
            state: AnimState::Jump,
            in_transition: false,
            jump_height: 0.3,
            gravity_control: 1.0,
        };
        let step = c.step(LocomotionInput::default(), anim, &world, 0.02);
        assert!(!step.use_gravity);
        assert!((c.collider().height - 1.3).abs() < 1e-5);
        assert!((c.collider().center.y - 1.1).abs() < 1e-5);

        c.step(LocomotionInput::default(), AnimatorSample::settled(AnimState::Idle), &world, 0.02);
        assert_eq!(*c.collider(), capsule());
    }

    #[test]
    fn jump_curve_resets_near_ground() {
        let world = SimCollisionWorld::new().with_plane("ground", 0, Vec3::new(0.0, 0.8, 0.0), Vec3::Y);
        let mut c = walker();
        let anim = AnimatorSample {
            jump_height: 0.3,
            ..AnimatorSample::settled(AnimState::Jump)
        };
        c.step(LocomotionInput::default(), anim, &world, 0.02);
        assert_eq!(*c.collider(), capsule());
    }

    #[test]
    fn follow_camera_keeps_offset() {
        let cam = FollowCamera::new(Vec3::new(0.0, 1.6, -0.2), Vec3::ZERO);
        assert!(cam.follow(Vec3::new(3.0, 0.0, 4.0)).abs_diff_eq(Vec3::new(3.0, 1.6, 3.8), 1e-6));
    }
}
