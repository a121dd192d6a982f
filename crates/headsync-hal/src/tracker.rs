//! Generic `HeadTracker` trait for head-mounted orientation/position sensors.

use glam::{Quat, Vec3};
use headsync_types::Pose;

/// A head-tracking device (phone-in-a-viewer IMU, HMD, replayed recording …).
///
/// The device is polled, not pushed: [`update_state`][Self::update_state]
/// triggers a fresh read, after which the accessors return that snapshot
/// until the next update.
pub trait HeadTracker: Send {
    /// Stable identifier for this tracker, e.g. `"viewer_imu"`.
    fn id(&self) -> &str;

    /// Read the latest state from the device.
    fn update_state(&mut self);

    /// Orientation from the most recent [`update_state`][Self::update_state].
    fn orientation(&self) -> Quat;

    /// Position from the most recent [`update_state`][Self::update_state].
    fn position(&self) -> Vec3;

    /// Both values as an immutable [`Pose`] snapshot.
    fn pose(&self) -> Pose {
        Pose::new(self.orientation(), self.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockTracker {
        reads: u32,
    }

    impl HeadTracker for MockTracker {
        fn id(&self) -> &str {
            "mock"
        }

        fn update_state(&mut self) {
            self.reads += 1;
        }

        fn orientation(&self) -> Quat {
            Quat::from_rotation_y(self.reads as f32 * 0.1)
        }

        fn position(&self) -> Vec3 {
            Vec3::new(0.0, self.reads as f32, 0.0)
        }
    }

    #[test]
    fn pose_combines_accessors() {
        let mut tracker = MockTracker { reads: 0 };
        tracker.update_state();
        tracker.update_state();
        let pose = tracker.pose();
        assert_eq!(pose.position, Vec3::new(0.0, 2.0, 0.0));
        assert!(pose.orientation.abs_diff_eq(Quat::from_rotation_y(0.2), 1e-6));
    }
}
