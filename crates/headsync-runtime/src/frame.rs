//! Frame scheduling: the once-per-frame latch and the two-phase driver.
//!
//! A host engine ticks every component twice per frame: an *early* phase
//! (gameplay update) and a *late* phase (after animation, before render).
//! [`FrameDriver`] reproduces that contract for anything implementing
//! [`FrameListener`]: every listener's early phase runs before any
//! listener's late phase.
//!
//! # Example
//!
//! ```rust
//! use headsync_runtime::frame::{FrameDriver, FrameLatch, FrameListener};
//!
//! #[derive(Default)]
//! struct Counter {
//!     latch: FrameLatch,
//!     computed: u32,
//! }
//!
//! impl FrameListener for Counter {
//!     fn on_early_tick(&mut self, frame: u64) {
//!         if self.latch.claim(frame) {
//!             self.computed += 1;
//!         }
//!     }
//!     fn on_late_tick(&mut self, frame: u64) {
//!         if self.latch.claim(frame) {
//!             self.computed += 1;
//!         }
//!     }
//! }
//!
//! let mut counter = Counter::default();
//! let mut driver = FrameDriver::new();
//! driver.init(&mut [&mut counter]);
//! driver.run_frame(&mut [&mut counter]);
//! driver.run_frame(&mut [&mut counter]);
//! assert_eq!(counter.computed, 2);
//! ```

use tracing::{debug, trace};

// ─────────────────────────────────────────────────────────────────────────────
// FrameLatch
// ─────────────────────────────────────────────────────────────────────────────

/// Remembers which frame a computation last ran in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLatch {
    last: Option<u64>,
}

impl FrameLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per distinct `frame`: the caller should
    /// compute.  Later calls with the same frame return `false`.
    pub fn claim(&mut self, frame: u64) -> bool {
        if self.last == Some(frame) {
            return false;
        }
        self.last = Some(frame);
        true
    }

    /// Whether `frame` has already been claimed.
    pub fn is_claimed(&self, frame: u64) -> bool {
        self.last == Some(frame)
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last
    }

    /// Forget the last frame so the next [`claim`][Self::claim] succeeds.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameListener
// ─────────────────────────────────────────────────────────────────────────────

/// A component driven by the frame loop.
pub trait FrameListener {
    /// Called once before the first frame.
    fn on_init(&mut self) {}

    /// Early phase of `frame`.
    fn on_early_tick(&mut self, _frame: u64) {}

    /// Late phase of `frame`; always runs after every listener's early phase.
    fn on_late_tick(&mut self, frame: u64);
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameDriver
// ─────────────────────────────────────────────────────────────────────────────

/// Single-threaded two-phase frame scheduler.
///
/// The driver owns only the frame counter; listeners stay with the caller
/// so they can be inspected between frames.
#[derive(Debug, Default)]
pub struct FrameDriver {
    next_frame: u64,
    initialised: bool,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `frame` instead of zero.
    pub fn starting_at(frame: u64) -> Self {
        Self {
            next_frame: frame,
            initialised: false,
        }
    }

    /// Run every listener's [`on_init`][FrameListener::on_init].
    pub fn init(&mut self, listeners: &mut [&mut dyn FrameListener]) {
        for listener in listeners.iter_mut() {
            listener.on_init();
        }
        self.initialised = true;
        debug!(listeners = listeners.len(), "frame driver initialised");
    }

    /// Run one frame and return its id.  Calls [`init`][Self::init] first if
    /// it has not been called yet.
    pub fn run_frame(&mut self, listeners: &mut [&mut dyn FrameListener]) -> u64 {
        if !self.initialised {
            self.init(listeners);
        }
        let frame = self.next_frame;
        trace!(frame, "early phase");
        for listener in listeners.iter_mut() {
            listener.on_early_tick(frame);
        }
        trace!(frame, "late phase");
        for listener in listeners.iter_mut() {
            listener.on_late_tick(frame);
        }
        self.next_frame = frame.wrapping_add(1);
        frame
    }

    /// The id the next [`run_frame`][Self::run_frame] will use.
    pub fn next_frame(&self) -> u64 {
        self.next_frame
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn latch_claims_once_per_frame() {
        let mut latch = FrameLatch::new();
        assert!(latch.claim(7));
        assert!(!latch.claim(7));
        assert!(latch.is_claimed(7));
        assert!(latch.claim(8));
        assert_eq!(latch.last_frame(), Some(8));
    }

    #[test]
    fn latch_reset_allows_reclaim() {
        let mut latch = FrameLatch::new();
        assert!(latch.claim(3));
        latch.reset();
        assert!(latch.claim(3));
    }

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl FrameListener for Recorder {
        fn on_init(&mut self) {
            self.log.borrow_mut().push(format!("{}:init", self.name));
        }
        fn on_early_tick(&mut self, frame: u64) {
            self.log.borrow_mut().push(format!("{}:early{frame}", self.name));
        }
        fn on_late_tick(&mut self, frame: u64) {
            self.log.borrow_mut().push(format!("{}:late{frame}", self.name));
        }
    }

    #[test]
    fn driver_runs_all_early_before_any_late() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut a = Recorder { name: "a", log: Rc::clone(&log) };
        let mut b = Recorder { name: "b", log: Rc::clone(&log) };
        let mut driver = FrameDriver::new();

        let frame = driver.run_frame(&mut [&mut a, &mut b]);
        assert_eq!(frame, 0);
        assert_eq!(
            *log.borrow(),
            vec!["a:init", "b:init", "a:early0", "b:early0", "a:late0", "b:late0"]
        );
    }

    #[test]
    fn driver_initialises_once_and_advances_frames() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut a = Recorder { name: "a", log: Rc::clone(&log) };
        let mut driver = FrameDriver::starting_at(10);
        driver.init(&mut [&mut a]);
        assert!(driver.is_initialised());
        driver.run_frame(&mut [&mut a]);
        driver.run_frame(&mut [&mut a]);
        assert_eq!(driver.next_frame(), 12);
        let inits = log.borrow().iter().filter(|l| l.ends_with("init")).count();
        assert_eq!(inits, 1);
        assert_eq!(log.borrow().last().map(String::as_str), Some("a:late11"));
    }
}
