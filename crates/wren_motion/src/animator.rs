//! Looping head animations for conversational states.
//!
//! THINKING is a slow contemplative gaze wander, SPEAKING is quick nod
//! emphasis over a gentle sway. Both are built from three phase-offset
//! sinusoids around the pose that was current when the loop started, and
//! both step at 20 Hz through `direct_write_full`. The reflex pathway
//! always wins; the coordinator simply skips the animator tick while a
//! face is being tracked.

use crate::servo::{ServoBus, ServoDriver};

const FRAME_INTERVAL: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopingAnimation {
    Thinking,
    Speaking,
}

impl LoopingAnimation {
    /// Offsets in degrees for a given time since the loop started.
    fn offsets(self, t: f32) -> (f32, f32, f32) {
        use std::f32::consts::TAU;
        match self {
            // Slow wander: the gaze drifts as if mulling something over.
            LoopingAnimation::Thinking => {
                let base = (t / 3.0 * TAU).sin() * 12.0;
                let nod = (t / 2.0 * TAU + 1.0).sin() * 4.0;
                let tilt = (t / 4.0 * TAU + 2.5).sin() * 6.0;
                (base, nod, tilt)
            }
            // Quick nod emphasis with a gentle side-to-side sway.
            LoopingAnimation::Speaking => {
                let base = (t / 2.0 * TAU).sin() * 3.0;
                let nod = (t / 0.8 * TAU + 0.7).sin() * 4.0;
                let tilt = (t / 3.0 * TAU + 1.8).sin() * 2.0;
                (base, nod, tilt)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoopingAnimator {
    current: Option<LoopingAnimation>,
    started_at: f64,
    last_frame: f64,
    home: (i32, i32, i32),
}

impl LoopingAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a loop around the current pose. Starting the loop that is
    /// already running keeps its phase; switching loops re-homes.
    pub fn start(&mut self, animation: LoopingAnimation, driver: &ServoDriver, now: f64) {
        if self.current == Some(animation) {
            return;
        }
        self.current = Some(animation);
        self.started_at = now;
        self.last_frame = 0.0;
        self.home = driver.position();
        tracing::debug!(?animation, "looping animation started");
    }

    /// Stop one loop kind. A no-op if that loop is not running, so repeated
    /// stops are safe. Returns the head to the loop's home pose.
    pub fn stop(
        &mut self,
        animation: LoopingAnimation,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
    ) {
        if self.current != Some(animation) {
            return;
        }
        self.current = None;
        let (base, nod, tilt) = self.home;
        driver.direct_write_full(bus, base, nod, tilt);
        tracing::debug!(?animation, "looping animation stopped");
    }

    pub fn stop_all(&mut self, driver: &mut ServoDriver, bus: &mut dyn ServoBus) {
        if let Some(animation) = self.current {
            self.stop(animation, driver, bus);
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<LoopingAnimation> {
        self.current
    }

    /// Advance one loop frame if 50 ms have passed.
    pub fn tick(&mut self, driver: &mut ServoDriver, bus: &mut dyn ServoBus, now: f64) {
        let Some(animation) = self.current else {
            return;
        };
        if now - self.last_frame < FRAME_INTERVAL {
            return;
        }
        self.last_frame = now;

        let t = (now - self.started_at) as f32;
        let (db, dn, dt) = animation.offsets(t);
        let (hb, hn, ht) = self.home;
        driver.direct_write_full(
            bus,
            hb + db.round() as i32,
            hn + dn.round() as i32,
            ht + dt.round() as i32,
        );
    }
}
