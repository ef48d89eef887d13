//! Three-axis servo driver with easing, jitter and hesitation.
//!
//! All writes funnel through the `ServoBus` trait so the same driver runs
//! against real PWM hardware and against a recording mock in tests. Every
//! angle is clamped to the mechanical limits before it reaches the bus;
//! nothing above this layer needs to worry about tearing a gear.

use rand::Rng;
use wren_core::MovementStyle;

// Mechanical limits in degrees.
pub const BASE_MIN: i32 = 10;
pub const BASE_MAX: i32 = 170;
pub const NOD_MIN: i32 = 80;
pub const NOD_MAX: i32 = 150;
pub const TILT_MIN: i32 = 20;
pub const TILT_MAX: i32 = 150;

pub const BASE_CENTER: i32 = 90;
pub const NOD_CENTER: i32 = 115;
pub const TILT_CENTER: i32 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Base,
    Nod,
    Tilt,
}

impl Axis {
    pub fn clamp(self, angle: i32) -> i32 {
        match self {
            Axis::Base => angle.clamp(BASE_MIN, BASE_MAX),
            Axis::Nod => angle.clamp(NOD_MIN, NOD_MAX),
            Axis::Tilt => angle.clamp(TILT_MIN, TILT_MAX),
        }
    }
}

/// Hardware seam. The real implementation pokes PWM registers and sleeps;
/// the mock records everything for assertions.
pub trait ServoBus {
    fn write(&mut self, axis: Axis, angle: i32);
    fn delay_ms(&mut self, ms: u64);
}

/// Test bus that records writes instead of moving anything.
#[derive(Debug, Default)]
pub struct MockServoBus {
    pub writes: Vec<(Axis, i32)>,
    pub delays_ms: u64,
}

impl MockServoBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes_for(&self, axis: Axis) -> Vec<i32> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == axis)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl ServoBus for MockServoBus {
    fn write(&mut self, axis: Axis, angle: i32) {
        self.writes.push((axis, angle));
    }

    fn delay_ms(&mut self, ms: u64) {
        self.delays_ms += ms;
    }
}

fn ease_in_out(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

fn apply_easing(t: f32, smoothness: f32) -> f32 {
    if smoothness > 0.75 {
        ease_in_out_cubic(t)
    } else if smoothness > 0.5 {
        ease_in_out(t)
    } else {
        t
    }
}

/// Tracks commanded positions and renders styled motion onto the bus.
#[derive(Debug, Clone)]
pub struct ServoDriver {
    base: i32,
    nod: i32,
    tilt: i32,
}

impl Default for ServoDriver {
    fn default() -> Self {
        Self {
            base: 90,
            nod: 110,
            tilt: 85,
        }
    }
}

impl ServoDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, bus: &mut dyn ServoBus, base: i32, nod: i32, tilt: i32) {
        self.base = Axis::Base.clamp(base);
        self.nod = Axis::Nod.clamp(nod);
        self.tilt = Axis::Tilt.clamp(tilt);
        bus.write(Axis::Base, self.base);
        bus.write(Axis::Nod, self.nod);
        bus.write(Axis::Tilt, self.tilt);
    }

    pub fn position(&self) -> (i32, i32, i32) {
        (self.base, self.nod, self.tilt)
    }

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn nod(&self) -> i32 {
        self.nod
    }

    pub fn tilt(&self) -> i32 {
        self.tilt
    }

    /// Styled interpolated move. Step count scales with distance and speed,
    /// easing follows smoothness, low smoothness adds jitter, and high
    /// hesitation inserts pauses. The exact target is always written last.
    pub fn smooth_move_to(
        &mut self,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        base_target: i32,
        nod_target: i32,
        tilt_target: i32,
        style: &MovementStyle,
    ) {
        let base_target = Axis::Base.clamp(base_target);
        let nod_target = Axis::Nod.clamp(nod_target);
        let tilt_target = Axis::Tilt.clamp(tilt_target);

        let (base_start, nod_start, tilt_start) = (self.base, self.nod, self.tilt);

        let max_dist = (base_target - base_start)
            .abs()
            .max((nod_target - nod_start).abs())
            .max((tilt_target - tilt_start).abs());

        if max_dist < 2 {
            self.base = base_target;
            self.nod = nod_target;
            self.tilt = tilt_target;
            return;
        }

        let steps = ((max_dist as f32 * (2.0 - style.speed)) as i32).clamp(5, 40);
        let jitter_amount = (1.0 - style.smoothness).clamp(0.0, 0.5);
        let delay = (style.delay_ms()).clamp(5, 50);

        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let eased = apply_easing(t, style.smoothness);

            let mut base = base_start + ((base_target - base_start) as f32 * eased) as i32;
            let mut nod = nod_start + ((nod_target - nod_start) as f32 * eased) as i32;
            let mut tilt = tilt_start + ((tilt_target - tilt_start) as f32 * eased) as i32;

            if jitter_amount > 0.1 && rng.gen_range(0..100) < 30 {
                let max_jitter = (jitter_amount * 8.0) as i32;
                base += rng.gen_range(-max_jitter..=max_jitter);
                nod += rng.gen_range(-max_jitter..=max_jitter);
                tilt += rng.gen_range(-max_jitter..=max_jitter);
            }

            base = Axis::Base.clamp(base);
            nod = Axis::Nod.clamp(nod);
            tilt = Axis::Tilt.clamp(tilt);

            bus.write(Axis::Base, base);
            bus.write(Axis::Nod, nod);
            bus.write(Axis::Tilt, tilt);

            self.base = base;
            self.nod = nod;
            self.tilt = tilt;

            bus.delay_ms(delay);

            if style.hesitation > 0.3 && rng.gen_range(0..100u32) < (style.hesitation * 20.0) as u32 {
                bus.delay_ms((style.hesitation * 150.0) as u64);
            }
        }

        bus.write(Axis::Base, base_target);
        bus.write(Axis::Nod, nod_target);
        bus.write(Axis::Tilt, tilt_target);
        self.base = base_target;
        self.nod = nod_target;
        self.tilt = tilt_target;
    }

    /// Instant move for startup and emergencies.
    pub fn snap_to(&mut self, bus: &mut dyn ServoBus, base: i32, nod: i32, tilt: i32) {
        self.base = Axis::Base.clamp(base);
        self.nod = Axis::Nod.clamp(nod);
        self.tilt = Axis::Tilt.clamp(tilt);
        bus.write(Axis::Base, self.base);
        bus.write(Axis::Nod, self.nod);
        bus.write(Axis::Tilt, self.tilt);
    }

    /// Direct two-axis write for the reflex pathway. No interpolation; tilt
    /// keeps its position.
    pub fn direct_write(&mut self, bus: &mut dyn ServoBus, base: i32, nod: i32) {
        self.base = Axis::Base.clamp(base);
        self.nod = Axis::Nod.clamp(nod);
        bus.write(Axis::Base, self.base);
        bus.write(Axis::Nod, self.nod);
    }

    /// Direct three-axis write for the looping animator.
    pub fn direct_write_full(&mut self, bus: &mut dyn ServoBus, base: i32, nod: i32, tilt: i32) {
        self.base = Axis::Base.clamp(base);
        self.nod = Axis::Nod.clamp(nod);
        self.tilt = Axis::Tilt.clamp(tilt);
        bus.write(Axis::Base, self.base);
        bus.write(Axis::Nod, self.nod);
        bus.write(Axis::Tilt, self.tilt);
    }

    /// Transient nod offset following a sine breathing cycle. Does not move
    /// the tracked position; the next real move supersedes it.
    pub fn breathing_motion(
        &mut self,
        bus: &mut dyn ServoBus,
        phase: f32,
        amplitude: f32,
    ) {
        let offset = (phase * std::f32::consts::TAU).sin() * amplitude;
        bus.write(Axis::Nod, Axis::Nod.clamp(self.nod + offset as i32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_axis_clamping() {
        assert_eq!(Axis::Base.clamp(300), BASE_MAX);
        assert_eq!(Axis::Base.clamp(-20), BASE_MIN);
        assert_eq!(Axis::Nod.clamp(60), NOD_MIN);
        assert_eq!(Axis::Tilt.clamp(200), TILT_MAX);
    }

    #[test]
    fn test_snap_to_clamps_and_writes() {
        let mut bus = MockServoBus::new();
        let mut driver = ServoDriver::new();
        driver.snap_to(&mut bus, 500, 0, 85);
        assert_eq!(driver.position(), (BASE_MAX, NOD_MIN, 85));
        assert_eq!(bus.writes.len(), 3);
    }

    #[test]
    fn test_smooth_move_ends_exactly_on_target() {
        let mut bus = MockServoBus::new();
        let mut driver = ServoDriver::new();
        driver.smooth_move_to(&mut bus, &mut rng(), 130, 140, 100, &MovementStyle::default());
        assert_eq!(driver.position(), (130, 140, 100));
        let base_writes = bus.writes_for(Axis::Base);
        assert_eq!(*base_writes.last().unwrap(), 130);
    }

    #[test]
    fn test_smooth_move_step_count_bounds() {
        // 40° at default speed 0.5 gives 60 raw steps, clamped to 40.
        let mut bus = MockServoBus::new();
        let mut driver = ServoDriver::new();
        driver.smooth_move_to(&mut bus, &mut rng(), 130, 110, 85, &MovementStyle::default());
        let base_writes = bus.writes_for(Axis::Base);
        // steps+1 interpolated writes plus the final exact write
        assert_eq!(base_writes.len(), 42);
    }

    #[test]
    fn test_smooth_move_short_distance_is_silent() {
        let mut bus = MockServoBus::new();
        let mut driver = ServoDriver::new();
        driver.smooth_move_to(&mut bus, &mut rng(), 91, 110, 85, &MovementStyle::default());
        assert!(bus.writes.is_empty(), "sub-2-degree moves should not write");
        assert_eq!(driver.base(), 91);
    }

    #[test]
    fn test_every_write_is_within_limits() {
        let mut bus = MockServoBus::new();
        let mut driver = ServoDriver::new();
        let style = MovementStyle::anxious(); // low smoothness, jitter on
        driver.smooth_move_to(&mut bus, &mut rng(), 170, 150, 150, &style);
        for (axis, angle) in &bus.writes {
            assert_eq!(*angle, axis.clamp(*angle), "unclamped write {:?}", (axis, angle));
        }
    }

    #[test]
    fn test_direct_write_keeps_tilt() {
        let mut bus = MockServoBus::new();
        let mut driver = ServoDriver::new();
        driver.direct_write(&mut bus, 100, 120);
        assert_eq!(driver.position(), (100, 120, 85));
        assert!(bus.writes_for(Axis::Tilt).is_empty());
    }

    #[test]
    fn test_breathing_does_not_move_tracked_position() {
        let mut bus = MockServoBus::new();
        let mut driver = ServoDriver::new();
        driver.breathing_motion(&mut bus, 0.25, 3.0);
        assert_eq!(driver.nod(), 110, "breathing must not shift the tracked nod");
        assert_eq!(bus.writes_for(Axis::Nod), vec![113]);
    }

    #[test]
    fn test_hesitant_style_accumulates_pauses() {
        let mut fidgety = MockServoBus::new();
        let mut steady = MockServoBus::new();
        let mut driver_a = ServoDriver::new();
        let mut driver_b = ServoDriver::new();

        let hesitant = MovementStyle {
            hesitation: 0.8,
            ..MovementStyle::default()
        };
        driver_a.smooth_move_to(&mut fidgety, &mut rng(), 150, 140, 120, &hesitant);
        driver_b.smooth_move_to(&mut steady, &mut rng(), 150, 140, 120, &MovementStyle::default());
        assert!(fidgety.delays_ms > steady.delays_ms);
    }
}
