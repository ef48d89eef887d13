//! Idle-body motion: breathing, weight shifts, curious glances.
//!
//! These run every tick underneath everything else and are the first
//! thing the coordinator sheds when any higher-priority motion owns the
//! servos. All three rhythms stretch or contract with the inner state,
//! so a restless robot visibly fidgets more than a calm one.

use rand::Rng;
use wren_core::{Affect, Needs, Personality};

use crate::servo::{Axis, ServoBus, ServoDriver};

const SHIFT_INTERVAL_MIN_S: f64 = 8.0;
const GLANCE_INTERVAL_MIN_S: f64 = 5.0;
const GLANCE_HOLD_MS: u64 = 300;
const SHIFT_BASE_MIN: i32 = 15;
const SHIFT_BASE_MAX: i32 = 165;

#[derive(Debug, Clone)]
pub struct AmbientLife {
    breath_phase: f32,
    last_shift: f64,
    last_glance: f64,
    shift_direction: i32,
}

impl Default for AmbientLife {
    fn default() -> Self {
        Self {
            breath_phase: 0.0,
            last_shift: 0.0,
            last_glance: 0.0,
            shift_direction: 1,
        }
    }
}

impl AmbientLife {
    pub fn new() -> Self {
        Self::default()
    }

    /// One ambient frame. Breathing runs every call; shifts and glances
    /// fire on their own schedules.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        now: f64,
        dt: f32,
        affect: &Affect,
        needs: &Needs,
        personality: &Personality,
    ) {
        self.breathe(driver, bus, dt, affect);
        self.maybe_shift_weight(driver, bus, rng, now, needs);
        self.maybe_glance(driver, bus, rng, now, needs, personality);
    }

    /// Sine nod oscillation. Aroused means faster and deeper breaths.
    fn breathe(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        dt: f32,
        affect: &Affect,
    ) {
        let period_s = 4.0 + (1.0 - affect.arousal) * 3.0;
        self.breath_phase = (self.breath_phase + dt / period_s).fract();
        let amplitude = 2.0 + affect.arousal * 1.5;
        driver.breathing_motion(bus, self.breath_phase, amplitude);
    }

    /// Occasional small repositioning. Low energy droops the head instead.
    fn maybe_shift_weight(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        now: f64,
        needs: &Needs,
    ) {
        let interval_s =
            (30.0 - needs.stimulation_pressure() as f64 * 20.0).max(SHIFT_INTERVAL_MIN_S);
        if now - self.last_shift < interval_s {
            return;
        }
        self.last_shift = now;

        let (base, nod, tilt) = driver.position();
        if needs.energy < 0.3 {
            driver.direct_write_full(bus, base, nod - 3, tilt);
            return;
        }

        if rng.gen_bool(0.3) {
            self.shift_direction = -self.shift_direction;
        }
        let shifted = (base + self.shift_direction * 5).clamp(SHIFT_BASE_MIN, SHIFT_BASE_MAX);
        driver.direct_write_full(bus, shifted, nod, tilt);
    }

    /// Quick tilt flick toward nothing in particular, then back.
    fn maybe_glance(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        now: f64,
        needs: &Needs,
        personality: &Personality,
    ) {
        let novelty_pressure = (1.0 - needs.novelty) as f64;
        let interval_s = (45.0 - novelty_pressure * 30.0 - personality.curiosity as f64 * 10.0)
            .max(GLANCE_INTERVAL_MIN_S);
        if now - self.last_glance < interval_s {
            return;
        }
        self.last_glance = now;

        let (base, nod, tilt) = driver.position();
        let direction = if rng.gen_bool(0.5) { 1 } else { -1 };
        bus.write(Axis::Tilt, Axis::Tilt.clamp(tilt + 10 * direction));
        bus.delay_ms(GLANCE_HOLD_MS);
        driver.direct_write_full(bus, base, nod, tilt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servo::MockServoBus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(3)
    }

    fn run_seconds(
        ambient: &mut AmbientLife,
        driver: &mut ServoDriver,
        bus: &mut MockServoBus,
        affect: &Affect,
        needs: &Needs,
        personality: &Personality,
        seconds: f64,
    ) {
        let mut r = rng();
        let mut now = 0.0;
        while now < seconds {
            now += 0.02;
            ambient.tick(driver, bus, &mut r, now, 0.02, affect, needs, personality);
        }
    }

    #[test]
    fn test_breathing_oscillates_around_nod() {
        let mut ambient = AmbientLife::new();
        let mut driver = ServoDriver::new();
        let mut bus = MockServoBus::new();
        run_seconds(
            &mut ambient,
            &mut driver,
            &mut bus,
            &Affect::default(),
            &Needs::default(),
            &Personality::default(),
            10.0,
        );
        let nods = bus.writes_for(Axis::Nod);
        assert!(nods.iter().any(|&n| n > 110), "breath should lift the head");
        assert!(nods.iter().any(|&n| n < 110), "breath should drop the head");
        for n in nods {
            assert!((104..=116).contains(&n), "breath amplitude too large: {}", n);
        }
    }

    #[test]
    fn test_aroused_breathing_is_faster() {
        let calm_cycles = breath_sign_changes(0.0);
        let aroused_cycles = breath_sign_changes(1.0);
        assert!(
            aroused_cycles > calm_cycles,
            "arousal {} vs calm {} cycles",
            aroused_cycles,
            calm_cycles
        );
    }

    fn breath_sign_changes(arousal: f32) -> usize {
        let mut ambient = AmbientLife::new();
        let mut driver = ServoDriver::new();
        let mut bus = MockServoBus::new();
        let mut affect = Affect::default();
        affect.arousal = arousal;
        run_seconds(
            &mut ambient,
            &mut driver,
            &mut bus,
            &affect,
            &Needs::default(),
            &Personality::default(),
            30.0,
        );
        let nods = bus.writes_for(Axis::Nod);
        nods.windows(2)
            .filter(|w| (w[0] > 110) != (w[1] > 110))
            .count()
    }

    #[test]
    fn test_weight_shift_moves_base_eventually() {
        let mut ambient = AmbientLife::new();
        let mut driver = ServoDriver::new();
        let mut bus = MockServoBus::new();
        let mut needs = Needs::default();
        needs.stimulation = 0.0;
        run_seconds(
            &mut ambient,
            &mut driver,
            &mut bus,
            &Affect::default(),
            &needs,
            &Personality::default(),
            40.0,
        );
        assert!(
            bus.writes_for(Axis::Base).iter().any(|&b| b != 90),
            "restless robot should shift its base within 40 s"
        );
    }

    #[test]
    fn test_low_energy_droops_instead_of_shifting() {
        let mut ambient = AmbientLife::new();
        let mut driver = ServoDriver::new();
        let mut bus = MockServoBus::new();
        let mut needs = Needs::default();
        needs.energy = 0.1;
        needs.stimulation = 0.0;
        run_seconds(
            &mut ambient,
            &mut driver,
            &mut bus,
            &Affect::default(),
            &needs,
            &Personality::default(),
            40.0,
        );
        assert!(driver.nod() < 110, "tired robot should droop");
        assert_eq!(driver.base(), 90, "tired robot should not swing its base");
    }

    #[test]
    fn test_glance_returns_tilt_home() {
        let mut ambient = AmbientLife::new();
        let mut driver = ServoDriver::new();
        let mut bus = MockServoBus::new();
        let mut needs = Needs::default();
        needs.novelty = 0.0;
        let mut personality = Personality::default();
        personality.curiosity = 0.8;
        run_seconds(
            &mut ambient,
            &mut driver,
            &mut bus,
            &Affect::default(),
            &needs,
            &personality,
            20.0,
        );
        let tilts = bus.writes_for(Axis::Tilt);
        assert!(
            tilts.iter().any(|&t| (t - 85).abs() >= 10),
            "curious robot should glance within 20 s"
        );
        assert_eq!(driver.tilt(), 85, "glance must come back to rest");
    }
}
