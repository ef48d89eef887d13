//! Homeostatic needs with threat-aware safety recovery.
//!
//! Six drives in [0,1] evolve against ideal setpoints. Safety has its own
//! dynamics: threats knock it down, recovery speeds up the longer things
//! stay calm, and repeated exposure to the same disturbance habituates.

use serde::{Deserialize, Serialize};

use crate::num::deserialize_safe_f32;
use crate::personality::Personality;

pub const IDEAL_STIMULATION: f32 = 0.5;
pub const IDEAL_SOCIAL: f32 = 0.4;
pub const IDEAL_ENERGY: f32 = 0.7;
pub const IDEAL_SAFETY: f32 = 0.8;

/// Safety never drops below this, so the robot can always recover.
pub const SAFETY_FLOOR: f32 = 0.15;

/// Environment summary fed in from spatial memory each update.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSample {
    /// Average variance across directions, normalized to roughly [0,1].
    pub dynamism: f32,
    /// Sum of per-direction novelty.
    pub total_novelty: f32,
    /// Largest recent distance change in cm, for threat detection.
    pub max_recent_change: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Needs {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub stimulation: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub social: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub energy: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub safety: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub novelty: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub expression: f32,

    stimulation_rate: f32,
    social_decay_rate: f32,
    energy_cost_rate: f32,

    last_threat_time: f64,
    last_threat_magnitude: f32,
    consecutive_calm_cycles: u32,
}

impl Default for Needs {
    fn default() -> Self {
        Self {
            stimulation: 0.4,
            social: 0.3,
            energy: 0.8,
            safety: 0.7,
            novelty: 0.6,
            expression: 0.5,
            stimulation_rate: 0.01,
            social_decay_rate: 0.005,
            energy_cost_rate: 0.0,
            last_threat_time: 0.0,
            last_threat_magnitude: 0.0,
            consecutive_calm_cycles: 0,
        }
    }
}

impl Needs {
    pub fn update(
        &mut self,
        dt: f32,
        now: f64,
        personality: &Personality,
        env: EnvironmentSample,
    ) {
        // Stimulation drains in a static scene, builds in a lively one.
        if env.dynamism < 0.2 {
            self.stimulation -= self.stimulation_rate * dt * personality.curiosity;
        } else {
            self.stimulation += 0.02 * dt * env.dynamism;
        }

        self.social -= self.social_decay_rate * dt * personality.sociability;

        if env.total_novelty < 0.1 {
            self.novelty += 0.01 * dt;
        } else {
            self.novelty -= 0.02 * dt * env.total_novelty;
        }

        self.energy -= self.energy_cost_rate * dt;
        if self.energy_cost_rate < 0.01 {
            self.energy += 0.015 * dt;
        }

        self.expression += 0.008 * dt;

        // Safety: threat detection, tiered recovery, habituation.
        let threat_detected = env.max_recent_change > 50.0;
        if threat_detected {
            self.last_threat_time = now;
            self.last_threat_magnitude = env.max_recent_change / 100.0;
            self.consecutive_calm_cycles = 0;
            self.safety -= 0.05 * self.last_threat_magnitude;
            tracing::debug!(
                change_cm = env.max_recent_change,
                safety = self.safety,
                "threat detected"
            );
        } else {
            self.consecutive_calm_cycles += 1;

            let since_threat = (now - self.last_threat_time) as f32;
            let recovery_rate = if since_threat < 5.0 {
                0.01
            } else if since_threat < 15.0 {
                0.03
            } else {
                0.05 + self.consecutive_calm_cycles as f32 * 0.001
            };
            self.safety += recovery_rate * dt;

            // Sustained calm makes the remembered threat less scary.
            if self.consecutive_calm_cycles > 20 && self.last_threat_magnitude > 0.0 {
                self.last_threat_magnitude *= 0.95;
            }
        }

        self.apply_interactions();
        self.clamp();
    }

    fn apply_interactions(&mut self) {
        if self.safety < 0.3 {
            self.social *= 0.9;
        }
        if self.energy < 0.3 {
            self.stimulation *= 0.7;
        }
        if self.novelty > 0.7 {
            self.stimulation += 0.05;
        }
    }

    fn clamp(&mut self) {
        self.stimulation = self.stimulation.clamp(0.0, 1.0);
        self.social = self.social.clamp(0.0, 1.0);
        self.energy = self.energy.clamp(0.0, 1.0);
        self.safety = self.safety.clamp(SAFETY_FLOOR, 1.0);
        self.novelty = self.novelty.clamp(0.0, 1.0);
        self.expression = self.expression.clamp(0.0, 1.0);
    }

    // Satisfaction with cross-effects.

    pub fn satisfy_stimulation(&mut self, amount: f32) {
        self.stimulation += amount;
        self.expression -= amount * 0.5;
        self.clamp();
    }

    pub fn satisfy_social(&mut self, amount: f32) {
        self.social += amount;
        self.safety += amount * 0.1;
        self.clamp();
    }

    pub fn satisfy_novelty(&mut self, amount: f32) {
        self.novelty -= amount;
        self.stimulation += amount * 0.3;
        self.clamp();
    }

    pub fn consume_energy(&mut self, amount: f32) {
        self.energy -= amount;
        self.energy_cost_rate = amount / 5.0;
        self.clamp();
    }

    pub fn detect_human_presence(&mut self) {
        self.social += 0.1;
        self.safety += 0.1;
        self.clamp();
    }

    pub fn detect_threat(&mut self, now: f64) {
        self.safety -= 0.1;
        self.last_threat_time = now;
        self.consecutive_calm_cycles = 0;
        self.clamp();
    }

    /// A completed retreat restores safety and backdates the threat so
    /// recovery resumes at the medium tier.
    pub fn successful_retreat(&mut self, now: f64) {
        self.safety += 0.3;
        self.last_threat_time = now - 10.0;
        self.clamp();
        tracing::info!(safety = self.safety, "retreat succeeded, safety restored");
    }

    /// Break a stuck state by manufacturing an appetite for exploration.
    pub fn force_exploration_drive(&mut self) {
        self.stimulation = 0.3;
        self.novelty = 0.7;
        self.safety = 0.5;
    }

    // Homeostatic pressure.

    pub fn stimulation_pressure(&self) -> f32 {
        (self.stimulation - IDEAL_STIMULATION).abs()
    }

    pub fn social_pressure(&self) -> f32 {
        (self.social - IDEAL_SOCIAL).abs()
    }

    pub fn energy_pressure(&self) -> f32 {
        (self.energy - IDEAL_ENERGY).abs()
    }

    pub fn safety_pressure(&self) -> f32 {
        (self.safety - IDEAL_SAFETY).abs()
    }

    pub fn imbalance(&self) -> f32 {
        (self.stimulation_pressure()
            + self.social_pressure()
            + self.energy_pressure()
            + self.safety_pressure())
            / 4.0
    }

    pub fn needs_stimulation(&self) -> bool {
        self.stimulation < IDEAL_STIMULATION
    }

    pub fn needs_social(&self) -> bool {
        self.social < IDEAL_SOCIAL
    }

    pub fn needs_rest(&self) -> bool {
        self.energy < 0.3
    }

    pub fn feels_threatened(&self) -> bool {
        self.safety < 0.4
    }

    pub fn needs_novelty(&self) -> bool {
        self.novelty > 0.7
    }

    pub fn consecutive_calm_cycles(&self) -> u32 {
        self.consecutive_calm_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calm_env() -> EnvironmentSample {
        EnvironmentSample {
            dynamism: 0.0,
            total_novelty: 0.0,
            max_recent_change: 0.0,
        }
    }

    #[test]
    fn test_stimulation_drains_in_static_scene() {
        let mut needs = Needs::default();
        let p = Personality::default();
        let before = needs.stimulation;
        needs.update(1.0, 0.0, &p, calm_env());
        assert!(needs.stimulation < before);
    }

    #[test]
    fn test_stimulation_builds_in_lively_scene() {
        let mut needs = Needs::default();
        let p = Personality::default();
        let env = EnvironmentSample {
            dynamism: 0.8,
            ..calm_env()
        };
        let before = needs.stimulation;
        needs.update(1.0, 0.0, &p, env);
        assert!(needs.stimulation > before);
    }

    #[test]
    fn test_threat_drops_safety() {
        let mut needs = Needs::default();
        let p = Personality::default();
        let env = EnvironmentSample {
            max_recent_change: 80.0,
            ..calm_env()
        };
        let before = needs.safety;
        needs.update(0.02, 10.0, &p, env);
        assert!(needs.safety < before, "a big scene change must reduce safety");
    }

    #[test]
    fn test_safety_floor_holds() {
        let mut needs = Needs::default();
        let p = Personality::default();
        let env = EnvironmentSample {
            max_recent_change: 100.0,
            ..calm_env()
        };
        for i in 0..1000 {
            needs.update(0.1, i as f64 * 0.1, &p, env);
        }
        assert!(needs.safety >= SAFETY_FLOOR);
    }

    #[test]
    fn test_safety_recovery_accelerates_with_calm() {
        let mut needs = Needs::default();
        let p = Personality::default();

        // Threat at t=0.
        needs.update(
            0.02,
            0.0,
            &p,
            EnvironmentSample {
                max_recent_change: 90.0,
                ..calm_env()
            },
        );
        let low = needs.safety;

        // Recovery right after the threat is slow.
        needs.update(1.0, 1.0, &p, calm_env());
        let early_gain = needs.safety - low;

        // Recovery long after the threat is faster per unit time.
        let mid = needs.safety;
        needs.update(1.0, 60.0, &p, calm_env());
        let late_gain = needs.safety - mid;

        assert!(
            late_gain > early_gain,
            "late recovery {} should beat early recovery {}",
            late_gain,
            early_gain
        );
    }

    #[test]
    fn test_satisfy_social_boosts_safety() {
        let mut needs = Needs::default();
        needs.safety = 0.5;
        needs.satisfy_social(0.4);
        assert!((needs.social - 0.7).abs() < 1e-6);
        assert!((needs.safety - 0.54).abs() < 1e-6);
    }

    #[test]
    fn test_satisfy_stimulation_spends_expression() {
        let mut needs = Needs::default();
        needs.satisfy_stimulation(0.2);
        assert!((needs.stimulation - 0.6).abs() < 1e-6);
        assert!((needs.expression - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_successful_retreat() {
        let mut needs = Needs::default();
        needs.safety = 0.2;
        needs.successful_retreat(100.0);
        assert!((needs.safety - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_force_exploration_drive() {
        let mut needs = Needs::default();
        needs.force_exploration_drive();
        assert_eq!(needs.stimulation, 0.3);
        assert_eq!(needs.novelty, 0.7);
        assert_eq!(needs.safety, 0.5);
    }

    #[test]
    fn test_imbalance_at_ideals_is_zero() {
        let mut needs = Needs::default();
        needs.stimulation = IDEAL_STIMULATION;
        needs.social = IDEAL_SOCIAL;
        needs.energy = IDEAL_ENERGY;
        needs.safety = IDEAL_SAFETY;
        assert!(needs.imbalance() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_needs_stay_in_range(
            dt in 0.001f32..2.0,
            dynamism in 0.0f32..1.0,
            total_novelty in 0.0f32..8.0,
            max_change in 0.0f32..200.0,
            steps in 1usize..100,
        ) {
            let mut needs = Needs::default();
            let p = Personality::default();
            let env = EnvironmentSample { dynamism, total_novelty, max_recent_change: max_change };
            for i in 0..steps {
                needs.update(dt, i as f64 * dt as f64, &p, env);
            }
            prop_assert!((0.0..=1.0).contains(&needs.stimulation));
            prop_assert!((0.0..=1.0).contains(&needs.social));
            prop_assert!((0.0..=1.0).contains(&needs.energy));
            prop_assert!((SAFETY_FLOOR..=1.0).contains(&needs.safety));
            prop_assert!((0.0..=1.0).contains(&needs.novelty));
            prop_assert!((0.0..=1.0).contains(&needs.expression));
        }
    }
}
