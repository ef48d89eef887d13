//! Slow-drifting temperament traits.
//!
//! Traits stay inside [0.2, 0.8] so the robot always keeps some of every
//! disposition; drift only responds to evidence strong enough to matter.

use serde::{Deserialize, Serialize};

use crate::num::deserialize_safe_f32;

pub const TRAIT_MIN: f32 = 0.2;
pub const TRAIT_MAX: f32 = 0.8;

/// Minimum |evidence| before a trait moves at all.
const EVIDENCE_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Curiosity,
    Caution,
    Sociability,
    Excitability,
    Persistence,
    Playfulness,
    Expressiveness,
}

impl Trait {
    pub const ALL: [Trait; 7] = [
        Trait::Curiosity,
        Trait::Caution,
        Trait::Sociability,
        Trait::Excitability,
        Trait::Persistence,
        Trait::Playfulness,
        Trait::Expressiveness,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personality {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub curiosity: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub caution: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub sociability: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub excitability: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub persistence: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub playfulness: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub expressiveness: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            curiosity: 0.5,
            caution: 0.5,
            sociability: 0.5,
            excitability: 0.5,
            persistence: 0.5,
            playfulness: 0.5,
            expressiveness: 0.5,
        }
    }
}

impl Personality {
    /// Eager, low-caution temperament.
    pub fn bold_explorer() -> Self {
        Self {
            curiosity: 0.8,
            caution: 0.2,
            sociability: 0.5,
            excitability: 0.6,
            persistence: 0.6,
            playfulness: 0.5,
            expressiveness: 0.6,
        }
    }

    /// Careful, watchful temperament.
    pub fn shy_observer() -> Self {
        Self {
            curiosity: 0.4,
            caution: 0.8,
            sociability: 0.3,
            excitability: 0.3,
            persistence: 0.5,
            playfulness: 0.3,
            expressiveness: 0.3,
        }
    }

    /// Sociable, high-energy temperament.
    pub fn playful_friend() -> Self {
        Self {
            curiosity: 0.6,
            caution: 0.3,
            sociability: 0.8,
            excitability: 0.7,
            persistence: 0.4,
            playfulness: 0.8,
            expressiveness: 0.7,
        }
    }

    pub fn get(&self, t: Trait) -> f32 {
        match t {
            Trait::Curiosity => self.curiosity,
            Trait::Caution => self.caution,
            Trait::Sociability => self.sociability,
            Trait::Excitability => self.excitability,
            Trait::Persistence => self.persistence,
            Trait::Playfulness => self.playfulness,
            Trait::Expressiveness => self.expressiveness,
        }
    }

    pub fn set(&mut self, t: Trait, value: f32) {
        let v = value.clamp(TRAIT_MIN, TRAIT_MAX);
        match t {
            Trait::Curiosity => self.curiosity = v,
            Trait::Caution => self.caution = v,
            Trait::Sociability => self.sociability = v,
            Trait::Excitability => self.excitability = v,
            Trait::Persistence => self.persistence = v,
            Trait::Playfulness => self.playfulness = v,
            Trait::Expressiveness => self.expressiveness = v,
        }
    }

    /// Move a trait toward the evidence at the given rate. Weak evidence
    /// (|evidence| <= 0.1) is ignored so noise does not reshape temperament.
    pub fn drift(&mut self, t: Trait, evidence: f32, rate: f32) {
        if evidence.abs() <= EVIDENCE_THRESHOLD {
            return;
        }
        let current = self.get(t);
        self.set(t, current + evidence * rate);
    }

    // Derived attributes.

    /// Curiosity discounted by caution.
    pub fn effective_curiosity(&self) -> f32 {
        self.curiosity * (1.0 - self.caution * 0.4)
    }

    /// Sociability amplified by excitability.
    pub fn effective_sociability(&self) -> f32 {
        self.sociability * (0.7 + self.excitability * 0.3)
    }

    pub fn exploration_style(&self) -> f32 {
        self.curiosity * self.persistence
    }

    pub fn risk_tolerance(&self) -> f32 {
        1.0 - self.caution
    }

    /// Human-readable temperament summary for diagnostics.
    pub fn archetype(&self) -> &'static str {
        if self.curiosity > 0.65 && self.caution < 0.4 {
            "Bold Explorer"
        } else if self.caution > 0.65 && self.sociability < 0.4 {
            "Shy Observer"
        } else if self.playfulness > 0.65 && self.sociability > 0.55 {
            "Playful Friend"
        } else {
            "Balanced"
        }
    }

    /// Re-clamp every trait. Used after loading persisted state.
    pub fn normalize(&mut self) {
        for t in Trait::ALL {
            let v = self.get(t);
            self.set(t, if v.is_finite() { v } else { 0.5 });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_balanced() {
        let p = Personality::default();
        assert_eq!(p.archetype(), "Balanced");
        assert_eq!(p.curiosity, 0.5);
    }

    #[test]
    fn test_drift_ignores_weak_evidence() {
        let mut p = Personality::default();
        p.drift(Trait::Curiosity, 0.05, 0.1);
        assert_eq!(p.curiosity, 0.5, "weak evidence must not move traits");
    }

    #[test]
    fn test_drift_applies_strong_evidence() {
        let mut p = Personality::default();
        p.drift(Trait::Curiosity, 0.5, 0.1);
        assert!((p.curiosity - 0.55).abs() < 1e-6);

        p.drift(Trait::Caution, -0.5, 0.1);
        assert!((p.caution - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_traits_stay_bounded() {
        let mut p = Personality::default();
        for _ in 0..100 {
            p.drift(Trait::Curiosity, 1.0, 0.1);
        }
        assert_eq!(p.curiosity, TRAIT_MAX);

        for _ in 0..100 {
            p.drift(Trait::Curiosity, -1.0, 0.1);
        }
        assert_eq!(p.curiosity, TRAIT_MIN);
    }

    #[test]
    fn test_archetypes() {
        assert_eq!(Personality::bold_explorer().archetype(), "Bold Explorer");
        assert_eq!(Personality::shy_observer().archetype(), "Shy Observer");
        assert_eq!(Personality::playful_friend().archetype(), "Playful Friend");
    }

    #[test]
    fn test_derived_attributes() {
        let p = Personality::default();
        // curiosity 0.5 * (1 - 0.5*0.4) = 0.4
        assert!((p.effective_curiosity() - 0.4).abs() < 1e-6);
        // sociability 0.5 * (0.7 + 0.5*0.3) = 0.425
        assert!((p.effective_sociability() - 0.425).abs() < 1e-6);
        assert!((p.risk_tolerance() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_repairs_nan() {
        let mut p = Personality::default();
        p.curiosity = f32::NAN;
        p.normalize();
        assert_eq!(p.curiosity, 0.5);
    }

    proptest! {
        #[test]
        fn prop_drift_never_escapes_bounds(
            evidence in -2.0f32..2.0,
            rate in 0.0f32..1.0,
            steps in 1usize..50,
        ) {
            let mut p = Personality::default();
            for _ in 0..steps {
                p.drift(Trait::Sociability, evidence, rate);
            }
            prop_assert!(p.sociability >= TRAIT_MIN && p.sociability <= TRAIT_MAX);
        }
    }
}
