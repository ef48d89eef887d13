//! Three-dimensional affect (arousal, valence, dominance) with momentum.
//!
//! Targets are computed from needs, personality and the scene, then the
//! state chases them with velocity so emotion has inertia instead of
//! snapping. A discrete label cascade maps the continuous point to the
//! eight expression labels the host understands.

use serde::{Deserialize, Serialize};

use crate::needs::Needs;
use crate::num::deserialize_safe_f32;
use crate::personality::Personality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmotionLabel {
    Neutral,
    Excited,
    Curious,
    Content,
    Anxious,
    Startled,
    Bored,
    Confused,
}

impl EmotionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Neutral => "NEUTRAL",
            EmotionLabel::Excited => "EXCITED",
            EmotionLabel::Curious => "CURIOUS",
            EmotionLabel::Content => "CONTENT",
            EmotionLabel::Anxious => "ANXIOUS",
            EmotionLabel::Startled => "STARTLED",
            EmotionLabel::Bored => "BORED",
            EmotionLabel::Confused => "CONFUSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "NEUTRAL" => EmotionLabel::Neutral,
            "EXCITED" => EmotionLabel::Excited,
            "CURIOUS" => EmotionLabel::Curious,
            "CONTENT" => EmotionLabel::Content,
            "ANXIOUS" => EmotionLabel::Anxious,
            "STARTLED" => EmotionLabel::Startled,
            "BORED" => EmotionLabel::Bored,
            "CONFUSED" => EmotionLabel::Confused,
            _ => return None,
        })
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affect {
    /// 0 = calm/sleepy, 1 = alert/activated.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub arousal: f32,
    /// -1 = negative, +1 = positive.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub valence: f32,
    /// 0 = submissive, 1 = confident.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub dominance: f32,
    /// 0 = weak emotion, 1 = strong emotion. Derived each update.
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub intensity: f32,

    baseline_valence: f32,
    baseline_arousal: f32,
    arousal_velocity: f32,
    valence_velocity: f32,
    prev_arousal: f32,
}

impl Default for Affect {
    fn default() -> Self {
        Self {
            arousal: 0.5,
            valence: 0.0,
            dominance: 0.5,
            intensity: 0.3,
            baseline_valence: 0.1,
            baseline_arousal: 0.5,
            arousal_velocity: 0.0,
            valence_velocity: 0.0,
            prev_arousal: 0.5,
        }
    }
}

impl Affect {
    pub fn update(
        &mut self,
        needs: &Needs,
        personality: &Personality,
        distance_cm: f32,
        distance_change_cm: f32,
        novelty: f32,
        dt: f32,
    ) {
        // Arousal target: stimulation hunger, energy, novelty, sudden motion.
        let mut target_arousal = 0.5;
        if needs.needs_stimulation() {
            target_arousal += 0.2;
        }
        target_arousal += needs.energy * 0.3;
        target_arousal += novelty * 0.3;
        if distance_change_cm > 20.0 {
            target_arousal += 0.3;
        }
        target_arousal *= 0.7 + personality.excitability * 0.6;

        // Valence target: need balance, safety, proximity.
        let mut target_valence = 0.0;
        let need_balance = 1.0 - needs.imbalance();
        target_valence += (need_balance - 0.5) * 0.8;

        if needs.feels_threatened() {
            target_valence -= 0.5;
        } else {
            target_valence += (needs.safety - 0.5) * 0.4;
        }

        // Something nearby is interesting when safe, unnerving when not.
        if distance_cm < 30.0 && distance_cm > 5.0 {
            if needs.safety > 0.6 {
                target_valence += 0.2 * personality.curiosity;
            } else {
                target_valence -= 0.2;
            }
        }
        if distance_cm < 10.0 {
            target_valence -= 0.3;
        }

        // Dominance target: energy, safety, disposition.
        let mut target_dominance = 0.5;
        target_dominance += (needs.energy - 0.5) * 0.4;
        target_dominance += (needs.safety - 0.5) * 0.6;
        target_dominance += (personality.risk_tolerance() - 0.5) * 0.3;
        target_dominance += (personality.persistence - 0.5) * 0.2;

        // Chase targets with momentum.
        self.arousal_velocity = (target_arousal - self.arousal) * 0.3;
        self.valence_velocity = (target_valence - self.valence) * 0.3;

        self.arousal += self.arousal_velocity * dt * 5.0;
        self.valence += self.valence_velocity * dt * 5.0;
        self.dominance += (target_dominance - self.dominance) * dt * 3.0;

        // Slow pull back toward baseline mood.
        self.valence += (self.baseline_valence - self.valence) * 0.05 * dt;
        self.arousal += (self.baseline_arousal - self.arousal) * 0.03 * dt;

        self.intensity = (self.valence_velocity * self.valence_velocity
            + self.arousal_velocity * self.arousal_velocity)
            .sqrt();
        self.intensity += self.valence.abs() * 0.3 + (self.arousal - 0.5).abs() * 0.3;

        // Strong emotion resists change.
        let magnitude = (self.arousal * self.arousal + self.valence * self.valence).sqrt();
        if magnitude > 0.7 {
            self.arousal_velocity *= 0.6;
            self.valence_velocity *= 0.6;
        }

        // After a big swing, a small settling oscillation.
        let arousal_delta = (self.arousal - self.prev_arousal).abs();
        if arousal_delta > 0.15 {
            self.arousal_velocity += (self.arousal - self.prev_arousal) * 0.05;
        }
        self.prev_arousal = self.arousal;

        self.clamp();
    }

    /// Additive push from an external signal, e.g. the host vision summary.
    pub fn nudge(&mut self, arousal: f32, valence: f32, dominance: f32) {
        self.arousal += arousal;
        self.valence += valence;
        self.dominance += dominance;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.arousal = self.arousal.clamp(0.0, 1.0);
        self.valence = self.valence.clamp(-1.0, 1.0);
        self.dominance = self.dominance.clamp(0.0, 1.0);
        self.intensity = self.intensity.clamp(0.0, 1.0);
    }

    pub fn label(&self) -> EmotionLabel {
        if self.intensity < 0.2 {
            return EmotionLabel::Neutral;
        }

        if self.arousal > 0.7 {
            return if self.valence > 0.3 {
                EmotionLabel::Excited
            } else if self.valence < -0.3 {
                if self.arousal > 0.85 {
                    EmotionLabel::Startled
                } else {
                    EmotionLabel::Anxious
                }
            } else {
                EmotionLabel::Curious
            };
        }

        if self.arousal > 0.4 {
            if self.valence > 0.2 {
                return EmotionLabel::Curious;
            } else if self.valence < -0.2 {
                return EmotionLabel::Confused;
            }
        }

        if self.arousal < 0.4 {
            if self.valence > 0.3 {
                return EmotionLabel::Content;
            } else if self.valence < -0.2 {
                return EmotionLabel::Bored;
            }
        }

        EmotionLabel::Neutral
    }

    pub fn is_positive(&self) -> bool {
        self.valence > 0.2
    }

    pub fn is_negative(&self) -> bool {
        self.valence < -0.2
    }

    pub fn is_activated(&self) -> bool {
        self.arousal > 0.6
    }

    pub fn is_calm(&self) -> bool {
        self.arousal < 0.4
    }

    pub fn is_confident(&self) -> bool {
        self.dominance > 0.6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fresh_affect_is_neutral() {
        let affect = Affect::default();
        assert_eq!(affect.label(), EmotionLabel::Neutral);
    }

    #[test]
    fn test_label_cascade_corners() {
        let mut a = Affect::default();
        a.intensity = 0.5;

        a.arousal = 0.8;
        a.valence = 0.5;
        assert_eq!(a.label(), EmotionLabel::Excited);

        a.valence = -0.5;
        assert_eq!(a.label(), EmotionLabel::Anxious);

        a.arousal = 0.9;
        assert_eq!(a.label(), EmotionLabel::Startled);

        a.arousal = 0.8;
        a.valence = 0.0;
        assert_eq!(a.label(), EmotionLabel::Curious);

        a.arousal = 0.5;
        a.valence = -0.3;
        assert_eq!(a.label(), EmotionLabel::Confused);

        a.arousal = 0.2;
        a.valence = 0.5;
        assert_eq!(a.label(), EmotionLabel::Content);

        a.valence = -0.3;
        assert_eq!(a.label(), EmotionLabel::Bored);
    }

    #[test]
    fn test_low_intensity_is_always_neutral() {
        let mut a = Affect::default();
        a.arousal = 0.9;
        a.valence = 0.9;
        a.intensity = 0.1;
        assert_eq!(a.label(), EmotionLabel::Neutral);
    }

    #[test]
    fn test_sudden_change_raises_arousal() {
        let needs = Needs::default();
        let p = Personality::default();

        let mut startled = Affect::default();
        let mut calm = Affect::default();
        for _ in 0..10 {
            startled.update(&needs, &p, 100.0, 60.0, 0.0, 0.02);
            calm.update(&needs, &p, 100.0, 0.0, 0.0, 0.02);
        }
        assert!(
            startled.arousal > calm.arousal,
            "sudden distance change should activate"
        );
    }

    #[test]
    fn test_threat_pushes_valence_negative() {
        let mut needs = Needs::default();
        needs.safety = 0.2;
        let p = Personality::default();

        let mut affect = Affect::default();
        for _ in 0..50 {
            affect.update(&needs, &p, 100.0, 0.0, 0.0, 0.02);
        }
        assert!(affect.valence < 0.0);
    }

    #[test]
    fn test_nudge_clamps() {
        let mut a = Affect::default();
        a.nudge(5.0, 5.0, 5.0);
        assert_eq!(a.arousal, 1.0);
        assert_eq!(a.valence, 1.0);
        assert_eq!(a.dominance, 1.0);

        a.nudge(-5.0, -5.0, -5.0);
        assert_eq!(a.arousal, 0.0);
        assert_eq!(a.valence, -1.0);
        assert_eq!(a.dominance, 0.0);
    }

    #[test]
    fn test_label_parse_roundtrip() {
        for label in [
            EmotionLabel::Neutral,
            EmotionLabel::Excited,
            EmotionLabel::Curious,
            EmotionLabel::Content,
            EmotionLabel::Anxious,
            EmotionLabel::Startled,
            EmotionLabel::Bored,
            EmotionLabel::Confused,
        ] {
            assert_eq!(EmotionLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(EmotionLabel::parse("GRUMPY"), None);
    }

    proptest! {
        #[test]
        fn prop_update_keeps_dimensions_bounded(
            distance in 0.0f32..400.0,
            change in 0.0f32..200.0,
            novelty in 0.0f32..1.0,
            steps in 1usize..200,
        ) {
            let needs = Needs::default();
            let p = Personality::default();
            let mut affect = Affect::default();
            for _ in 0..steps {
                affect.update(&needs, &p, distance, change, novelty, 0.02);
            }
            prop_assert!((0.0..=1.0).contains(&affect.arousal));
            prop_assert!((-1.0..=1.0).contains(&affect.valence));
            prop_assert!((0.0..=1.0).contains(&affect.dominance));
            prop_assert!((0.0..=1.0).contains(&affect.intensity));
        }
    }
}
