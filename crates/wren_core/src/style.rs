//! Movement quality parameters derived from the current inner state.
//!
//! The same gesture reads very differently depending on how it is executed;
//! these five scalars are how emotion leaks into motion.

use crate::affect::Affect;
use crate::needs::Needs;
use crate::personality::Personality;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementStyle {
    /// 0 = very slow, 1 = fast.
    pub speed: f32,
    /// 0 = small movements, 1 = large.
    pub amplitude: f32,
    /// 0 = jerky, 1 = smooth.
    pub smoothness: f32,
    /// 0 = wandering path, 1 = straight to target.
    pub directness: f32,
    /// 0 = confident, 0.8 = many pauses.
    pub hesitation: f32,
}

impl Default for MovementStyle {
    fn default() -> Self {
        Self {
            speed: 0.5,
            amplitude: 0.5,
            smoothness: 0.7,
            directness: 0.6,
            hesitation: 0.2,
        }
    }
}

impl MovementStyle {
    pub fn generate(affect: &Affect, personality: &Personality, needs: &Needs) -> Self {
        let mut speed = 0.3 + affect.arousal * 0.7;
        speed *= 0.5 + needs.energy * 0.5;
        speed *= 0.9 + personality.excitability * 0.2;

        let mut amplitude = 0.4 + affect.intensity * 0.4 + affect.dominance * 0.3;
        amplitude *= 0.7 + personality.expressiveness * 0.5;
        if needs.energy < 0.4 {
            amplitude *= 0.6;
        }

        let mut smoothness = 0.5 + affect.valence * 0.3;
        smoothness -= affect.arousal * 0.2;
        smoothness += affect.dominance * 0.2;
        smoothness += personality.caution * 0.2;

        let mut directness = 0.4 + affect.dominance * 0.6;
        directness -= personality.curiosity * 0.2;
        if needs.safety < 0.5 {
            directness *= 0.7;
        }

        let mut hesitation = personality.caution * (1.0 - affect.dominance);
        if affect.is_negative() {
            hesitation += 0.2;
        }
        if needs.energy < 0.4 {
            hesitation += 0.3;
        }

        Self {
            speed: speed.clamp(0.1, 1.0),
            amplitude: amplitude.clamp(0.2, 1.0),
            smoothness: smoothness.clamp(0.2, 1.0),
            directness: directness.clamp(0.3, 1.0),
            hesitation: hesitation.clamp(0.0, 0.8),
        }
    }

    /// Per-step delay, inverse of speed: 5 ms flat out, 50 ms drowsy.
    pub fn delay_ms(&self) -> u64 {
        (50.0 - self.speed * 45.0) as u64
    }

    /// Fraction of full servo range this style uses, 50 to 100 percent.
    pub fn range_scale(&self) -> u32 {
        (50.0 + self.amplitude * 50.0) as u32
    }

    pub fn excited() -> Self {
        Self {
            speed: 0.9,
            amplitude: 0.8,
            smoothness: 0.6,
            directness: 0.8,
            hesitation: 0.1,
        }
    }

    pub fn anxious() -> Self {
        Self {
            speed: 0.6,
            amplitude: 0.4,
            smoothness: 0.3,
            directness: 0.5,
            hesitation: 0.6,
        }
    }

    pub fn content() -> Self {
        Self {
            speed: 0.4,
            amplitude: 0.5,
            smoothness: 0.9,
            directness: 0.6,
            hesitation: 0.2,
        }
    }
}
