//! Inner-life texture layered over behavior selection.
//!
//! Nothing here picks behaviors. It watches the scores, the mood, and
//! the environment and produces tension, hesitation, wondering spells,
//! and a slowly evolving self-narrative that the rest of the system can
//! surface in reports and movement.

use rand::Rng;
use wren_core::{Affect, Behavior, Needs, Personality};

use crate::selector::BehaviorScore;
use crate::spatial::{SpatialMemory, DIRECTION_COUNT};

const CONFLICT_THRESHOLD: f32 = 0.3;
const WONDER_COOLDOWN_S: f64 = 300.0;
const WONDER_MAX_DURATION_S: f64 = 45.0;
const CATCH_COOLDOWN_S: f64 = 60.0;
const MOOD_WINDOW: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpistemicState {
    Confident,
    Uncertain,
    Confused,
    Learning,
    Conflicted,
    Wondering,
}

impl EpistemicState {
    pub fn as_str(self) -> &'static str {
        match self {
            EpistemicState::Confident => "confident",
            EpistemicState::Uncertain => "uncertain",
            EpistemicState::Confused => "confused",
            EpistemicState::Learning => "learning",
            EpistemicState::Conflicted => "conflicted",
            EpistemicState::Wondering => "wondering",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WonderingType {
    Identity,
    Place,
    Purpose,
    Future,
    Past,
}

const WONDERING_TYPES: [WonderingType; 5] = [
    WonderingType::Identity,
    WonderingType::Place,
    WonderingType::Purpose,
    WonderingType::Future,
    WonderingType::Past,
];

#[derive(Debug, Clone)]
struct MotivationalTension {
    dominant: Behavior,
    suppressed: Behavior,
    level: f32,
    suppression_cost: f32,
    conflict_start: Option<f64>,
}

#[derive(Debug, Clone)]
struct SelfNarrative {
    perceived_competence: f32,
    perceived_safety: f32,
    social_confidence: f32,
    mood_trend: f32,
    mood_samples: [f32; MOOD_WINDOW],
    mood_index: usize,
    direction_preferences: [f32; DIRECTION_COUNT],
}

#[derive(Debug, Clone)]
struct Counterfactual {
    active: bool,
    regret: f32,
    relief: f32,
    started_at: f64,
}

#[derive(Debug, Clone)]
struct Wondering {
    active: bool,
    kind: WonderingType,
    intensity: f32,
    started_at: f64,
    last_spell: f64,
}

#[derive(Debug, Clone)]
pub struct ConsciousnessLayer {
    epistemic: EpistemicState,
    confidence: f32,
    tension: MotivationalTension,
    narrative: SelfNarrative,
    counterfactual: Counterfactual,
    wondering: Wondering,
    self_awareness: f32,
    uncertainty_awareness: f32,
    caught_myself: bool,
    last_catch: f64,
}

impl Default for ConsciousnessLayer {
    fn default() -> Self {
        Self {
            epistemic: EpistemicState::Confident,
            confidence: 0.7,
            tension: MotivationalTension {
                dominant: Behavior::Idle,
                suppressed: Behavior::Idle,
                level: 0.0,
                suppression_cost: 0.0,
                conflict_start: None,
            },
            narrative: SelfNarrative {
                perceived_competence: 0.5,
                perceived_safety: 0.7,
                social_confidence: 0.5,
                mood_trend: 0.0,
                mood_samples: [0.0; MOOD_WINDOW],
                mood_index: 0,
                direction_preferences: [0.0; DIRECTION_COUNT],
            },
            counterfactual: Counterfactual {
                active: false,
                regret: 0.0,
                relief: 0.0,
                started_at: 0.0,
            },
            wondering: Wondering {
                active: false,
                kind: WonderingType::Identity,
                intensity: 0.0,
                started_at: 0.0,
                last_spell: 0.0,
            },
            self_awareness: 0.5,
            uncertainty_awareness: 0.0,
            caught_myself: false,
            last_catch: 0.0,
        }
    }
}

impl ConsciousnessLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs on the medium cadence, after scoring but before selection.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        scores: &[BehaviorScore],
        needs: &Needs,
        affect: &Affect,
        personality: &Personality,
        memory: &SpatialMemory,
        rng: &mut impl Rng,
        now: f64,
    ) {
        self.update_tension(scores, personality, now);
        self.update_epistemic(memory, affect);
        self.update_narrative(affect, needs);
        self.update_counterfactual(now);
        self.update_wondering(needs, affect, rng, now);
        self.update_meta_awareness(affect, personality, rng, now);
        self.update_preferences(memory, affect);
    }

    // ========================================================================
    // Epistemic state
    // ========================================================================

    fn update_epistemic(&mut self, memory: &SpatialMemory, affect: &Affect) {
        let novelty = memory.total_novelty();
        let dynamism = memory.average_dynamism();
        let emotional_clarity = affect.valence.abs();

        (self.epistemic, self.confidence) = if self.in_conflict() {
            (EpistemicState::Conflicted, 0.3)
        } else if self.wondering.active {
            (EpistemicState::Wondering, 0.5)
        } else if novelty > 0.7 && dynamism > 0.5 {
            (EpistemicState::Learning, 0.4)
        } else if novelty > 0.5 || emotional_clarity < 0.15 {
            (EpistemicState::Uncertain, 0.5)
        } else if dynamism > 0.6 && affect.arousal > 0.6 {
            (EpistemicState::Confused, 0.3)
        } else {
            (EpistemicState::Confident, 0.8)
        };
    }

    // ========================================================================
    // Motivational tension
    // ========================================================================

    fn update_tension(&mut self, scores: &[BehaviorScore], personality: &Personality, now: f64) {
        if scores.len() < 2 {
            self.tension.level = 0.0;
            return;
        }
        // Scores arrive sorted; top two define the conflict.
        let first = &scores[0];
        let second = &scores[1];

        let gap = first.final_score - second.final_score;
        let max_score = first.final_score.max(0.01);
        let mut raw = 1.0 - gap / max_score;

        if Self::opposing(first.behavior, second.behavior) {
            raw *= 1.4;
        }
        raw *= 0.7 + personality.caution * 0.6;
        raw *= 1.3 - personality.playfulness * 0.3;

        self.tension.level = raw.clamp(0.0, 1.0);
        self.tension.dominant = first.behavior;
        self.tension.suppressed = second.behavior;

        if self.in_conflict() {
            let start = *self.tension.conflict_start.get_or_insert(now);
            let duration = (now - start).max(0.0) as f32;
            self.tension.suppression_cost = (duration * 0.1).clamp(0.0, 0.8);
        } else {
            self.tension.conflict_start = None;
            self.tension.suppression_cost *= 0.9;
        }
    }

    fn opposing(a: Behavior, b: Behavior) -> bool {
        use Behavior::*;
        matches!(
            (a, b),
            (Explore, Retreat)
                | (Retreat, Explore)
                | (SocialEngage, Retreat)
                | (Retreat, SocialEngage)
                | (Play, Rest)
                | (Rest, Play)
        )
    }

    // ========================================================================
    // Counterfactual thinking
    // ========================================================================

    pub fn trigger_counterfactual(
        &mut self,
        outcome: f32,
        rng: &mut impl Rng,
        now: f64,
    ) {
        let imagined = (outcome + rng.gen_range(-0.3..0.3)).clamp(0.0, 1.0);
        self.counterfactual.active = true;
        self.counterfactual.started_at = now;
        self.counterfactual.regret = if imagined > outcome + 0.1 {
            imagined - outcome
        } else {
            0.0
        };
        self.counterfactual.relief = if outcome > imagined + 0.1 {
            outcome - imagined
        } else {
            0.0
        };
    }

    fn update_counterfactual(&mut self, now: f64) {
        if self.counterfactual.active && now - self.counterfactual.started_at > 4.0 {
            self.counterfactual.active = false;
            self.counterfactual.regret *= 0.5;
            self.counterfactual.relief *= 0.5;
        }
    }

    // ========================================================================
    // Wondering
    // ========================================================================

    fn update_wondering(
        &mut self,
        needs: &Needs,
        affect: &Affect,
        rng: &mut impl Rng,
        now: f64,
    ) {
        if self.wondering.active {
            let duration = now - self.wondering.started_at;
            self.wondering.intensity = 0.5 + ((duration * 0.5).sin() as f32) * 0.3;
            if duration > WONDER_MAX_DURATION_S || needs.imbalance() > 0.5 {
                self.wondering.active = false;
                self.wondering.intensity = 0.0;
            }
            return;
        }

        if now - self.wondering.last_spell < WONDER_COOLDOWN_S {
            return;
        }
        // Only a peaceful, satisfied mind drifts off, and rarely even then.
        if needs.imbalance() < 0.15
            && affect.is_calm()
            && affect.valence > -0.2
            && needs.safety > 0.7
            && rng.gen_range(0..10_000u32) < 2
        {
            self.wondering.active = true;
            self.wondering.started_at = now;
            self.wondering.last_spell = now;
            self.wondering.intensity = 0.6;
            self.wondering.kind = WONDERING_TYPES[rng.gen_range(0..WONDERING_TYPES.len())];
            tracing::debug!(kind = ?self.wondering.kind, "wondering spell begins");
        }
    }

    // ========================================================================
    // Meta-awareness
    // ========================================================================

    fn update_meta_awareness(
        &mut self,
        affect: &Affect,
        personality: &Personality,
        rng: &mut impl Rng,
        now: f64,
    ) {
        let mut target = 0.3 + personality.curiosity * 0.3 - affect.arousal * 0.2;
        if self.in_conflict() {
            target += self.tension.level * 0.3;
        }
        self.self_awareness =
            (self.self_awareness + (target - self.self_awareness) * 0.1).clamp(0.0, 1.0);

        self.caught_myself = false;
        if self.self_awareness > 0.6
            && rng.gen_range(0..1000u32) < 5
            && now - self.last_catch > CATCH_COOLDOWN_S
        {
            self.caught_myself = true;
            self.last_catch = now;
        }

        if matches!(
            self.epistemic,
            EpistemicState::Uncertain | EpistemicState::Confused
        ) {
            self.uncertainty_awareness += 0.05;
        } else {
            self.uncertainty_awareness *= 0.95;
        }
        self.uncertainty_awareness = self.uncertainty_awareness.clamp(0.0, 1.0);
    }

    // ========================================================================
    // Self-narrative
    // ========================================================================

    fn update_narrative(&mut self, affect: &Affect, needs: &Needs) {
        self.narrative.mood_samples[self.narrative.mood_index] = affect.valence;
        self.narrative.mood_index = (self.narrative.mood_index + 1) % MOOD_WINDOW;

        let avg: f32 = self.narrative.mood_samples.iter().sum::<f32>() / MOOD_WINDOW as f32;
        self.narrative.mood_trend = avg - affect.valence;

        self.narrative.perceived_safety +=
            (needs.safety - self.narrative.perceived_safety) * 0.02;
    }

    pub fn record_significant_action(&mut self, outcome: f32) {
        if outcome > 0.6 {
            self.narrative.perceived_competence += 0.02;
        } else if outcome < 0.3 {
            self.narrative.perceived_competence -= 0.01;
        }
        self.narrative.perceived_competence = self.narrative.perceived_competence.clamp(0.1, 0.9);
    }

    pub fn record_social_outcome(&mut self, quality: f32) {
        self.narrative.social_confidence =
            (self.narrative.social_confidence + (quality - 0.5) * 0.05).clamp(0.1, 0.9);
    }

    fn update_preferences(&mut self, memory: &SpatialMemory, affect: &Affect) {
        for dir in 0..DIRECTION_COUNT {
            if memory.novelty(dir) > 0.3 {
                let pref = &mut self.narrative.direction_preferences[dir];
                *pref = (*pref + affect.valence * 0.005).clamp(-0.5, 0.5);
            }
        }
    }

    // ========================================================================
    // Behavior modulation
    // ========================================================================

    /// Extra hesitation before acting while torn, up to 800 ms.
    pub fn deliberation_delay_ms(&self) -> u64 {
        if !self.in_conflict() {
            return 0;
        }
        (self.tension.level * 800.0) as u64
    }

    pub fn should_show_false_start(&self, rng: &mut impl Rng) -> bool {
        self.tension.level > 0.5 && rng.gen_range(0..100u32) < 30
    }

    pub fn direction_bias(&self, direction: usize) -> f32 {
        self.narrative
            .direction_preferences
            .get(direction)
            .copied()
            .unwrap_or(0.0)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn in_conflict(&self) -> bool {
        self.tension.level > CONFLICT_THRESHOLD
    }

    pub fn tension(&self) -> f32 {
        self.tension.level
    }

    pub fn dominant_drive(&self) -> Behavior {
        self.tension.dominant
    }

    pub fn suppressed_drive(&self) -> Behavior {
        self.tension.suppressed
    }

    pub fn epistemic_state(&self) -> EpistemicState {
        self.epistemic
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_wondering(&self) -> bool {
        self.wondering.active
    }

    pub fn wondering_intensity(&self) -> f32 {
        self.wondering.intensity
    }

    pub fn self_awareness(&self) -> f32 {
        self.self_awareness
    }

    pub fn caught_myself(&self) -> bool {
        self.caught_myself
    }

    pub fn regret(&self) -> f32 {
        self.counterfactual.regret
    }

    pub fn relief(&self) -> f32 {
        self.counterfactual.relief
    }

    pub fn perceived_competence(&self) -> f32 {
        self.narrative.perceived_competence
    }

    pub fn social_confidence(&self) -> f32 {
        self.narrative.social_confidence
    }

    pub fn mood_trend(&self) -> f32 {
        self.narrative.mood_trend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(31)
    }

    fn score(behavior: Behavior, final_score: f32) -> BehaviorScore {
        BehaviorScore {
            behavior,
            urgency: 0.5,
            suitability: 0.5,
            expected_payoff: 0.5,
            energy_cost: 0.3,
            final_score,
        }
    }

    #[test]
    fn test_close_scores_create_tension() {
        let mut layer = ConsciousnessLayer::new();
        let scores = vec![score(Behavior::Explore, 0.60), score(Behavior::Retreat, 0.58)];
        layer.update(
            &scores,
            &Needs::default(),
            &Affect::default(),
            &Personality::default(),
            &SpatialMemory::new(),
            &mut rng(),
            1.0,
        );
        assert!(layer.in_conflict());
        assert_eq!(layer.epistemic_state(), EpistemicState::Conflicted);
        assert_eq!(layer.dominant_drive(), Behavior::Explore);
        assert_eq!(layer.suppressed_drive(), Behavior::Retreat);
        assert!(layer.deliberation_delay_ms() > 0);
    }

    #[test]
    fn test_clear_winner_means_no_conflict() {
        let mut layer = ConsciousnessLayer::new();
        let scores = vec![score(Behavior::Explore, 0.9), score(Behavior::Idle, 0.1)];
        let mut affect = Affect::default();
        affect.valence = 0.5;
        layer.update(
            &scores,
            &Needs::default(),
            &affect,
            &Personality::default(),
            &SpatialMemory::new(),
            &mut rng(),
            1.0,
        );
        assert!(!layer.in_conflict());
        assert_eq!(layer.deliberation_delay_ms(), 0);
    }

    #[test]
    fn test_opposing_drives_amplify_tension() {
        let make = |a, b| {
            let mut layer = ConsciousnessLayer::new();
            let scores = vec![score(a, 0.6), score(b, 0.45)];
            layer.update_tension(&scores, &Personality::default(), 1.0);
            layer.tension()
        };
        let opposing = make(Behavior::Play, Behavior::Rest);
        let aligned = make(Behavior::Play, Behavior::Explore);
        assert!(opposing > aligned);
    }

    #[test]
    fn test_suppression_cost_builds_during_conflict() {
        let mut layer = ConsciousnessLayer::new();
        let scores = vec![score(Behavior::Explore, 0.6), score(Behavior::Retreat, 0.58)];
        let p = Personality::default();
        layer.update_tension(&scores, &p, 0.0);
        let early = layer.tension.suppression_cost;
        layer.update_tension(&scores, &p, 5.0);
        let late = layer.tension.suppression_cost;
        assert!(late > early);
        assert!(late <= 0.8);
    }

    #[test]
    fn test_counterfactual_regret_and_relief_are_exclusive() {
        let mut layer = ConsciousnessLayer::new();
        let mut r = rng();
        for _ in 0..50 {
            layer.trigger_counterfactual(0.5, &mut r, 0.0);
            assert!(
                layer.regret() == 0.0 || layer.relief() == 0.0,
                "cannot feel both at once"
            );
        }
    }

    #[test]
    fn test_counterfactual_fades_after_four_seconds() {
        let mut layer = ConsciousnessLayer::new();
        let mut r = rng();
        layer.trigger_counterfactual(0.1, &mut r, 0.0);
        let regret = layer.regret();
        layer.update_counterfactual(5.0);
        assert!(!layer.counterfactual.active);
        assert!(layer.regret() <= regret);
    }

    #[test]
    fn test_competence_tracks_outcomes_with_clamps() {
        let mut layer = ConsciousnessLayer::new();
        for _ in 0..100 {
            layer.record_significant_action(0.9);
        }
        assert_eq!(layer.perceived_competence(), 0.9);
        for _ in 0..200 {
            layer.record_significant_action(0.1);
        }
        assert_eq!(layer.perceived_competence(), 0.1);
    }

    #[test]
    fn test_uncertainty_awareness_rises_in_novel_places() {
        let mut layer = ConsciousnessLayer::new();
        let mut mem = SpatialMemory::new();
        // Constant big swings keep novelty high.
        for i in 0..30 {
            let d = if i % 2 == 0 { 30.0 } else { 190.0 };
            mem.update_reading(0, d, i as f64 * 0.2);
        }
        let mut r = rng();
        let scores = vec![score(Behavior::Explore, 0.9), score(Behavior::Idle, 0.1)];
        for i in 0..20 {
            layer.update(
                &scores,
                &Needs::default(),
                &Affect::default(),
                &Personality::default(),
                &mem,
                &mut r,
                10.0 + i as f64,
            );
        }
        assert!(layer.uncertainty_awareness > 0.2);
    }
}
