//! Behavior scoring and selection.
//!
//! Every cycle all eight behaviors are scored on urgency, suitability,
//! expected payoff and energy cost, then shaped by learned weights,
//! repetition penalties, episodic memory, and a variety bonus for
//! behaviors that have not run in a while. Hysteresis keeps the winner
//! in place for at least ten seconds unless a clear threat appears.

use rand::Rng;
use wren_core::{Affect, Behavior, Needs, Personality};

use crate::episodic::EpisodicMemory;
use crate::spatial::SpatialMemory;

const MIN_DWELL_S: f64 = 10.0;
const SWITCH_THRESHOLD: f32 = 0.15;
pub const WEIGHT_MIN: f32 = 0.3;
pub const WEIGHT_MAX: f32 = 1.7;

#[derive(Debug, Clone, Copy)]
pub struct BehaviorScore {
    pub behavior: Behavior,
    pub urgency: f32,
    pub suitability: f32,
    pub expected_payoff: f32,
    pub energy_cost: f32,
    pub final_score: f32,
}

impl BehaviorScore {
    fn finish(mut self, weight: f32) -> Self {
        let combined = self.urgency * 0.4 + self.suitability * 0.3
            + self.expected_payoff * 0.2
            - self.energy_cost * 0.1;
        self.final_score = combined.clamp(0.0, 1.0) * weight;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorSelector {
    weights: [f32; 8],
    success_history: [f32; 8],
    consecutive: [u32; 8],
    execution_counts: [u32; 8],
    last_execution: [Option<f64>; 8],
    last_behavior: Behavior,
    last_change: f64,
    dwell_start: f64,
    stuck_counter: u32,
}

impl Default for BehaviorSelector {
    fn default() -> Self {
        Self {
            weights: [1.0; 8],
            success_history: [0.0; 8],
            consecutive: [0; 8],
            execution_counts: [0; 8],
            last_execution: [None; 8],
            last_behavior: Behavior::Idle,
            last_change: 0.0,
            dwell_start: 0.0,
            stuck_counter: 0,
        }
    }
}

impl BehaviorSelector {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Scoring
    // ========================================================================

    pub fn score_all(
        &self,
        needs: &Needs,
        personality: &Personality,
        affect: &Affect,
        memory: &SpatialMemory,
        episodic: &EpisodicMemory,
        current_direction: usize,
        now: f64,
    ) -> Vec<BehaviorScore> {
        let mut scores = vec![
            self.score_idle(needs, affect),
            self.score_explore(needs, personality),
            self.score_investigate(personality, affect, memory, current_direction),
            self.score_social(needs, personality, memory),
            self.score_retreat(needs, personality, affect),
            self.score_rest(needs, affect),
            self.score_play(needs, personality, affect),
            self.score_vigilant(needs, personality),
        ];

        for score in &mut scores {
            self.apply_repetition_penalty(score);
            self.apply_variety_bonus(score, now);
            self.apply_memory_influence(score, episodic);
        }
        scores.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        scores
    }

    fn score_idle(&self, needs: &Needs, affect: &Affect) -> BehaviorScore {
        BehaviorScore {
            behavior: Behavior::Idle,
            urgency: 0.1,
            suitability: (1.0 - needs.imbalance()) * (1.0 - affect.arousal),
            expected_payoff: 0.1,
            energy_cost: 0.0,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::Idle))
    }

    fn score_explore(&self, needs: &Needs, personality: &Personality) -> BehaviorScore {
        let mut urgency = if needs.needs_stimulation() {
            0.5 - needs.stimulation
        } else {
            0.0
        };
        urgency += needs.novelty * 0.3;
        // A long calm stretch pushes toward getting out there.
        if needs.consecutive_calm_cycles() > 30 {
            urgency += 0.3;
        }

        let suitability = personality.effective_curiosity()
            * needs.energy
            * (1.0 - personality.caution * 0.3);

        BehaviorScore {
            behavior: Behavior::Explore,
            urgency,
            suitability,
            expected_payoff: 0.6,
            energy_cost: 0.6,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::Explore))
    }

    fn score_investigate(
        &self,
        personality: &Personality,
        affect: &Affect,
        memory: &SpatialMemory,
        direction: usize,
    ) -> BehaviorScore {
        let novelty = memory.novelty(direction);
        let change = memory.recent_change(direction);

        BehaviorScore {
            behavior: Behavior::Investigate,
            urgency: novelty * 0.7 + if change > 20.0 { 0.3 } else { 0.0 },
            suitability: personality.curiosity
                * affect.arousal
                * (0.7 + personality.caution * 0.3),
            expected_payoff: 0.7,
            energy_cost: 0.5,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::Investigate))
    }

    fn score_social(
        &self,
        needs: &Needs,
        personality: &Personality,
        memory: &SpatialMemory,
    ) -> BehaviorScore {
        let human = memory.likely_human_present();
        BehaviorScore {
            behavior: Behavior::SocialEngage,
            urgency: if needs.needs_social() {
                0.5 - needs.social
            } else {
                0.0
            },
            suitability: personality.effective_sociability()
                * if human { 1.0 } else { 0.1 }
                * if needs.safety > 0.4 { 1.0 } else { 0.3 },
            expected_payoff: 0.8,
            energy_cost: 0.4,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::SocialEngage))
    }

    fn score_retreat(
        &self,
        needs: &Needs,
        personality: &Personality,
        affect: &Affect,
    ) -> BehaviorScore {
        let mut urgency = if needs.feels_threatened() { 0.6 } else { 0.0 };
        if affect.is_negative() && affect.is_activated() {
            urgency += 0.3;
        }
        // Diminishing returns after a run of retreats.
        if self.consecutive[Behavior::Retreat.index()] > 2 {
            urgency *= 0.5;
        }

        BehaviorScore {
            behavior: Behavior::Retreat,
            urgency,
            suitability: personality.caution,
            expected_payoff: 0.4,
            energy_cost: 0.3,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::Retreat))
    }

    fn score_rest(&self, needs: &Needs, affect: &Affect) -> BehaviorScore {
        let mut urgency = if needs.needs_rest() { 0.8 } else { 0.0 };
        // Rest breaks a defensive loop.
        if self.consecutive[Behavior::Retreat.index()] > 3
            || self.consecutive[Behavior::Vigilant.index()] > 3
        {
            urgency += 0.4;
        }

        let mut suitability = (1.0 - needs.energy) * (1.0 - affect.arousal);
        if affect.is_positive() && affect.is_calm() {
            suitability += 0.3;
        }

        BehaviorScore {
            behavior: Behavior::Rest,
            urgency,
            suitability,
            expected_payoff: 0.5,
            energy_cost: -0.3,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::Rest))
    }

    fn score_play(
        &self,
        needs: &Needs,
        personality: &Personality,
        affect: &Affect,
    ) -> BehaviorScore {
        BehaviorScore {
            behavior: Behavior::Play,
            urgency: needs.expression * 0.5,
            suitability: personality.playfulness
                * needs.energy
                * if affect.is_positive() { 1.5 } else { 0.5 },
            expected_payoff: 0.6,
            energy_cost: 0.7,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::Play))
    }

    fn score_vigilant(&self, needs: &Needs, personality: &Personality) -> BehaviorScore {
        BehaviorScore {
            behavior: Behavior::Vigilant,
            urgency: (1.0 - needs.safety) * 0.5,
            suitability: personality.caution
                * if needs.safety > 0.3 && needs.safety < 0.7 {
                    1.0
                } else {
                    0.3
                },
            expected_payoff: 0.4,
            energy_cost: 0.3,
            final_score: 0.0,
        }
        .finish(self.weight(Behavior::Vigilant))
    }

    fn apply_repetition_penalty(&self, score: &mut BehaviorScore) {
        let consecutive = self.consecutive[score.behavior.index()];
        if consecutive > 0 {
            let penalty = (1.0 - consecutive as f32 * 0.2).clamp(0.2, 1.0);
            score.final_score *= penalty;
        }
    }

    fn apply_variety_bonus(&self, score: &mut BehaviorScore, now: f64) {
        if let Some(last) = self.last_execution[score.behavior.index()] {
            let minutes_since = ((now - last).max(0.0) / 60.0) as f32;
            score.final_score += (minutes_since / 5.0).min(0.3);
        }
    }

    fn apply_memory_influence(&self, score: &mut BehaviorScore, episodic: &EpisodicMemory) {
        if !episodic.has_experience_with(score.behavior) {
            return;
        }
        let mut memory_weight = 0.5 + episodic.average_outcome(score.behavior);
        if episodic.count_successful(score.behavior) > 3 {
            memory_weight += 0.1;
        }
        score.final_score *= memory_weight;
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Pick from sorted scores with dwell-time hysteresis. A RETREAT scoring
    /// above 0.8 bypasses hysteresis entirely.
    pub fn select(
        &mut self,
        scores: &[BehaviorScore],
        rng: &mut impl Rng,
        now: f64,
    ) -> Behavior {
        let Some(best) = scores.first() else {
            return self.last_behavior;
        };

        let dwell_met = now - self.dwell_start >= MIN_DWELL_S;
        let current_score = scores
            .iter()
            .find(|s| s.behavior == self.last_behavior)
            .map_or(0.0, |s| s.final_score);
        let significantly_better = best.final_score > current_score + SWITCH_THRESHOLD;
        let safety_override = best.behavior == Behavior::Retreat && best.final_score > 0.8;

        let mut candidate = best.behavior;
        if safety_override || (dwell_met && significantly_better) {
            if candidate != self.last_behavior {
                self.dwell_start = now;
            }
        } else {
            candidate = self.last_behavior;
        }

        // Occasional second-best pick for variety.
        if dwell_met && scores.len() > 1 && rng.gen_range(0..100u32) < 10 {
            let second = &scores[1];
            if second.final_score > current_score + SWITCH_THRESHOLD {
                self.dwell_start = now;
                self.track(second.behavior, now);
                return second.behavior;
            }
        }

        self.track(candidate, now);
        candidate
    }

    fn track(&mut self, selected: Behavior, now: f64) {
        for (i, count) in self.consecutive.iter_mut().enumerate() {
            if i == selected.index() {
                *count += 1;
            } else {
                *count = 0;
            }
        }
        if selected != self.last_behavior {
            self.last_change = now;
            self.last_behavior = selected;
        }
        self.execution_counts[selected.index()] += 1;
    }

    pub fn record_execution(&mut self, behavior: Behavior, now: f64) {
        self.last_execution[behavior.index()] = Some(now);
    }

    // ========================================================================
    // Stuck detection and escape
    // ========================================================================

    /// Same behavior for more than five cycles and fifteen seconds, three
    /// checks in a row, means the loop needs breaking.
    pub fn is_stuck(&mut self, now: f64) -> bool {
        let count = self.consecutive[self.last_behavior.index()];
        if count > 5 && now - self.last_change > 15.0 {
            self.stuck_counter += 1;
            if self.stuck_counter > 2 {
                tracing::warn!(behavior = %self.last_behavior, "behavior loop detected");
                return true;
            }
        } else {
            self.stuck_counter = 0;
        }
        false
    }

    /// Break out of a loop by favoring the least-repeated alternative.
    pub fn force_alternative(&mut self, scores: &[BehaviorScore], now: f64) -> Behavior {
        let mut best: Option<(Behavior, f32)> = None;
        for score in scores {
            if score.behavior == self.last_behavior {
                continue;
            }
            let repeat = self.consecutive[score.behavior.index()] as f32;
            let adjusted = score.final_score * (1.0 + (10.0 - repeat) * 0.1);
            if best.is_none_or(|(_, s)| adjusted > s) {
                best = Some((score.behavior, adjusted));
            }
        }
        let chosen = best.map_or(Behavior::Explore, |(b, _)| b);
        self.stuck_counter = 0;
        self.track(chosen, now);
        chosen
    }

    // ========================================================================
    // Learning
    // ========================================================================

    pub fn update_weight(&mut self, behavior: Behavior, outcome: f32) {
        let i = behavior.index();
        self.success_history[i] = self.success_history[i] * 0.9 + outcome * 0.1;
        self.weights[i] = (self.weights[i] + outcome * 0.05).clamp(WEIGHT_MIN, WEIGHT_MAX);
    }

    pub fn weight(&self, behavior: Behavior) -> f32 {
        self.weights[behavior.index()]
    }

    pub fn set_weight(&mut self, behavior: Behavior, weight: f32) {
        self.weights[behavior.index()] = weight.clamp(WEIGHT_MIN, WEIGHT_MAX);
    }

    pub fn success_history(&self, behavior: Behavior) -> f32 {
        self.success_history[behavior.index()]
    }

    pub fn consecutive_count(&self, behavior: Behavior) -> u32 {
        self.consecutive[behavior.index()]
    }

    pub fn current_behavior(&self) -> Behavior {
        self.last_behavior
    }
}
