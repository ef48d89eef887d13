//! Standardized outcome measurement for learning.
//!
//! Snapshot the inner state before a behavior runs, then score how the
//! cycle went on a 0..1 scale: need satisfaction 40%, emotional
//! improvement 30%, goal alignment 20%, safety maintenance 10%.

use wren_core::{Affect, Behavior, Needs};

use crate::goals::GoalFormation;

const WEIGHT_NEEDS: f32 = 0.40;
const WEIGHT_EMOTION: f32 = 0.30;
const WEIGHT_GOAL: f32 = 0.20;
const WEIGHT_SAFETY: f32 = 0.10;

#[derive(Debug, Clone)]
pub struct OutcomeCalculator {
    stimulation: f32,
    social: f32,
    energy: f32,
    safety: f32,
    novelty: f32,
    arousal: f32,
    valence: f32,
}

impl Default for OutcomeCalculator {
    fn default() -> Self {
        Self {
            stimulation: 0.5,
            social: 0.5,
            energy: 0.5,
            safety: 0.5,
            novelty: 0.5,
            arousal: 0.5,
            valence: 0.5,
        }
    }
}

impl OutcomeCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&mut self, needs: &Needs, affect: &Affect) {
        self.stimulation = needs.stimulation;
        self.social = needs.social;
        self.energy = needs.energy;
        self.safety = needs.safety;
        self.novelty = needs.novelty;
        self.arousal = affect.arousal;
        self.valence = affect.valence;
    }

    pub fn calculate(
        &self,
        behavior: Behavior,
        needs_after: &Needs,
        affect_after: &Affect,
        goals: Option<&GoalFormation>,
    ) -> f32 {
        let mut outcome = 0.5;
        outcome += self.need_improvement(behavior, needs_after) * WEIGHT_NEEDS;
        outcome += self.emotional_improvement(affect_after) * WEIGHT_EMOTION;
        if let Some(goals) = goals {
            if goals.has_active_goal() {
                outcome += Self::goal_alignment(behavior, goals) * WEIGHT_GOAL;
            }
        }
        outcome += self.safety_maintenance(behavior, needs_after) * WEIGHT_SAFETY;
        outcome.clamp(0.0, 1.0)
    }

    fn need_improvement(&self, behavior: Behavior, after: &Needs) -> f32 {
        use Behavior::*;
        let mut improvement = 0.0;

        let stim_change = after.stimulation - self.stimulation;
        improvement += stim_change
            * if matches!(behavior, Explore | Investigate | Play) {
                2.0
            } else {
                0.5
            };

        let social_change = after.social - self.social;
        improvement += social_change * if behavior == SocialEngage { 3.0 } else { 0.5 };

        let energy_change = after.energy - self.energy;
        if behavior == Rest {
            improvement += energy_change * 2.0;
        } else if matches!(behavior, Play | Explore) {
            improvement += energy_change * 0.3;
        }

        // Investigation resolving novelty counts as a win.
        let novelty_change = after.novelty - self.novelty;
        if behavior == Investigate {
            improvement += -novelty_change * 1.5;
        }

        improvement.clamp(-0.3, 0.3)
    }

    fn emotional_improvement(&self, after: &Affect) -> f32 {
        let mut improvement = (after.valence - self.valence) * 0.5;

        // Moderate arousal is the sweet spot.
        let off_target_before = (self.arousal - 0.5).abs();
        let off_target_after = (after.arousal - 0.5).abs();
        improvement += (off_target_before - off_target_after) * 0.2;

        improvement.clamp(-0.2, 0.2)
    }

    fn goal_alignment(behavior: Behavior, goals: &GoalFormation) -> f32 {
        let aligned = goals.current().is_some_and(|goal| {
            use crate::goals::GoalType;
            match goal.kind {
                GoalType::UnderstandPattern => {
                    matches!(behavior, Behavior::Investigate | Behavior::Explore)
                }
                other => behavior == other.primary_behavior(),
            }
        });
        if aligned {
            0.2
        } else {
            0.0
        }
    }

    fn safety_maintenance(&self, behavior: Behavior, after: &Needs) -> f32 {
        let change = after.safety - self.safety;
        if change < 0.0 {
            // A retreat that still lost safety failed at its whole job.
            if behavior == Behavior::Retreat {
                -0.15
            } else {
                -0.05
            }
        } else if change > 0.0 {
            0.05
        } else {
            0.0
        }
    }
}
