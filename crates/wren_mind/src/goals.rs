//! Multi-step goal formation and pursuit.
//!
//! A goal biases behavior selection over several cycles until its step
//! count is met, it times out, or repeated poor outcomes abandon it.
//! Resolutions are handed back to the caller so completions and
//! abandonments can land in episodic memory.

use rand::Rng;
use wren_core::{Affect, Behavior, Personality};

const FORMATION_COOLDOWN_S: f64 = 10.0;
const FORMATION_THRESHOLD: f32 = 0.6;
const GOAL_TIMEOUT_S: f64 = 60.0;
const RESUME_WINDOW_S: f64 = 30.0;
const MAX_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalType {
    InvestigateThoroughly,
    SeekSocial,
    ExploreArea,
    UnderstandPattern,
    Experiment,
    RestFully,
}

impl GoalType {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalType::InvestigateThoroughly => "investigate thoroughly",
            GoalType::SeekSocial => "seek social",
            GoalType::ExploreArea => "explore area",
            GoalType::UnderstandPattern => "understand pattern",
            GoalType::Experiment => "experiment",
            GoalType::RestFully => "rest fully",
        }
    }

    /// The behavior that primarily serves this goal.
    pub fn primary_behavior(self) -> Behavior {
        match self {
            GoalType::InvestigateThoroughly | GoalType::UnderstandPattern => Behavior::Investigate,
            GoalType::SeekSocial => Behavior::SocialEngage,
            GoalType::ExploreArea => Behavior::Explore,
            GoalType::Experiment => Behavior::Play,
            GoalType::RestFully => Behavior::Rest,
        }
    }

    fn steps_required(self) -> u32 {
        match self {
            GoalType::InvestigateThoroughly => 3,
            GoalType::SeekSocial => 4,
            GoalType::ExploreArea => 5,
            GoalType::UnderstandPattern => 6,
            GoalType::Experiment => 3,
            GoalType::RestFully => 2,
        }
    }

    fn urgency(self) -> f32 {
        match self {
            GoalType::InvestigateThoroughly => 0.7,
            GoalType::SeekSocial => 0.8,
            GoalType::ExploreArea => 0.6,
            GoalType::UnderstandPattern => 0.7,
            GoalType::Experiment => 0.5,
            GoalType::RestFully => 0.9,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Goal {
    pub kind: GoalType,
    pub target_direction: usize,
    pub target_distance: f32,
    pub urgency: f32,
    pub progress: f32,
    started_at: f64,
    last_update: f64,
    steps_completed: u32,
    steps_required: u32,
}

/// How a goal ended, for the episodic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalResolution {
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Default)]
pub struct GoalFormation {
    current: Option<Goal>,
    last_formation: f64,
    consecutive_failures: u32,
}

impl GoalFormation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intention emerges from temperament and pressure, on a cooldown.
    pub fn should_form_goal(
        &self,
        current_behavior: Behavior,
        affect: &Affect,
        personality: &Personality,
        curiosity_level: f32,
        social_need: f32,
        now: f64,
    ) -> bool {
        if now - self.last_formation < FORMATION_COOLDOWN_S {
            return false;
        }
        if matches!(current_behavior, Behavior::Retreat | Behavior::Rest) {
            return false;
        }

        let mut chance = personality.curiosity * 0.3
            + affect.arousal * 0.2
            + personality.persistence * 0.2;
        if curiosity_level > 0.7 {
            chance += 0.2;
        }
        if social_need > 0.7 {
            chance += 0.2;
        }
        chance > FORMATION_THRESHOLD
    }

    /// Forming a goal silently drops any unfinished predecessor.
    pub fn form_goal(
        &mut self,
        kind: GoalType,
        direction: usize,
        distance: f32,
        personality: &Personality,
        now: f64,
    ) {
        let mut steps = kind.steps_required();
        if personality.persistence > 0.7 {
            steps += 1;
        }

        tracing::info!(goal = kind.as_str(), direction, steps, "goal formed");
        self.current = Some(Goal {
            kind,
            target_direction: direction,
            target_distance: distance,
            urgency: kind.urgency(),
            progress: 0.0,
            started_at: now,
            last_update: now,
            steps_completed: 0,
            steps_required: steps,
        });
        self.last_formation = now;
        self.consecutive_failures = 0;
    }

    /// Bias the selector's pick toward the goal. Times out after a minute;
    /// a flighty temperament sometimes lets the original pick stand.
    pub fn pursue(
        &mut self,
        original: Behavior,
        personality: &Personality,
        rng: &mut impl Rng,
        now: f64,
    ) -> (Behavior, Option<GoalResolution>) {
        let Some(goal) = &self.current else {
            return (original, None);
        };

        if now - goal.started_at > GOAL_TIMEOUT_S {
            tracing::info!(goal = goal.kind.as_str(), "goal timed out");
            let resolved = self.resolve(GoalResolution::Abandoned);
            return (original, resolved);
        }

        let suggested = match goal.kind {
            GoalType::UnderstandPattern => {
                if goal.steps_completed % 2 == 0 {
                    Behavior::Investigate
                } else {
                    Behavior::Explore
                }
            }
            other => other.primary_behavior(),
        };

        if personality.persistence < 0.4 && rng.gen_range(0..100u32) < 30 {
            return (original, None);
        }
        (suggested, None)
    }

    /// Feed back how the last behavior cycle went.
    pub fn record_progress(
        &mut self,
        executed: Behavior,
        outcome: f32,
        now: f64,
    ) -> Option<GoalResolution> {
        let goal = self.current.as_mut()?;
        goal.last_update = now;

        let advanced = match goal.kind {
            GoalType::UnderstandPattern => {
                matches!(executed, Behavior::Investigate | Behavior::Explore)
            }
            other => executed == other.primary_behavior(),
        };
        if !advanced {
            return None;
        }

        if outcome > 0.5 {
            goal.steps_completed += 1;
            goal.progress = goal.steps_completed as f32 / goal.steps_required as f32;
            self.consecutive_failures = 0;
            tracing::debug!(
                goal = goal.kind.as_str(),
                step = goal.steps_completed,
                of = goal.steps_required,
                "goal progress"
            );
            if goal.steps_completed >= goal.steps_required {
                return self.resolve(GoalResolution::Completed);
            }
        } else {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= MAX_FAILURES {
                return self.resolve(GoalResolution::Abandoned);
            }
        }
        None
    }

    fn resolve(&mut self, resolution: GoalResolution) -> Option<GoalResolution> {
        if let Some(goal) = self.current.take() {
            match resolution {
                GoalResolution::Completed => {
                    tracing::info!(goal = goal.kind.as_str(), "goal complete")
                }
                GoalResolution::Abandoned => {
                    tracing::info!(goal = goal.kind.as_str(), "goal abandoned")
                }
            }
            self.consecutive_failures = 0;
            self.current = None;
            let _ = goal;
        }
        Some(resolution)
    }

    /// A sufficiently urgent need may interrupt the current goal.
    pub fn can_interrupt(&self, urgency: f32) -> bool {
        match &self.current {
            None => true,
            Some(goal) => urgency > goal.urgency + 0.3,
        }
    }

    pub fn should_resume(&self, now: f64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|g| now - g.last_update < RESUME_WINDOW_S)
    }

    pub fn has_active_goal(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Goal> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(21)
    }

    #[test]
    fn test_formation_respects_cooldown() {
        let mut goals = GoalFormation::new();
        let p = Personality::bold_explorer();
        let mut affect = Affect::default();
        affect.arousal = 0.9;
        goals.form_goal(GoalType::ExploreArea, 3, 80.0, &p, 5.0);
        assert!(!goals.should_form_goal(Behavior::Idle, &affect, &p, 0.9, 0.9, 10.0));
        assert!(goals.should_form_goal(Behavior::Idle, &affect, &p, 0.9, 0.9, 20.0));
    }

    #[test]
    fn test_no_goals_while_retreating_or_resting() {
        let goals = GoalFormation::new();
        let p = Personality::bold_explorer();
        let mut affect = Affect::default();
        affect.arousal = 1.0;
        assert!(!goals.should_form_goal(Behavior::Retreat, &affect, &p, 1.0, 1.0, 100.0));
        assert!(!goals.should_form_goal(Behavior::Rest, &affect, &p, 1.0, 1.0, 100.0));
    }

    #[test]
    fn test_goal_completes_after_required_steps() {
        let mut goals = GoalFormation::new();
        let p = Personality::default();
        goals.form_goal(GoalType::InvestigateThoroughly, 0, 50.0, &p, 0.0);

        assert!(goals.record_progress(Behavior::Investigate, 0.8, 1.0).is_none());
        assert!(goals.record_progress(Behavior::Investigate, 0.8, 2.0).is_none());
        assert_eq!(
            goals.record_progress(Behavior::Investigate, 0.8, 3.0),
            Some(GoalResolution::Completed)
        );
        assert!(!goals.has_active_goal());
    }

    #[test]
    fn test_unrelated_behavior_does_not_advance() {
        let mut goals = GoalFormation::new();
        let p = Personality::default();
        goals.form_goal(GoalType::SeekSocial, 0, 60.0, &p, 0.0);
        for i in 0..10 {
            assert!(goals.record_progress(Behavior::Idle, 0.9, i as f64).is_none());
        }
        assert_eq!(goals.current().unwrap().progress, 0.0);
    }

    #[test]
    fn test_repeated_failure_abandons() {
        let mut goals = GoalFormation::new();
        let p = Personality::default();
        goals.form_goal(GoalType::Experiment, 0, 50.0, &p, 0.0);
        assert!(goals.record_progress(Behavior::Play, 0.2, 1.0).is_none());
        assert!(goals.record_progress(Behavior::Play, 0.2, 2.0).is_none());
        assert_eq!(
            goals.record_progress(Behavior::Play, 0.2, 3.0),
            Some(GoalResolution::Abandoned)
        );
    }

    #[test]
    fn test_pursuit_times_out_after_a_minute() {
        let mut goals = GoalFormation::new();
        let p = Personality::default();
        goals.form_goal(GoalType::ExploreArea, 2, 90.0, &p, 0.0);
        let (behavior, resolution) = goals.pursue(Behavior::Idle, &p, &mut rng(), 61.0);
        assert_eq!(behavior, Behavior::Idle);
        assert_eq!(resolution, Some(GoalResolution::Abandoned));
    }

    #[test]
    fn test_pursuit_suggests_goal_behavior() {
        let mut goals = GoalFormation::new();
        let mut p = Personality::default();
        p.persistence = 0.8;
        goals.form_goal(GoalType::SeekSocial, 1, 70.0, &p, 0.0);
        let (behavior, _) = goals.pursue(Behavior::Idle, &p, &mut rng(), 5.0);
        assert_eq!(behavior, Behavior::SocialEngage);
    }

    #[test]
    fn test_interrupt_needs_clear_urgency_margin() {
        let mut goals = GoalFormation::new();
        let p = Personality::default();
        assert!(goals.can_interrupt(0.1), "no goal means always interruptible");
        goals.form_goal(GoalType::RestFully, 0, 50.0, &p, 0.0);
        assert!(!goals.can_interrupt(1.0), "urgency 1.0 vs 0.9 + 0.3 margin");
        goals.form_goal(GoalType::Experiment, 0, 50.0, &p, 20.0);
        assert!(goals.can_interrupt(0.9), "urgency 0.9 vs 0.5 + 0.3 margin");
    }
}
