//! Episodic memory: a ring of the last twenty experiences.
//!
//! Each episode carries a salience score set at record time and reshaped
//! during consolidation, where unrecalled memories fade and recalled ones
//! strengthen.

use wren_core::{Behavior, EmotionLabel};

pub const MAX_EPISODES: usize = 20;
const RECALL_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct Episode {
    pub timestamp: f64,
    pub behavior: Behavior,
    pub emotion: EmotionLabel,
    pub distance: f32,
    pub direction: usize,
    pub human_present: bool,
    pub outcome: f32,
    pub was_successful: bool,
    pub salience: f32,
    recall_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct EpisodicMemory {
    episodes: Vec<Episode>,
    next_slot: usize,
}

impl EpisodicMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_episode(
        &mut self,
        behavior: Behavior,
        emotion: EmotionLabel,
        distance: f32,
        direction: usize,
        human_present: bool,
        outcome: f32,
        now: f64,
    ) {
        let salience = Self::salience_of(emotion, outcome, human_present);
        let episode = Episode {
            timestamp: now,
            behavior,
            emotion,
            distance,
            direction,
            human_present,
            outcome,
            was_successful: outcome > 0.5,
            salience,
            recall_count: 0,
        };

        if self.episodes.len() < MAX_EPISODES {
            self.episodes.push(episode);
        } else {
            self.episodes[self.next_slot] = episode;
        }
        self.next_slot = (self.next_slot + 1) % MAX_EPISODES;

        if salience > 0.7 {
            tracing::debug!(%behavior, salience, "memorable experience recorded");
        }
    }

    fn salience_of(emotion: EmotionLabel, outcome: f32, human_present: bool) -> f32 {
        let mut sal = match emotion {
            EmotionLabel::Excited | EmotionLabel::Startled | EmotionLabel::Anxious => 0.4,
            EmotionLabel::Curious | EmotionLabel::Confused => 0.3,
            _ => 0.1,
        };
        // Extreme outcomes in either direction stick.
        sal += (outcome - 0.5).abs() * 0.4;
        if human_present {
            sal += 0.3;
        }
        sal.clamp(0.0, 1.0)
    }

    // ========================================================================
    // Recall
    // ========================================================================

    /// Best match for the current situation, if any resemblance is strong
    /// enough. Recalling a memory strengthens it at the next consolidation.
    pub fn recall_similar(
        &mut self,
        behavior: Behavior,
        direction: usize,
        distance: f32,
        now: f64,
    ) -> Option<Episode> {
        let mut best: Option<(usize, f32)> = None;
        for (i, ep) in self.episodes.iter().enumerate() {
            let mut similarity = 0.0;
            if ep.behavior == behavior {
                similarity += 0.4;
            }

            let mut dir_diff = (ep.direction as i32 - direction as i32).unsigned_abs();
            if dir_diff > 4 {
                dir_diff = 8 - dir_diff;
            }
            similarity += (1.0 - dir_diff as f32 / 4.0) * 0.2;

            let dist_diff = (ep.distance - distance).abs();
            similarity += (1.0 - (dist_diff / 100.0).clamp(0.0, 1.0)) * 0.2;

            // Recency fades over five minutes; salience always helps.
            let age = (now - ep.timestamp).max(0.0) as f32;
            similarity += (1.0 - age / 300.0).clamp(0.0, 0.3);
            similarity += ep.salience * 0.2;

            if best.is_none_or(|(_, s)| similarity > s) {
                best = Some((i, similarity));
            }
        }

        let (index, similarity) = best?;
        if similarity <= RECALL_THRESHOLD {
            return None;
        }
        self.episodes[index].recall_count += 1;
        tracing::debug!(similarity, "recalled similar experience");
        Some(self.episodes[index])
    }

    pub fn recall_best(&mut self, behavior: Behavior) -> Option<Episode> {
        let index = self
            .episodes
            .iter()
            .enumerate()
            .filter(|(_, ep)| ep.behavior == behavior)
            .max_by(|(_, a), (_, b)| a.outcome.total_cmp(&b.outcome))
            .map(|(i, _)| i)?;
        self.episodes[index].recall_count += 1;
        Some(self.episodes[index])
    }

    pub fn recall_worst(&mut self, behavior: Behavior) -> Option<Episode> {
        let index = self
            .episodes
            .iter()
            .enumerate()
            .filter(|(_, ep)| ep.behavior == behavior)
            .min_by(|(_, a), (_, b)| a.outcome.total_cmp(&b.outcome))
            .map(|(i, _)| i)?;
        self.episodes[index].recall_count += 1;
        Some(self.episodes[index])
    }

    pub fn recall_most_intense(&mut self) -> Option<Episode> {
        let index = self
            .episodes
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.salience.total_cmp(&b.salience))
            .map(|(i, _)| i)?;
        self.episodes[index].recall_count += 1;
        Some(self.episodes[index])
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn has_experience_with(&self, behavior: Behavior) -> bool {
        self.episodes.iter().any(|ep| ep.behavior == behavior)
    }

    /// Mean outcome for a behavior; a neutral 0.5 when untried.
    pub fn average_outcome(&self, behavior: Behavior) -> f32 {
        let matching: Vec<f32> = self
            .episodes
            .iter()
            .filter(|ep| ep.behavior == behavior)
            .map(|ep| ep.outcome)
            .collect();
        if matching.is_empty() {
            0.5
        } else {
            matching.iter().sum::<f32>() / matching.len() as f32
        }
    }

    pub fn count_successful(&self, behavior: Behavior) -> usize {
        self.episodes
            .iter()
            .filter(|ep| ep.behavior == behavior && ep.was_successful)
            .count()
    }

    pub fn count_social(&self) -> usize {
        self.episodes.iter().filter(|ep| ep.human_present).count()
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    // ========================================================================
    // Consolidation
    // ========================================================================

    /// Forgetting-curve pass. Runs on the slow cadence.
    pub fn consolidate(&mut self, now: f64) {
        for ep in &mut self.episodes {
            let age_days = ((now - ep.timestamp).max(0.0) / 86_400.0) as f32;
            let age_decay = 1.0 / (1.0 + 0.1 * age_days);

            if ep.recall_count == 0 {
                ep.salience *= 0.95 * age_decay;
            } else {
                ep.salience *= 1.05;
                ep.recall_count = 0;
            }
            ep.salience = ep.salience.clamp(0.0, 1.0);
        }
    }
}
