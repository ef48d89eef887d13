//! Eight-direction spatial memory built from rangefinder sweeps.
//!
//! Direction 0 faces front and indices advance clockwise. Each bin keeps
//! a running distance average, a short history for variance, and a novelty
//! score that spikes on change and decays exponentially with idle time.

use wren_core::{EnvironmentSample, Personality};

pub const DIRECTION_COUNT: usize = 8;
const HISTORY_LEN: usize = 5;

const HUMAN_DISTANCE_MIN: f32 = 30.0;
const HUMAN_DISTANCE_MAX: f32 = 150.0;
const CHANGE_THRESHOLD: f32 = 20.0;
const FACE_FRESH_SECS: f64 = 3.0;

#[derive(Debug, Clone)]
struct SpatialBin {
    average_distance: f32,
    variance: f32,
    recent_change: f32,
    change_frequency: u32,
    novelty: f32,
    last_update: Option<f64>,
    reading_count: u32,
    history: [f32; HISTORY_LEN],
    history_index: usize,
}

impl Default for SpatialBin {
    fn default() -> Self {
        Self {
            // Unexplored directions read as far and mildly interesting.
            average_distance: 200.0,
            variance: 0.0,
            recent_change: 0.0,
            change_frequency: 0,
            novelty: 0.5,
            last_update: None,
            reading_count: 0,
            history: [200.0; HISTORY_LEN],
            history_index: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpatialMemory {
    bins: [SpatialBin; DIRECTION_COUNT],
}

impl SpatialMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a distance reading into one direction's bin.
    pub fn update_reading(&mut self, direction: usize, distance: f32, now: f64) {
        let Some(bin) = self.bins.get_mut(direction) else {
            return;
        };

        let change = (distance - bin.average_distance).abs();
        bin.recent_change = change;
        if change > CHANGE_THRESHOLD {
            bin.change_frequency += 1;
            bin.novelty = (bin.novelty + 0.1).min(1.0);
        }

        bin.history[bin.history_index] = distance;
        bin.history_index = (bin.history_index + 1) % HISTORY_LEN;

        // Adapt quickly while the bin is young, slowly once it has settled.
        if bin.reading_count < 10 {
            bin.average_distance = bin.average_distance * 0.7 + distance * 0.3;
        } else {
            bin.average_distance = bin.average_distance * 0.95 + distance * 0.05;
        }

        let mean: f32 = bin.history.iter().sum::<f32>() / HISTORY_LEN as f32;
        let sum_sq: f32 = bin.history.iter().map(|d| (d - mean) * (d - mean)).sum();
        bin.variance = (sum_sq / HISTORY_LEN as f32).sqrt();

        if let Some(last) = bin.last_update {
            let idle = (now - last).max(0.0) as f32;
            bin.novelty *= (-0.1 * idle).exp();
        }
        bin.last_update = Some(now);
        bin.reading_count += 1;
    }

    /// A confirmed face boosts novelty and firms up the distance estimate.
    pub fn record_face_at(&mut self, direction: usize, distance: f32, now: f64) {
        if direction >= DIRECTION_COUNT {
            return;
        }
        self.update_reading(direction, distance, now);
        let bin = &mut self.bins[direction];
        bin.novelty = (bin.novelty + 0.2).min(1.0);
        bin.variance = (bin.variance - 5.0).max(0.0);
    }

    /// Externally reported novelty, from a vision source that sees more
    /// than the rangefinder does.
    pub fn inject_novelty(&mut self, direction: usize, amount: f32) {
        if let Some(bin) = self.bins.get_mut(direction) {
            bin.novelty = (bin.novelty + amount.max(0.0)).min(1.0);
        }
    }

    // ========================================================================
    // Per-bin queries
    // ========================================================================

    pub fn novelty(&self, direction: usize) -> f32 {
        self.bins.get(direction).map_or(0.0, |b| b.novelty)
    }

    pub fn variance(&self, direction: usize) -> f32 {
        self.bins.get(direction).map_or(0.0, |b| b.variance)
    }

    pub fn recent_change(&self, direction: usize) -> f32 {
        self.bins.get(direction).map_or(0.0, |b| b.recent_change)
    }

    pub fn average_distance(&self, direction: usize) -> f32 {
        self.bins.get(direction).map_or(200.0, |b| b.average_distance)
    }

    // ========================================================================
    // Whole-environment analysis
    // ========================================================================

    pub fn average_dynamism(&self) -> f32 {
        let mut total = 0.0;
        let mut valid = 0;
        for bin in &self.bins {
            if bin.reading_count > 0 {
                total += bin.variance;
                valid += 1;
            }
        }
        if valid == 0 {
            0.0
        } else {
            (total / valid as f32) / 50.0
        }
    }

    pub fn total_novelty(&self) -> f32 {
        let mut total = 0.0;
        let mut valid = 0;
        for bin in &self.bins {
            if bin.reading_count > 0 {
                total += bin.novelty;
                valid += 1;
            }
        }
        if valid == 0 {
            0.0
        } else {
            total / valid as f32
        }
    }

    pub fn max_recent_change(&self) -> f32 {
        self.bins
            .iter()
            .map(|b| b.recent_change)
            .fold(0.0, f32::max)
    }

    pub fn environment_sample(&self) -> EnvironmentSample {
        EnvironmentSample {
            dynamism: self.average_dynamism(),
            total_novelty: self.total_novelty(),
            max_recent_change: self.max_recent_change(),
        }
    }

    /// Direction worth turning toward, weighted by temperament.
    pub fn most_interesting_direction(&self, personality: &Personality) -> usize {
        let mut best_score = -1.0;
        let mut best = 4;
        for (i, bin) in self.bins.iter().enumerate() {
            if bin.reading_count == 0 {
                continue;
            }
            let interest = bin.novelty * personality.curiosity
                + (bin.variance / 50.0) * personality.excitability;
            if interest > best_score {
                best_score = interest;
                best = i;
            }
        }
        best
    }

    /// Sustained stable presence at conversational distance.
    pub fn likely_human_present(&self) -> bool {
        self.bins.iter().any(|bin| {
            bin.average_distance >= HUMAN_DISTANCE_MIN
                && bin.average_distance <= HUMAN_DISTANCE_MAX
                && bin.variance < 30.0
                && bin.reading_count > 3
        })
    }

    fn has_face_in(&self, direction: usize, now: f64) -> bool {
        let Some(bin) = self.bins.get(direction) else {
            return false;
        };
        let fresh = bin
            .last_update
            .is_some_and(|last| now - last < FACE_FRESH_SECS);
        fresh
            && bin.average_distance >= HUMAN_DISTANCE_MIN
            && bin.average_distance <= HUMAN_DISTANCE_MAX
            && bin.variance < 25.0
    }

    pub fn face_distance(&self, direction: usize) -> f32 {
        self.bins.get(direction).map_or(999.0, |b| b.average_distance)
    }

    pub fn closest_face_direction(&self, now: f64) -> usize {
        let mut closest = 999.0;
        let mut dir = 0;
        for i in 0..DIRECTION_COUNT {
            if self.has_face_in(i, now) && self.bins[i].average_distance < closest {
                closest = self.bins[i].average_distance;
                dir = i;
            }
        }
        dir
    }

    pub fn visible_face_count(&self, now: f64) -> usize {
        (0..DIRECTION_COUNT)
            .filter(|&i| self.has_face_in(i, now))
            .count()
    }
}
