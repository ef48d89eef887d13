//! Salience-driven attention over the eight spatial directions.

use wren_core::Personality;

use crate::spatial::{SpatialMemory, DIRECTION_COUNT};

const ATTENTION_SHIFT_THRESHOLD: f32 = 0.3;
const FOCUS_DECAY_RATE: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct AttentionSystem {
    focus_direction: usize,
    focus_strength: f32,
    focus_start: f64,
    salience: [f32; DIRECTION_COUNT],
}

impl Default for AttentionSystem {
    fn default() -> Self {
        Self {
            focus_direction: 0,
            focus_strength: 0.5,
            focus_start: 0.0,
            salience: [0.1; DIRECTION_COUNT],
        }
    }
}

impl AttentionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute salience and shift focus if another direction clearly wins.
    /// Focus strength decays so a stale focus eventually loses its grip.
    pub fn update(
        &mut self,
        memory: &SpatialMemory,
        personality: &Personality,
        dt: f32,
        now: f64,
    ) {
        self.update_salience(memory, personality);

        let (max_dir, max_sal) = self
            .salience
            .iter()
            .copied()
            .enumerate()
            .fold((0, self.salience[0]), |(bi, bs), (i, s)| {
                if s > bs {
                    (i, s)
                } else {
                    (bi, bs)
                }
            });

        if max_dir != self.focus_direction
            && max_sal > self.focus_strength + ATTENTION_SHIFT_THRESHOLD
        {
            tracing::debug!(
                from = self.focus_direction,
                to = max_dir,
                salience = max_sal,
                "attention shift"
            );
            self.focus_direction = max_dir;
            self.focus_strength = max_sal;
            self.focus_start = now;
        }

        self.focus_strength =
            (self.focus_strength * (-FOCUS_DECAY_RATE * dt).exp()).clamp(0.0, 1.0);
    }

    fn update_salience(&mut self, memory: &SpatialMemory, personality: &Personality) {
        for i in 0..DIRECTION_COUNT {
            let novelty = memory.novelty(i);
            let variance = memory.variance(i) / 50.0;
            let recent_change = memory.recent_change(i) / 100.0;

            let distance = memory.average_distance(i);
            let presence_bonus = if distance > 20.0 && distance < 100.0 {
                0.3
            } else {
                0.0
            };

            self.salience[i] = (novelty * personality.curiosity * 0.4
                + variance * personality.excitability * 0.3
                + recent_change * 0.2
                + presence_bonus * personality.sociability * 0.1)
                .clamp(0.0, 1.0);
        }
    }

    /// Snap attention somewhere, e.g. when novelty erupts off to one side.
    pub fn force_attention(&mut self, direction: usize, strength: f32, now: f64) {
        if direction >= DIRECTION_COUNT {
            return;
        }
        self.focus_direction = direction;
        self.focus_strength = strength.clamp(0.0, 1.0);
        self.focus_start = now;
    }

    pub fn focus_direction(&self) -> usize {
        self.focus_direction
    }

    pub fn focus_strength(&self) -> f32 {
        self.focus_strength
    }

    pub fn salience(&self, direction: usize) -> f32 {
        self.salience.get(direction).copied().unwrap_or(0.0)
    }

    pub fn max_salience(&self) -> f32 {
        self.salience.iter().copied().fold(0.0, f32::max)
    }

    pub fn time_focused(&self, now: f64) -> f64 {
        (now - self.focus_start).max(0.0)
    }
}
