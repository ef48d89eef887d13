//! Multi-timescale learning and on-disk persistence.
//!
//! Fast weights adapt within a session and decay by the minute. Medium
//! weights accumulate across sessions through consolidation and feed
//! evidence into slow personality drift. Traits, behavior weights, and
//! session statistics survive restarts in a small checksummed state file.

use std::fs;
use std::io;
use std::path::Path;

use wren_core::{Behavior, Personality, Trait};

use crate::selector::BehaviorSelector;

const STATE_MAGIC: u16 = 0xBEEF;
const STATE_VERSION: u8 = 1;
// magic + version + 7 traits + 8 weights + sessions + uptime + checksum
const STATE_LEN: usize = 2 + 1 + 7 * 4 + 8 * 4 + 4 + 4 + 2;

const FAST_DECAY_PER_MINUTE: f32 = 0.90;
const MEDIUM_LEARNING_RATE: f32 = 0.03;
const OUTCOME_HISTORY: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state io: {0}")]
    Io(#[from] io::Error),
    #[error("state file too short: {0} bytes")]
    Truncated(usize),
    #[error("bad magic 0x{0:04X}")]
    BadMagic(u16),
    #[error("unsupported state version {0}")]
    BadVersion(u8),
    #[error("checksum mismatch")]
    BadChecksum,
}

#[derive(Debug, Clone, Copy, Default)]
struct OutcomeRecord {
    value: f32,
    timestamp: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Learning {
    fast_weights: [f32; 8],
    medium_weights: [f32; 8],
    recent_outcomes: [OutcomeRecord; OUTCOME_HISTORY],
    outcome_index: usize,
    session_count: u32,
    session_start: f64,
}

impl Default for Learning {
    fn default() -> Self {
        Self {
            fast_weights: [0.0; 8],
            medium_weights: [0.0; 8],
            recent_outcomes: [OutcomeRecord::default(); OUTCOME_HISTORY],
            outcome_index: 0,
            session_count: 0,
            session_start: 0.0,
        }
    }
}

impl Learning {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Fast timescale
    // ========================================================================

    pub fn record_outcome(&mut self, behavior: Behavior, outcome: f32, now: f64) {
        let i = behavior.index();
        self.fast_weights[i] = (self.fast_weights[i] + outcome * 0.1).clamp(-0.5, 0.5);

        self.recent_outcomes[self.outcome_index] = OutcomeRecord {
            value: outcome,
            timestamp: Some(now),
        };
        self.outcome_index = (self.outcome_index + 1) % OUTCOME_HISTORY;
    }

    pub fn decay_fast_weights(&mut self, minutes: f32) {
        let factor = FAST_DECAY_PER_MINUTE.powf(minutes);
        for w in &mut self.fast_weights {
            *w *= factor;
        }
    }

    /// Mean of outcomes recorded in the last minute.
    pub fn average_recent_outcome(&self, now: f64) -> f32 {
        let recent: Vec<f32> = self
            .recent_outcomes
            .iter()
            .filter(|r| r.timestamp.is_some_and(|t| now - t < 60.0))
            .map(|r| r.value)
            .collect();
        if recent.is_empty() {
            0.0
        } else {
            recent.iter().sum::<f32>() / recent.len() as f32
        }
    }

    // ========================================================================
    // Medium timescale
    // ========================================================================

    /// Fold fast learning into the durable medium weights, scaled by how
    /// well the session is going. Poor sessions consolidate nothing.
    pub fn consolidate(&mut self, session_quality: f32) {
        if session_quality <= 0.5 {
            return;
        }
        for i in 0..8 {
            let delta = self.fast_weights[i] * MEDIUM_LEARNING_RATE * session_quality;
            self.medium_weights[i] = (self.medium_weights[i] + delta).clamp(-0.3, 0.3);
        }
        tracing::debug!(quality = session_quality, "consolidated learning weights");
    }

    // ========================================================================
    // Slow timescale
    // ========================================================================

    /// Accumulated behavioral evidence for drifting one trait.
    pub fn personality_evidence(&self, which: Trait) -> f32 {
        use Behavior::*;
        match which {
            Trait::Curiosity => {
                (self.medium_weights[Explore.index()] + self.medium_weights[Investigate.index()])
                    / 2.0
            }
            Trait::Caution => {
                (self.medium_weights[Retreat.index()] + self.medium_weights[Vigilant.index()]
                    - self.medium_weights[Explore.index()] * 0.5)
                    / 3.0
            }
            Trait::Sociability => self.medium_weights[SocialEngage.index()],
            Trait::Playfulness => self.medium_weights[Play.index()],
            _ => 0.0,
        }
    }

    pub fn drift_personality(&self, personality: &mut Personality, rate: f32) {
        for which in [
            Trait::Curiosity,
            Trait::Caution,
            Trait::Sociability,
            Trait::Playfulness,
        ] {
            personality.drift(which, self.personality_evidence(which), rate);
        }
    }

    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn fast_weight(&self, behavior: Behavior) -> f32 {
        self.fast_weights[behavior.index()]
    }

    pub fn medium_weight(&self, behavior: Behavior) -> f32 {
        self.medium_weights[behavior.index()]
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn save_state(
        &self,
        path: &Path,
        personality: &Personality,
        selector: &BehaviorSelector,
        now: f64,
    ) -> Result<(), StateError> {
        let mut buf = Vec::with_capacity(STATE_LEN);
        buf.extend_from_slice(&STATE_MAGIC.to_le_bytes());
        buf.push(STATE_VERSION);
        for which in Trait::ALL {
            buf.extend_from_slice(&personality.get(which).to_le_bytes());
        }
        for behavior in Behavior::ALL {
            buf.extend_from_slice(&selector.weight(behavior).to_le_bytes());
        }
        buf.extend_from_slice(&self.session_count.to_le_bytes());
        let uptime = (now - self.session_start).max(0.0) as u32;
        buf.extend_from_slice(&uptime.to_le_bytes());
        buf.extend_from_slice(&checksum(&buf).to_le_bytes());

        fs::write(path, &buf)?;
        tracing::info!(
            path = %path.display(),
            sessions = self.session_count,
            uptime,
            "state saved"
        );
        Ok(())
    }

    /// Restore traits and weights from disk. A missing or invalid file
    /// leaves the defaults in place; the error tells the caller why.
    pub fn load_state(
        &mut self,
        path: &Path,
        personality: &mut Personality,
        selector: &mut BehaviorSelector,
    ) -> Result<(), StateError> {
        let buf = fs::read(path)?;
        if buf.len() < STATE_LEN {
            return Err(StateError::Truncated(buf.len()));
        }

        let magic = u16::from_le_bytes([buf[0], buf[1]]);
        if magic != STATE_MAGIC {
            return Err(StateError::BadMagic(magic));
        }
        if buf[2] != STATE_VERSION {
            return Err(StateError::BadVersion(buf[2]));
        }
        let stored = u16::from_le_bytes([buf[STATE_LEN - 2], buf[STATE_LEN - 1]]);
        if stored != checksum(&buf[..STATE_LEN - 2]) {
            return Err(StateError::BadChecksum);
        }

        let mut offset = 3;
        let mut read_f32 = |buf: &[u8]| {
            let v = f32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
            offset += 4;
            v
        };
        for which in Trait::ALL {
            personality.set(which, read_f32(&buf));
        }
        for behavior in Behavior::ALL {
            selector.set_weight(behavior, read_f32(&buf));
        }
        let sessions = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
        self.session_count = sessions + 1;

        tracing::info!(previous_sessions = sessions, "state restored");
        Ok(())
    }

    pub fn begin_session(&mut self, now: f64) {
        self.session_start = now;
        if self.session_count == 0 {
            self.session_count = 1;
        }
    }
}

/// Additive 16-bit checksum over the serialized bytes.
fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_weights_saturate() {
        let mut learning = Learning::new();
        for i in 0..20 {
            learning.record_outcome(Behavior::Play, 1.0, i as f64);
        }
        assert_eq!(learning.fast_weight(Behavior::Play), 0.5);
    }

    #[test]
    fn test_fast_weights_decay_over_minutes() {
        let mut learning = Learning::new();
        learning.record_outcome(Behavior::Explore, 1.0, 0.0);
        let before = learning.fast_weight(Behavior::Explore);
        learning.decay_fast_weights(5.0);
        let after = learning.fast_weight(Behavior::Explore);
        assert!((after - before * 0.9f32.powi(5)).abs() < 1e-6);
    }

    #[test]
    fn test_poor_sessions_do_not_consolidate() {
        let mut learning = Learning::new();
        learning.record_outcome(Behavior::Play, 1.0, 0.0);
        learning.consolidate(0.3);
        assert_eq!(learning.medium_weight(Behavior::Play), 0.0);
        learning.consolidate(0.9);
        assert!(learning.medium_weight(Behavior::Play) > 0.0);
    }

    #[test]
    fn test_average_outcome_only_counts_last_minute() {
        let mut learning = Learning::new();
        learning.record_outcome(Behavior::Idle, 1.0, 0.0);
        learning.record_outcome(Behavior::Idle, 0.2, 100.0);
        let avg = learning.average_recent_outcome(110.0);
        assert!((avg - 0.2).abs() < 1e-6, "the old outcome must have aged out");
    }

    #[test]
    fn test_evidence_maps_behaviors_to_traits() {
        let mut learning = Learning::new();
        for i in 0..30 {
            learning.record_outcome(Behavior::SocialEngage, 1.0, i as f64);
        }
        learning.consolidate(1.0);
        assert!(learning.personality_evidence(Trait::Sociability) > 0.0);
        assert_eq!(learning.personality_evidence(Trait::Persistence), 0.0);
    }

    #[test]
    fn test_state_round_trip() {
        let dir = std::env::temp_dir().join("wren_learning_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.bin");

        let personality = Personality::bold_explorer();
        let mut selector = BehaviorSelector::new();
        selector.set_weight(Behavior::Play, 1.4);
        let mut learning = Learning::new();
        learning.session_count = 7;
        learning.save_state(&path, &personality, &selector, 123.0).unwrap();

        let mut restored_personality = Personality::default();
        let mut restored_selector = BehaviorSelector::new();
        let mut restored_learning = Learning::new();
        restored_learning
            .load_state(&path, &mut restored_personality, &mut restored_selector)
            .unwrap();

        assert_eq!(restored_personality.curiosity, personality.curiosity);
        assert_eq!(restored_selector.weight(Behavior::Play), 1.4);
        assert_eq!(restored_learning.session_count(), 8, "session count increments on load");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_corrupted_state_is_rejected() {
        let dir = std::env::temp_dir().join("wren_learning_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.bin");

        let personality = Personality::default();
        let selector = BehaviorSelector::new();
        Learning::new()
            .save_state(&path, &personality, &selector, 10.0)
            .unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[10] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let mut p = Personality::default();
        let mut s = BehaviorSelector::new();
        let err = Learning::new().load_state(&path, &mut p, &mut s);
        assert!(matches!(err, Err(StateError::BadChecksum)));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_wrong_magic_is_rejected() {
        let dir = std::env::temp_dir().join("wren_learning_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("magic.bin");
        fs::write(&path, vec![0u8; STATE_LEN]).unwrap();

        let mut p = Personality::default();
        let mut s = BehaviorSelector::new();
        let err = Learning::new().load_state(&path, &mut p, &mut s);
        assert!(matches!(err, Err(StateError::BadMagic(0))));
        fs::remove_file(&path).unwrap();
    }
}
