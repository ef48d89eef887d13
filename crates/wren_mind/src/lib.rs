//! Cognition for the wren companion robot.
//!
//! Everything above raw drives lives here: spatial memory over eight
//! direction bins, attention, goal formation, episodic memory, behavior
//! selection with learned weights, the consciousness layer, speech
//! urges, person familiarity, outcome scoring, and cross-session
//! learning persistence.
//!
//! All of it is synchronous and clock-injected; callers pass `now` in
//! seconds and whatever randomness a step needs.

pub mod attention;
pub mod consciousness;
pub mod episodic;
pub mod goals;
pub mod learning;
pub mod outcome;
pub mod people;
pub mod selector;
pub mod spatial;
pub mod speech;

pub use attention::AttentionSystem;
pub use consciousness::{ConsciousnessLayer, EpistemicState, WonderingType};
pub use episodic::{Episode, EpisodicMemory};
pub use goals::{Goal, GoalFormation, GoalResolution, GoalType};
pub use learning::{Learning, StateError};
pub use outcome::OutcomeCalculator;
pub use people::{Familiarity, PeopleRegistry, PersonRecord};
pub use selector::{BehaviorScore, BehaviorSelector};
pub use spatial::SpatialMemory;
pub use speech::{SpeechContext, SpeechTrigger, SpeechUrge};
