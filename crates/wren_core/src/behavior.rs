//! The eight discrete behaviors the selector arbitrates between.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Behavior {
    Idle,
    Explore,
    Investigate,
    SocialEngage,
    Retreat,
    Rest,
    Play,
    Vigilant,
}

impl Behavior {
    pub const ALL: [Behavior; 8] = [
        Behavior::Idle,
        Behavior::Explore,
        Behavior::Investigate,
        Behavior::SocialEngage,
        Behavior::Retreat,
        Behavior::Rest,
        Behavior::Play,
        Behavior::Vigilant,
    ];

    /// Stable index into the weight tables.
    pub fn index(self) -> usize {
        match self {
            Behavior::Idle => 0,
            Behavior::Explore => 1,
            Behavior::Investigate => 2,
            Behavior::SocialEngage => 3,
            Behavior::Retreat => 4,
            Behavior::Rest => 5,
            Behavior::Play => 6,
            Behavior::Vigilant => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Behavior::Idle => "IDLE",
            Behavior::Explore => "EXPLORE",
            Behavior::Investigate => "INVESTIGATE",
            Behavior::SocialEngage => "SOCIAL_ENGAGE",
            Behavior::Retreat => "RETREAT",
            Behavior::Rest => "REST",
            Behavior::Play => "PLAY",
            Behavior::Vigilant => "VIGILANT",
        }
    }
}

impl std::fmt::Display for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Idle
    }
}
