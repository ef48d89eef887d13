pub mod affect;
pub mod behavior;
pub mod config;
pub mod needs;
pub mod num;
pub mod personality;
pub mod style;

pub use affect::{Affect, EmotionLabel};
pub use behavior::Behavior;
pub use config::FirmwareConfig;
pub use needs::{EnvironmentSample, Needs};
pub use personality::{Personality, Trait};
pub use style::MovementStyle;
