pub mod ambient;
pub mod animator;
pub mod gesture;
pub mod reflex;
pub mod servo;

pub use ambient::AmbientLife;
pub use animator::{LoopingAnimation, LoopingAnimator};
pub use gesture::{GestureEngine, Pose, PoseKind};
pub use reflex::ReflexController;
pub use servo::{Axis, MockServoBus, ServoBus, ServoDriver};
