//! Line protocol between the firmware core and its hosts.
//!
//! Three surfaces share one newline-terminated ASCII stream: host
//! commands (`!`-prefixed, one JSON reply each), sensor lines from the
//! vision process and rangefinder, and outbound state reports. This
//! crate only parses and formats; execution lives with the coordinator.

pub mod command;
pub mod state_report;
pub mod vision;

pub use command::{
    AttentionDirection, Command, NeedKind, Parsed, Reply, ReplyReason, parse_line,
};
pub use state_report::{StateReport, STREAM_INTERVAL_S};
pub use vision::{
    FaceEvent, FaceObservation, RichVisionUpdate, SensorInbox, SensorLine, RANGE_SENTINEL_CM,
};
