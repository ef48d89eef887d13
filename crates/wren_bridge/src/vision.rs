//! Sensor-side lines: face reports from the vision process and
//! ultrasonic range readings.
//!
//! The vision process can outrun the control loop, so the inbox keeps
//! only the newest face message per tick. Acting on a backlog of stale
//! frames makes the head chase where the face used to be.

use serde::Deserialize;

/// Distance reported when the rangefinder times out.
pub const RANGE_SENTINEL_CM: f32 = 400.0;

/// Logical camera frame is 240x240 regardless of sensor resolution.
pub const FRAME_SIZE: i32 = 240;

/// One `FACE:` line. Coordinates are frame pixels, velocities are
/// pixels per frame, `seq` is monotonic per vision-process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceObservation {
    pub x: i32,
    pub y: i32,
    pub vx: i32,
    pub vy: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: i32,
    pub seq: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorLine {
    Face(FaceObservation),
    NoFace,
    Range(f32),
}

impl SensorLine {
    /// Parse one raw sensor line. Unrecognized lines yield `None`; the
    /// sensor stream shares a wire with debug chatter and must tolerate
    /// noise.
    pub fn parse(line: &str) -> Option<SensorLine> {
        let line = line.trim();
        if line == "NO_FACE" {
            return Some(SensorLine::NoFace);
        }
        if let Some(args) = line.strip_prefix("FACE:") {
            let mut fields = [0i32; 8];
            let mut count = 0;
            for part in args.split(',') {
                if count >= 8 {
                    return None;
                }
                fields[count] = part.trim().parse::<i32>().ok()?;
                count += 1;
            }
            if count != 8 || fields[7] < 0 {
                return None;
            }
            return Some(SensorLine::Face(FaceObservation {
                x: fields[0],
                y: fields[1],
                vx: fields[2],
                vy: fields[3],
                width: fields[4],
                height: fields[5],
                confidence: fields[6],
                seq: fields[7] as u32,
            }));
        }
        if let Some(args) = line.strip_prefix("RANGE:") {
            let cm = args.trim().parse::<f32>().ok()?;
            if !cm.is_finite() || cm < 0.0 {
                return None;
            }
            return Some(SensorLine::Range(cm.min(RANGE_SENTINEL_CM)));
        }
        None
    }
}

/// What the face channel resolved to after a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceEvent {
    Seen(FaceObservation),
    Lost,
}

/// Latest-wins inbox. Push every sensor line received this tick, then
/// `take()` at the control point.
#[derive(Debug, Default)]
pub struct SensorInbox {
    latest_face: Option<FaceEvent>,
    latest_range: Option<f32>,
    discarded: u64,
}

impl SensorInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: &str) {
        match SensorLine::parse(line) {
            Some(SensorLine::Face(obs)) => {
                if self.latest_face.is_some() {
                    self.discarded += 1;
                }
                self.latest_face = Some(FaceEvent::Seen(obs));
            }
            Some(SensorLine::NoFace) => {
                if self.latest_face.is_some() {
                    self.discarded += 1;
                }
                self.latest_face = Some(FaceEvent::Lost);
            }
            Some(SensorLine::Range(cm)) => {
                self.latest_range = Some(cm);
            }
            None => {}
        }
    }

    /// Drain the inbox: newest face event and newest range reading.
    pub fn take(&mut self) -> (Option<FaceEvent>, Option<f32>) {
        (self.latest_face.take(), self.latest_range.take())
    }

    /// Messages superseded before anyone read them. Diagnostic only.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

/// Compact payload of a rich `!VISION:{…}` update. Missing keys default
/// to "nothing observed".
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RichVisionUpdate {
    #[serde(rename = "f", default)]
    pub face: u8,
    #[serde(rename = "fc", default)]
    pub face_count: u32,
    #[serde(rename = "ex", default)]
    pub expression: String,
    #[serde(rename = "nv", default)]
    pub novelty: f32,
    #[serde(rename = "ob", default)]
    pub object_count: u32,
    #[serde(rename = "mv", default)]
    pub motion: f32,
}

impl RichVisionUpdate {
    pub fn face_present(&self) -> bool {
        self.face != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_line_round_trip() {
        let parsed = SensorLine::parse("FACE:140,120,-2,1,60,60,85,7").unwrap();
        let SensorLine::Face(obs) = parsed else {
            panic!("expected a face, got {:?}", parsed);
        };
        assert_eq!(obs.x, 140);
        assert_eq!(obs.vx, -2);
        assert_eq!(obs.confidence, 85);
        assert_eq!(obs.seq, 7);
    }

    #[test]
    fn test_malformed_face_lines_rejected() {
        assert_eq!(SensorLine::parse("FACE:140,120,0,0,60,60,85"), None);
        assert_eq!(SensorLine::parse("FACE:140,120,0,0,60,60,85,1,9"), None);
        assert_eq!(SensorLine::parse("FACE:x,120,0,0,60,60,85,1"), None);
    }

    #[test]
    fn test_range_caps_at_sentinel() {
        assert_eq!(SensorLine::parse("RANGE:55"), Some(SensorLine::Range(55.0)));
        assert_eq!(
            SensorLine::parse("RANGE:1200"),
            Some(SensorLine::Range(RANGE_SENTINEL_CM))
        );
        assert_eq!(SensorLine::parse("RANGE:-3"), None);
    }

    #[test]
    fn test_inbox_keeps_only_latest_face() {
        let mut inbox = SensorInbox::new();
        inbox.push("FACE:100,100,0,0,50,50,80,1");
        inbox.push("FACE:110,100,0,0,50,50,80,2");
        inbox.push("NO_FACE");
        inbox.push("RANGE:72");

        let (face, range) = inbox.take();
        assert_eq!(face, Some(FaceEvent::Lost), "newest face message wins");
        assert_eq!(range, Some(72.0));
        assert_eq!(inbox.discarded(), 2);

        let (face, range) = inbox.take();
        assert_eq!(face, None, "take drains the inbox");
        assert_eq!(range, None);
    }

    #[test]
    fn test_noise_lines_are_ignored() {
        let mut inbox = SensorInbox::new();
        inbox.push("hello world");
        inbox.push("");
        let (face, range) = inbox.take();
        assert_eq!(face, None);
        assert_eq!(range, None);
    }
}
