//! Outbound state JSON.
//!
//! Built by hand so the field order and two-decimal formatting stay
//! byte-stable for hosts that diff frames. The same line answers
//! `!QUERY` and, with a `STATE:` prefix, the periodic stream.

use std::fmt::Write;

/// Period between stream frames when streaming is enabled.
pub const STREAM_INTERVAL_S: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct StateReport {
    pub arousal: f32,
    pub valence: f32,
    pub dominance: f32,
    pub emotion: &'static str,
    pub behavior: &'static str,
    pub stimulation: f32,
    pub social: f32,
    pub energy: f32,
    pub safety: f32,
    pub novelty: f32,
    pub tracking: bool,
    pub servo_base: i32,
    pub servo_nod: i32,
    pub servo_tilt: i32,
    pub animating: bool,
    pub epistemic: &'static str,
    pub tension: f32,
    pub wondering: bool,
    pub self_awareness: f32,
    pub speech_urge: f32,
    pub speech_trigger: &'static str,
    pub wants_to_speak: bool,
}

impl StateReport {
    pub fn to_json_line(&self) -> String {
        let mut s = String::with_capacity(384);
        // Infallible writes into a String.
        let _ = write!(s, "{{\"arousal\":{:.2}", self.arousal);
        let _ = write!(s, ",\"valence\":{:.2}", self.valence);
        let _ = write!(s, ",\"dominance\":{:.2}", self.dominance);
        let _ = write!(s, ",\"emotion\":\"{}\"", self.emotion);
        let _ = write!(s, ",\"behavior\":\"{}\"", self.behavior);
        let _ = write!(s, ",\"stimulation\":{:.2}", self.stimulation);
        let _ = write!(s, ",\"social\":{:.2}", self.social);
        let _ = write!(s, ",\"energy\":{:.2}", self.energy);
        let _ = write!(s, ",\"safety\":{:.2}", self.safety);
        let _ = write!(s, ",\"novelty\":{:.2}", self.novelty);
        let _ = write!(s, ",\"tracking\":{}", self.tracking);
        let _ = write!(s, ",\"servoBase\":{}", self.servo_base);
        let _ = write!(s, ",\"servoNod\":{}", self.servo_nod);
        let _ = write!(s, ",\"servoTilt\":{}", self.servo_tilt);
        let _ = write!(s, ",\"animating\":{}", self.animating);
        let _ = write!(s, ",\"epistemic\":\"{}\"", self.epistemic);
        let _ = write!(s, ",\"tension\":{:.2}", self.tension);
        let _ = write!(s, ",\"wondering\":{}", self.wondering);
        let _ = write!(s, ",\"selfAwareness\":{:.2}", self.self_awareness);
        let _ = write!(s, ",\"speechUrge\":{:.2}", self.speech_urge);
        let _ = write!(s, ",\"speechTrigger\":\"{}\"", self.speech_trigger);
        let _ = write!(s, ",\"wantsToSpeak\":{}}}", self.wants_to_speak);
        s
    }

    pub fn to_stream_line(&self) -> String {
        format!("STATE:{}", self.to_json_line())
    }
}
