//! Speech urge: pressure to externalize, not speech itself.
//!
//! The host process reads the urge and trigger over the bridge and
//! decides whether to let the robot talk. Each trigger has its own
//! cooldown; the strongest proposal in an update wins.

use wren_core::{Affect, Needs, Personality};

const URGE_THRESHOLD: f32 = 0.7;
const URGE_DECAY: f32 = 0.985;
const MIN_UTTERANCE_GAP_S: f64 = 120.0;
const GREETING_COOLDOWN_S: f64 = 300.0;
const LONELY_ONSET_S: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechTrigger {
    None,
    Lonely,
    Bored,
    Wondering,
    FaceAppeared,
    FaceRecognized,
    FaceLeft,
    Startled,
    Content,
    Conflict,
    Discovery,
    Greeting,
    Commentary,
}

impl SpeechTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            SpeechTrigger::None => "none",
            SpeechTrigger::Lonely => "lonely",
            SpeechTrigger::Bored => "bored",
            SpeechTrigger::Wondering => "wondering",
            SpeechTrigger::FaceAppeared => "face_appeared",
            SpeechTrigger::FaceRecognized => "face_recognized",
            SpeechTrigger::FaceLeft => "face_left",
            SpeechTrigger::Startled => "startled",
            SpeechTrigger::Content => "content",
            SpeechTrigger::Conflict => "conflict",
            SpeechTrigger::Discovery => "discovery",
            SpeechTrigger::Greeting => "greeting",
            SpeechTrigger::Commentary => "commentary",
        }
    }

    fn index(self) -> usize {
        match self {
            SpeechTrigger::None => 0,
            SpeechTrigger::Lonely => 1,
            SpeechTrigger::Bored => 2,
            SpeechTrigger::Wondering => 3,
            SpeechTrigger::FaceAppeared => 4,
            SpeechTrigger::FaceRecognized => 5,
            SpeechTrigger::FaceLeft => 6,
            SpeechTrigger::Startled => 7,
            SpeechTrigger::Content => 8,
            SpeechTrigger::Conflict => 9,
            SpeechTrigger::Discovery => 10,
            SpeechTrigger::Greeting => 11,
            SpeechTrigger::Commentary => 12,
        }
    }
}

/// Snapshot of mind state the urge system reacts to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeechContext {
    pub is_wondering: bool,
    pub in_conflict: bool,
    pub conflict_tension: f32,
    pub face_detected: bool,
    pub face_recognized: bool,
    pub environment_novelty: f32,
}

#[derive(Debug, Clone)]
pub struct SpeechUrge {
    urge: f32,
    trigger: SpeechTrigger,
    trigger_intensity: f32,
    last_utterance: Option<f64>,
    last_face_time: Option<f64>,
    face_appeared_at: f64,
    face_present: bool,
    last_trigger_time: [Option<f64>; 13],
}

impl Default for SpeechUrge {
    fn default() -> Self {
        Self {
            urge: 0.0,
            trigger: SpeechTrigger::None,
            trigger_intensity: 0.0,
            last_utterance: None,
            last_face_time: None,
            face_appeared_at: 0.0,
            face_present: false,
            last_trigger_time: [None; 13],
        }
    }
}

impl SpeechUrge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs at roughly 1 Hz alongside consciousness.
    pub fn update(
        &mut self,
        needs: &Needs,
        affect: &Affect,
        personality: &Personality,
        ctx: SpeechContext,
        now: f64,
    ) {
        // Just spoke: suppress new pressure, bleed off the old.
        if self
            .last_utterance
            .is_some_and(|t| now - t < MIN_UTTERANCE_GAP_S)
        {
            self.urge *= 0.95;
            return;
        }

        let was_present = self.face_present;
        self.face_present = ctx.face_detected;
        if ctx.face_detected {
            self.last_face_time = Some(now);
        }

        if ctx.face_detected && !was_present {
            self.face_appeared_at = now;
            if ctx.face_recognized {
                if self.cooled(SpeechTrigger::FaceRecognized, GREETING_COOLDOWN_S, now) {
                    let intensity = 0.8 + personality.sociability * 0.2;
                    self.propose(SpeechTrigger::FaceRecognized, intensity);
                }
            } else if self.cooled(SpeechTrigger::FaceAppeared, GREETING_COOLDOWN_S, now) {
                let intensity = 0.6 + personality.curiosity * 0.2;
                self.propose(SpeechTrigger::FaceAppeared, intensity);
            }
        }

        if !ctx.face_detected && was_present && self.cooled(SpeechTrigger::FaceLeft, 60.0, now) {
            let mut intensity = 0.4 + personality.sociability * 0.3;
            if now - self.face_appeared_at > 30.0 {
                intensity += 0.2;
            }
            self.propose(SpeechTrigger::FaceLeft, intensity);
        }

        let long_alone = self
            .last_face_time
            .map_or(true, |t| now - t > LONELY_ONSET_S);
        if !ctx.face_detected
            && needs.social > 0.6
            && long_alone
            && self.cooled(SpeechTrigger::Lonely, 300.0, now)
        {
            self.propose(
                SpeechTrigger::Lonely,
                needs.social * personality.sociability * 0.7,
            );
        }

        if needs.stimulation > 0.6
            && ctx.environment_novelty < 0.2
            && self.cooled(SpeechTrigger::Bored, 300.0, now)
        {
            self.propose(
                SpeechTrigger::Bored,
                needs.stimulation * personality.curiosity * 0.6,
            );
        }

        if ctx.is_wondering && self.cooled(SpeechTrigger::Wondering, 300.0, now) {
            self.propose(SpeechTrigger::Wondering, 0.5 + personality.curiosity * 0.3);
        }

        if ctx.in_conflict
            && ctx.conflict_tension > 0.6
            && self.cooled(SpeechTrigger::Conflict, 180.0, now)
        {
            self.propose(SpeechTrigger::Conflict, ctx.conflict_tension * 0.6);
        }

        if affect.arousal > 0.8
            && affect.valence < -0.2
            && self.cooled(SpeechTrigger::Startled, 30.0, now)
        {
            self.propose(SpeechTrigger::Startled, 0.85);
        }

        if affect.valence > 0.5
            && affect.arousal > 0.3
            && affect.arousal < 0.6
            && self.cooled(SpeechTrigger::Content, 300.0, now)
        {
            self.propose(
                SpeechTrigger::Content,
                affect.valence * personality.sociability * 0.5,
            );
        }

        if ctx.environment_novelty > 0.7 && self.cooled(SpeechTrigger::Discovery, 120.0, now) {
            self.propose(
                SpeechTrigger::Discovery,
                ctx.environment_novelty * personality.curiosity * 0.7,
            );
        }

        self.urge *= URGE_DECAY;
        if self.urge < 0.1 {
            self.trigger = SpeechTrigger::None;
            self.trigger_intensity = 0.0;
        }
    }

    fn cooled(&self, trigger: SpeechTrigger, cooldown_s: f64, now: f64) -> bool {
        self.last_trigger_time[trigger.index()]
            .map_or(true, |t| now - t > cooldown_s)
    }

    fn propose(&mut self, trigger: SpeechTrigger, intensity: f32) {
        let intensity = intensity.clamp(0.0, 1.0);
        if intensity > self.trigger_intensity {
            self.trigger = trigger;
            self.trigger_intensity = intensity;
            self.urge = self.urge.max(intensity);
        }
    }

    /// The host confirms it finished speaking; resets pressure and stamps
    /// the active trigger's cooldown.
    pub fn utterance_completed(&mut self, now: f64) {
        self.last_utterance = Some(now);
        if self.trigger != SpeechTrigger::None {
            self.last_trigger_time[self.trigger.index()] = Some(now);
        }
        self.urge = 0.0;
        self.trigger = SpeechTrigger::None;
        self.trigger_intensity = 0.0;
    }

    pub fn wants_to_speak(&self) -> bool {
        self.urge >= URGE_THRESHOLD && self.trigger != SpeechTrigger::None
    }

    pub fn urge(&self) -> f32 {
        self.urge
    }

    pub fn trigger(&self) -> SpeechTrigger {
        self.trigger
    }

    pub fn trigger_intensity(&self) -> f32 {
        self.trigger_intensity
    }

    pub fn face_present(&self) -> bool {
        self.face_present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_ctx() -> SpeechContext {
        SpeechContext::default()
    }

    #[test]
    fn test_recognized_face_beats_unknown_face() {
        let mut urge = SpeechUrge::new();
        let needs = Needs::default();
        let affect = Affect::default();
        let p = Personality::default();

        let ctx = SpeechContext {
            face_detected: true,
            face_recognized: true,
            ..quiet_ctx()
        };
        urge.update(&needs, &affect, &p, ctx, 10.0);
        assert_eq!(urge.trigger(), SpeechTrigger::FaceRecognized);
        assert!(urge.wants_to_speak(), "0.8 + 0.5*0.2 = 0.9 exceeds threshold");
    }

    #[test]
    fn test_face_left_after_long_interaction_is_stronger() {
        let mut short = SpeechUrge::new();
        let mut long = SpeechUrge::new();
        let needs = Needs::default();
        let affect = Affect::default();
        let p = Personality::default();
        let present = SpeechContext {
            face_detected: true,
            ..quiet_ctx()
        };

        // Short visit: appears at t=10, leaves at t=15.
        short.update(&needs, &affect, &p, present, 10.0);
        short.utterance_completed(0.0);
        short.last_utterance = None;
        short.update(&needs, &affect, &p, quiet_ctx(), 15.0);

        // Long visit: appears at t=10, leaves at t=50.
        long.update(&needs, &affect, &p, present, 10.0);
        long.utterance_completed(0.0);
        long.last_utterance = None;
        long.update(&needs, &affect, &p, quiet_ctx(), 50.0);

        assert_eq!(long.trigger(), SpeechTrigger::FaceLeft);
        assert!(long.trigger_intensity() > short.trigger_intensity());
    }

    #[test]
    fn test_cooldown_after_utterance() {
        let mut urge = SpeechUrge::new();
        let needs = Needs::default();
        let affect = Affect::default();
        let p = Personality::default();
        let ctx = SpeechContext {
            face_detected: true,
            face_recognized: true,
            ..quiet_ctx()
        };

        urge.update(&needs, &affect, &p, ctx, 10.0);
        urge.utterance_completed(11.0);
        assert!(!urge.wants_to_speak());

        // Inside the two-minute gap nothing builds.
        let startled = SpeechContext {
            environment_novelty: 1.0,
            ..quiet_ctx()
        };
        urge.update(&needs, &affect, &p, startled, 60.0);
        assert_eq!(urge.urge(), 0.0);
    }

    #[test]
    fn test_lonely_needs_sustained_absence() {
        let mut urge = SpeechUrge::new();
        let mut needs = Needs::default();
        needs.social = 0.8;
        let affect = Affect::default();
        let p = Personality::default();

        // A face seen recently blocks loneliness.
        urge.last_face_time = Some(0.0);
        urge.update(&needs, &affect, &p, quiet_ctx(), 100.0);
        assert_ne!(urge.trigger(), SpeechTrigger::Lonely);

        // Three minutes later the ache registers.
        urge.update(&needs, &affect, &p, quiet_ctx(), 200.0);
        assert_eq!(urge.trigger(), SpeechTrigger::Lonely);
    }

    #[test]
    fn test_startled_fires_on_spiked_arousal() {
        let mut urge = SpeechUrge::new();
        let needs = Needs::default();
        let mut affect = Affect::default();
        affect.arousal = 0.9;
        affect.valence = -0.5;
        urge.update(&needs, &affect, &Personality::default(), quiet_ctx(), 1.0);
        assert_eq!(urge.trigger(), SpeechTrigger::Startled);
        assert!(urge.wants_to_speak());
    }

    #[test]
    fn test_urge_decays_to_silence() {
        let mut urge = SpeechUrge::new();
        let needs = Needs::default();
        let affect = Affect::default();
        let p = Personality::default();
        let ctx = SpeechContext {
            face_detected: true,
            ..quiet_ctx()
        };
        urge.update(&needs, &affect, &p, ctx, 0.0);
        assert!(urge.urge() > 0.5);

        let face_still = SpeechContext {
            face_detected: true,
            ..quiet_ctx()
        };
        for i in 1..400 {
            urge.update(&needs, &affect, &p, face_still, i as f64);
        }
        assert!(urge.urge() < 0.1 || urge.trigger() == SpeechTrigger::None);
    }
}
