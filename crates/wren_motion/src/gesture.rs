//! Pose vocabulary and one-shot expressive gestures.
//!
//! Poses are static postures per behavior, modulated by affect and
//! personality before execution. Gestures are short scripted sequences
//! rendered through the styled driver; they run to completion inside a
//! tick, pacing themselves through the bus.

use rand::Rng;
use wren_core::{Affect, Behavior, EmotionLabel, MovementStyle, Needs, Personality};

use crate::servo::{Axis, ServoBus, ServoDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pose {
    pub base: i32,
    pub nod: i32,
    pub tilt: i32,
}

impl Pose {
    pub const fn new(base: i32, nod: i32, tilt: i32) -> Self {
        Self { base, nod, tilt }
    }

    pub fn clamped(self) -> Self {
        Self {
            base: Axis::Base.clamp(self.base),
            nod: Axis::Nod.clamp(self.nod),
            tilt: Axis::Tilt.clamp(self.tilt),
        }
    }

    pub const fn neutral() -> Self {
        Self::new(90, 110, 85)
    }

    pub const fn startup() -> Self {
        Self::new(90, 105, 90)
    }

    pub const fn curious_tilt() -> Self {
        Self::new(90, 120, 55)
    }

    pub const fn confused() -> Self {
        Self::new(75, 115, 95)
    }

    pub const fn excited() -> Self {
        Self::new(90, 135, 70)
    }

    pub const fn withdrawn() -> Self {
        Self::new(90, 90, 105)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseKind {
    Neutral,
    Engaged,
    Extreme,
    Transition,
}

/// Characteristic posture for a behavior.
fn base_pose(behavior: Behavior, kind: PoseKind) -> Pose {
    use Behavior::*;
    use PoseKind::*;
    match (behavior, kind) {
        (Idle, Engaged) => Pose::new(90, 110, 90),
        (Idle, Transition) => Pose::new(90, 108, 87),
        (Idle, _) => Pose::new(90, 105, 85),

        (Explore, Engaged) => Pose::new(135, 125, 70),
        (Explore, Extreme) => Pose::new(170, 135, 60),
        (Explore, Transition) => Pose::new(110, 122, 75),
        (Explore, _) => Pose::new(90, 120, 80),

        (Investigate, Engaged) => Pose::new(90, 135, 45),
        (Investigate, Extreme) => Pose::new(90, 140, 30),
        (Investigate, Transition) => Pose::new(90, 130, 52),
        (Investigate, _) => Pose::new(90, 125, 60),

        (SocialEngage, Engaged) => Pose::new(90, 125, 70),
        (SocialEngage, Extreme) => Pose::new(90, 130, 65),
        (SocialEngage, Transition) => Pose::new(90, 122, 72),
        (SocialEngage, _) => Pose::new(90, 120, 75),

        (Retreat, Engaged) => Pose::new(45, 85, 110),
        (Retreat, Extreme) => Pose::new(10, 80, 120),
        (Retreat, Transition) => Pose::new(70, 90, 105),
        (Retreat, _) => Pose::new(90, 95, 100),

        (Rest, Engaged) => Pose::new(90, 95, 95),
        (Rest, Transition) => Pose::new(90, 98, 92),
        (Rest, _) => Pose::new(90, 100, 90),

        (Play, Engaged) => Pose::new(120, 125, 60),
        (Play, Extreme) => Pose::new(150, 130, 50),
        (Play, Transition) => Pose::new(105, 120, 65),
        (Play, _) => Pose::new(90, 115, 70),

        (Vigilant, Engaged) => Pose::new(90, 130, 80),
        (Vigilant, Extreme) => Pose::new(90, 135, 75),
        (Vigilant, Transition) => Pose::new(90, 127, 82),
        (Vigilant, _) => Pose::new(90, 125, 85),
    }
}

/// Modulate a behavior posture by the current inner state.
pub fn generate_pose(
    behavior: Behavior,
    affect: &Affect,
    personality: &Personality,
    rng: &mut impl Rng,
    kind: PoseKind,
) -> Pose {
    let mut pose = base_pose(behavior, kind);

    // Arousal lifts the head, valence tips it, dominance raises posture.
    pose.nod += ((affect.arousal - 0.5) * 20.0) as i32;
    pose.tilt -= (affect.valence * 15.0) as i32;
    pose.nod += ((affect.dominance - 0.5) * 10.0) as i32;

    if personality.caution > 0.6 {
        pose.nod -= ((personality.caution - 0.6) * 20.0) as i32;
    }
    if personality.curiosity > 0.6 && behavior == Behavior::Investigate {
        pose.tilt -= ((personality.curiosity - 0.6) * 15.0) as i32;
    }
    if personality.playfulness > 0.6 && behavior == Behavior::Play {
        pose.base += rng.gen_range(-15..=15);
        pose.tilt -= rng.gen_range(5..20);
    }

    pose.clamped()
}

/// Scripted pose sequence for a behavior, at most five poses.
pub fn generate_sequence(
    behavior: Behavior,
    affect: &Affect,
    personality: &Personality,
    rng: &mut impl Rng,
) -> Vec<Pose> {
    let mut seq = Vec::with_capacity(5);
    match behavior {
        Behavior::Explore => {
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Neutral));
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Engaged));
            let mut var = generate_pose(behavior, affect, personality, rng, PoseKind::Engaged);
            var.base += 30;
            seq.push(var.clamped());
            var.base -= 60;
            seq.push(var.clamped());
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Neutral));
        }
        Behavior::Investigate => {
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Neutral));
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Engaged));
            let close = generate_pose(behavior, affect, personality, rng, PoseKind::Extreme);
            seq.push(close);
            let mut shifted = close;
            shifted.base += 10;
            shifted.tilt -= 5;
            seq.push(shifted.clamped());
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Neutral));
        }
        Behavior::Retreat => {
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Neutral));
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Engaged));
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Extreme));
        }
        Behavior::SocialEngage => {
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Neutral));
            for i in 0..2 {
                let mut nod = generate_pose(behavior, affect, personality, rng, PoseKind::Engaged);
                nod.nod += if i % 2 == 0 { 5 } else { -5 };
                seq.push(nod.clamped());
            }
        }
        Behavior::Play => {
            for i in 0..4 {
                let kind = if i % 2 == 0 {
                    PoseKind::Engaged
                } else {
                    PoseKind::Neutral
                };
                let mut playful = generate_pose(behavior, affect, personality, rng, kind);
                playful.base += rng.gen_range(-20..=20);
                playful.tilt += rng.gen_range(-15..=15);
                seq.push(playful.clamped());
            }
        }
        _ => {
            seq.push(generate_pose(behavior, affect, personality, rng, PoseKind::Neutral));
        }
    }
    seq
}

// ============================================================================
// Gesture engine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct GestureEngine {
    animating: bool,
    current_pose: Pose,
}

impl Default for Pose {
    fn default() -> Self {
        Pose::neutral()
    }
}

impl GestureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn current_pose(&self) -> Pose {
        self.current_pose
    }

    /// Play the pose sequence for a behavior. Refuses to interrupt itself.
    #[allow(clippy::too_many_arguments)]
    pub fn execute_behavior(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        behavior: Behavior,
        affect: &Affect,
        personality: &Personality,
        needs: &Needs,
    ) {
        if self.animating {
            return;
        }
        self.animating = true;

        let style = MovementStyle::generate(affect, personality, needs);
        let sequence = generate_sequence(behavior, affect, personality, rng);
        tracing::debug!(%behavior, poses = sequence.len(), "executing behavior sequence");

        let pause = 200 + (style.hesitation * 300.0) as u64;
        let last = sequence.len() - 1;
        for (i, pose) in sequence.iter().enumerate() {
            driver.smooth_move_to(bus, rng, pose.base, pose.nod, pose.tilt, &style);
            if i < last {
                bus.delay_ms(pause);
            }
        }
        self.current_pose = sequence[last];
        self.animating = false;
    }

    pub fn nod_yes(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        count: u32,
        style: &MovementStyle,
    ) {
        let count = count.clamp(1, 10);
        self.animating = true;
        let (base, nod, tilt) = driver.position();
        for _ in 0..count {
            driver.smooth_move_to(bus, rng, base, nod + 15, tilt, style);
            bus.delay_ms(150);
            driver.smooth_move_to(bus, rng, base, nod - 5, tilt, style);
            bus.delay_ms(150);
        }
        driver.smooth_move_to(bus, rng, base, nod, tilt, style);
        self.animating = false;
    }

    pub fn shake_no(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        count: u32,
        style: &MovementStyle,
    ) {
        let count = count.clamp(1, 10);
        self.animating = true;
        let (base, nod, tilt) = driver.position();
        for _ in 0..count {
            driver.smooth_move_to(bus, rng, base - 20, nod, tilt, style);
            bus.delay_ms(150);
            driver.smooth_move_to(bus, rng, base + 20, nod, tilt, style);
            bus.delay_ms(150);
        }
        driver.smooth_move_to(bus, rng, base, nod, tilt, style);
        self.animating = false;
    }

    pub fn playful_bounce(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        style: &MovementStyle,
    ) {
        self.animating = true;
        let mut bounce_style = *style;
        bounce_style.speed = (bounce_style.speed * 1.3).min(1.0);

        let (base, nod, tilt) = driver.position();
        for _ in 0..3 {
            let wobble = rng.gen_range(-10..=10);
            driver.smooth_move_to(bus, rng, base + wobble, nod + 15, tilt - 10, &bounce_style);
            bus.delay_ms(100);
            let wobble = rng.gen_range(-10..=10);
            driver.smooth_move_to(bus, rng, base + wobble, nod - 5, tilt + 5, &bounce_style);
            bus.delay_ms(100);
        }
        driver.smooth_move_to(bus, rng, base, nod, tilt, &bounce_style);
        self.animating = false;
    }

    /// Quick recoil to the withdrawn posture, then a slow cautious peek back.
    pub fn retreat_motion(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        style: &MovementStyle,
    ) {
        self.animating = true;
        let recoil = Pose::withdrawn();
        driver.smooth_move_to(bus, rng, recoil.base, recoil.nod, recoil.tilt, style);
        bus.delay_ms(500);

        let mut peek_style = *style;
        peek_style.speed = (peek_style.speed * 0.5).max(0.1);
        let peek = Pose::neutral();
        driver.smooth_move_to(bus, rng, peek.base, peek.nod - 10, peek.tilt, &peek_style);
        self.animating = false;
    }

    pub fn curious_tilt(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        personality: &Personality,
        style: &MovementStyle,
    ) {
        self.animating = true;
        let (base, nod, tilt) = driver.position();
        let amount = 20 + (personality.curiosity * 20.0) as i32;
        let direction = if rng.gen_bool(0.5) { 1 } else { -1 };

        driver.smooth_move_to(bus, rng, base, nod + 5, tilt + amount * direction, style);
        bus.delay_ms(400);
        driver.smooth_move_to(bus, rng, base, nod, tilt, style);
        self.animating = false;
    }

    pub fn scanning_motion(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        center_angle: i32,
        amplitude: f32,
        style: &MovementStyle,
    ) {
        self.animating = true;
        let (_, nod, tilt) = driver.position();
        let scan = (amplitude * style.amplitude) as i32;

        driver.smooth_move_to(bus, rng, center_angle - scan, nod + 5, tilt, style);
        bus.delay_ms(200);
        driver.smooth_move_to(bus, rng, center_angle + scan, nod + 5, tilt - 5, style);
        bus.delay_ms(200);
        driver.smooth_move_to(bus, rng, center_angle, nod, tilt, style);
        self.animating = false;
    }

    /// Lean in slightly, head raised: the listening posture.
    pub fn attentive_pose(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        style: &MovementStyle,
    ) {
        self.animating = true;
        driver.smooth_move_to(bus, rng, 90, 125, 70, style);
        self.animating = false;
    }

    /// Single small quick nod without leaving the current bearing.
    pub fn acknowledge(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        style: &MovementStyle,
    ) {
        self.animating = true;
        let mut quick = *style;
        quick.speed = (quick.speed * 1.2).min(1.0);
        let (base, nod, tilt) = driver.position();
        driver.smooth_move_to(bus, rng, base, nod + 8, tilt, &quick);
        bus.delay_ms(80);
        driver.smooth_move_to(bus, rng, base, nod, tilt, &quick);
        self.animating = false;
    }

    pub fn celebrate(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        style: &MovementStyle,
    ) {
        let mut excited = *style;
        excited.speed = (excited.speed * 1.3).min(1.0);
        excited.amplitude = (excited.amplitude * 1.2).min(1.0);
        self.playful_bounce(driver, bus, rng, &excited);
    }

    /// Posture-level rendition of a discrete emotion label.
    pub fn express_emotion(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        label: EmotionLabel,
        personality: &Personality,
        needs: &Needs,
    ) {
        let style = MovementStyle::generate(&Affect::default(), personality, needs);
        let pose = match label {
            EmotionLabel::Excited => {
                let pose = Pose::excited();
                self.playful_bounce(driver, bus, rng, &style);
                pose
            }
            EmotionLabel::Startled => {
                self.retreat_motion(driver, bus, rng, &MovementStyle::anxious());
                Pose::withdrawn()
            }
            EmotionLabel::Curious => {
                let pose = Pose::curious_tilt();
                driver.smooth_move_to(bus, rng, pose.base, pose.nod, pose.tilt, &style);
                pose
            }
            EmotionLabel::Anxious => {
                let pose = Pose::withdrawn();
                driver.smooth_move_to(bus, rng, pose.base, pose.nod, pose.tilt, &style);
                pose
            }
            EmotionLabel::Confused => {
                let pose = Pose::confused();
                driver.smooth_move_to(bus, rng, pose.base, pose.nod, pose.tilt, &style);
                self.shake_no(driver, bus, rng, 2, &style);
                pose
            }
            EmotionLabel::Content | EmotionLabel::Bored => {
                let mut pose = Pose::neutral();
                pose.nod -= 5;
                driver.smooth_move_to(bus, rng, pose.base, pose.nod, pose.tilt, &style);
                pose
            }
            EmotionLabel::Neutral => {
                let pose = Pose::neutral();
                driver.smooth_move_to(bus, rng, pose.base, pose.nod, pose.tilt, &style);
                pose
            }
        };
        self.current_pose = pose;
    }

    pub fn return_to_neutral(
        &mut self,
        driver: &mut ServoDriver,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        style: &MovementStyle,
    ) {
        let pose = Pose::neutral();
        driver.smooth_move_to(bus, rng, pose.base, pose.nod, pose.tilt, style);
        self.current_pose = pose;
    }
}
