//! The main coordinator: one 50 Hz cooperative loop that owns every
//! subsystem.
//!
//! Each tick runs a fixed pipeline: drain input lines, apply the newest
//! sensor data, let the reflex tracker drive if it is active, run the
//! cognition tiers that are due, then hand the servos down the
//! arbitration ladder (reflex, one-shot gesture, looping animation,
//! behavior, ambient life). Streaming frames go out last.
//!
//! Everything is synchronous and clock-injected, so the whole loop can
//! be driven in tests with a mock servo bus and a simulated clock.

use rand::Rng;

use wren_bridge::{
    parse_line, AttentionDirection, Command, FaceEvent, NeedKind, Parsed, Reply, ReplyReason,
    StateReport, SensorInbox,
};
use wren_core::{Affect, Behavior, FirmwareConfig, MovementStyle, Needs, Personality};
use wren_mind::{
    AttentionSystem, BehaviorSelector, ConsciousnessLayer, EpisodicMemory, GoalFormation,
    GoalType, Learning, OutcomeCalculator, PeopleRegistry, SpatialMemory, SpeechContext,
    SpeechUrge,
};
use wren_motion::{
    AmbientLife, GestureEngine, LoopingAnimation, LoopingAnimator, ReflexController, ServoBus,
    ServoDriver,
};

const DIRECTION_SPAN_DEG: i32 = 22;
const STUCK_AT_LIMIT_S: f64 = 3.0;
const RETREAT_LOOP_LIMIT: u32 = 5;

/// Only one wire-level face identity exists: the camera stream carries
/// no person id, so everyone is "the person" and familiarity accrues to
/// a single record across sessions.
const WIRE_PERSON_ID: u32 = 0;

// ============================================
// Face tracking engagement states
// ============================================

/// Lock-on state machine layered over the reflex tracker. The reflex
/// does the servo control; this decides when attention is committed and
/// how long it stays committed.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TrackingState {
    Idle,
    Engaging { since: f64, duration: f64 },
    Locked { since: f64, duration: f64 },
    Disengaging,
}

pub struct Coordinator {
    config: FirmwareConfig,

    // Motion
    driver: ServoDriver,
    reflex: ReflexController,
    gestures: GestureEngine,
    looping: LoopingAnimator,
    ambient: AmbientLife,

    // Inner state
    needs: Needs,
    affect: Affect,
    personality: Personality,
    memory: SpatialMemory,
    attention: AttentionSystem,
    selector: BehaviorSelector,
    episodic: EpisodicMemory,
    goals: GoalFormation,
    consciousness: ConsciousnessLayer,
    speech: SpeechUrge,
    people: PeopleRegistry,
    outcome_calc: OutcomeCalculator,
    learning: Learning,

    // I/O
    inbox: SensorInbox,
    streaming: bool,
    last_stream: f64,

    // Sensor snapshot
    distance_cm: f32,
    last_distance: f32,
    current_direction: usize,

    // Tracking
    tracking: TrackingState,
    last_face_seen: f64,
    face_visible: bool,
    face_recognized: bool,
    limit_stuck_since: Option<(i32, i32, f64)>,

    // Behavior
    current_behavior: Behavior,
    previous_behavior: Behavior,
    behavior_uncertainty: f32,
    retreat_loop: u32,

    // Tier clocks
    booted: bool,
    last_fast: f64,
    last_medium: f64,
    last_slow: f64,
}

impl Coordinator {
    pub fn new(config: FirmwareConfig) -> Self {
        let personality = match config.robot.archetype.as_str() {
            "bold_explorer" => Personality::bold_explorer(),
            "shy_observer" => Personality::shy_observer(),
            "playful_friend" => Personality::playful_friend(),
            _ => Personality::default(),
        };
        Self {
            config,
            driver: ServoDriver::new(),
            reflex: ReflexController::new(),
            gestures: GestureEngine::new(),
            looping: LoopingAnimator::new(),
            ambient: AmbientLife::new(),
            needs: Needs::default(),
            affect: Affect::default(),
            personality,
            memory: SpatialMemory::new(),
            attention: AttentionSystem::new(),
            selector: BehaviorSelector::new(),
            episodic: EpisodicMemory::new(),
            goals: GoalFormation::new(),
            consciousness: ConsciousnessLayer::new(),
            speech: SpeechUrge::new(),
            people: PeopleRegistry::new(),
            outcome_calc: OutcomeCalculator::new(),
            learning: Learning::new(),
            inbox: SensorInbox::new(),
            streaming: false,
            last_stream: 0.0,
            distance_cm: wren_bridge::RANGE_SENTINEL_CM,
            last_distance: wren_bridge::RANGE_SENTINEL_CM,
            current_direction: 4,
            tracking: TrackingState::Idle,
            last_face_seen: 0.0,
            face_visible: false,
            face_recognized: false,
            limit_stuck_since: None,
            current_behavior: Behavior::Idle,
            previous_behavior: Behavior::Idle,
            behavior_uncertainty: 0.0,
            retreat_loop: 0,
            booted: false,
            last_fast: 0.0,
            last_medium: 0.0,
            last_slow: 0.0,
        }
    }

    /// Center the head, restore learned state and start the session.
    pub fn boot(&mut self, bus: &mut dyn ServoBus, now: f64) {
        self.driver.initialize(bus, 90, 110, 85);

        let path = self.config.persistence.state_path.clone();
        match self
            .learning
            .load_state(&path, &mut self.personality, &mut self.selector)
        {
            Ok(()) => {}
            Err(err) => {
                tracing::info!(%err, "no usable saved state, starting fresh");
            }
        }
        self.learning.begin_session(now);
        self.outcome_calc.snapshot(&self.needs, &self.affect);

        self.streaming = self.config.timing.stream_on_boot;
        self.last_stream = now;
        self.last_fast = now;
        self.last_medium = now;
        self.last_slow = now;
        self.booted = true;
        tracing::info!(
            sessions = self.learning.session_count(),
            archetype = %self.config.robot.archetype,
            "coordinator ready"
        );
    }

    /// One loop iteration. `input` holds every line received since the
    /// previous tick; the returned lines are replies and stream frames,
    /// in order.
    pub fn tick(
        &mut self,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        input: &[&str],
        now: f64,
    ) -> Vec<String> {
        let mut out = Vec::new();

        // 1. Input. Commands are answered inline; sensor lines land in
        // the latest-wins inbox.
        for line in input {
            if let Some(rest) = line.strip_prefix('!') {
                match parse_line(rest) {
                    Parsed::Command(cmd) => {
                        if let Some(reply) = self.execute(cmd, bus, rng, now) {
                            out.push(reply);
                        }
                    }
                    Parsed::Reply(reply) => out.push(reply.to_json_line()),
                    Parsed::Ignored => {}
                }
            } else {
                self.handle_raw_line(line, now);
            }
        }

        // 2. Newest sensor data.
        let (face, range) = self.inbox.take();
        let range_arrived = range.is_some();
        if let Some(cm) = range {
            self.distance_cm = cm;
        }
        if let Some(event) = face {
            self.apply_face_event(event, rng, now);
        }
        self.advance_tracking_state(bus, rng, now);

        // 3. Reflex drive.
        if self.reflex.is_active() {
            let (base, nod) = self.reflex.calculate(self.driver.base(), self.driver.nod(), now);
            self.driver.direct_write(bus, base, nod);
            self.check_stuck_at_limit(base, nod, now);
        } else {
            self.limit_stuck_since = None;
        }
        self.reflex.check_timeout(now);

        // 4. Cognition tiers.
        self.fast_tier(range_arrived, now);
        if now - self.last_medium >= self.config.timing.medium_interval_secs as f64 {
            self.medium_tier(bus, rng, now);
            self.last_medium = now;
        }
        if now - self.last_slow >= self.config.timing.slow_interval_secs as f64 {
            self.slow_tier(now);
            self.last_slow = now;
        }

        // 5. Looping animation, then ambient life. Both yield to the
        // reflex; ambient additionally yields to everything else.
        if !self.reflex.is_active() {
            self.looping.tick(&mut self.driver, bus, now);

            if !self.looping.is_active()
                && !self.gestures.is_animating()
                && self.tracking == TrackingState::Idle
            {
                let dt = (now - self.last_fast).max(0.0) as f32;
                self.ambient.tick(
                    &mut self.driver,
                    bus,
                    rng,
                    now,
                    dt.max(0.02),
                    &self.affect,
                    &self.needs,
                    &self.personality,
                );
            }
        }
        self.last_fast = now;

        // 6. Streaming.
        let interval = self.config.timing.stream_interval_ms as f64 / 1000.0;
        if self.streaming && now - self.last_stream >= interval {
            self.last_stream = now;
            out.push(self.state_report().to_stream_line());
        }

        out
    }

    // ============================================
    // Input handling
    // ============================================

    /// Non-command lines: single-character diagnostics, otherwise
    /// sensor traffic.
    fn handle_raw_line(&mut self, line: &str, now: f64) {
        match line.trim() {
            "s" => {
                if let Err(err) = self.save(now) {
                    tracing::warn!(%err, "manual save failed");
                }
            }
            "d" => self.log_diagnostics(now),
            _ => self.inbox.push(line),
        }
    }

    fn log_diagnostics(&self, now: f64) {
        tracing::info!(
            behavior = self.current_behavior.as_str(),
            emotion = self.affect.label().as_str(),
            uncertainty = self.behavior_uncertainty,
            tracking = self.reflex.is_active(),
            epistemic = self.consciousness.epistemic_state().as_str(),
            episodes = self.episodic.len(),
            people = self.people.len(),
            goal = self.goals.current().map(|g| g.kind.as_str()).unwrap_or("none"),
            session = self.learning.session_count(),
            uptime_s = now,
            "diagnostics"
        );
    }

    // ============================================
    // Command execution
    // ============================================

    fn execute(
        &mut self,
        cmd: Command,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        now: f64,
    ) -> Option<String> {
        if !self.booted {
            return match cmd {
                Command::Vision(_) => None,
                _ => Some(Reply::failed(ReplyReason::NotInitialized).to_json_line()),
            };
        }

        let reply = match cmd {
            Command::Query => return Some(self.state_report().to_json_line()),

            Command::Look { base, nod } => self.cmd_look(bus, rng, base, nod),

            Command::Satisfy { need, amount } => {
                let value = match need {
                    NeedKind::Social => {
                        self.needs.satisfy_social(amount);
                        self.needs.social
                    }
                    NeedKind::Stimulation => {
                        self.needs.satisfy_stimulation(amount);
                        self.needs.stimulation
                    }
                    NeedKind::Novelty => {
                        self.needs.satisfy_novelty(amount);
                        self.needs.novelty
                    }
                };
                Reply::NeedValue { need, value }
            }

            Command::Presence => {
                self.needs.detect_human_presence();
                Reply::Ok
            }

            Command::Express(label) => match self.motion_block() {
                Some(reason) => Reply::failed(reason),
                None => {
                    self.gestures.express_emotion(
                        &mut self.driver,
                        bus,
                        rng,
                        label,
                        &self.personality,
                        &self.needs,
                    );
                    Reply::Ok
                }
            },

            Command::Nod(count) => match self.motion_block() {
                Some(reason) => Reply::failed(reason),
                None => {
                    let style = self.style();
                    self.gestures.nod_yes(&mut self.driver, bus, rng, count, &style);
                    Reply::Ok
                }
            },

            Command::Shake(count) => match self.motion_block() {
                Some(reason) => Reply::failed(reason),
                None => {
                    let style = self.style();
                    self.gestures.shake_no(&mut self.driver, bus, rng, count, &style);
                    Reply::Ok
                }
            },

            Command::Attention(direction) => match self.motion_block() {
                Some(reason) => Reply::failed(reason),
                None => {
                    let style = self.style();
                    let (base, nod) = match direction {
                        AttentionDirection::Center => (90, 110),
                        AttentionDirection::Left => (140, 110),
                        AttentionDirection::Right => (40, 110),
                        AttentionDirection::Up => (90, 130),
                        AttentionDirection::Down => (90, 95),
                    };
                    let tilt = self.driver.tilt();
                    self.driver.smooth_move_to(bus, rng, base, nod, tilt, &style);
                    Reply::Ok
                }
            },

            Command::Listening => match self.motion_block() {
                Some(reason) => Reply::failed(reason),
                None => {
                    let style = self.style();
                    self.gestures.attentive_pose(&mut self.driver, bus, rng, &style);
                    Reply::Ok
                }
            },

            Command::Thinking => {
                self.looping.start(LoopingAnimation::Thinking, &self.driver, now);
                Reply::Ok
            }
            Command::Speaking => {
                self.looping.start(LoopingAnimation::Speaking, &self.driver, now);
                Reply::Ok
            }
            Command::StopThinking => {
                self.looping
                    .stop(LoopingAnimation::Thinking, &mut self.driver, bus);
                Reply::Ok
            }
            Command::StopSpeaking => {
                self.looping
                    .stop(LoopingAnimation::Speaking, &mut self.driver, bus);
                Reply::Ok
            }

            Command::Acknowledge => match self.motion_block() {
                Some(reason) => Reply::failed(reason),
                None => {
                    let style = self.style();
                    self.gestures.acknowledge(&mut self.driver, bus, rng, &style);
                    Reply::Ok
                }
            },

            Command::Celebrate => match self.motion_block() {
                Some(reason) => Reply::failed(reason),
                None => {
                    let style = self.style();
                    self.gestures.celebrate(&mut self.driver, bus, rng, &style);
                    Reply::Ok
                }
            },

            Command::Idle => {
                self.looping.stop_all(&mut self.driver, bus);
                if !self.reflex.is_active() {
                    let style = self.style();
                    self.gestures.return_to_neutral(&mut self.driver, bus, rng, &style);
                }
                Reply::Ok
            }

            Command::Stream(on) => {
                self.streaming = on;
                if on {
                    self.last_stream = now;
                }
                Reply::Streaming(on)
            }

            Command::Vision(update) => {
                self.apply_rich_vision(&update);
                return None;
            }

            Command::Spoke => {
                self.speech.utterance_completed(now);
                self.needs.satisfy_stimulation(0.1);
                Reply::Ok
            }
        };
        Some(reply.to_json_line())
    }

    fn style(&self) -> MovementStyle {
        MovementStyle::generate(&self.affect, &self.personality, &self.needs)
    }

    /// Why a motion one-shot cannot run right now, if it cannot.
    fn motion_block(&self) -> Option<ReplyReason> {
        if self.reflex.is_active() {
            Some(ReplyReason::TrackingActive)
        } else if self.looping.is_active() || self.gestures.is_animating() {
            Some(ReplyReason::Animating)
        } else {
            None
        }
    }

    fn cmd_look(&mut self, bus: &mut dyn ServoBus, rng: &mut impl Rng, base: i32, nod: i32) -> Reply {
        if let Some(reason) = self.motion_block() {
            return Reply::failed(reason);
        }
        let base = base.clamp(10, 170);
        let nod = nod.clamp(80, 150);
        let tilt = self.driver.tilt();
        let style = self.style();
        self.driver.smooth_move_to(bus, rng, base, nod, tilt, &style);
        Reply::Ok
    }

    /// Rich vision updates nudge inner state without a reply.
    fn apply_rich_vision(&mut self, update: &wren_bridge::RichVisionUpdate) {
        if update.face_present() {
            self.needs
                .satisfy_social(0.05 * update.face_count.max(1) as f32);
        }
        self.needs
            .satisfy_stimulation(update.motion * 0.05 + update.object_count as f32 * 0.01);

        let valence_nudge = match update.expression.as_str() {
            "happy" | "smile" => 0.05,
            "sad" | "frown" => -0.05,
            "surprised" => 0.02,
            _ => 0.0,
        };
        self.affect
            .nudge(update.motion * 0.1, valence_nudge, 0.0);

        if update.novelty > 0.0 {
            self.memory
                .inject_novelty(self.current_direction, update.novelty * 0.5);
        }
        tracing::debug!(
            faces = update.face_count,
            novelty = update.novelty,
            motion = update.motion,
            "rich vision applied"
        );
    }

    // ============================================
    // Face tracking
    // ============================================

    fn apply_face_event(&mut self, event: FaceEvent, rng: &mut impl Rng, now: f64) {
        match event {
            FaceEvent::Seen(obs) => {
                self.last_face_seen = now;
                self.face_visible = true;

                self.reflex
                    .update_face_data(obs.x, obs.y, obs.width, self.distance_cm as i32, now);
                self.reflex.update_confidence(obs.confidence);
                self.memory
                    .record_face_at(self.current_direction, self.distance_cm, now);

                if matches!(self.tracking, TrackingState::Idle | TrackingState::Disengaging) {
                    let boost = self
                        .people
                        .handle_detection(WIRE_PERSON_ID, self.distance_cm, now);
                    self.needs.satisfy_social(boost);
                    self.face_recognized = self.people.is_recognized(WIRE_PERSON_ID);

                    // Known people get committed to faster; strangers
                    // earn a longer, warier look first.
                    let duration = if self.face_recognized {
                        rng.gen_range(0.2..0.5)
                    } else {
                        rng.gen_range(0.4..0.8)
                    };
                    self.tracking = TrackingState::Engaging { since: now, duration };
                    self.reflex.enable();
                    tracing::debug!(recognized = self.face_recognized, "engaging face");
                }
            }
            FaceEvent::Lost => {
                self.face_visible = false;
                self.reflex.face_lost();
            }
        }
    }

    fn advance_tracking_state(
        &mut self,
        bus: &mut dyn ServoBus,
        rng: &mut impl Rng,
        now: f64,
    ) {
        let silence = now - self.last_face_seen;
        match self.tracking {
            TrackingState::Idle => {}

            TrackingState::Engaging { since, duration } => {
                if silence > 0.8 {
                    self.stop_tracking(bus, rng, now);
                } else if now - since >= duration {
                    let lock = if self.face_recognized {
                        rng.gen_range(5.0..12.0)
                    } else {
                        rng.gen_range(8.0..15.0)
                    };
                    self.tracking = TrackingState::Locked { since: now, duration: lock };
                    tracing::debug!(lock_s = lock, "locked on");
                }
            }

            TrackingState::Locked { since, duration } => {
                if silence > 2.0 || now - since >= duration {
                    self.tracking = TrackingState::Disengaging;
                }
            }

            TrackingState::Disengaging => {
                if silence > 1.5 {
                    self.stop_tracking(bus, rng, now);
                }
            }
        }
    }

    fn stop_tracking(&mut self, bus: &mut dyn ServoBus, rng: &mut impl Rng, now: f64) {
        self.tracking = TrackingState::Idle;
        self.reflex.disable();
        self.people.end_interaction();
        self.face_visible = false;

        if !self.looping.is_active() && !self.gestures.is_animating() {
            let mut style = self.style();
            style.speed = 0.3;
            self.gestures.return_to_neutral(&mut self.driver, bus, rng, &style);
        }
        tracing::debug!(at = now, "face tracking stopped");
    }

    /// Disable the reflex if its target has been pinned to the same
    /// mechanical limit for a while: the face is outside the reachable
    /// envelope and the head would just lean on the stop.
    fn check_stuck_at_limit(&mut self, base: i32, nod: i32, now: f64) {
        let at_limit = base == 10 || base == 170 || nod == 80 || nod == 150;
        if !at_limit {
            self.limit_stuck_since = None;
            return;
        }
        match self.limit_stuck_since {
            Some((b, n, since)) if b == base && n == nod => {
                if now - since >= STUCK_AT_LIMIT_S {
                    tracing::warn!(base, nod, "reflex pinned at limit, disabling");
                    self.reflex.disable();
                    self.tracking = TrackingState::Idle;
                    self.limit_stuck_since = None;
                }
            }
            _ => self.limit_stuck_since = Some((base, nod, now)),
        }
    }

    // ============================================
    // Cognition tiers
    // ============================================

    fn fast_tier(&mut self, range_arrived: bool, now: f64) {
        let dt = (now - self.last_fast).max(0.0) as f32;

        self.current_direction =
            (self.driver.base() / DIRECTION_SPAN_DEG).clamp(0, 7) as usize;
        if range_arrived {
            self.memory
                .update_reading(self.current_direction, self.distance_cm, now);
        }

        let change = (self.distance_cm - self.last_distance).abs();
        let novelty = self.memory.novelty(self.current_direction);
        self.affect.update(
            &self.needs,
            &self.personality,
            self.distance_cm,
            change,
            novelty,
            dt,
        );
        self.respond_to_novelty(novelty, now);
        self.last_distance = self.distance_cm;

        // A retreat that keeps getting reselected means the threat
        // reading is stale; declare the retreat successful and move on.
        if self.current_behavior == Behavior::Retreat {
            self.retreat_loop += 1;
            if self.retreat_loop > RETREAT_LOOP_LIMIT {
                self.needs.successful_retreat(now);
                self.retreat_loop = 0;
            }
        } else if self.retreat_loop > 0 {
            self.retreat_loop -= 1;
        }
    }

    fn respond_to_novelty(&mut self, novelty: f32, now: f64) {
        if novelty < 0.6 {
            return;
        }
        if matches!(self.current_behavior, Behavior::Retreat | Behavior::Rest) {
            return;
        }
        if novelty > 0.8 {
            self.needs.satisfy_stimulation(0.15);
            self.needs.satisfy_novelty(0.20);
        } else {
            self.needs.satisfy_stimulation(0.08);
            self.needs.satisfy_novelty(0.10);
        }
        self.attention
            .force_attention(self.current_direction, 0.6, now);
    }

    fn medium_tier(&mut self, bus: &mut dyn ServoBus, rng: &mut impl Rng, now: f64) {
        let dt = (now - self.last_medium).max(0.0) as f32;

        self.needs
            .update(dt, now, &self.personality, self.memory.environment_sample());
        self.attention.update(&self.memory, &self.personality, dt, now);

        let scores = self.selector.score_all(
            &self.needs,
            &self.personality,
            &self.affect,
            &self.memory,
            &self.episodic,
            self.current_direction,
            now,
        );
        self.consciousness.update(
            &scores,
            &self.needs,
            &self.affect,
            &self.personality,
            &self.memory,
            rng,
            now,
        );
        self.speech.update(
            &self.needs,
            &self.affect,
            &self.personality,
            SpeechContext {
                is_wondering: self.consciousness.is_wondering(),
                in_conflict: self.consciousness.in_conflict(),
                conflict_tension: self.consciousness.tension(),
                face_detected: self.face_visible,
                face_recognized: self.face_recognized,
                environment_novelty: self.memory.total_novelty(),
            },
            now,
        );

        let mut selected = self.selector.select(&scores, rng, now);
        let (goal_choice, resolution) = self.goals.pursue(selected, &self.personality, rng, now);
        selected = goal_choice;
        if let Some(res) = resolution {
            tracing::info!(?res, "goal resolved during pursuit");
        }
        if self.selector.is_stuck(now) {
            selected = self.selector.force_alternative(&scores, now);
            self.needs.force_exploration_drive();
        }

        // Close out the previous cycle before switching.
        let outcome = self.close_outcome(now);

        self.previous_behavior = self.current_behavior;
        self.current_behavior = selected;
        self.selector.record_execution(selected, now);
        if self.current_behavior != self.previous_behavior {
            self.outcome_calc.snapshot(&self.needs, &self.affect);
        }

        // Uncertainty is how close the runner-up came.
        self.behavior_uncertainty = match (scores.first(), scores.get(1)) {
            (Some(top), Some(second)) => {
                (1.0 - (top.final_score - second.final_score)).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };

        if self.goals.should_form_goal(
            self.current_behavior,
            &self.affect,
            &self.personality,
            self.memory.total_novelty(),
            self.needs.social,
            now,
        ) {
            self.form_appropriate_goal(now);
        }

        if self.behavior_uncertainty > 0.4 && rng.gen_range(0..100u32) < 15 {
            self.consciousness.trigger_counterfactual(outcome, rng, now);
        }
        if self.current_behavior != self.previous_behavior
            && !matches!(self.current_behavior, Behavior::Idle | Behavior::Rest)
        {
            self.consciousness.record_significant_action(outcome);
        }

        self.execute_behavior(bus, rng, now);
        self.learning.decay_fast_weights(dt / 60.0);
    }

    /// Score the cycle that just ended and feed every learner.
    fn close_outcome(&mut self, now: f64) -> f32 {
        let mut outcome = self.outcome_calc.calculate(
            self.current_behavior,
            &self.needs,
            &self.affect,
            Some(&self.goals),
        );
        // A retreat that will not end is not working.
        if self.current_behavior == Behavior::Retreat
            && self.selector.consecutive_count(Behavior::Retreat) > 2
        {
            outcome *= 0.5;
        }

        if self.current_behavior != Behavior::Idle {
            self.learning.record_outcome(self.current_behavior, outcome, now);
            self.selector.update_weight(self.current_behavior, outcome);
        }
        if self.current_behavior == Behavior::SocialEngage {
            self.consciousness.record_social_outcome(outcome);
        }
        outcome
    }

    fn form_appropriate_goal(&mut self, now: f64) {
        let focus = self.attention.focus_direction();
        let focus_distance = self.memory.average_distance(focus);

        let kind = if self.memory.total_novelty() > 0.7 {
            GoalType::InvestigateThoroughly
        } else if self.needs.social > 0.7 {
            GoalType::SeekSocial
        } else if self.attention.max_salience() > 0.6 {
            GoalType::UnderstandPattern
        } else if self.personality.playfulness > 0.6 && self.needs.energy > 0.5 {
            GoalType::Experiment
        } else if self.needs.energy < 0.3 {
            GoalType::RestFully
        } else {
            GoalType::ExploreArea
        };
        self.goals
            .form_goal(kind, focus, focus_distance, &self.personality, now);
    }

    fn execute_behavior(&mut self, bus: &mut dyn ServoBus, rng: &mut impl Rng, now: f64) {
        // Reflex and conversational loops outrank behavior motion; the
        // needs side-effects still apply so the inner state keeps moving.
        let may_move = !self.reflex.is_active() && !self.looping.is_active();
        let style = self.style();

        match self.current_behavior {
            Behavior::Idle => {
                if may_move {
                    self.gestures.return_to_neutral(&mut self.driver, bus, rng, &style);
                }
                self.needs.consume_energy(-0.02);
            }
            Behavior::Explore => {
                if may_move {
                    self.run_sequence(bus, rng, Behavior::Explore);
                }
                self.needs.satisfy_stimulation(0.15);
                self.needs.consume_energy(0.05);
            }
            Behavior::Investigate => {
                self.reflex.enable();
                if may_move {
                    self.run_sequence(bus, rng, Behavior::Investigate);
                    if self.personality.curiosity > 0.5 && rng.gen_range(0..100u32) < 50 {
                        self.gestures.curious_tilt(
                            &mut self.driver,
                            bus,
                            rng,
                            &self.personality,
                            &style,
                        );
                    }
                }
                self.needs.satisfy_novelty(0.2);
                self.needs.satisfy_stimulation(0.1);
                self.needs.consume_energy(0.03);
            }
            Behavior::SocialEngage => {
                self.reflex.enable();
                if may_move {
                    self.run_sequence(bus, rng, Behavior::SocialEngage);
                }
                self.needs.satisfy_social(0.2);
                self.needs.consume_energy(0.02);
            }
            Behavior::Retreat => {
                if may_move {
                    self.gestures
                        .retreat_motion(&mut self.driver, bus, rng, &MovementStyle::anxious());
                }
                self.needs.consume_energy(0.02);
            }
            Behavior::Rest => {
                if may_move {
                    self.run_sequence(bus, rng, Behavior::Rest);
                }
                self.needs.consume_energy(-0.1);
            }
            Behavior::Play => {
                if may_move {
                    self.gestures.playful_bounce(&mut self.driver, bus, rng, &style);
                }
                self.needs.consume_energy(0.06);
            }
            Behavior::Vigilant => {
                if may_move {
                    let center = direction_to_angle(self.attention.focus_direction());
                    self.gestures
                        .scanning_motion(&mut self.driver, bus, rng, center, 30.0, &style);
                }
                self.needs.consume_energy(0.03);
            }
        }

        let outcome = self.outcome_calc.calculate(
            self.current_behavior,
            &self.needs,
            &self.affect,
            Some(&self.goals),
        );
        self.episodic.record_episode(
            self.current_behavior,
            self.affect.label(),
            self.distance_cm,
            self.current_direction,
            self.memory.likely_human_present(),
            outcome,
            now,
        );
        if self.goals.has_active_goal() {
            if let Some(res) = self.goals.record_progress(self.current_behavior, outcome, now) {
                tracing::info!(?res, "goal finished");
            }
        }
    }

    fn run_sequence(&mut self, bus: &mut dyn ServoBus, rng: &mut impl Rng, behavior: Behavior) {
        self.gestures.execute_behavior(
            &mut self.driver,
            bus,
            rng,
            behavior,
            &self.affect,
            &self.personality,
            &self.needs,
        );
    }

    fn slow_tier(&mut self, now: f64) {
        let quality = self.session_quality();
        self.learning.consolidate(quality);
        self.learning.drift_personality(&mut self.personality, 0.001);
        self.episodic.consolidate(now);

        if self.config.persistence.autosave {
            if let Err(err) = self.save(now) {
                tracing::warn!(%err, "autosave failed");
            }
        }
        tracing::debug!(quality, "slow tier consolidated");
    }

    fn session_quality(&self) -> f32 {
        let need_balance = 1.0 - self.needs.imbalance();
        let emotional_state = self.affect.valence * 0.5 + 0.5;
        let exploration_value = self.memory.total_novelty();
        let attention_engagement = self.attention.max_salience();

        let loop_penalty = if self.selector.consecutive_count(self.current_behavior) > 4 {
            0.2
        } else {
            0.0
        };
        let goal_bonus = self.goals.current().map_or(0.0, |g| g.progress * 0.1);

        need_balance * 0.3
            + emotional_state * 0.2
            + exploration_value * 0.2
            + attention_engagement * 0.3
            + goal_bonus
            - loop_penalty
    }

    /// Final save before the process exits.
    pub fn save_on_shutdown(&self, now: f64) -> Result<(), wren_mind::StateError> {
        self.save(now)
    }

    fn save(&self, now: f64) -> Result<(), wren_mind::StateError> {
        self.learning.save_state(
            &self.config.persistence.state_path,
            &self.personality,
            &self.selector,
            now,
        )
    }

    // ============================================
    // Reporting
    // ============================================

    pub fn state_report(&self) -> StateReport {
        let (base, nod, tilt) = self.driver.position();
        StateReport {
            arousal: self.affect.arousal,
            valence: self.affect.valence,
            dominance: self.affect.dominance,
            emotion: self.affect.label().as_str(),
            behavior: self.current_behavior.as_str(),
            stimulation: self.needs.stimulation,
            social: self.needs.social,
            energy: self.needs.energy,
            safety: self.needs.safety,
            novelty: self.needs.novelty,
            tracking: self.reflex.is_active(),
            servo_base: base,
            servo_nod: nod,
            servo_tilt: tilt,
            animating: self.looping.is_active() || self.gestures.is_animating(),
            epistemic: self.consciousness.epistemic_state().as_str(),
            tension: self.consciousness.tension(),
            wondering: self.consciousness.is_wondering(),
            self_awareness: self.consciousness.self_awareness(),
            speech_urge: self.speech.urge(),
            speech_trigger: self.speech.trigger().as_str(),
            wants_to_speak: self.speech.wants_to_speak(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn current_behavior(&self) -> Behavior {
        self.current_behavior
    }

    pub fn is_tracking(&self) -> bool {
        self.reflex.is_active()
    }
}

fn direction_to_angle(direction: usize) -> i32 {
    direction as i32 * DIRECTION_SPAN_DEG + DIRECTION_SPAN_DEG / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use wren_motion::MockServoBus;

    const TICK: f64 = 0.02;

    fn booted() -> (Coordinator, MockServoBus, StdRng) {
        let mut config = FirmwareConfig::default();
        config.persistence.autosave = false;
        config.persistence.state_path = std::env::temp_dir().join("wren_coord_test_state.bin");
        let mut coordinator = Coordinator::new(config);
        let mut bus = MockServoBus::new();
        coordinator.boot(&mut bus, 0.0);
        (coordinator, bus, StdRng::seed_from_u64(7))
    }

    fn run_quiet(
        coordinator: &mut Coordinator,
        bus: &mut MockServoBus,
        rng: &mut StdRng,
        from: f64,
        ticks: usize,
    ) -> f64 {
        let mut now = from;
        for _ in 0..ticks {
            now += TICK;
            coordinator.tick(bus, rng, &[], now);
        }
        now
    }

    #[test]
    fn test_cold_query() {
        let (mut coordinator, mut bus, mut rng) = booted();
        let out = coordinator.tick(&mut bus, &mut rng, &["!QUERY"], TICK);

        assert_eq!(out.len(), 1, "exactly one reply line");
        let line = &out[0];
        assert!(line.contains("\"emotion\":\"NEUTRAL\""), "got {}", line);
        assert!(line.contains("\"behavior\":\"IDLE\""), "got {}", line);
        assert!(line.contains("\"tracking\":false"), "got {}", line);
        assert!(line.contains("\"servoBase\":90"), "got {}", line);
    }

    #[test]
    fn test_commands_before_boot_are_rejected() {
        let mut coordinator = Coordinator::new(FirmwareConfig::default());
        let mut bus = MockServoBus::new();
        let mut rng = StdRng::seed_from_u64(1);
        let out = coordinator.tick(&mut bus, &mut rng, &["!QUERY"], 0.0);
        assert_eq!(out, vec!["{\"ok\":false,\"reason\":\"not_initialized\"}"]);
    }

    #[test]
    fn test_face_acquire_activates_tracking() {
        let (mut coordinator, mut bus, mut rng) = booted();
        let mut now = 0.0;
        for seq in 1..=5 {
            now += TICK;
            let line = format!("FACE:140,120,0,0,60,60,85,{}", seq);
            coordinator.tick(&mut bus, &mut rng, &[line.as_str()], now);
        }
        assert!(coordinator.is_tracking(), "reflex should engage within 5 ticks");
    }

    #[test]
    fn test_arbitration_blocks_gesture_during_tracking() {
        let (mut coordinator, mut bus, mut rng) = booted();
        let mut now = 0.0;
        for seq in 1..=5 {
            now += TICK;
            // Moving coordinates so the staleness filter keeps the data.
            let line = format!("FACE:{},120,2,0,60,60,85,{}", 130 + seq * 2, seq);
            coordinator.tick(&mut bus, &mut rng, &[line.as_str()], now);
        }
        assert!(coordinator.is_tracking());

        let out = coordinator.tick(&mut bus, &mut rng, &["!NOD:3"], now + TICK);
        assert_eq!(out, vec!["{\"ok\":false,\"reason\":\"tracking_active\"}"]);
    }

    #[test]
    fn test_stream_toggle_emits_and_stops() {
        let (mut coordinator, mut bus, mut rng) = booted();
        let out = coordinator.tick(&mut bus, &mut rng, &["!STREAM:on"], TICK);
        assert_eq!(out, vec!["{\"ok\":true,\"streaming\":true}"]);

        let mut frames = 0;
        let mut now = TICK;
        for _ in 0..60 {
            now += TICK;
            let lines = coordinator.tick(&mut bus, &mut rng, &[], now);
            frames += lines.iter().filter(|l| l.starts_with("STATE:")).count();
        }
        assert!(frames >= 2, "1.2 s of streaming should carry >= 2 frames, got {}", frames);

        let out = coordinator.tick(&mut bus, &mut rng, &["!STREAM:off"], now + TICK);
        assert_eq!(out, vec!["{\"ok\":true,\"streaming\":false}"]);
        let now = run_quiet(&mut coordinator, &mut bus, &mut rng, now + TICK, 30);
        let lines = coordinator.tick(&mut bus, &mut rng, &[], now + TICK);
        assert!(lines.iter().all(|l| !l.starts_with("STATE:")));
    }

    #[test]
    fn test_every_command_gets_exactly_one_reply() {
        let commands = [
            "!QUERY",
            "!LOOK:90,115",
            "!SATISFY:social,0.2",
            "!PRESENCE",
            "!EXPRESS:curious",
            "!NOD:2",
            "!SHAKE:1",
            "!ATTENTION:left",
            "!LISTENING",
            "!THINKING",
            "!STOP_THINKING",
            "!SPEAKING",
            "!STOP_SPEAKING",
            "!ACKNOWLEDGE",
            "!CELEBRATE",
            "!IDLE",
            "!STREAM:off",
            "!SPOKE",
            "!NONSENSE",
        ];
        let (mut coordinator, mut bus, mut rng) = booted();
        let mut now = 0.0;
        for cmd in commands {
            now += TICK;
            let out = coordinator.tick(&mut bus, &mut rng, &[cmd], now);
            assert_eq!(out.len(), 1, "{} must yield exactly one line", cmd);
        }

        now += TICK;
        let out = coordinator.tick(
            &mut bus,
            &mut rng,
            &["!VISION:{\"f\":1,\"fc\":1,\"nv\":0.3,\"mv\":0.1,\"ob\":0,\"ex\":\"\"}"],
            now,
        );
        assert!(out.is_empty(), "VISION is fire-and-forget");
    }

    #[test]
    fn test_stop_thinking_is_idempotent() {
        let (mut coordinator, mut bus, mut rng) = booted();
        coordinator.tick(&mut bus, &mut rng, &["!THINKING"], TICK);
        assert!(coordinator.state_report().animating);

        let out = coordinator.tick(&mut bus, &mut rng, &["!THINKING"], 2.0 * TICK);
        assert_eq!(out, vec!["{\"ok\":true}"], "second THINKING still succeeds");
        assert!(coordinator.state_report().animating, "loop keeps running");

        coordinator.tick(&mut bus, &mut rng, &["!STOP_THINKING"], 3.0 * TICK);
        assert!(!coordinator.state_report().animating);
        let out = coordinator.tick(&mut bus, &mut rng, &["!STOP_THINKING"], 4.0 * TICK);
        assert_eq!(out, vec!["{\"ok\":true}"]);
        assert!(!coordinator.state_report().animating);
    }

    #[test]
    fn test_gesture_blocked_while_looping() {
        let (mut coordinator, mut bus, mut rng) = booted();
        coordinator.tick(&mut bus, &mut rng, &["!SPEAKING"], TICK);
        let out = coordinator.tick(&mut bus, &mut rng, &["!NOD:1"], 2.0 * TICK);
        assert_eq!(out, vec!["{\"ok\":false,\"reason\":\"animating\"}"]);
    }

    #[test]
    fn test_servo_angles_stay_in_bounds() {
        let (mut coordinator, mut bus, mut rng) = booted();
        let mut now = 0.0;
        let inputs = [
            "!LOOK:500,500",
            "!LOOK:-40,0",
            "!EXPRESS:excited",
            "!NOD:10",
            "!CELEBRATE",
            "RANGE:12",
            "!ATTENTION:up",
        ];
        for line in inputs {
            now += TICK;
            coordinator.tick(&mut bus, &mut rng, &[line], now);
        }
        run_quiet(&mut coordinator, &mut bus, &mut rng, now, 400);

        for angle in bus.writes_for(wren_motion::Axis::Base) {
            assert!((10..=170).contains(&angle), "base out of range: {}", angle);
        }
        for angle in bus.writes_for(wren_motion::Axis::Nod) {
            assert!((80..=150).contains(&angle), "nod out of range: {}", angle);
        }
        for angle in bus.writes_for(wren_motion::Axis::Tilt) {
            assert!((20..=150).contains(&angle), "tilt out of range: {}", angle);
        }
    }

    #[test]
    fn test_satisfy_reports_new_value() {
        let (mut coordinator, mut bus, mut rng) = booted();
        let out = coordinator.tick(&mut bus, &mut rng, &["!SATISFY:social,1.0"], TICK);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("{\"ok\":true,\"need\":\"social\",\"value\":"));
    }

    #[test]
    fn test_range_updates_distance_and_memory() {
        let (mut coordinator, mut bus, mut rng) = booted();
        coordinator.tick(&mut bus, &mut rng, &["RANGE:55"], TICK);
        assert_eq!(coordinator.distance_cm, 55.0);
        // The bin under the current bearing saw the reading.
        let dir = coordinator.current_direction;
        assert!((coordinator.memory.average_distance(dir) - 200.0).abs() > 1.0);
    }

    #[test]
    fn test_behavior_switching_waits_out_dwell() {
        let (mut coordinator, mut bus, mut rng) = booted();
        let mut now = 0.0;
        let mut switches = Vec::new();
        let mut last = coordinator.current_behavior();
        // Ten minutes of quiet ticks with occasional range chatter.
        for i in 0..3000 {
            now += 0.2;
            let line = format!("RANGE:{}", 60 + (i % 7) * 40);
            coordinator.tick(&mut bus, &mut rng, &[line.as_str()], now);
            let behavior = coordinator.current_behavior();
            if behavior != last {
                switches.push((now, behavior));
                last = behavior;
            }
        }
        for pair in switches.windows(2) {
            let held = pair[1].0 - pair[0].0;
            assert!(
                held >= 9.9 || pair[1].1 == Behavior::Retreat,
                "switched after only {:.1} s into {:?}",
                held,
                pair[1].1
            );
        }
    }
}
