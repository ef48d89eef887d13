//! Reflexive face tracking.
//!
//! This is the spinal pathway: camera coordinates in, servo angles out,
//! no cognition in between. An adaptive PID with four gain sets chases the
//! face, a pair of state machines handle acquisition and blind recovery,
//! and stale-data detection protects against a frozen detector upstream.
//!
//! The camera rides on the nod servo, so pan error maps to base and
//! vertical error maps to nod.

use crate::servo::{BASE_CENTER, BASE_MAX, BASE_MIN, NOD_CENTER, NOD_MAX, NOD_MIN};

pub const FRAME_WIDTH: i32 = 240;
pub const FRAME_HEIGHT: i32 = 240;
pub const CENTER_X: i32 = 120;
pub const CENTER_Y: i32 = 120;

const ACQUIRE_THRESHOLD: f32 = 20.0;
const FRAMES_TO_ACQUIRE: u32 = 1;
const FRAMES_TO_TRACK: u32 = 2;
const FRAMES_TO_LOST: u32 = 10;

const RETURN_TO_CENTER_TIMEOUT: f64 = 1.5;
const BLIND_IGNORE_FRAMES: u32 = 5;
const SETTLING_FRAMES: u32 = 10;
const SETTLING_GAIN_SCALE: f32 = 0.3;

/// Max degrees of travel per 20 ms frame. Higher values chase the face
/// straight out of the frame.
const MAX_VELOCITY_PER_FRAME: f32 = 6.0;
const SMOOTHING_FACTOR: f32 = 0.5;
const REFERENCE_FACE_WIDTH: f32 = 55.0;

const STALE_THRESHOLD_PX: i32 = 3;
const STALE_TIMEOUT: f64 = 0.3;
const STALE_MAX_COUNT: u32 = 5;

const FACE_SILENCE_TIMEOUT: f64 = 2.0;
const TIMEOUT_CHECK_INTERVAL: f64 = 0.5;

const CONTROL_DT: f32 = 0.02;
const UPDATE_INTERVAL: f64 = 0.02;

// ============================================================================
// Adaptive PID
// ============================================================================

#[derive(Debug, Clone)]
struct AdaptivePid {
    kp: f32,
    ki: f32,
    kd: f32,
    integral: f32,
    prev_error: f32,
    max_integral: f32,
}

impl AdaptivePid {
    fn new() -> Self {
        Self {
            kp: 0.07,
            ki: 0.012,
            kd: 0.0025,
            integral: 0.0,
            prev_error: 0.0,
            max_integral: 15.0,
        }
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    /// Pick a gain set by error magnitude, then scale by motion confidence.
    fn update_gains(&mut self, error: f32, motion_scale: f32) {
        let abs_error = error.abs();
        let (kp, kd) = if abs_error > 50.0 {
            (0.11, 0.004)
        } else if abs_error > 30.0 {
            (0.09, 0.003)
        } else if abs_error > 15.0 {
            (0.07, 0.0025)
        } else {
            (0.05, 0.0015)
        };
        self.kp = kp * motion_scale;
        self.kd = kd * motion_scale;
    }

    fn update(&mut self, error: f32, dt: f32) -> f32 {
        let derivative = (error - self.prev_error) / dt;
        self.integral += self.ki * error * dt;
        self.integral = self.integral.clamp(-self.max_integral, self.max_integral);
        let output = self.kp * error + self.integral + self.kd * derivative;
        self.prev_error = error;
        output
    }

    fn kp(&self) -> f32 {
        self.kp
    }
}

// ============================================================================
// Gentle return trajectory
// ============================================================================

#[derive(Debug, Clone, Default)]
struct ReturnTrajectory {
    active: bool,
    start_pan: f32,
    start_tilt: f32,
    target_pan: f32,
    target_tilt: f32,
    current_step: f32,
    total_steps: f32,
}

impl ReturnTrajectory {
    fn plan_return_to_center(&mut self, from_pan: f32, from_tilt: f32) {
        self.start_pan = from_pan;
        self.start_tilt = from_tilt;
        self.target_pan = BASE_CENTER as f32;
        self.target_tilt = NOD_CENTER as f32;

        let distance = ((self.target_pan - from_pan).powi(2)
            + (self.target_tilt - from_tilt).powi(2))
        .sqrt();
        let duration_seconds = (distance / 60.0).clamp(0.3, 1.5);

        self.total_steps = duration_seconds * 50.0;
        self.current_step = 0.0;
        self.active = true;
    }

    fn next_position(&mut self) -> Option<(f32, f32)> {
        if !self.active {
            return None;
        }
        if self.current_step >= self.total_steps {
            self.active = false;
            return None;
        }

        let t = self.current_step / self.total_steps;
        let smooth_t = if t < 0.5 {
            2.0 * t * t
        } else {
            1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
        };

        let pan = self.start_pan + (self.target_pan - self.start_pan) * smooth_t;
        let tilt = self.start_tilt + (self.target_tilt - self.start_tilt) * smooth_t;

        self.current_step += 1.0;
        Some((pan, tilt))
    }

    fn cancel(&mut self) {
        self.active = false;
    }
}

// ============================================================================
// State machines
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Lost,
    Acquire,
    Track,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlindState {
    Normal,
    BlindMoving,
    GentleSettling,
}

// ============================================================================
// Controller
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReflexController {
    active: bool,
    should_be_active: bool,

    control_state: ControlState,
    blind_state: BlindState,

    face_x: i32,
    face_y: i32,
    face_vx: i32,
    face_vy: i32,
    face_size: i32,
    face_confidence: i32,
    face_distance: i32,
    last_face_time: f64,

    prev_face_x: i32,
    prev_face_y: i32,
    last_change_time: f64,
    stale_count: u32,
    data_is_stale: bool,

    frames_tracked: u32,
    frames_lost: u32,
    blind_frame_counter: u32,
    oscillation_count: i32,

    pan_angle: f32,
    tilt_angle: f32,
    target_base: i32,
    target_nod: i32,

    tracking_quality: f32,
    error_magnitude: f32,
    prev_error_magnitude: f32,
    settled: bool,

    update_count: u64,
    current_gain: f32,

    pan_pid: AdaptivePid,
    tilt_pid: AdaptivePid,
    trajectory: ReturnTrajectory,

    last_update_time: f64,
    last_timeout_check: f64,
    returning_to_center: bool,

    last_velocity_x: i32,
    last_velocity_y: i32,
    last_velocity_time: f64,
}

impl Default for ReflexController {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflexController {
    pub fn new() -> Self {
        Self {
            active: false,
            should_be_active: false,
            control_state: ControlState::Lost,
            blind_state: BlindState::Normal,
            face_x: CENTER_X,
            face_y: CENTER_Y,
            face_vx: 0,
            face_vy: 0,
            face_size: 0,
            face_confidence: 0,
            face_distance: 100,
            last_face_time: 0.0,
            prev_face_x: CENTER_X,
            prev_face_y: CENTER_Y,
            last_change_time: 0.0,
            stale_count: 0,
            data_is_stale: false,
            frames_tracked: 0,
            frames_lost: 0,
            blind_frame_counter: 0,
            oscillation_count: 0,
            pan_angle: BASE_CENTER as f32,
            tilt_angle: NOD_CENTER as f32,
            target_base: BASE_CENTER,
            target_nod: NOD_CENTER,
            tracking_quality: 0.0,
            error_magnitude: 0.0,
            prev_error_magnitude: 0.0,
            settled: false,
            update_count: 0,
            current_gain: 0.11,
            pan_pid: AdaptivePid::new(),
            tilt_pid: AdaptivePid::new(),
            trajectory: ReturnTrajectory::default(),
            last_update_time: 0.0,
            last_timeout_check: 0.0,
            returning_to_center: false,
            last_velocity_x: CENTER_X,
            last_velocity_y: CENTER_Y,
            last_velocity_time: 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn enable(&mut self) {
        self.should_be_active = true;
        self.active = true;
    }

    pub fn disable(&mut self) {
        self.should_be_active = false;
        if self.active {
            self.active = false;
            self.settled = false;
        }
    }

    /// Deactivate after two seconds of face silence. Checked at most twice a
    /// second; the fast path stays cheap.
    pub fn check_timeout(&mut self, now: f64) {
        if !self.active {
            return;
        }
        if now - self.last_timeout_check < TIMEOUT_CHECK_INTERVAL {
            return;
        }
        self.last_timeout_check = now;

        if self.last_face_time > 0.0 && now - self.last_face_time > FACE_SILENCE_TIMEOUT {
            tracing::debug!("face silence timeout, reflex deactivating");
            self.active = false;
        }
    }

    /// Feed one face detection. Stale frames (coordinates frozen for too
    /// long) deactivate tracking and are dropped.
    pub fn update_face_data(&mut self, x: i32, y: i32, size: i32, distance: i32, now: f64) {
        let x = x.clamp(0, FRAME_WIDTH);
        let y = y.clamp(0, FRAME_HEIGHT);

        let total_change = (x - self.prev_face_x).abs() + (y - self.prev_face_y).abs();
        if total_change >= STALE_THRESHOLD_PX {
            self.prev_face_x = x;
            self.prev_face_y = y;
            self.last_change_time = now;
            self.stale_count = 0;
            self.data_is_stale = false;
        } else {
            self.stale_count += 1;
            let since_change = now - self.last_change_time;
            if since_change > STALE_TIMEOUT || self.stale_count > STALE_MAX_COUNT {
                self.data_is_stale = true;
                if self.active {
                    tracing::debug!(
                        stale_count = self.stale_count,
                        "stale face data, reflex deactivating"
                    );
                    self.active = false;
                }
                return;
            }
        }

        // Velocity from position deltas, when the time delta is sane.
        if self.last_velocity_time > 0.0 {
            let dt = (now - self.last_velocity_time) as f32;
            if dt > 0.001 && dt < 0.5 {
                self.face_vx = (((x - self.last_velocity_x) as f32 / dt) as i32).clamp(-200, 200);
                self.face_vy = (((y - self.last_velocity_y) as f32 / dt) as i32).clamp(-200, 200);
            }
        }
        self.last_velocity_x = x;
        self.last_velocity_y = y;
        self.last_velocity_time = now;

        self.face_x = x;
        self.face_y = y;
        self.face_size = size;
        self.face_distance = distance;
        self.last_face_time = now;

        // Detectors that never report confidence get full trust.
        if self.face_confidence == 0 {
            self.face_confidence = 100;
        }

        if self.should_be_active && !self.active && !self.data_is_stale {
            self.active = true;
        }
    }

    pub fn update_confidence(&mut self, confidence: i32) {
        self.face_confidence = confidence.clamp(0, 100);
    }

    pub fn face_lost(&mut self) {
        if self.active {
            self.active = false;
            self.settled = false;
        }
    }

    /// One control frame: returns the base/nod targets to write. Throttled
    /// internally to 50 Hz; calls inside the same frame return the cached
    /// targets.
    pub fn calculate(&mut self, current_base: i32, current_nod: i32, now: f64) -> (i32, i32) {
        if now - self.last_update_time < UPDATE_INTERVAL {
            return (self.target_base, self.target_nod);
        }
        self.last_update_time = now;

        self.pan_angle = current_base as f32;
        self.tilt_angle = current_nod as f32;

        // Blind state machine: during a blind return, face data is ignored
        // so the camera sweeping across the scene cannot hijack the move.
        if self.blind_state != BlindState::Normal {
            self.blind_frame_counter += 1;

            if self.blind_state == BlindState::BlindMoving {
                if self.blind_frame_counter <= BLIND_IGNORE_FRAMES {
                    if let Some((pan, tilt)) = self.trajectory.next_position() {
                        self.pan_angle = pan;
                        self.tilt_angle = tilt;
                    }
                    self.store_targets();
                    return (self.target_base, self.target_nod);
                }
                self.blind_state = BlindState::GentleSettling;
                self.blind_frame_counter = 0;
            }

            if self.blind_state == BlindState::GentleSettling
                && self.blind_frame_counter > SETTLING_FRAMES
            {
                self.blind_state = BlindState::Normal;
                self.blind_frame_counter = 0;
                self.returning_to_center = false;
            }
        }

        // Acquisition state machine.
        let face_detected = self.active && !self.data_is_stale;
        if face_detected {
            self.frames_lost = 0;
            self.frames_tracked += 1;

            if self.control_state == ControlState::Lost
                && self.frames_tracked >= FRAMES_TO_ACQUIRE
            {
                self.control_state = ControlState::Acquire;
                self.trajectory.cancel();
            } else if self.control_state == ControlState::Acquire
                && self.frames_tracked >= FRAMES_TO_TRACK
            {
                let error_x = (self.face_x - CENTER_X).abs() as f32;
                let error_y = (self.face_y - CENTER_Y).abs() as f32;
                if error_x < ACQUIRE_THRESHOLD && error_y < ACQUIRE_THRESHOLD {
                    self.control_state = ControlState::Track;
                }
            }
        } else {
            self.frames_tracked = 0;
            self.frames_lost += 1;
            if self.frames_lost >= FRAMES_TO_LOST && self.control_state != ControlState::Lost {
                self.control_state = ControlState::Lost;
                self.blind_state = BlindState::Normal;
            }
        }

        match self.control_state {
            ControlState::Acquire | ControlState::Track => self.update_predictive_tracking(),
            ControlState::Lost => self.update_lost(now),
        }

        self.store_targets();
        self.update_count += 1;
        (self.target_base, self.target_nod)
    }

    fn store_targets(&mut self) {
        self.target_base = (self.pan_angle as i32).clamp(BASE_MIN, BASE_MAX);
        self.target_nod = (self.tilt_angle as i32).clamp(NOD_MIN, NOD_MAX);
    }

    fn update_predictive_tracking(&mut self) {
        let mut error_x = (self.face_x - CENTER_X) as f32;
        let mut error_y = (self.face_y - CENTER_Y) as f32;

        // Adaptive deadband, TRACK only: high confidence earns a tight
        // deadband, low confidence a forgiving one.
        if self.control_state == ControlState::Track {
            let confidence_ratio = self.face_confidence as f32 / 100.0;
            let deadband = 12.0 + (1.0 - confidence_ratio) * 8.0;
            if error_x.abs() < deadband {
                error_x = 0.0;
            }
            if error_y.abs() < deadband {
                error_y = 0.0;
            }
        }

        let total_error = (error_x * error_x + error_y * error_y).sqrt();
        self.error_magnitude = total_error;

        // Confidence-based motion scaling.
        let mut motion_scale = 0.4 + (self.face_confidence as f32 / 100.0) * 0.6;

        if self.blind_state == BlindState::GentleSettling {
            motion_scale *= SETTLING_GAIN_SCALE;
        }

        // Stationary target far from center: slow down to avoid overshoot.
        let face_speed = ((self.face_vx * self.face_vx + self.face_vy * self.face_vy) as f32).sqrt();
        if face_speed < 5.0 && total_error > 40.0 {
            motion_scale *= 0.6;
        }

        if self.face_size > 0 {
            let depth_scale = (self.face_size as f32 / REFERENCE_FACE_WIDTH).clamp(0.7, 1.2);
            motion_scale *= depth_scale;
        }

        self.pan_pid.update_gains(total_error, motion_scale);
        self.tilt_pid.update_gains(total_error, motion_scale);

        let pan_command = self
            .pan_pid
            .update(error_x * 0.1, CONTROL_DT)
            .clamp(-MAX_VELOCITY_PER_FRAME, MAX_VELOCITY_PER_FRAME);
        let tilt_command = self
            .tilt_pid
            .update(error_y * 0.1, CONTROL_DT)
            .clamp(-MAX_VELOCITY_PER_FRAME, MAX_VELOCITY_PER_FRAME);

        self.pan_angle += pan_command * SMOOTHING_FACTOR;
        self.tilt_angle += tilt_command * SMOOTHING_FACTOR;

        self.current_gain = self.pan_pid.kp();

        // Oscillation detection: error jumping around near center.
        let error_delta = (total_error - self.prev_error_magnitude).abs();
        if error_delta > 10.0 && total_error < 30.0 {
            self.oscillation_count += 1;
        } else if self.oscillation_count > 0 {
            self.oscillation_count -= 1;
        }
        self.oscillation_count = self.oscillation_count.clamp(0, 10);
        self.prev_error_magnitude = total_error;

        self.tracking_quality = (1.0 - total_error / 120.0).clamp(0.0, 1.0);
        self.settled = total_error < 10.0;
    }

    fn update_lost(&mut self, now: f64) {
        let time_lost = now - self.last_face_time;

        if time_lost < 1.0 {
            // Short loss: drift toward where the face was headed.
            let predict_x = self.face_x as f32 + self.face_vx as f32 * time_lost as f32;
            let predict_y = self.face_y as f32 + self.face_vy as f32 * time_lost as f32;

            self.pan_angle += (predict_x - CENTER_X as f32) * 0.01;
            self.tilt_angle += (predict_y - CENTER_Y as f32) * 0.01;

            self.blind_state = BlindState::Normal;
            self.returning_to_center = false;
        } else if time_lost >= RETURN_TO_CENTER_TIMEOUT {
            if !self.returning_to_center {
                self.returning_to_center = true;
                self.blind_state = BlindState::BlindMoving;
                self.blind_frame_counter = 0;
                self.trajectory
                    .plan_return_to_center(self.pan_angle, self.tilt_angle);
            }
            if let Some((pan, tilt)) = self.trajectory.next_position() {
                self.pan_angle = pan;
                self.tilt_angle = tilt;
            }
        } else {
            self.blind_state = BlindState::Normal;
            self.returning_to_center = false;
        }
    }

    /// Scan pattern for reacquisition, centered on the last known angles.
    pub fn search_position(&self, search_step: u32) -> (i32, i32) {
        const OFFSETS: [(i32, i32); 8] = [
            (0, 0),
            (-30, 0),
            (30, 0),
            (0, -15),
            (0, 15),
            (-45, -15),
            (45, -15),
            (0, 0),
        ];
        let (dx, dy) = OFFSETS[(search_step % 8) as usize];
        (
            (self.pan_angle as i32 + dx).clamp(BASE_MIN, BASE_MAX),
            (self.tilt_angle as i32 + dy).clamp(NOD_MIN, NOD_MAX),
        )
    }

    // Queries.

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn tracking_quality(&self) -> f32 {
        self.tracking_quality
    }

    pub fn error_magnitude(&self) -> f32 {
        self.error_magnitude
    }

    pub fn control_state(&self) -> ControlState {
        self.control_state
    }

    pub fn face_position(&self) -> (i32, i32) {
        (self.face_x, self.face_y)
    }

    pub fn face_confidence(&self) -> i32 {
        self.face_confidence
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the controller with a face at a fixed bearing; the face pixel
    /// position follows the servo angles like a camera would see it.
    fn closed_loop_step(
        reflex: &mut ReflexController,
        world_pan: f32,
        world_tilt: f32,
        now: f64,
        jitter: i32,
    ) -> f32 {
        let base = reflex.target_base;
        let nod = reflex.target_nod;
        // 2 px per degree of angular error, plus detector jitter.
        let face_x = CENTER_X + ((world_pan - base as f32) * 2.0) as i32 + jitter;
        let face_y = CENTER_Y + ((world_tilt - nod as f32) * 2.0) as i32 + jitter;
        reflex.update_face_data(face_x, face_y, 55, 60, now);
        reflex.calculate(base, nod, now);
        reflex.error_magnitude()
    }

    #[test]
    fn test_starts_inactive_at_center() {
        let reflex = ReflexController::new();
        assert!(!reflex.is_active());
        assert_eq!(reflex.control_state(), ControlState::Lost);
        assert_eq!((reflex.target_base, reflex.target_nod), (90, 115));
    }

    #[test]
    fn test_enable_then_face_activates_tracking() {
        let mut reflex = ReflexController::new();
        reflex.enable();
        reflex.update_face_data(160, 100, 55, 60, 0.02);
        assert!(reflex.is_active());
        reflex.calculate(90, 115, 0.02);
        assert_eq!(reflex.control_state(), ControlState::Acquire);
    }

    #[test]
    fn test_converges_on_offset_face() {
        let mut reflex = ReflexController::new();
        reflex.enable();

        // Face 25 degrees to the left of center.
        let world_pan = 65.0;
        let world_tilt = 115.0;

        let mut now = 0.02;
        let mut final_error = f32::MAX;
        for i in 0..150 {
            let jitter = if i % 2 == 0 { 3 } else { -3 };
            final_error = closed_loop_step(&mut reflex, world_pan, world_tilt, now, jitter);
            now += 0.02;
        }

        assert!(reflex.is_active(), "tracking should survive convergence");
        assert!(
            final_error < 30.0,
            "error should converge, still at {} px",
            final_error
        );
        assert!(
            (reflex.target_base - 65).abs() <= 8,
            "base should approach the face bearing, at {}",
            reflex.target_base
        );
    }

    #[test]
    fn test_targets_always_within_limits() {
        let mut reflex = ReflexController::new();
        reflex.enable();
        let mut now = 0.02;
        // Face pinned at the frame edge, pulling hard in one direction.
        for i in 0..600 {
            let jitter = if i % 2 == 0 { 2 } else { -2 };
            reflex.update_face_data(238 + jitter, 2 + jitter, 55, 40, now);
            let (base, nod) = reflex.calculate(reflex.target_base, reflex.target_nod, now);
            assert!((BASE_MIN..=BASE_MAX).contains(&base));
            assert!((NOD_MIN..=NOD_MAX).contains(&nod));
            now += 0.02;
        }
    }

    #[test]
    fn test_stale_data_deactivates() {
        let mut reflex = ReflexController::new();
        reflex.enable();
        reflex.update_face_data(150, 100, 55, 60, 0.02);
        assert!(reflex.is_active());

        // Identical coordinates, frame after frame.
        let mut now = 0.04;
        for _ in 0..8 {
            reflex.update_face_data(150, 100, 55, 60, now);
            now += 0.02;
        }
        assert!(!reflex.is_active(), "frozen coordinates must deactivate");
    }

    #[test]
    fn test_face_silence_timeout_deactivates() {
        let mut reflex = ReflexController::new();
        reflex.enable();
        reflex.update_face_data(150, 100, 55, 60, 1.0);
        assert!(reflex.is_active());

        reflex.check_timeout(2.0);
        assert!(reflex.is_active(), "within timeout, stays active");

        reflex.check_timeout(3.5);
        assert!(!reflex.is_active(), "2s of silence must deactivate");
    }

    #[test]
    fn test_track_state_requires_centered_face() {
        let mut reflex = ReflexController::new();
        reflex.enable();
        let mut now = 0.02;

        // Far off-center: should stay in ACQUIRE.
        for i in 0..5 {
            let jitter = if i % 2 == 0 { 3 } else { -3 };
            reflex.update_face_data(220 + jitter, 120, 55, 60, now);
            reflex.calculate(reflex.target_base, reflex.target_nod, now);
            now += 0.02;
        }
        assert_eq!(reflex.control_state(), ControlState::Acquire);

        // Near center: promotes to TRACK.
        for i in 0..5 {
            let jitter = if i % 2 == 0 { 3 } else { -3 };
            reflex.update_face_data(122 + jitter, 118, 55, 60, now);
            reflex.calculate(reflex.target_base, reflex.target_nod, now);
            now += 0.02;
        }
        assert_eq!(reflex.control_state(), ControlState::Track);
    }

    #[test]
    fn test_long_loss_returns_to_center() {
        let mut reflex = ReflexController::new();
        reflex.enable();

        // Track a face off to one side for a while.
        let mut now = 0.02;
        for i in 0..100 {
            let jitter = if i % 2 == 0 { 3 } else { -3 };
            closed_loop_step(&mut reflex, 140.0, 130.0, now, jitter);
            now += 0.02;
        }
        let displaced_base = reflex.target_base;
        assert!(displaced_base > BASE_CENTER + 10);

        // Lose the face and run the loop well past the return timeout.
        reflex.face_lost();
        now += 2.0;
        for _ in 0..200 {
            reflex.calculate(reflex.target_base, reflex.target_nod, now);
            now += 0.02;
        }
        assert!(
            (reflex.target_base - BASE_CENTER).abs() <= 2,
            "should return near center, at {}",
            reflex.target_base
        );
        assert!((reflex.target_nod - NOD_CENTER).abs() <= 2);
    }

    #[test]
    fn test_search_pattern_wraps_and_clamps() {
        let reflex = ReflexController::new();
        let (b0, n0) = reflex.search_position(0);
        assert_eq!((b0, n0), (90, 115));
        let (b1, _) = reflex.search_position(1);
        assert_eq!(b1, 60);
        // Step 9 wraps to offset index 1.
        assert_eq!(reflex.search_position(9), reflex.search_position(1));
    }

    #[test]
    fn test_velocity_clamped() {
        let mut reflex = ReflexController::new();
        reflex.enable();
        reflex.update_face_data(0, 0, 55, 60, 0.02);
        // Huge jump in one 20ms frame implies an absurd velocity.
        reflex.update_face_data(240, 240, 55, 60, 0.04);
        assert!(reflex.face_vx <= 200 && reflex.face_vx >= -200);
        assert!(reflex.face_vy <= 200 && reflex.face_vy >= -200);
    }
}
