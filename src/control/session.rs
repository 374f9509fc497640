//! Control session.
//!
//! Owns the per-session mutable state the original controllers kept in
//! scattered module-level refs: input targets, the ramp state, the last
//! sent payload, the recording buffer, and the playback stop flag. One
//! session is constructed per run and driven by the fixed-period tick loop.

use crate::config::AppConfig;
use crate::control::command::{LegacyCommand, VelocityCommand};
use crate::control::ramp::{RampState, VelocityRamp};
use crate::control::transmitter::CommandTransmitter;
use crate::input::curve;
use crate::input::keys::KeyCommand;
use crate::input::normalize::NormalizedInput;
use crate::playback::{RecordedStep, Recorder, StopFlag};
use crate::transport::Transport;
use tracing::{info, warn};

/// Mutual exclusion between live driving and playback, made explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Live,
    Recording,
    Playing,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionMode::Live => "live",
            SessionMode::Recording => "recording",
            SessionMode::Playing => "playing",
        };
        f.write_str(s)
    }
}

/// Read-only view of the session for status display.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub target_linear: f64,
    pub target_angular: f64,
    pub actual: RampState,
    pub max_linear: f64,
    pub max_angular: f64,
    pub invert_linear: bool,
    pub invert_angular: bool,
    pub recorded_steps: usize,
    /// Control positions reverse-derived from the targets, so a displayed
    /// slider stays consistent after a programmatic zero
    pub linear_proxy: f64,
    pub angular_proxy: f64,
}

/// The control session: operator input in, rate-limited commands out.
pub struct ControlSession {
    max_linear: f64,
    max_angular: f64,
    curve_exponent: f64,
    linear_step: f64,
    angular_step: f64,
    /// Tick period in seconds
    dt: f64,
    target_linear: f64,
    target_angular: f64,
    ramp: VelocityRamp,
    transmitter: CommandTransmitter,
    recorder: Recorder,
    stop_flag: StopFlag,
    mode: SessionMode,
}

impl ControlSession {
    pub fn new(config: &AppConfig) -> Self {
        let drive = &config.drive;
        Self {
            max_linear: drive.max_linear_velocity.abs(),
            max_angular: drive.max_angular_velocity.abs(),
            curve_exponent: config.input.curve_exponent,
            linear_step: config.input.linear_step,
            angular_step: config.input.angular_step,
            dt: drive.tick_ms as f64 / 1000.0,
            target_linear: 0.0,
            target_angular: 0.0,
            ramp: VelocityRamp::new(drive.accel, drive.decel),
            transmitter: CommandTransmitter::new(
                config.broker.topic.clone(),
                drive.invert_linear,
                drive.invert_angular,
            ),
            recorder: Recorder::new(),
            stop_flag: StopFlag::new(),
            mode: SessionMode::Live,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// One control tick: advance the ramp toward the targets and transmit
    /// the resulting command. Suspended while a recording is playing.
    pub async fn tick(&mut self, transport: &dyn Transport) {
        if self.mode == SessionMode::Playing {
            return;
        }

        let actual = self.ramp.tick(self.target_linear, self.target_angular, self.dt);
        let command =
            VelocityCommand::new(actual.linear, actual.angular).clamped(self.max_linear, self.max_angular);

        if let Some(payload) = self.transmitter.transmit(command, transport).await {
            if self.mode == SessionMode::Recording {
                self.recorder.record(payload);
            }
        }
    }

    /// Joystick input: a normalized deflection on the control surface.
    ///
    /// Vertical deflection drives the linear axis, lateral deflection the
    /// angular axis, both scaled by the deflection magnitude so sensitivity
    /// is compressed near center (the stick's response curve).
    pub fn set_stick(&mut self, input: NormalizedInput) {
        let magnitude = input.magnitude();
        self.target_linear = -input.y * magnitude * self.max_linear;
        self.target_angular = -input.x * magnitude * self.max_angular;
    }

    /// Slider input, linear axis: a proxy position in [-1, 1] shaped
    /// through the response curve.
    pub fn set_linear_proxy(&mut self, s: f64) {
        self.target_linear = curve::response(s, self.max_linear, self.curve_exponent);
    }

    /// Slider input, angular axis.
    pub fn set_angular_proxy(&mut self, s: f64) {
        self.target_angular = curve::response(s, self.max_angular, self.curve_exponent);
    }

    /// Discrete key input: nudge the targets by the configured steps.
    pub fn apply_key(&mut self, key: KeyCommand) {
        if key == KeyCommand::ZeroAll {
            self.zero();
            return;
        }

        let (linear_mult, angular_mult) = key.step();
        self.target_linear = (self.target_linear + linear_mult * self.linear_step)
            .clamp(-self.max_linear, self.max_linear);
        self.target_angular = (self.target_angular + angular_mult * self.angular_step)
            .clamp(-self.max_angular, self.max_angular);
    }

    /// Emergency stop: zero both targets and the actual velocity at once,
    /// bypassing the ramp.
    pub fn zero(&mut self) {
        self.target_linear = 0.0;
        self.target_angular = 0.0;
        self.ramp.zero();
    }

    /// Reset after a dropped session: stop commanding motion and forget the
    /// last sent payload so the next session gets a fresh command.
    pub fn handle_disconnect(&mut self) {
        self.zero();
        self.transmitter.reset();
    }

    pub fn set_max_linear(&mut self, max: f64) {
        self.max_linear = max.max(0.0);
        self.target_linear = self.target_linear.clamp(-self.max_linear, self.max_linear);
    }

    pub fn set_max_angular(&mut self, max: f64) {
        self.max_angular = max.max(0.0);
        self.target_angular = self.target_angular.clamp(-self.max_angular, self.max_angular);
    }

    pub fn toggle_invert_linear(&mut self) -> bool {
        self.transmitter.toggle_invert_linear()
    }

    pub fn toggle_invert_angular(&mut self) -> bool {
        self.transmitter.toggle_invert_angular()
    }

    /// Publish a legacy discrete command immediately, bypassing the ramp.
    pub async fn send_legacy(&mut self, command: LegacyCommand, transport: &dyn Transport) {
        self.transmitter.send_raw(command.as_str(), transport).await;
        if self.mode == SessionMode::Recording {
            self.recorder.record(command.as_str().to_string());
        }
    }

    /// Enter recording mode. Subsequent transmitted payloads are appended
    /// to the recording buffer.
    pub fn start_recording(&mut self) {
        match self.mode {
            SessionMode::Playing => warn!("Cannot record while playing"),
            _ => {
                info!("⏺️  Recording");
                self.mode = SessionMode::Recording;
            }
        }
    }

    /// Leave recording mode, keeping the buffer.
    pub fn stop_recording(&mut self) {
        if self.mode == SessionMode::Recording {
            info!("Recording stopped ({} steps)", self.recorder.len());
            self.mode = SessionMode::Live;
        }
    }

    /// Begin playback: returns the snapshot the caller should replay (the
    /// session suspends live ticks until [`Self::playback_finished`]).
    pub fn begin_playback(&mut self) -> Option<(Vec<RecordedStep>, StopFlag)> {
        match self.mode {
            SessionMode::Recording => {
                warn!("Stop recording before playing");
                None
            }
            SessionMode::Playing => {
                warn!("Playback already running");
                None
            }
            SessionMode::Live if self.recorder.is_empty() => {
                warn!("Nothing recorded");
                None
            }
            SessionMode::Live => {
                self.mode = SessionMode::Playing;
                Some((self.recorder.snapshot(), self.stop_flag.clone()))
            }
        }
    }

    /// Mark playback as finished, resuming live ticks.
    pub fn playback_finished(&mut self) {
        if self.mode == SessionMode::Playing {
            self.mode = SessionMode::Live;
        }
    }

    /// Raise the cooperative stop flag for a running playback.
    pub fn stop_playback(&self) {
        self.stop_flag.raise();
    }

    /// Drop the recording, abort any running playback, and return to live
    /// mode.
    pub fn clear_recording(&mut self) {
        self.recorder.clear();
        self.stop_flag.raise();
        self.mode = SessionMode::Live;
        info!("Recording cleared");
    }

    pub fn topic(&self) -> &str {
        self.transmitter.topic()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            target_linear: self.target_linear,
            target_angular: self.target_angular,
            actual: self.ramp.actual(),
            max_linear: self.max_linear,
            max_angular: self.max_angular,
            invert_linear: self.transmitter.invert_linear(),
            invert_angular: self.transmitter.invert_angular(),
            recorded_steps: self.recorder.len(),
            linear_proxy: curve::proxy(self.target_linear, self.max_linear, self.curve_exponent),
            angular_proxy: curve::proxy(self.target_angular, self.max_angular, self.curve_exponent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConsoleTransport;

    fn session() -> ControlSession {
        ControlSession::new(&AppConfig::default())
    }

    async fn connected_transport() -> ConsoleTransport {
        let transport = ConsoleTransport::new();
        transport.connect().await.unwrap();
        transport
    }

    fn payloads(transport: &ConsoleTransport) -> Vec<String> {
        transport
            .published()
            .into_iter()
            .map(|(_, payload)| payload)
            .collect()
    }

    #[test]
    fn test_full_lateral_deflection_is_pure_angular() {
        let mut session = session();
        session.set_stick(NormalizedInput { x: 1.0, y: 0.0 });

        let snap = session.snapshot();
        assert_eq!(snap.target_linear, 0.0);
        // magnitude = max_angular * 1 * 1
        assert_eq!(snap.target_angular.abs(), 2.0);
    }

    #[test]
    fn test_drag_to_surface_edge_is_full_angular() {
        use crate::input::normalize::normalize_drag;

        let mut session = session();
        // Drag all the way right on a 110px-radius surface
        session.set_stick(normalize_drag(110.0, 0.0, 110.0));

        let snap = session.snapshot();
        assert_eq!(snap.target_angular.abs(), 2.0);
        assert_eq!(snap.target_linear, 0.0);
    }

    #[test]
    fn test_full_forward_deflection_is_pure_linear() {
        let mut session = session();
        // Stick pushed up (surface y is positive down)
        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 });

        let snap = session.snapshot();
        assert_eq!(snap.target_linear, 3.0);
        assert_eq!(snap.target_angular, 0.0);
    }

    #[test]
    fn test_stick_magnitude_compresses_center() {
        let mut session = session();
        session.set_stick(NormalizedInput { x: 0.0, y: -0.5 });

        // 0.5 deflection * 0.5 magnitude * 3.0 max = 0.75, not 1.5
        assert_eq!(session.snapshot().target_linear, 0.75);
    }

    #[test]
    fn test_slider_proxy_round_trip() {
        let mut session = session();
        session.set_linear_proxy(0.5);

        let snap = session.snapshot();
        assert!((snap.target_linear - 0.75).abs() < 1e-9);
        assert!((snap.linear_proxy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_key_steps_accumulate_and_clamp() {
        let mut session = session();
        session.apply_key(KeyCommand::IncreaseLinear);
        session.apply_key(KeyCommand::IncreaseLinear);
        assert!((session.snapshot().target_linear - 0.4).abs() < 1e-9);

        for _ in 0..100 {
            session.apply_key(KeyCommand::IncreaseLinear);
        }
        assert_eq!(session.snapshot().target_linear, 3.0);

        session.apply_key(KeyCommand::DecreaseAngular);
        assert!((session.snapshot().target_angular + 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_zero_key_is_emergency_stop() {
        let mut session = session();
        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 });
        session.apply_key(KeyCommand::ZeroAll);

        let snap = session.snapshot();
        assert_eq!(snap.target_linear, 0.0);
        assert_eq!(snap.actual, RampState::default());
    }

    #[tokio::test]
    async fn test_tick_ramps_and_publishes_sequence() {
        let transport = connected_transport().await;
        let mut session = session();
        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 }); // target 3.0

        for _ in 0..3 {
            session.tick(&transport).await;
        }

        assert_eq!(
            payloads(&transport),
            vec![
                r#"{"linear_velocity":1.0,"angular_velocity":0.0}"#,
                r#"{"linear_velocity":2.0,"angular_velocity":0.0}"#,
                r#"{"linear_velocity":3.0,"angular_velocity":0.0}"#,
            ]
        );

        // Steady state: no further publishes
        session.tick(&transport).await;
        session.tick(&transport).await;
        assert_eq!(transport.publish_count(), 3);
    }

    #[tokio::test]
    async fn test_zero_reaches_wire_within_one_tick() {
        let transport = connected_transport().await;
        let mut session = session();
        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 });
        for _ in 0..3 {
            session.tick(&transport).await;
        }

        session.zero();
        session.tick(&transport).await;

        assert_eq!(
            payloads(&transport).last().map(String::as_str),
            Some(r#"{"linear_velocity":0.0,"angular_velocity":0.0}"#)
        );
    }

    #[tokio::test]
    async fn test_recording_captures_transmitted_payloads() {
        let transport = connected_transport().await;
        let mut session = session();

        session.start_recording();
        assert_eq!(session.mode(), SessionMode::Recording);

        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 });
        for _ in 0..4 {
            session.tick(&transport).await;
        }

        // 3 ramp steps transmitted, 4th tick suppressed
        assert_eq!(session.snapshot().recorded_steps, 3);

        session.stop_recording();
        assert_eq!(session.mode(), SessionMode::Live);
    }

    #[tokio::test]
    async fn test_playing_suspends_live_ticks() {
        let transport = connected_transport().await;
        let mut session = session();

        session.start_recording();
        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 });
        session.tick(&transport).await;
        session.stop_recording();

        let before = transport.publish_count();
        let (steps, _stop) = session.begin_playback().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(session.mode(), SessionMode::Playing);

        session.tick(&transport).await;
        session.tick(&transport).await;
        assert_eq!(transport.publish_count(), before);

        session.playback_finished();
        assert_eq!(session.mode(), SessionMode::Live);
    }

    #[test]
    fn test_begin_playback_refuses_while_recording() {
        let mut session = session();
        session.start_recording();
        assert!(session.begin_playback().is_none());
    }

    #[test]
    fn test_begin_playback_refuses_empty_recording() {
        let mut session = session();
        assert!(session.begin_playback().is_none());
    }

    #[tokio::test]
    async fn test_clear_recording_exits_recording_mode() {
        let transport = connected_transport().await;
        let mut session = session();

        session.start_recording();
        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 });
        session.tick(&transport).await;

        session.clear_recording();
        assert_eq!(session.mode(), SessionMode::Live);
        assert_eq!(session.snapshot().recorded_steps, 0);
    }

    #[tokio::test]
    async fn test_lowered_max_velocity_reclamps_target() {
        let transport = connected_transport().await;
        let mut session = session();
        session.set_stick(NormalizedInput { x: 0.0, y: -1.0 }); // target 3.0

        session.set_max_linear(1.0);
        for _ in 0..5 {
            session.tick(&transport).await;
        }

        let snap = session.snapshot();
        assert_eq!(snap.target_linear, 1.0);
        assert_eq!(snap.actual.linear, 1.0);
    }

    #[tokio::test]
    async fn test_legacy_command_bypasses_ramp() {
        let transport = connected_transport().await;
        let mut session = session();

        session.send_legacy(LegacyCommand::Forward, &transport).await;
        assert_eq!(
            payloads(&transport),
            vec!["forward".to_string()]
        );
    }

    #[test]
    fn test_zero_max_velocity_degrades_to_zero_output() {
        let mut session = session();
        session.set_max_linear(0.0);
        session.set_linear_proxy(1.0);

        let snap = session.snapshot();
        assert_eq!(snap.target_linear, 0.0);
        assert_eq!(snap.linear_proxy, 0.0);
    }
}
