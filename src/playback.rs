//! Recording and playback of command sequences.
//!
//! While recording, every transmitted payload is appended together with the
//! delay since the previous recorded payload. Playback replays the sequence
//! by waiting each recorded delay and republishing, under a cooperative stop
//! flag checked after each wait: a stop never retracts a publish that
//! already went out, it only suppresses the rest of the sequence.

use crate::transport::{Transport, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// One recorded command and the delay since the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStep {
    pub message: String,
    pub delay_ms: u64,
}

/// Append-only recording buffer.
///
/// Exclusively owned by the session; the player only ever sees a snapshot.
#[derive(Debug, Default)]
pub struct Recorder {
    steps: Vec<RecordedStep>,
    last_recorded_at: Option<Instant>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, stamping it with the time since the previous
    /// recorded message (zero for the first).
    pub fn record(&mut self, message: String) {
        self.record_at(message, Instant::now());
    }

    fn record_at(&mut self, message: String, now: Instant) {
        let delay_ms = self
            .last_recorded_at
            .map(|prev| now.duration_since(prev).as_millis() as u64)
            .unwrap_or(0);
        self.last_recorded_at = Some(now);

        debug!("Recorded step ({} ms): {}", delay_ms, message);
        self.steps.push(RecordedStep { message, delay_ms });
    }

    pub fn steps(&self) -> &[RecordedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Snapshot of the sequence for the player.
    pub fn snapshot(&self) -> Vec<RecordedStep> {
        self.steps.clone()
    }

    /// Drop the recorded sequence and the inter-message timer.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.last_recorded_at = None;
    }
}

/// Shared cooperative cancellation flag for playback.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn lower(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Replay a recorded sequence on the given topic.
///
/// Waits each step's recorded delay (no wall-clock drift correction), then
/// republishes it. The stop flag is checked after each wait, so a stop
/// raised during a wait suppresses that step's publish and everything after
/// it. The flag is lowered when playback starts.
pub async fn play(
    steps: Vec<RecordedStep>,
    transport: Arc<dyn Transport>,
    topic: String,
    stop: StopFlag,
) {
    stop.lower();
    info!("▶️  Replaying {} recorded steps", steps.len());

    for step in steps {
        sleep(Duration::from_millis(step.delay_ms)).await;

        if stop.is_raised() {
            info!("⏹️  Playback stopped");
            return;
        }

        match transport.publish(&topic, &step.message).await {
            Ok(()) => debug!("Replayed: {}", step.message),
            Err(TransportError::NotConnected) => {
                warn!("No broker session, replayed command dropped: {}", step.message);
            }
            Err(e) => warn!("Replay publish failed: {}", e),
        }
    }

    info!("✅ Playback complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConsoleTransport;
    use std::time::Duration as StdDuration;

    #[test]
    fn test_first_step_has_zero_delay() {
        let mut recorder = Recorder::new();
        let t0 = Instant::now();
        recorder.record_at("m1".to_string(), t0);
        recorder.record_at("m2".to_string(), t0 + StdDuration::from_millis(500));
        recorder.record_at("m3".to_string(), t0 + StdDuration::from_millis(700));

        let steps = recorder.steps();
        assert_eq!(steps[0].delay_ms, 0);
        assert_eq!(steps[1].delay_ms, 500);
        assert_eq!(steps[2].delay_ms, 200);
    }

    #[test]
    fn test_clear_resets_timing() {
        let mut recorder = Recorder::new();
        let t0 = Instant::now();
        recorder.record_at("m1".to_string(), t0);
        recorder.clear();
        assert!(recorder.is_empty());

        // After clearing, the next step is "first" again
        recorder.record_at("m2".to_string(), t0 + StdDuration::from_millis(300));
        assert_eq!(recorder.steps()[0].delay_ms, 0);
    }

    fn sequence() -> Vec<RecordedStep> {
        vec![
            RecordedStep {
                message: "m1".to_string(),
                delay_ms: 0,
            },
            RecordedStep {
                message: "m2".to_string(),
                delay_ms: 50,
            },
            RecordedStep {
                message: "m3".to_string(),
                delay_ms: 20,
            },
        ]
    }

    #[tokio::test]
    async fn test_replay_publishes_in_order() {
        let transport = Arc::new(ConsoleTransport::new());
        transport.connect().await.unwrap();

        play(
            sequence(),
            transport.clone(),
            "robot/drive".to_string(),
            StopFlag::new(),
        )
        .await;

        let published: Vec<String> = transport
            .published()
            .into_iter()
            .map(|(_, payload)| payload)
            .collect();
        assert_eq!(published, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_replay_honors_recorded_delays() {
        let transport = Arc::new(ConsoleTransport::new());
        transport.connect().await.unwrap();

        let started = Instant::now();
        play(
            sequence(),
            transport.clone(),
            "robot/drive".to_string(),
            StopFlag::new(),
        )
        .await;

        let elapsed = started.elapsed();
        assert!(elapsed >= StdDuration::from_millis(70), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_stop_during_wait_suppresses_rest() {
        let transport = Arc::new(ConsoleTransport::new());
        transport.connect().await.unwrap();

        let stop = StopFlag::new();
        let handle = tokio::spawn(play(
            sequence(),
            transport.clone(),
            "robot/drive".to_string(),
            stop.clone(),
        ));

        // Raise the stop during m2's 50ms wait
        sleep(Duration::from_millis(20)).await;
        stop.raise();
        handle.await.unwrap();

        let published: Vec<String> = transport
            .published()
            .into_iter()
            .map(|(_, payload)| payload)
            .collect();
        assert_eq!(published, vec!["m1"]);
    }

    #[tokio::test]
    async fn test_play_lowers_a_stale_stop_flag() {
        let transport = Arc::new(ConsoleTransport::new());
        transport.connect().await.unwrap();

        let stop = StopFlag::new();
        stop.raise();

        play(
            sequence(),
            transport.clone(),
            "robot/drive".to_string(),
            stop,
        )
        .await;
        assert_eq!(transport.publish_count(), 3);
    }

    #[tokio::test]
    async fn test_replay_without_session_does_not_panic() {
        let transport = Arc::new(ConsoleTransport::new()); // never connected
        play(
            sequence(),
            transport.clone(),
            "robot/drive".to_string(),
            StopFlag::new(),
        )
        .await;
        assert_eq!(transport.publish_count(), 0);
    }
}
