//! Recording session state machine.
//!
//! Ties the countdown timer, the capture boundary, and the waveform view
//! together. All recording state lives here and is mutated only through the
//! controller's methods; the TUI reads state and reacts to the events this
//! module emits. The machine has three states:
//!
//! ```text
//! Idle --request_start--> CountingDown --countdown complete--> Recording
//! CountingDown --cancel_countdown--> Idle
//! CountingDown --capture failed--> Idle (error surfaced)
//! Recording --request_stop--> Idle
//! ```

use std::sync::mpsc::Receiver;
use std::time::Instant;

use crate::countdown::{CountdownEvent, CountdownTimer};
use crate::recording::capture::{Capture, CaptureError, Chunk};

/// Where the session currently is in the countdown → record → stop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not recording, no countdown in progress.
    Idle,
    /// Countdown armed; recording begins when it completes.
    CountingDown,
    /// Capture is live and chunks are accumulating.
    Recording,
}

/// State change notification for the view.
#[derive(Debug)]
pub enum SessionEvent {
    /// Countdown decremented; carries the new remaining value.
    CountdownTick(u32),
    /// Capture acquired and live. The view clears the waveform and starts
    /// following the incoming audio.
    CaptureStarted,
    /// Capture could not be acquired; the session is back in `Idle`.
    CaptureFailed(CaptureError),
}

/// Owns one recording session at a time and orchestrates its lifecycle.
///
/// Generic over the capture source so the state machine can be driven in
/// tests by a scripted capture instead of real hardware.
pub struct RecordingController<C: Capture> {
    capture: C,
    countdown: CountdownTimer,
    countdown_from: u32,
    state: SessionState,
    chunks: Vec<Chunk>,
    chunk_rx: Option<Receiver<Chunk>>,
    last_error: Option<CaptureError>,
    recording_started_at: Option<Instant>,
}

impl<C: Capture> RecordingController<C> {
    /// Creates an idle controller.
    ///
    /// `countdown_from` is the value the pre-recording countdown starts at;
    /// `countdown` supplies the decrement cadence.
    pub fn new(capture: C, countdown: CountdownTimer, countdown_from: u32) -> Self {
        Self {
            capture,
            countdown,
            countdown_from,
            state: SessionState::Idle,
            chunks: Vec::new(),
            chunk_rx: None,
            last_error: None,
            recording_started_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Displayed countdown value, or `None` outside `CountingDown`.
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    /// Number of chunks accumulated in the current or most recent session.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Error from the most recent failed capture attempt, if any.
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    /// Sample rate of the capture source, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.capture.sample_rate()
    }

    /// How long the current recording has been running.
    pub fn recording_duration(&self, now: Instant) -> std::time::Duration {
        self.recording_started_at
            .map(|started| now.duration_since(started))
            .unwrap_or_default()
    }

    /// Arms the countdown and moves to `CountingDown`.
    ///
    /// Starting while already counting down restarts the countdown; the
    /// superseded one can never complete, so two sessions cannot overlap.
    /// Starting while recording is a no-op.
    pub fn request_start(&mut self, now: Instant) {
        match self.state {
            SessionState::Recording => {
                tracing::debug!("Start requested while recording; ignored");
            }
            SessionState::Idle | SessionState::CountingDown => {
                self.last_error = None;
                self.countdown.start(self.countdown_from, now);
                self.state = SessionState::CountingDown;
                tracing::info!("Countdown started from {}", self.countdown_from);
            }
        }
    }

    /// Aborts an in-progress countdown and returns to `Idle`.
    pub fn cancel_countdown(&mut self) {
        if self.state == SessionState::CountingDown {
            self.countdown.cancel();
            self.state = SessionState::Idle;
            tracing::info!("Countdown cancelled");
        }
    }

    /// Drives the countdown forward and begins capture on completion.
    pub fn advance(&mut self, now: Instant) -> Vec<SessionEvent> {
        if self.state != SessionState::CountingDown {
            return Vec::new();
        }

        let mut events = Vec::new();
        for countdown_event in self.countdown.poll(now) {
            match countdown_event {
                CountdownEvent::Tick(remaining) => {
                    events.push(SessionEvent::CountdownTick(remaining));
                }
                CountdownEvent::Completed => {
                    events.push(self.begin_capture(now));
                }
            }
        }
        events
    }

    /// Acquires the microphone and transitions to `Recording`.
    ///
    /// On failure the session falls back to `Idle` with the error retained
    /// for display; the countdown having already elapsed must never leave
    /// the UI implying a recording that is not happening.
    fn begin_capture(&mut self, now: Instant) -> SessionEvent {
        match self.capture.start() {
            Ok(rx) => {
                self.chunks.clear();
                self.chunk_rx = Some(rx);
                self.state = SessionState::Recording;
                self.recording_started_at = Some(now);
                tracing::info!("Capture started at {}Hz", self.capture.sample_rate());
                SessionEvent::CaptureStarted
            }
            Err(err) => {
                tracing::error!("Capture failed: {}", err);
                self.state = SessionState::Idle;
                self.last_error = Some(err.clone());
                SessionEvent::CaptureFailed(err)
            }
        }
    }

    /// Pulls every pending chunk from the capture channel, in emission
    /// order. Returns true when new chunks arrived.
    pub fn drain_chunks(&mut self) -> bool {
        let Some(rx) = &self.chunk_rx else {
            return false;
        };
        let mut received = false;
        while let Ok(chunk) = rx.try_recv() {
            self.chunks.push(chunk);
            received = true;
        }
        received
    }

    /// Stops an active recording and returns to `Idle`.
    ///
    /// Chunks already emitted by the capture callback are drained before
    /// the channel is dropped, so the final take is complete. Stopping
    /// while not recording is a no-op; returns whether a recording was
    /// actually stopped.
    pub fn request_stop(&mut self) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }

        self.capture.stop();
        self.drain_chunks();
        self.chunk_rx = None;
        self.state = SessionState::Idle;
        self.recording_started_at = None;
        tracing::info!("Recording stopped: {} chunks captured", self.chunks.len());
        true
    }

    /// Releases the capture stream regardless of state. Used on every exit
    /// path, including quit during a countdown or an active recording.
    pub fn shutdown(&mut self) {
        self.countdown.cancel();
        self.capture.stop();
        self.drain_chunks();
        self.chunk_rx = None;
        self.state = SessionState::Idle;
        self.recording_started_at = None;
    }

    /// Concatenates all chunks captured so far into one playable sequence.
    ///
    /// O(n) in total samples per call; fine for short interactive takes,
    /// which is the only use this tool has.
    pub fn combined_samples(&self) -> Vec<i16> {
        let total: usize = self.chunks.iter().map(|c| c.len()).sum();
        let mut samples = Vec::with_capacity(total);
        for chunk in &self.chunks {
            samples.extend_from_slice(chunk);
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{self, Sender};
    use std::time::Duration;

    /// Scripted capture source: hands out a channel whose sender the test
    /// keeps, or fails with a scripted error.
    struct FakeCapture {
        fail_with: Option<CaptureError>,
        sender: Option<Sender<Chunk>>,
        started: bool,
        stopped: bool,
    }

    impl FakeCapture {
        fn working() -> Self {
            Self {
                fail_with: None,
                sender: None,
                started: false,
                stopped: false,
            }
        }

        fn denied() -> Self {
            Self {
                fail_with: Some(CaptureError::PermissionDenied),
                sender: None,
                started: false,
                stopped: false,
            }
        }
    }

    impl Capture for FakeCapture {
        fn start(&mut self) -> Result<Receiver<Chunk>, CaptureError> {
            if let Some(err) = self.fail_with.take() {
                return Err(err);
            }
            let (tx, rx) = mpsc::channel();
            self.sender = Some(tx);
            self.started = true;
            Ok(rx)
        }

        fn stop(&mut self) {
            self.stopped = true;
            self.sender = None;
        }

        fn sample_rate(&self) -> u32 {
            16000
        }
    }

    fn controller(capture: FakeCapture) -> RecordingController<FakeCapture> {
        RecordingController::new(capture, CountdownTimer::new(Duration::from_secs(1)), 3)
    }

    /// Runs the countdown to completion and returns the emitted events.
    fn run_countdown(
        ctrl: &mut RecordingController<FakeCapture>,
        t0: Instant,
    ) -> Vec<SessionEvent> {
        ctrl.request_start(t0);
        let mut events = Vec::new();
        for i in 1..=4 {
            events.extend(ctrl.advance(t0 + Duration::from_secs(i)));
        }
        events
    }

    #[test]
    fn test_full_session_two_chunks() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();

        assert_eq!(ctrl.state(), SessionState::Idle);
        let events = run_countdown(&mut ctrl, t0);

        let ticks = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::CountdownTick(_)))
            .count();
        assert_eq!(ticks, 3);
        assert!(matches!(events.last(), Some(SessionEvent::CaptureStarted)));
        assert_eq!(ctrl.state(), SessionState::Recording);

        let tx = ctrl.capture.sender.clone().unwrap();
        tx.send(vec![1, 2, 3]).unwrap();
        tx.send(vec![4, 5]).unwrap();
        assert!(ctrl.drain_chunks());

        assert!(ctrl.request_stop());
        assert_eq!(ctrl.state(), SessionState::Idle);
        assert!(!ctrl.is_recording());
        assert_eq!(ctrl.chunk_count(), 2);
        assert_eq!(ctrl.combined_samples(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_chunks_arrive_in_emission_order() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();
        run_countdown(&mut ctrl, t0);

        let tx = ctrl.capture.sender.clone().unwrap();
        let sent: Vec<Chunk> = (0..8).map(|i| vec![i as i16; i + 1]).collect();
        for (k, chunk) in sent.iter().enumerate() {
            tx.send(chunk.clone()).unwrap();
            ctrl.drain_chunks();

            // After the k-th notification the combined sequence holds
            // exactly the first k+1 chunks, in order
            let expected: Vec<i16> = sent[..=k].iter().flatten().copied().collect();
            assert_eq!(ctrl.combined_samples(), expected);
        }
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut ctrl = controller(FakeCapture::working());
        assert!(!ctrl.request_stop());
        assert_eq!(ctrl.state(), SessionState::Idle);
        assert_eq!(ctrl.chunk_count(), 0);
        assert!(ctrl.last_error().is_none());
    }

    #[test]
    fn test_permission_denied_returns_to_idle() {
        let mut ctrl = controller(FakeCapture::denied());
        let t0 = Instant::now();
        let events = run_countdown(&mut ctrl, t0);

        assert!(matches!(
            events.last(),
            Some(SessionEvent::CaptureFailed(CaptureError::PermissionDenied))
        ));
        assert_eq!(ctrl.state(), SessionState::Idle);
        assert_eq!(ctrl.chunk_count(), 0);
        assert!(matches!(
            ctrl.last_error(),
            Some(CaptureError::PermissionDenied)
        ));
    }

    #[test]
    fn test_restart_during_countdown_single_capture() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();

        ctrl.request_start(t0);
        ctrl.advance(t0 + Duration::from_secs(1));
        assert_eq!(ctrl.state(), SessionState::CountingDown);

        // Restart mid-countdown; only one capture may ever begin
        ctrl.request_start(t0 + Duration::from_secs(1));

        let mut captures = 0;
        for i in 2..=10 {
            for event in ctrl.advance(t0 + Duration::from_secs(i)) {
                if matches!(event, SessionEvent::CaptureStarted) {
                    captures += 1;
                }
            }
        }
        assert_eq!(captures, 1);
        assert_eq!(ctrl.state(), SessionState::Recording);
    }

    #[test]
    fn test_cancel_countdown_returns_to_idle() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();

        ctrl.request_start(t0);
        assert_eq!(ctrl.state(), SessionState::CountingDown);
        ctrl.cancel_countdown();
        assert_eq!(ctrl.state(), SessionState::Idle);

        // A cancelled countdown never completes
        for i in 1..=10 {
            assert!(ctrl.advance(t0 + Duration::from_secs(i)).is_empty());
        }
        assert!(!ctrl.capture.started);
    }

    #[test]
    fn test_start_while_recording_is_ignored() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();
        run_countdown(&mut ctrl, t0);
        assert_eq!(ctrl.state(), SessionState::Recording);

        ctrl.request_start(t0 + Duration::from_secs(10));
        assert_eq!(ctrl.state(), SessionState::Recording);
        assert_eq!(ctrl.countdown_remaining(), None);
    }

    #[test]
    fn test_new_session_resets_chunks_at_capture_start() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();
        run_countdown(&mut ctrl, t0);

        let tx = ctrl.capture.sender.clone().unwrap();
        tx.send(vec![9, 9]).unwrap();
        ctrl.drain_chunks();
        ctrl.request_stop();
        assert_eq!(ctrl.chunk_count(), 1);

        // The finished take stays visible until the next capture begins
        let t1 = t0 + Duration::from_secs(60);
        ctrl.request_start(t1);
        assert_eq!(ctrl.chunk_count(), 1);
        for i in 1..=4 {
            ctrl.advance(t1 + Duration::from_secs(i));
        }
        assert_eq!(ctrl.state(), SessionState::Recording);
        assert_eq!(ctrl.chunk_count(), 0);
    }

    #[test]
    fn test_late_chunks_after_stop_are_discarded() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();
        run_countdown(&mut ctrl, t0);

        let tx = ctrl.capture.sender.clone().unwrap();
        tx.send(vec![1]).unwrap();
        ctrl.request_stop();
        assert_eq!(ctrl.chunk_count(), 1);

        // The receiver is gone; a straggling callback cannot revive the take
        assert!(tx.send(vec![2]).is_err());
        assert!(!ctrl.drain_chunks());
        assert_eq!(ctrl.chunk_count(), 1);
    }

    #[test]
    fn test_shutdown_releases_capture_in_any_state() {
        let mut ctrl = controller(FakeCapture::working());
        let t0 = Instant::now();
        run_countdown(&mut ctrl, t0);
        assert!(ctrl.is_recording());

        ctrl.shutdown();
        assert_eq!(ctrl.state(), SessionState::Idle);
        assert!(ctrl.capture.stopped);
    }
}
