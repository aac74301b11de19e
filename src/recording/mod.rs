//! Audio recording feature for tapedeck.
//!
//! Provides the countdown → capture → stop session state machine, the
//! microphone capture boundary, waveform state, and the recording TUI.

pub mod capture;
pub mod session;
pub mod ui;
pub mod wav;
pub mod waveform;

pub use capture::{Capture, CaptureError, Chunk, MicCapture};
pub use session::{RecordingController, SessionEvent, SessionState};
pub use ui::{RecorderCommand, RecorderTui};
pub use wav::save_wav;
pub use waveform::WaveformView;
