//! The recording command.
//!
//! Runs the countdown → capture → stop loop with the TUI: waits in idle for
//! a start request, counts down, records with a live waveform, and stops on
//! request or on SIGUSR1. An optional output path dumps the finished take
//! as WAV.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::TapedeckConfig;
use crate::countdown::CountdownTimer;
use crate::recording::{
    save_wav, MicCapture, RecorderCommand, RecorderTui, RecordingController, SessionEvent,
};
use crate::ui::ErrorScreen;

/// Runs the interactive recorder.
///
/// `device`, `output` and `countdown` override the corresponding config
/// values for this invocation only.
///
/// # Errors
/// - If configuration cannot be loaded
/// - If the terminal UI cannot be initialized
/// - If the finished take cannot be written to `output`
pub fn handle_record(
    device: Option<String>,
    output: Option<PathBuf>,
    countdown: Option<u32>,
) -> anyhow::Result<()> {
    tracing::info!("=== tapedeck recorder started ===");

    let config = match TapedeckConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            let error_message = format!(
                "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/tapedeck/tapedeck.toml file and try again."
            );
            let mut error_screen = ErrorScreen::new()?;
            error_screen.show_error(&error_message)?;
            error_screen.cleanup()?;
            return Err(anyhow::anyhow!("Configuration error: {err}"));
        }
    };

    let device = device.unwrap_or_else(|| config.audio.device.clone());
    let countdown_from = countdown.unwrap_or(config.countdown.seconds);

    tracing::info!(
        "Configuration: device={}, sample_rate={}Hz, reference_level={}dBFS, countdown={}s",
        device,
        config.audio.sample_rate,
        config.audio.reference_level_db,
        countdown_from
    );

    let capture = MicCapture::new(config.audio.sample_rate, device);
    let timer = CountdownTimer::new(std::time::Duration::from_secs(1));
    let mut controller = RecordingController::new(capture, timer, countdown_from);

    let mut tui = RecorderTui::new(config.audio.reference_level_db)
        .map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;

    // SIGUSR1 stops an active recording, for scripted use
    let stop_signal = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, stop_signal.clone())
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    tracing::debug!("Entering recorder loop");
    let result = run_loop(&mut controller, &mut tui, &stop_signal);

    // Release the capture stream on every exit path, including quit during
    // a countdown or an active recording
    controller.shutdown();
    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;
    result?;

    if let Some(path) = output {
        let samples = controller.combined_samples();
        if samples.is_empty() {
            tracing::warn!("No audio captured; skipping WAV output");
            eprintln!("No audio captured; nothing written to {}", path.display());
        } else {
            save_wav(&samples, controller.sample_rate(), &path)?;
            println!("Recording saved to {}", path.display());
        }
    }

    tracing::info!("=== tapedeck recorder exited ===");
    Ok(())
}

/// Drives input, session progress and rendering until the user quits.
fn run_loop(
    controller: &mut RecordingController<MicCapture>,
    tui: &mut RecorderTui,
    stop_signal: &std::sync::atomic::AtomicBool,
) -> anyhow::Result<()> {
    loop {
        if stop_signal.swap(false, std::sync::atomic::Ordering::Relaxed)
            && controller.request_stop()
        {
            tracing::info!("Received SIGUSR1: recording stopped by external trigger");
            tui.waveform_mut().stop_follow();
        }

        // handle_input polls for ~50ms, which also paces the loop
        match tui.handle_input(controller.state()) {
            Ok(RecorderCommand::Start) => {
                controller.request_start(Instant::now());
            }
            Ok(RecorderCommand::Stop) => {
                if controller.request_stop() {
                    tui.waveform_mut().stop_follow();
                }
            }
            Ok(RecorderCommand::CancelCountdown) => {
                controller.cancel_countdown();
            }
            Ok(RecorderCommand::Quit) => {
                tracing::debug!("Quit requested");
                return Ok(());
            }
            Ok(RecorderCommand::Continue) => {}
            Err(e) => {
                tracing::error!("Input handling error: {}", e);
                return Err(anyhow::anyhow!("Input handling error: {e}"));
            }
        }

        for event in controller.advance(Instant::now()) {
            match event {
                SessionEvent::CountdownTick(remaining) => {
                    tracing::debug!("Countdown: {}", remaining);
                }
                SessionEvent::CaptureStarted => {
                    tui.waveform_mut().clear();
                    tui.waveform_mut().follow();
                }
                SessionEvent::CaptureFailed(err) => {
                    // Already back in Idle; the error renders in the footer
                    tracing::warn!("Session aborted: {}", err);
                }
            }
        }

        if controller.is_recording() {
            controller.drain_chunks();
            let samples = controller.combined_samples();
            tui.update_waveform(&samples, controller.sample_rate());
        }

        let error_text = controller.last_error().map(|e| e.to_string());
        tui.render(
            controller.state(),
            controller.countdown_remaining(),
            controller.recording_duration(Instant::now()),
            error_text.as_deref(),
        )
        .map_err(|e| anyhow::anyhow!("Render failed: {e}"))?;
    }
}
