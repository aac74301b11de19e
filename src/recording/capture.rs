//! Microphone capture boundary.
//!
//! Wraps a cpal input stream behind the [`Capture`] trait. The audio callback
//! downmixes each buffer to mono i16 and forwards it as one chunk over an
//! mpsc channel, so chunks reach the recording session in emission order.
//! Audio is captured from the system's default input device unless a
//! device name or index is configured.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// One mono i16 PCM buffer as delivered by the audio callback.
pub type Chunk = Vec<i16>;

/// Failure to acquire or run the microphone stream.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// No input device is available, or the platform refused access to it.
    #[error("microphone unavailable: access denied or no input device present")]
    PermissionDenied,
    /// A specific configured device could not be found.
    #[error("audio input device '{0}' not found")]
    DeviceNotFound(String),
    /// The device was found but the stream could not be configured or started.
    #[error("audio stream failed: {0}")]
    Stream(String),
}

/// Source of captured audio chunks.
///
/// The production implementation is [`MicCapture`]; tests substitute a
/// scripted source so the session state machine can be exercised without
/// audio hardware.
pub trait Capture {
    /// Acquires the stream and begins capture.
    ///
    /// On success returns the receiving end of the chunk channel. Chunks
    /// arrive in emission order until [`Capture::stop`] is called.
    fn start(&mut self) -> Result<Receiver<Chunk>, CaptureError>;

    /// Stops capture and releases the stream. Safe to call when idle.
    fn stop(&mut self);

    /// Sample rate of the running or most recent capture, in Hz.
    fn sample_rate(&self) -> u32;
}

/// Captures audio from a cpal input device.
///
/// Multi-channel devices are downmixed to mono by averaging channels. The
/// actual sample rate may differ from the requested one; it is fixed up
/// from the device configuration when the stream starts.
pub struct MicCapture {
    sample_rate: u32,
    device_name: String,
    stream: Option<cpal::Stream>,
}

impl MicCapture {
    /// Creates a capture source for the given device.
    ///
    /// Use "default" as the device name for the system default input.
    pub fn new(requested_sample_rate: u32, device_name: String) -> Self {
        Self {
            sample_rate: requested_sample_rate,
            device_name,
            stream: None,
        }
    }
}

impl Capture for MicCapture {
    fn start(&mut self) -> Result<Receiver<Chunk>, CaptureError> {
        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or(CaptureError::PermissionDenied)
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_label = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_label);

        let device_config = device.default_input_config().map_err(|e| {
            tracing::error!("Failed to query device configuration: {}", e);
            CaptureError::Stream(e.to_string())
        })?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if device_sample_rate != self.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Capturing at device rate.",
                self.sample_rate,
                device_sample_rate
            );
        }
        self.sample_rate = device_sample_rate;

        tracing::debug!(
            "Device configuration: {}Hz, {} channels",
            device_sample_rate,
            num_channels
        );

        let (tx, rx): (Sender<Chunk>, Receiver<Chunk>) = mpsc::channel();

        let stream = device
            .build_input_stream(
                &device_config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let chunk = downmix_to_mono(data, num_channels);
                    if !chunk.is_empty() {
                        // Send fails only after the session dropped the
                        // receiver; late chunks are discarded by design
                        let _ = tx.send(chunk);
                    }
                },
                |err| {
                    tracing::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => CaptureError::PermissionDenied,
                other => CaptureError::Stream(other.to_string()),
            })?;

        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("Audio stream started");
        Ok(rx)
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Audio stream stopped");
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Downmixes an interleaved buffer to mono by averaging all channels.
fn downmix_to_mono(data: &[i16], num_channels: usize) -> Chunk {
    match num_channels {
        0 => Vec::new(),
        1 => data.to_vec(),
        2 => data
            .chunks_exact(2)
            .map(|frame| {
                let left = frame[0] as i32;
                let right = frame[1] as i32;
                ((left + right) / 2) as i16
            })
            .collect(),
        n => data
            .chunks_exact(n)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / n as i32) as i16
            })
            .collect(),
    }
}

/// Finds an audio input device by name or numeric index.
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, CaptureError> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| CaptureError::Stream(format!("failed to enumerate devices: {e}")))?
        .collect();

    // Numeric index first, matching `tapedeck list-devices` output
    if let Ok(index) = device_spec.parse::<usize>() {
        return devices
            .into_iter()
            .nth(index)
            .ok_or_else(|| CaptureError::DeviceNotFound(device_spec.to_string()));
    }

    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| CaptureError::DeviceNotFound(device_spec.to_string()))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T, CaptureError>
where
    F: FnOnce() -> Result<T, CaptureError>,
{
    let dev_null = match OpenOptions::new().write(true).open("/dev/null") {
        Ok(file) => file,
        // If /dev/null is unavailable, run without suppression
        Err(_) => return f(),
    };

    let dev_null_fd = dev_null.as_raw_fd();

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }

    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T, CaptureError>
where
    F: FnOnce() -> Result<T, CaptureError>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_mono_passthrough() {
        let data = vec![1i16, -2, 3, -4];
        assert_eq!(downmix_to_mono(&data, 1), data);
    }

    #[test]
    fn test_downmix_stereo_averages_pairs() {
        let data = vec![100i16, 200, -100, 100, 0, 0];
        assert_eq!(downmix_to_mono(&data, 2), vec![150, 0, 0]);
    }

    #[test]
    fn test_downmix_multichannel_averages_frames() {
        let data = vec![30i16, 60, 90, -30, -60, -90];
        assert_eq!(downmix_to_mono(&data, 3), vec![60, -60]);
    }

    #[test]
    fn test_downmix_drops_partial_trailing_frame() {
        let data = vec![10i16, 20, 30];
        assert_eq!(downmix_to_mono(&data, 2), vec![15]);
    }
}
