//! Scrolling waveform surface.
//!
//! Owns the volume-history buffer rendered as a sparkline by the recording
//! TUI. Volume is derived from the tail of the combined sample sequence:
//! RMS over the most recent ~50 ms, converted to dBFS and normalized to a
//! 0-100 scale against the configured reference level.

use std::time::{Duration, Instant};

/// Waveform state for one rendering surface.
///
/// The view only scrolls while following a live recording; outside of that
/// the buffer freezes so the finished take stays on screen.
pub struct WaveformView {
    history: Vec<u64>,
    width: usize,
    reference_level_db: i8,
    last_push_at: Instant,
    push_interval: Duration,
    last_volume: u8,
    following: bool,
}

impl WaveformView {
    /// Creates an empty surface sized to the terminal width.
    pub fn new(width: usize, reference_level_db: i8) -> Self {
        Self {
            history: vec![0u64; width],
            width,
            reference_level_db,
            last_push_at: Instant::now(),
            push_interval: Duration::from_millis(50),
            last_volume: 0,
            following: true,
        }
    }

    /// Resets the surface to silence. Called when a new capture begins.
    pub fn clear(&mut self) {
        self.history = vec![0u64; self.width];
        self.last_volume = 0;
    }

    /// Begins scrolling with incoming audio.
    pub fn follow(&mut self) {
        self.following = true;
    }

    /// Freezes the surface. Called when the recording stops.
    pub fn stop_follow(&mut self) {
        self.following = false;
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Feeds the combined sample sequence captured so far.
    ///
    /// Pushes at most one history entry per push interval so the scroll
    /// speed is tied to wall time, not to the render rate.
    pub fn update(&mut self, samples: &[i16], sample_rate: u32) {
        let volume = calculate_volume(samples, sample_rate, self.reference_level_db);
        self.last_volume = volume;

        if self.following && self.last_push_at.elapsed() >= self.push_interval {
            self.history.push(volume as u64);
            if self.history.len() > self.width {
                self.history.remove(0);
            }
            self.last_push_at = Instant::now();
        }
    }

    /// Adjusts the buffer to a new terminal width, padding with silence on
    /// the left or trimming the oldest entries.
    pub fn resize(&mut self, width: usize) {
        if width == self.width {
            return;
        }
        self.width = width;
        if self.history.len() > width {
            let excess = self.history.len() - width;
            self.history.drain(..excess);
        } else {
            while self.history.len() < width {
                self.history.insert(0, 0);
            }
        }
    }

    /// Volume history, oldest first. Values are 0-100.
    pub fn data(&self) -> &[u64] {
        &self.history
    }

    /// Most recently computed volume, 0-100.
    pub fn last_volume(&self) -> u8 {
        self.last_volume
    }
}

/// Converts the tail of the sample sequence to a 0-100 volume value.
///
/// RMS over the last ~50 ms of audio, mapped to dBFS and normalized so the
/// reference level lands at 100. True silence (empty or all-zero window)
/// yields 0; audible audio is floored at 4 to keep a visible baseline in
/// the sparkline.
pub fn calculate_volume(samples: &[i16], sample_rate: u32, reference_level_db: i8) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    // At least one sample, whatever rate the device reports
    let window = std::cmp::min((sample_rate / 20).max(1), samples.len() as u32) as usize;
    let recent = &samples[samples.len() - window..];

    let sum_of_squares: i64 = recent.iter().map(|&x| (x as i64).pow(2)).sum();
    let mean_square = sum_of_squares / recent.len() as i64;
    let rms = (mean_square as f32).sqrt();

    if rms == 0.0 {
        return 0;
    }

    let db_fs = 20.0 * (rms / 32767.0).log10();
    let min_db = reference_level_db as f32 - 40.0;
    ((db_fs - min_db) / 40.0 * 100.0).clamp(4.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16000;
    const REF_DB: i8 = -20;

    #[test]
    fn test_empty_samples_are_silent() {
        assert_eq!(calculate_volume(&[], RATE, REF_DB), 0);
    }

    #[test]
    fn test_all_zero_samples_are_silent() {
        assert_eq!(calculate_volume(&vec![0i16; 1600], RATE, REF_DB), 0);
    }

    #[test]
    fn test_sub_20hz_sample_rate_does_not_panic() {
        // Rates below 20 Hz used to produce an empty RMS window
        assert_eq!(calculate_volume(&vec![0i16; 100], 10, REF_DB), 0);
        assert!(calculate_volume(&vec![1000i16; 100], 10, REF_DB) >= 4);
        assert!(calculate_volume(&vec![1000i16; 100], 0, REF_DB) >= 4);
    }

    #[test]
    fn test_volume_bounds() {
        let quiet = vec![1i16; 1600];
        let loud = vec![i16::MAX; 1600];

        let low = calculate_volume(&quiet, RATE, REF_DB);
        let high = calculate_volume(&loud, RATE, REF_DB);
        assert!(low >= 4 && low <= 100);
        assert_eq!(high, 100);
        assert!(high > low);
    }

    #[test]
    fn test_volume_uses_recent_window_only() {
        // Loud tail after a silent lead: only the tail should count
        let mut samples = vec![0i16; 16000];
        samples.extend(vec![20000i16; 1600]);

        let tail_only = calculate_volume(&samples[16000..], RATE, REF_DB);
        assert_eq!(calculate_volume(&samples, RATE, REF_DB), tail_only);
    }

    #[test]
    fn test_history_is_bounded_by_width() {
        let mut view = WaveformView::new(8, REF_DB);
        view.push_interval = Duration::from_millis(0);

        let samples = vec![10000i16; 1600];
        for _ in 0..20 {
            view.update(&samples, RATE);
        }
        assert_eq!(view.data().len(), 8);
    }

    #[test]
    fn test_clear_resets_to_silence() {
        let mut view = WaveformView::new(4, REF_DB);
        view.push_interval = Duration::from_millis(0);
        view.update(&vec![20000i16; 1600], RATE);

        view.clear();
        assert_eq!(view.data(), &[0, 0, 0, 0]);
        assert_eq!(view.last_volume(), 0);
    }

    #[test]
    fn test_no_scroll_while_not_following() {
        let mut view = WaveformView::new(4, REF_DB);
        view.push_interval = Duration::from_millis(0);
        view.stop_follow();

        view.update(&vec![20000i16; 1600], RATE);
        assert_eq!(view.data(), &[0, 0, 0, 0]);
        // Volume still tracks, only the scroll is frozen
        assert!(view.last_volume() > 0);
    }

    #[test]
    fn test_resize_pads_left_and_trims_oldest() {
        let mut view = WaveformView::new(3, REF_DB);
        view.history = vec![1, 2, 3];

        view.resize(5);
        assert_eq!(view.data(), &[0, 0, 1, 2, 3]);

        view.resize(2);
        assert_eq!(view.data(), &[2, 3]);
    }
}
