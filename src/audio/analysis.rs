use anyhow::{ensure, Result};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

use super::decode::AudioData;
use crate::spectrum::frame::{FrameQueue, FrequencyFrame};

/// Parameters of the byte-spectrum analyser.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyserSettings {
    pub fft_size: usize,
    /// Weight of the previous frame in the temporal average (0 = none).
    pub smoothing: f32,
    /// Level mapped to byte 0.
    pub min_decibels: f32,
    /// Level mapped to byte 255.
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserSettings {
    pub fn bins(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.fft_size.is_power_of_two() && (32..=32768).contains(&self.fft_size),
            "FFT size must be a power of two between 32 and 32768, got {}",
            self.fft_size
        );
        ensure!(
            (0.0..=1.0).contains(&self.smoothing),
            "smoothing must be within 0.0-1.0, got {}",
            self.smoothing
        );
        ensure!(
            self.min_decibels < self.max_decibels,
            "min decibels ({}) must be below max decibels ({})",
            self.min_decibels,
            self.max_decibels
        );
        Ok(())
    }
}

/// Turn decoded audio into one frame per tick at `fps` ticks per second.
///
/// Each frame looks at the `fft_size` samples ending at its tick, so the
/// spectrogram advances in step with playback.
pub fn analyze(audio: &AudioData, fps: u32, settings: &AnalyserSettings) -> Result<FrameQueue> {
    settings.validate()?;
    ensure!(fps > 0, "tick rate must be positive");
    ensure!(audio.sample_rate > 0, "audio has no sample rate");

    let hop = (audio.sample_rate as f32 / fps as f32).max(1.0);
    let total_frames = (audio.frames() as f32 / hop).ceil() as usize;

    log::info!(
        "Analyzing {} frame(s) per channel (FFT {}, hop {:.1} samples)...",
        total_frames,
        settings.fft_size,
        hop
    );

    let per_channel: Vec<Vec<FrequencyFrame>> = audio
        .channels
        .iter()
        .map(|samples| {
            let magnitudes = magnitude_frames(samples, hop, total_frames, settings.fft_size);
            smooth_to_bytes(&magnitudes, settings)
        })
        .collect();

    let frames = (0..total_frames).map(|i| per_channel.iter().map(|ch| ch[i].clone()).collect::<Vec<_>>());
    Ok(FrameQueue::finished(frames))
}

/// Normalized FFT magnitudes for every frame, computed in parallel.
fn magnitude_frames(samples: &[f32], hop: f32, total_frames: usize, fft_size: usize) -> Vec<Vec<f32>> {
    let window = blackman_window(fft_size);
    let half = fft_size / 2;

    (0..total_frames)
        .into_par_iter()
        .map(|frame_idx| {
            let end = (((frame_idx + 1) as f32 * hop) as usize).min(samples.len());
            let start = end.saturating_sub(fft_size);
            let offset = fft_size - (end - start);

            let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];
            for (i, &s) in samples[start..end].iter().enumerate() {
                buffer[offset + i] = Complex::new(s * window[offset + i], 0.0);
            }

            // Per-thread FFT planner (rayon-safe)
            let mut planner = FftPlanner::<f32>::new();
            let fft = planner.plan_fft_forward(fft_size);
            fft.process(&mut buffer);

            buffer[..half].iter().map(|c| c.norm() / fft_size as f32).collect()
        })
        .collect()
}

/// Sequential pass: temporal smoothing, then decibels mapped onto bytes.
fn smooth_to_bytes(magnitudes: &[Vec<f32>], settings: &AnalyserSettings) -> Vec<FrequencyFrame> {
    let bins = settings.bins();
    let tau = settings.smoothing;
    let mut smoothed = vec![0.0f32; bins];

    magnitudes
        .iter()
        .map(|frame| {
            let bytes: Vec<u8> = smoothed
                .iter_mut()
                .zip(frame)
                .map(|(s, &m)| {
                    *s = tau * *s + (1.0 - tau) * m;
                    decibels_to_byte(20.0 * s.log10(), settings.min_decibels, settings.max_decibels)
                })
                .collect();
            FrequencyFrame::new(bytes)
        })
        .collect()
}

/// Linear map of `[min_db, max_db]` onto `0..=255`, clamped.
pub fn decibels_to_byte(db: f32, min_db: f32, max_db: f32) -> u8 {
    if db.is_nan() {
        return 0;
    }
    let scaled = 255.0 / (max_db - min_db) * (db - min_db);
    scaled.floor().clamp(0.0, 255.0) as u8
}

fn blackman_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
        })
        .collect()
}
