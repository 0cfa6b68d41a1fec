use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::export::{ChannelImage, ExportCompositor, ExportOptions};
use super::raster::Raster;
use super::scroll::ScrollBuffer;
use super::spectrogram::{RenderSettings, SessionState, SpectrogramState};
use crate::error::{Result, SpectrogramError};
use crate::spectrum::axis::AxisMapper;
use crate::spectrum::frame::{FramePoll, FrameSource};

/// Shared stop flag. Cloning yields a handle to the same flag, so a host can
/// cancel from an input handler or another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A column was appended to every channel that received a frame.
    Drawn,
    /// The source had nothing new.
    Skipped,
    /// The source is exhausted; the driver should stop ticking.
    Ended,
    /// Cancellation was observed before any work was done.
    Cancelled,
}

impl TickOutcome {
    /// Whether the driver should schedule another tick.
    pub fn should_continue(&self) -> bool {
        matches!(self, TickOutcome::Drawn | TickOutcome::Skipped)
    }
}

/// A rendering session: one live raster per channel sharing one set of
/// display settings.
///
/// The session never schedules itself. A host calls [`tick`](Self::tick)
/// once per display frame until it stops returning a continuing outcome.
pub struct Spectrogram {
    channels: Vec<SpectrogramState>,
    labels: Vec<String>,
    settings: RenderSettings,
    cancel: CancelHandle,
}

impl Spectrogram {
    /// `labels` names the channels; its length is the channel count.
    pub fn new(labels: Vec<String>, width: u32, height: u32, settings: RenderSettings) -> Result<Self> {
        if labels.is_empty() {
            return Err(SpectrogramError::InvalidConfig(
                "a spectrogram needs at least one channel".into(),
            ));
        }
        settings.validate()?;

        let channels = labels
            .iter()
            .map(|_| SpectrogramState::new(width, height))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "spectrogram session created: {} channel(s), {}x{}",
            channels.len(),
            width,
            height
        );

        Ok(Self {
            channels,
            labels,
            settings,
            cancel: CancelHandle::default(),
        })
    }

    /// Conventional channel labels for a channel count.
    pub fn default_labels(channels: usize) -> Vec<String> {
        match channels {
            1 => vec!["MONO".to_string()],
            2 => vec!["LEFT CHANNEL".to_string(), "RIGHT CHANNEL".to_string()],
            n => (1..=n).map(|i| format!("CHANNEL {}", i)).collect(),
        }
    }

    pub fn channels(&self) -> &[SpectrogramState] {
        &self.channels
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn width(&self) -> u32 {
        self.channels[0].width()
    }

    pub fn height(&self) -> u32 {
        self.channels[0].height()
    }

    pub fn is_active(&self) -> bool {
        self.channels.iter().any(|c| c.state() == SessionState::Active)
    }

    /// Replace the display settings. Takes effect on the next tick; columns
    /// already drawn keep their colours.
    pub fn set_settings(&mut self, settings: RenderSettings) -> Result<()> {
        settings.validate()?;
        if settings != self.settings {
            log::debug!(
                "settings changed: {} {:.0}-{:.0} Hz, column width {}",
                settings.axis.scale,
                settings.axis.min_freq,
                settings.axis.max_freq,
                settings.column_width
            );
        }
        self.settings = settings;
        Ok(())
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Re-arm after a cancellation so ticks draw again.
    pub fn start(&mut self) {
        self.cancel.reset();
    }

    /// One unit of work: pull a frame per channel and append a column.
    ///
    /// Cancellation is checked before anything else, so once a cancel is
    /// visible no further column is drawn.
    pub fn tick(&mut self, source: &mut dyn FrameSource) -> Result<TickOutcome> {
        if self.cancel.is_cancelled() {
            self.stop();
            return Ok(TickOutcome::Cancelled);
        }

        let frames = match source.poll_frame() {
            FramePoll::Ready(frames) => frames,
            FramePoll::Pending => return Ok(TickOutcome::Skipped),
            FramePoll::Ended => return Ok(TickOutcome::Ended),
        };

        for (channel, frame) in self.channels.iter_mut().zip(frames.iter()) {
            channel.append_column(frame, &self.settings)?;
        }
        Ok(TickOutcome::Drawn)
    }

    /// Tick until the source ends or cancellation is observed. Returns the
    /// number of columns drawn.
    pub fn run(&mut self, source: &mut dyn FrameSource) -> Result<usize> {
        let mut drawn = 0;
        loop {
            match self.tick(source)? {
                TickOutcome::Drawn => drawn += 1,
                TickOutcome::Skipped => {}
                TickOutcome::Ended | TickOutcome::Cancelled => return Ok(drawn),
            }
        }
    }

    /// Stop drawing. Raster contents are kept for export.
    pub fn stop(&mut self) {
        for channel in &mut self.channels {
            channel.stop();
        }
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
        log::debug!("spectrogram cleared");
    }

    /// Reallocate every channel. All-or-nothing: if any allocation fails the
    /// session keeps its current rasters.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let buffers = self
            .channels
            .iter()
            .map(|_| ScrollBuffer::new(width, height))
            .collect::<Result<Vec<_>>>()?;

        for (channel, buffer) in self.channels.iter_mut().zip(buffers) {
            channel.replace_buffer(buffer);
        }
        log::debug!("spectrogram resized to {}x{}", width, height);
        Ok(())
    }

    /// Copies of the live rasters, safe to hand to the export compositor.
    pub fn snapshot(&self) -> Result<Vec<ChannelImage>> {
        self.channels
            .iter()
            .zip(&self.labels)
            .map(|(channel, label)| {
                Ok(ChannelImage {
                    label: label.clone(),
                    raster: channel.snapshot()?,
                })
            })
            .collect()
    }

    /// Composite all channels with axes and legend into one image.
    ///
    /// `bins` is the analysis frame length, needed to place gridlines on the
    /// same rows the data was sampled from.
    pub fn export(&self, bins: usize, options: &ExportOptions) -> Result<Raster> {
        let images = self.snapshot()?;
        let mapper = AxisMapper::new(&self.settings.axis, self.height(), bins)?;
        ExportCompositor::new(options.clone()).compose(&images, &mapper, &self.settings.palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::axis::{AxisConfig, AxisScale};
    use crate::spectrum::frame::{FrameQueue, FrequencyFrame};
    use crate::spectrum::palette::Palette;
    use crate::spectrum::shape::ShapeConfig;

    fn settings() -> RenderSettings {
        RenderSettings {
            axis: AxisConfig {
                scale: AxisScale::Linear,
                min_freq: 0.0,
                max_freq: 22050.0,
                sample_rate: 44100,
            },
            shape: ShapeConfig::default(),
            palette: Palette::Grayscale,
            column_width: 1,
        }
    }

    fn stereo(left: u8, right: u8) -> Vec<FrequencyFrame> {
        vec![
            FrequencyFrame::new(vec![left; 32]),
            FrequencyFrame::new(vec![right; 32]),
        ]
    }

    #[test]
    fn channels_are_drawn_independently() {
        let mut session = Spectrogram::new(Spectrogram::default_labels(2), 4, 4, settings()).unwrap();
        let mut source = FrameQueue::finished(vec![stereo(10, 200)]);

        assert_eq!(session.tick(&mut source).unwrap(), TickOutcome::Drawn);
        assert_eq!(session.channels()[0].buffer().pixel(3, 0), Some([10, 10, 10, 255]));
        assert_eq!(session.channels()[1].buffer().pixel(3, 0), Some([200, 200, 200, 255]));
        assert_eq!(session.tick(&mut source).unwrap(), TickOutcome::Ended);
    }

    #[test]
    fn pending_source_is_a_no_op() {
        let mut session = Spectrogram::new(Spectrogram::default_labels(1), 4, 4, settings()).unwrap();
        let mut source = FrameQueue::new();
        assert_eq!(session.tick(&mut source).unwrap(), TickOutcome::Skipped);
        assert!(!session.is_active());
        assert!(session.channels()[0].buffer().is_blank());
    }

    #[test]
    fn cancel_stops_the_next_tick() {
        let mut session = Spectrogram::new(Spectrogram::default_labels(2), 4, 4, settings()).unwrap();
        let mut source = FrameQueue::finished(vec![stereo(1, 1), stereo(2, 2), stereo(3, 3)]);

        assert_eq!(session.tick(&mut source).unwrap(), TickOutcome::Drawn);
        assert!(session.is_active());

        session.cancel_handle().cancel();
        assert_eq!(session.tick(&mut source).unwrap(), TickOutcome::Cancelled);
        assert!(!session.is_active());
        assert_eq!(source.len(), 2, "cancelled tick must not consume frames");

        session.start();
        assert_eq!(session.run(&mut source).unwrap(), 2);
    }

    #[test]
    fn surplus_and_missing_channels_are_tolerated() {
        let mut session = Spectrogram::new(Spectrogram::default_labels(2), 2, 2, settings()).unwrap();
        let mut source = FrameQueue::finished(vec![vec![FrequencyFrame::new(vec![50u8; 8])]]);
        assert_eq!(session.tick(&mut source).unwrap(), TickOutcome::Drawn);
        assert!(!session.channels()[0].buffer().is_blank());
        assert!(session.channels()[1].buffer().is_blank());
    }

    #[test]
    fn rejects_invalid_settings_up_front() {
        let mut bad = settings();
        bad.shape.contrast = 0.0;
        assert!(Spectrogram::new(Spectrogram::default_labels(1), 4, 4, bad.clone()).is_err());

        let mut session = Spectrogram::new(Spectrogram::default_labels(1), 4, 4, settings()).unwrap();
        assert!(session.set_settings(bad).is_err());
        assert_eq!(session.settings(), &settings());
    }

    #[test]
    fn resize_is_all_or_nothing() {
        let mut session = Spectrogram::new(Spectrogram::default_labels(2), 3, 3, settings()).unwrap();
        let mut source = FrameQueue::finished(vec![stereo(9, 9)]);
        session.run(&mut source).unwrap();

        assert!(session.resize(u32::MAX, u32::MAX).is_err());
        assert_eq!((session.width(), session.height()), (3, 3));
        assert!(!session.channels()[1].buffer().is_blank());

        session.resize(5, 2).unwrap();
        assert_eq!((session.width(), session.height()), (5, 2));
        assert!(session.channels().iter().all(|c| c.buffer().is_blank()));
    }

    #[test]
    fn default_labels_by_channel_count() {
        assert_eq!(Spectrogram::default_labels(1), vec!["MONO"]);
        assert_eq!(Spectrogram::default_labels(2)[1], "RIGHT CHANNEL");
        assert_eq!(Spectrogram::default_labels(3)[2], "CHANNEL 3");
    }
}
