use std::collections::VecDeque;
use std::sync::Arc;

/// One analysis frame: byte magnitudes, index 0 = DC, last index = Nyquist.
///
/// Cheap to clone; the bins are shared and never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyFrame {
    bins: Arc<[u8]>,
}

impl FrequencyFrame {
    pub fn new(bins: impl Into<Arc<[u8]>>) -> Self {
        Self { bins: bins.into() }
    }

    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Magnitude at `index`, clamped into the frame. Empty frames read as 0.
    pub fn sample(&self, index: usize) -> u8 {
        match self.bins.len() {
            0 => 0,
            n => self.bins[index.min(n - 1)],
        }
    }
}

/// Result of asking a source for the next tick's frames.
#[derive(Clone, Debug, PartialEq)]
pub enum FramePoll {
    /// One frame per channel, in channel order.
    Ready(Vec<FrequencyFrame>),
    /// Nothing new yet; the tick is a no-op.
    Pending,
    Ended,
}

/// Supplier of already-computed frequency frames.
///
/// Implementations must not block: a tick that finds nothing buffered gets
/// [`FramePoll::Pending`].
pub trait FrameSource {
    fn poll_frame(&mut self) -> FramePoll;
}

/// In-memory FIFO of per-channel frames.
///
/// Fed up front by offline analysis, or incrementally by a host that pushes
/// frames as it computes them.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<Vec<FrequencyFrame>>,
    finished: bool,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue holding all of `frames` that ends once they are drained.
    pub fn finished(frames: impl IntoIterator<Item = Vec<FrequencyFrame>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            finished: true,
        }
    }

    pub fn push(&mut self, channels: Vec<FrequencyFrame>) {
        self.frames.push_back(channels);
    }

    /// No more frames will be pushed.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for FrameQueue {
    fn poll_frame(&mut self) -> FramePoll {
        match self.frames.pop_front() {
            Some(channels) => FramePoll::Ready(channels),
            None if self.finished => FramePoll::Ended,
            None => FramePoll::Pending,
        }
    }
}
