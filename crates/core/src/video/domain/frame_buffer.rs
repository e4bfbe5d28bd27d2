use std::collections::VecDeque;

use ndarray::{s, Array3};

use crate::montage::image_montage::{ImageMontage, MontageOptions};
use crate::shared::constants::{DEFAULT_BUFFER_CAPACITY, MONTAGE_MIN_TILE};
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;

/// Bounded FIFO of the most recent frames.
///
/// Once `capacity` frames are held, each `push` evicts the oldest one.
/// The buffer is passive: it is filled synchronously by whoever pulls
/// frames from a sequence.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Result<Self, VideoError> {
        if capacity == 0 {
            return Err(VideoError::InvalidArgument(
                "frame buffer capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Adds a frame, returning the evicted one when the buffer was full.
    pub fn push(&mut self, frame: Frame) -> Option<Frame> {
        let evicted = if self.frames.len() == self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Oldest frame held.
    pub fn first(&self) -> Option<&Frame> {
        self.frames.front()
    }

    /// Newest frame held.
    pub fn last(&self) -> Option<&Frame> {
        self.frames.back()
    }

    pub fn middle(&self) -> Option<&Frame> {
        self.frames.get(self.frames.len() / 2)
    }

    pub fn get(&self, i: usize) -> Option<&Frame> {
        self.frames.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.frames.iter()
    }

    /// Pulls frames until the buffer is full or the source ends.
    ///
    /// Returns the number of frames added. Decode errors abort the fill.
    pub fn fill_from<I>(&mut self, source: I) -> Result<usize, VideoError>
    where
        I: IntoIterator<Item = Result<Frame, VideoError>>,
    {
        self.ensure_not_full()?;
        let mut added = 0;
        let mut source = source.into_iter();
        while !self.is_full() {
            let Some(frame) = source.next() else { break };
            self.push(frame?);
            added += 1;
        }
        Ok(added)
    }

    /// Fills the buffer by repeating `frames` in order.
    pub fn fill_cycling(&mut self, frames: &[Frame]) -> Result<usize, VideoError> {
        self.ensure_not_full()?;
        if frames.is_empty() {
            return Err(VideoError::InvalidArgument(
                "cannot fill a buffer from an empty frame list".into(),
            ));
        }
        let mut added = 0;
        for frame in frames.iter().cycle() {
            if self.is_full() {
                break;
            }
            self.push(frame.clone());
            added += 1;
        }
        Ok(added)
    }

    /// Stacks the buffered frames as grayscale into an array of shape
    /// (n, height, width). Frames of a different size are stretched to
    /// `size`, which defaults to the size of the oldest frame.
    pub fn as_gray_stack(&self, size: Option<(u32, u32)>) -> Result<Array3<u8>, VideoError> {
        let Some(first) = self.first() else {
            return Ok(Array3::zeros((0, 0, 0)));
        };
        let (w, h) = size.unwrap_or(first.size());
        let mut stack = Array3::zeros((self.len(), h as usize, w as usize));
        for (i, frame) in self.frames.iter().enumerate() {
            let gray = frame.resized(w, h)?.to_gray()?;
            stack
                .slice_mut(s![i, .., ..])
                .assign(&gray.as_ndarray().slice(s![.., .., 0]));
        }
        Ok(stack)
    }

    /// Lays the buffered frames out as a montage, oldest first.
    ///
    /// Without a tile size, tiles are one fifth of the oldest frame, but no
    /// smaller than 32x24.
    pub fn as_montage(
        &self,
        layout: (u32, u32),
        tile_size: Option<(u32, u32)>,
    ) -> Result<ImageMontage, VideoError> {
        let first = self.first().ok_or_else(|| {
            VideoError::InvalidArgument("cannot build a montage from an empty buffer".into())
        })?;
        let tile_size = tile_size.unwrap_or_else(|| {
            let (w, h) = first.size();
            ((w / 5).max(MONTAGE_MIN_TILE.0), (h / 5).max(MONTAGE_MIN_TILE.1))
        });
        ImageMontage::new(
            self.frames.iter().cloned().collect(),
            MontageOptions {
                layout,
                tile_size,
                ..MontageOptions::default()
            },
        )
    }

    fn ensure_not_full(&self) -> Result<(), VideoError> {
        if self.is_full() {
            return Err(VideoError::InvalidArgument("frame buffer is already full".into()));
        }
        Ok(())
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            frames: VecDeque::with_capacity(DEFAULT_BUFFER_CAPACITY),
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}
