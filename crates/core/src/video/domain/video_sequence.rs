use std::time::Duration;

use log::{debug, warn};

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::frame_buffer::FrameBuffer;
use crate::video::domain::frame_source::{FrameSource, SeekableSource};
use crate::video::domain::playback_control::PlaybackState;

/// Pull-based view over a single frame source.
///
/// Tracks the position of the next frame, optional inclusive
/// `[start_frame, end_frame]` bounds, an optional output size and an
/// optional buffer of the most recently produced frames. The sequence owns
/// its source; dropping or closing the sequence releases it.
///
/// Sequential operations are available for every source. `seek`, `reset`
/// and `len` only exist when the source is a [`SeekableSource`].
pub struct VideoSequence<S: FrameSource> {
    source: S,
    position: usize,
    start_frame: usize,
    end_frame: Option<usize>,
    output_size: Option<(u32, u32)>,
    buffer: Option<FrameBuffer>,
    state: PlaybackState,
    current: Option<Frame>,
    exhausted: bool,
    closed: bool,
}

impl<S: FrameSource> VideoSequence<S> {
    /// Attaches a source. The sequence starts paused at frame 0.
    pub fn new(source: S) -> Self {
        Self {
            source,
            position: 0,
            start_frame: 0,
            end_frame: None,
            output_size: None,
            buffer: None,
            state: PlaybackState::Paused,
            current: None,
            exhausted: false,
            closed: false,
        }
    }

    /// Restricts the sequence to frames `start_frame..=end_frame`.
    ///
    /// Frames before `start_frame` are skipped on the first read.
    pub fn with_bounds(
        mut self,
        start_frame: usize,
        end_frame: Option<usize>,
    ) -> Result<Self, VideoError> {
        if let Some(end) = end_frame {
            if end < start_frame {
                return Err(VideoError::InvalidArgument(format!(
                    "end frame {end} precedes start frame {start_frame}"
                )));
            }
        }
        if let Some(count) = self.source.frame_count() {
            if start_frame >= count {
                return Err(VideoError::OutOfRange {
                    index: start_frame,
                    start: 0,
                    end: count.saturating_sub(1),
                });
            }
        }
        self.start_frame = start_frame;
        self.end_frame = end_frame;
        Ok(self)
    }

    /// Stretches every produced frame to `width` x `height`.
    pub fn with_output_size(mut self, width: u32, height: u32) -> Self {
        self.output_size = Some((width, height));
        self
    }

    /// Keeps the `capacity` most recent frames in a [`FrameBuffer`].
    pub fn with_buffer(mut self, capacity: usize) -> Result<Self, VideoError> {
        self.buffer = Some(FrameBuffer::new(capacity)?);
        Ok(self)
    }

    pub fn metadata(&self) -> &SourceMetadata {
        self.source.metadata()
    }

    /// Frame count of the underlying source, `None` for live sources.
    pub fn frame_count(&self) -> Option<usize> {
        self.source.frame_count()
    }

    /// Index of the frame the next `next_frame` call will produce.
    pub fn position(&self) -> usize {
        self.position.max(self.start_frame)
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn end_frame(&self) -> Option<usize> {
        self.end_frame
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The most recently produced frame.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    pub fn buffer(&self) -> Option<&FrameBuffer> {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> Option<&mut FrameBuffer> {
        self.buffer.as_mut()
    }

    /// Nominal time between frames, from the source frame rate.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.metadata().frame_interval()
    }

    /// Produces the next frame and advances by one.
    ///
    /// Returns `Ok(None)` at the end of the source or past `end_frame`.
    /// A `DecodeError` still advances the position, so calling again
    /// continues with the following frame.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        self.ensure_open()?;
        if self.exhausted {
            return Ok(None);
        }
        if self.position < self.start_frame {
            self.discard_until(self.start_frame)?;
            if self.exhausted {
                return Ok(None);
            }
        }
        if self.end_frame.is_some_and(|end| self.position > end) {
            self.finish();
            return Ok(None);
        }

        let frame = match self.source.read_next() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.finish();
                return Ok(None);
            }
            Err(err) => {
                if let VideoError::DecodeError { index, .. } = &err {
                    self.position = index + 1;
                }
                return Err(err);
            }
        };
        self.position = frame.index() + 1;

        let frame = match self.output_size {
            Some((w, h)) => frame.resized(w, h)?,
            None => frame,
        };
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.push(frame.clone());
        }
        self.current = Some(frame.clone());
        Ok(Some(frame))
    }

    /// Moves forward to `index` by reading and discarding frames.
    ///
    /// Works on every source, including live ones, but cannot go backwards:
    /// a target behind the current position fails with `NotSeekable`.
    pub fn skip_to(&mut self, index: usize) -> Result<(), VideoError> {
        self.ensure_open()?;
        self.check_upper_bound(index)?;
        if index < self.position() {
            return Err(VideoError::NotSeekable);
        }
        if index > 0 {
            debug!("Cueing sequence forward to frame {index}");
        }
        self.discard_until(index)
    }

    /// Marks the sequence as playing, paused or stopped. Exhausted and
    /// closed sequences stay stopped.
    pub fn set_state(&mut self, state: PlaybackState) {
        self.state = if self.exhausted || self.closed {
            PlaybackState::Stopped
        } else {
            state
        };
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Releases the source. Every later call fails with `Closed`.
    pub fn close(&mut self) {
        if !self.closed {
            self.source.close();
            self.closed = true;
            self.state = PlaybackState::Stopped;
            self.current = None;
            debug!("Closed sequence at frame {}", self.position);
        }
    }

    fn discard_until(&mut self, index: usize) -> Result<(), VideoError> {
        while self.position < index {
            match self.source.read_next() {
                Ok(Some(frame)) => self.position = frame.index() + 1,
                Ok(None) => {
                    self.finish();
                    break;
                }
                Err(VideoError::DecodeError { index: bad, reason }) => {
                    warn!("Skipping undecodable frame {bad} while cueing: {reason}");
                    self.position = bad + 1;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Last index inside both the end bound and the source, when either is
    /// known.
    fn last_index(&self) -> Option<usize> {
        match (self.end_frame, self.source.frame_count()) {
            (Some(end), Some(count)) => Some(end.min(count.saturating_sub(1))),
            (Some(end), None) => Some(end),
            (None, Some(count)) => Some(count.saturating_sub(1)),
            (None, None) => None,
        }
    }

    fn check_upper_bound(&self, index: usize) -> Result<(), VideoError> {
        match self.last_index() {
            Some(last) if index > last => Err(VideoError::OutOfRange {
                index,
                start: self.start_frame,
                end: last,
            }),
            _ => Ok(()),
        }
    }

    fn finish(&mut self) {
        if !self.exhausted {
            debug!("Sequence exhausted at frame {}", self.position);
        }
        self.exhausted = true;
        self.state = PlaybackState::Stopped;
    }

    fn ensure_open(&self) -> Result<(), VideoError> {
        if self.closed {
            return Err(VideoError::Closed);
        }
        Ok(())
    }
}

impl<S: SeekableSource> VideoSequence<S> {
    /// Number of frames within the bounds.
    pub fn len(&self) -> usize {
        let count = self.source.len();
        let end = self.end_frame.map_or(count, |end| (end + 1).min(count));
        end.saturating_sub(self.start_frame)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positions the sequence so the next `next_frame` yields frame `index`.
    ///
    /// Starts a new playback session: the buffer is cleared and an
    /// exhausted sequence becomes paused again.
    pub fn seek(&mut self, index: usize) -> Result<(), VideoError> {
        self.ensure_open()?;
        if index < self.start_frame {
            return Err(VideoError::OutOfRange {
                index,
                start: self.start_frame,
                end: self.last_index().unwrap_or(self.start_frame),
            });
        }
        self.check_upper_bound(index)?;

        debug!("Seeking sequence to frame {index}");
        self.source.seek(index)?;
        self.position = index;
        self.exhausted = false;
        self.current = None;
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.clear();
        }
        if self.state == PlaybackState::Stopped {
            self.state = PlaybackState::Paused;
        }
        Ok(())
    }

    /// Rewinds to the start bound.
    pub fn reset(&mut self) -> Result<(), VideoError> {
        self.seek(self.start_frame)
    }

    /// Seeks to `index` and returns that frame.
    pub fn frame_at(&mut self, index: usize) -> Result<Frame, VideoError> {
        self.seek(index)?;
        self.next_frame()?.ok_or_else(|| VideoError::OutOfRange {
            index,
            start: self.start_frame,
            end: self.last_index().unwrap_or(self.start_frame),
        })
    }
}

impl<S: FrameSource> Iterator for VideoSequence<S> {
    type Item = Result<Frame, VideoError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl<S: FrameSource> Drop for VideoSequence<S> {
    fn drop(&mut self) {
        self.close();
    }
}
