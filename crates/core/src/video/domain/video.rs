use std::time::Duration;

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::frame_buffer::FrameBuffer;
use crate::video::domain::frame_source::{FrameSource, SeekableSource};
use crate::video::domain::playback_control::PlaybackState;
use crate::video::domain::video_sequence::VideoSequence;

pub type SeekableSequence = VideoSequence<Box<dyn SeekableSource>>;
pub type LiveSequence = VideoSequence<Box<dyn FrameSource>>;

/// A sequence whose source kind is only known at runtime.
///
/// Finite sources come back as `Seekable`; cameras and streams as `Live`.
/// Match on the variant to reach the statically typed API, or use the
/// methods here, which fail with `NotSeekable` where a live source cannot
/// comply.
pub enum Video {
    Seekable(SeekableSequence),
    Live(LiveSequence),
}

macro_rules! each {
    ($video:expr, $seq:ident => $body:expr) => {
        match $video {
            Video::Seekable($seq) => $body,
            Video::Live($seq) => $body,
        }
    };
}

impl Video {
    pub fn seekable(source: impl SeekableSource + 'static) -> Self {
        Video::Seekable(VideoSequence::new(Box::new(source)))
    }

    pub fn live(source: impl FrameSource + 'static) -> Self {
        Video::Live(VideoSequence::new(Box::new(source)))
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self, Video::Seekable(_))
    }

    pub fn with_bounds(self, start_frame: usize, end_frame: Option<usize>) -> Result<Self, VideoError> {
        Ok(match self {
            Video::Seekable(seq) => Video::Seekable(seq.with_bounds(start_frame, end_frame)?),
            Video::Live(seq) => Video::Live(seq.with_bounds(start_frame, end_frame)?),
        })
    }

    pub fn with_output_size(self, width: u32, height: u32) -> Self {
        match self {
            Video::Seekable(seq) => Video::Seekable(seq.with_output_size(width, height)),
            Video::Live(seq) => Video::Live(seq.with_output_size(width, height)),
        }
    }

    pub fn with_buffer(self, capacity: usize) -> Result<Self, VideoError> {
        Ok(match self {
            Video::Seekable(seq) => Video::Seekable(seq.with_buffer(capacity)?),
            Video::Live(seq) => Video::Live(seq.with_buffer(capacity)?),
        })
    }

    pub fn metadata(&self) -> &SourceMetadata {
        each!(self, seq => seq.metadata())
    }

    pub fn frame_count(&self) -> Option<usize> {
        each!(self, seq => seq.frame_count())
    }

    /// Frames within the bounds; `None` for live sources.
    pub fn len(&self) -> Option<usize> {
        match self {
            Video::Seekable(seq) => Some(seq.len()),
            Video::Live(_) => None,
        }
    }

    pub fn position(&self) -> usize {
        each!(self, seq => seq.position())
    }

    pub fn start_frame(&self) -> usize {
        each!(self, seq => seq.start_frame())
    }

    pub fn end_frame(&self) -> Option<usize> {
        each!(self, seq => seq.end_frame())
    }

    pub fn state(&self) -> PlaybackState {
        each!(self, seq => seq.state())
    }

    pub fn set_state(&mut self, state: PlaybackState) {
        each!(self, seq => seq.set_state(state))
    }

    pub fn pause(&mut self) {
        each!(self, seq => seq.pause())
    }

    pub fn is_closed(&self) -> bool {
        each!(self, seq => seq.is_closed())
    }

    pub fn is_exhausted(&self) -> bool {
        each!(self, seq => seq.is_exhausted())
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        each!(self, seq => seq.current_frame())
    }

    pub fn buffer(&self) -> Option<&FrameBuffer> {
        each!(self, seq => seq.buffer())
    }

    pub fn buffer_mut(&mut self) -> Option<&mut FrameBuffer> {
        each!(self, seq => seq.buffer_mut())
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        each!(self, seq => seq.frame_interval())
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        each!(self, seq => seq.next_frame())
    }

    pub fn skip_to(&mut self, index: usize) -> Result<(), VideoError> {
        each!(self, seq => seq.skip_to(index))
    }

    /// Repositions to `index`; live sources fail with `NotSeekable`.
    pub fn seek(&mut self, index: usize) -> Result<(), VideoError> {
        match self {
            Video::Seekable(seq) => seq.seek(index),
            Video::Live(seq) => {
                if seq.is_closed() {
                    return Err(VideoError::Closed);
                }
                Err(VideoError::NotSeekable)
            }
        }
    }

    pub fn reset(&mut self) -> Result<(), VideoError> {
        let start = self.start_frame();
        self.seek(start)
    }

    pub fn close(&mut self) {
        each!(self, seq => seq.close())
    }
}

impl Iterator for Video {
    type Item = Result<Frame, VideoError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

impl From<SeekableSequence> for Video {
    fn from(seq: SeekableSequence) -> Self {
        Video::Seekable(seq)
    }
}

impl From<LiveSequence> for Video {
    fn from(seq: LiveSequence) -> Self {
        Video::Live(seq)
    }
}
