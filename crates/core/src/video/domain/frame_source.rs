use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Sequential access to decoded frames.
///
/// Implementations own their decoder or device handle exclusively and hand
/// out frames one at a time in source order. Frame indices start at 0 and
/// increase by one per frame read since the last (re)positioning.
pub trait FrameSource: Send {
    fn metadata(&self) -> &SourceMetadata;

    /// Decodes the next frame, or `Ok(None)` once the source is exhausted.
    ///
    /// A `DecodeError` consumes the corrupt frame: the next call continues
    /// with the following one.
    fn read_next(&mut self) -> Result<Option<Frame>, VideoError>;

    /// Number of frames for finite sources, `None` for live ones.
    fn frame_count(&self) -> Option<usize> {
        self.metadata().total_frames
    }

    /// Releases the decoder or device. Idempotent.
    fn close(&mut self);
}

/// Random access for finite sources.
pub trait SeekableSource: FrameSource {
    /// Total number of frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positions the source so the next `read_next` yields frame `index`.
    ///
    /// `index == len()` is valid and leaves the source exhausted.
    fn seek(&mut self, index: usize) -> Result<(), VideoError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn metadata(&self) -> &SourceMetadata {
        (**self).metadata()
    }

    fn read_next(&mut self) -> Result<Option<Frame>, VideoError> {
        (**self).read_next()
    }

    fn frame_count(&self) -> Option<usize> {
        (**self).frame_count()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<T: SeekableSource + ?Sized> SeekableSource for Box<T> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn seek(&mut self, index: usize) -> Result<(), VideoError> {
        (**self).seek(index)
    }
}
