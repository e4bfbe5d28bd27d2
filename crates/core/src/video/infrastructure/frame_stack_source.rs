use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::frame_source::{FrameSource, SeekableSource};

/// Plays an in-memory list of frames as a video.
///
/// Frames are re-indexed by their position in the list. All frames must
/// share the geometry of the first one.
pub struct FrameStackSource {
    frames: Vec<Frame>,
    next: usize,
    metadata: SourceMetadata,
}

impl FrameStackSource {
    pub fn new(frames: Vec<Frame>) -> Result<Self, VideoError> {
        let (width, height) = frames.first().map(Frame::size).unwrap_or((0, 0));
        if let Some(odd) = frames.iter().find(|f| f.size() != (width, height)) {
            return Err(VideoError::InvalidArgument(format!(
                "frame {} is {}x{}, expected {width}x{height}",
                odd.index(),
                odd.width(),
                odd.height()
            )));
        }
        let metadata = SourceMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: Some(frames.len()),
            codec: "raw".to_string(),
            source_path: None,
        };
        Ok(Self {
            frames,
            next: 0,
            metadata,
        })
    }

    /// Splits a (frames, height, width) grayscale stack into frames.
    pub fn from_gray_stack(stack: &ndarray::Array3<u8>) -> Result<Self, VideoError> {
        let (_, h, w) = stack.dim();
        let frames = stack
            .outer_iter()
            .enumerate()
            .map(|(i, plane)| Frame::new(plane.iter().copied().collect(), w as u32, h as u32, 1, i))
            .collect();
        Self::new(frames)
    }
}

impl FrameSource for FrameStackSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read_next(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(frame) = self.frames.get(self.next) else {
            return Ok(None);
        };
        let frame = frame.clone().with_index(self.next);
        self.next += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.next = self.frames.len();
    }
}

impl SeekableSource for FrameStackSource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn seek(&mut self, index: usize) -> Result<(), VideoError> {
        if index > self.frames.len() {
            return Err(VideoError::OutOfRange {
                index,
                start: 0,
                end: self.frames.len().saturating_sub(1),
            });
        }
        self.next = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|i| Frame::zeros(4, 3, 3, 100 + i)).collect()
    }

    #[test]
    fn test_metadata_reflects_stack() {
        let source = FrameStackSource::new(frames(5)).unwrap();
        let meta = source.metadata();
        assert_eq!((meta.width, meta.height), (4, 3));
        assert_eq!(meta.total_frames, Some(5));
        assert_eq!(source.len(), 5);
    }

    #[test]
    fn test_reindexes_by_position() {
        let mut source = FrameStackSource::new(frames(3)).unwrap();
        let idx: Vec<_> = std::iter::from_fn(|| source.read_next().unwrap())
            .map(|f| f.index())
            .collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn test_seek_and_end() {
        let mut source = FrameStackSource::new(frames(3)).unwrap();
        source.seek(2).unwrap();
        assert_eq!(source.read_next().unwrap().unwrap().index(), 2);
        assert!(source.read_next().unwrap().is_none());
        source.seek(3).unwrap();
        assert!(source.read_next().unwrap().is_none());
        assert!(source.seek(4).is_err());
    }

    #[test]
    fn test_mixed_sizes_rejected() {
        let list = vec![Frame::zeros(2, 2, 3, 0), Frame::zeros(3, 2, 3, 1)];
        assert!(matches!(
            FrameStackSource::new(list),
            Err(VideoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_from_gray_stack() {
        let mut stack = ndarray::Array3::<u8>::zeros((3, 2, 4));
        stack[[1, 1, 3]] = 77;
        let mut source = FrameStackSource::from_gray_stack(&stack).unwrap();
        assert_eq!(source.len(), 3);
        source.seek(1).unwrap();
        let frame = source.read_next().unwrap().unwrap();
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.size(), (4, 2));
        assert_eq!(frame.as_ndarray()[[1, 3, 0]], 77);
    }

    #[test]
    fn test_close_exhausts() {
        let mut source = FrameStackSource::new(frames(2)).unwrap();
        source.close();
        assert!(source.read_next().unwrap().is_none());
    }
}
