use log::{debug, info, warn};

use crate::montage::image_montage::{canvas_size, ImageMontage, MontageOptions, TileLabels};
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::video::Video;

/// Several labelled videos played in lockstep as one sequential source.
///
/// Every read advances each unfinished video by one frame and composes the
/// latest frame of every video, in label order, into a montage. Finished
/// videos keep showing their last frame; the montage ends once all of them
/// have finished.
pub struct VideoMontage {
    videos: Vec<(String, Video)>,
    latest: Vec<Option<Frame>>,
    finished: Vec<bool>,
    options: MontageOptions,
    next_index: usize,
    metadata: SourceMetadata,
}

impl VideoMontage {
    pub fn new(
        videos: impl IntoIterator<Item = (String, Video)>,
        layout: (u32, u32),
        tile_size: (u32, u32),
    ) -> Result<Self, VideoError> {
        let mut videos: Vec<(String, Video)> = videos.into_iter().collect();
        if videos.is_empty() {
            return Err(VideoError::InvalidArgument(
                "a video montage needs at least one video".into(),
            ));
        }
        videos.sort_by(|a, b| a.0.cmp(&b.0));

        let options = MontageOptions {
            layout,
            tile_size,
            labels: TileLabels::Custom(videos.iter().map(|(label, _)| label.clone()).collect()),
            ..MontageOptions::default()
        };
        if layout.0 == 0 || layout.1 == 0 {
            return Err(VideoError::InvalidArgument(format!(
                "montage layout {}x{} has no tiles",
                layout.0, layout.1
            )));
        }

        let (width, height) = canvas_size(&options, videos.len())?;
        let fps = videos
            .iter()
            .map(|(_, v)| v.metadata().fps)
            .fold(0.0, f64::max);
        let total_frames = videos
            .iter()
            .map(|(_, v)| v.len())
            .try_fold(0, |max, len| len.map(|l| max.max(l)));
        let metadata = SourceMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: "montage".into(),
            source_path: None,
        };

        let n = videos.len();
        Ok(Self {
            videos,
            latest: vec![None; n],
            finished: vec![false; n],
            options,
            next_index: 0,
            metadata,
        })
    }

    /// Labels in display order.
    pub fn labels(&self) -> Vec<&str> {
        self.videos.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.iter().all(|&f| f)
    }

    /// Rewinds every video. Fails with `NotSeekable` if any of them is live.
    pub fn reset(&mut self) -> Result<(), VideoError> {
        for (_, video) in &mut self.videos {
            video.reset()?;
        }
        self.latest.iter_mut().for_each(|f| *f = None);
        self.finished.iter_mut().for_each(|f| *f = false);
        self.next_index = 0;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), VideoError> {
        for (i, (label, video)) in self.videos.iter_mut().enumerate() {
            if self.finished[i] {
                continue;
            }
            match video.next_frame() {
                Ok(Some(frame)) => self.latest[i] = Some(frame),
                Ok(None) => {
                    debug!("Montage video '{label}' finished");
                    self.finished[i] = true;
                }
                Err(VideoError::DecodeError { index, reason }) => {
                    warn!("Montage video '{label}' skipped frame {index}: {reason}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn compose(&self) -> Result<Frame, VideoError> {
        let (tw, th) = self.options.tile_size;
        let tiles = self
            .latest
            .iter()
            .map(|f| f.clone().unwrap_or_else(|| Frame::zeros(tw, th, 3, 0)))
            .collect();
        let montage = ImageMontage::new(tiles, self.options.clone())?;
        Ok(montage.into_frame().with_index(self.next_index))
    }
}

impl FrameSource for VideoMontage {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    fn read_next(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.is_finished() {
            return Ok(None);
        }
        self.advance()?;
        if self.is_finished() {
            info!("All videos in the montage have completed");
            return Ok(None);
        }
        let frame = self.compose()?;
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        for (_, video) in &mut self.videos {
            video.close();
        }
        self.finished.iter_mut().for_each(|f| *f = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_sequence::VideoSequence;
    use crate::video::infrastructure::frame_stack_source::FrameStackSource;

    fn video(n: usize, value: u8) -> Video {
        let frames = (0..n)
            .map(|i| Frame::new(vec![value; 8 * 6 * 3], 8, 6, 3, i))
            .collect();
        Video::seekable(FrameStackSource::new(frames).unwrap())
    }

    fn montage() -> VideoMontage {
        VideoMontage::new(
            [("b".to_string(), video(2, 200)), ("a".to_string(), video(4, 100))],
            (1, 2),
            (8, 6),
        )
        .unwrap()
    }

    #[test]
    fn test_requires_a_video() {
        assert!(VideoMontage::new(Vec::new(), (1, 1), (8, 6)).is_err());
    }

    #[test]
    fn test_oversized_tiles_are_rejected() {
        assert!(matches!(
            VideoMontage::new([("a".to_string(), video(1, 0))], (1, 1), (u32::MAX, 6)),
            Err(VideoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_metadata() {
        let m = montage();
        assert_eq!(m.labels(), vec!["a", "b"]);
        // 2 * (8 + 2) + 2 by 1 * (6 + 2) + 2
        assert_eq!((m.metadata().width, m.metadata().height), (22, 10));
        assert_eq!(m.frame_count(), Some(4));
    }

    #[test]
    fn test_runs_until_longest_video_ends() {
        let mut m = montage();
        let mut frames = Vec::new();
        while let Some(frame) = m.read_next().unwrap() {
            frames.push(frame);
        }
        assert_eq!(frames.len(), 4);
        assert_eq!(
            frames.iter().map(Frame::index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        // "a" sits in the first tile, "b" keeps its last frame in the second.
        let last = frames[3].as_ndarray();
        assert_eq!(last[[2, 2, 0]], 100);
        assert_eq!(last[[2, 12, 0]], 200);
        assert!(m.is_finished());
        assert!(m.read_next().unwrap().is_none());
    }

    #[test]
    fn test_reset_replays() {
        let mut m = montage();
        while m.read_next().unwrap().is_some() {}
        m.reset().unwrap();
        assert_eq!(m.read_next().unwrap().unwrap().index(), 0);
    }

    #[test]
    fn test_plays_as_a_sequence() {
        let seq = VideoSequence::new(montage()).with_bounds(1, Some(2)).unwrap();
        let indices: Vec<usize> = seq.map(|f| f.unwrap().index()).collect();
        assert_eq!(indices, vec![1, 2]);
    }
}
