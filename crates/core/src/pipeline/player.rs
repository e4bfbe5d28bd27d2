use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::pipeline::playback_logger::{NullPlaybackLogger, PlaybackLogger};
use crate::shared::annotation::{AnnotationLayer, BLACK, WHITE};
use crate::shared::constants::{DEFAULT_PLAY_DELAY, FRAME_LABEL_POSITION};
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::geometry::Point;
use crate::video::domain::display::{Display, Window};
use crate::video::domain::frame_buffer::FrameBuffer;
use crate::video::domain::frame_source::{FrameSource, SeekableSource};
use crate::video::domain::playback_control::{
    AutoPlayController, PlaybackCommand, PlaybackController, PlaybackState,
};
use crate::video::domain::video::Video;
use crate::video::domain::video_sequence::VideoSequence;

#[derive(Clone, Debug)]
pub struct PlayOptions {
    /// Cue to this frame before playing. `None` plays from the current
    /// position.
    pub start_frame: Option<usize>,
    /// Last frame to play, inclusive.
    pub end_frame: Option<usize>,
    /// Wait between frames while playing. Zero means no wait.
    pub delay: Duration,
    /// Begin in step mode: every frame waits for a command.
    pub start_paused: bool,
    /// Attach a "Frame: N" label to every shown frame.
    pub annotate: bool,
    pub window_title: String,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            start_frame: None,
            end_frame: None,
            delay: DEFAULT_PLAY_DELAY,
            start_paused: false,
            annotate: true,
            window_title: "Video".to_string(),
        }
    }
}

impl PlayOptions {
    pub fn range(start_frame: usize, end_frame: Option<usize>, delay: Duration) -> Self {
        Self {
            start_frame: Some(start_frame),
            end_frame,
            delay,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The sequence ran out of frames.
    Exhausted,
    /// The frame after `end_frame` was reached.
    EndFrame,
    Quit,
    /// The frame callback asked to stop.
    Callback,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames_played: usize,
    pub last_frame_index: Option<usize>,
    pub stop_reason: StopReason,
}

/// What the frame callback sees for each played frame.
pub struct FrameEvent<'f> {
    pub frame: &'f Frame,
    pub annotations: &'f AnnotationLayer,
    /// Key pressed while waiting after the previous frame, if any.
    pub key: Option<char>,
    pub buffer: Option<&'f FrameBuffer>,
}

type FrameCallback<'a> = Box<dyn FnMut(&FrameEvent<'_>) -> bool + 'a>;

/// Drives a sequence frame by frame.
///
/// Per frame: push to the sequence buffer (done by the sequence), label,
/// show, call back, then wait on the controller for the next command.
///
/// Errors end playback with the sequence paused. A `DecodeError` has
/// already moved the sequence past the corrupt frame, so playing again
/// with `start_frame: None` resumes right after it.
pub struct Player<'a> {
    options: PlayOptions,
    controller: Box<dyn PlaybackController + 'a>,
    display: Option<&'a mut dyn Display>,
    on_new_frame: Option<FrameCallback<'a>>,
    logger: Box<dyn PlaybackLogger + 'a>,
    cancelled: Arc<AtomicBool>,
}

impl<'a> Player<'a> {
    pub fn new(options: PlayOptions) -> Self {
        Self {
            options,
            controller: Box::new(AutoPlayController),
            display: None,
            on_new_frame: None,
            logger: Box::new(NullPlaybackLogger),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_controller(mut self, controller: impl PlaybackController + 'a) -> Self {
        self.controller = Box::new(controller);
        self
    }

    pub fn with_display(mut self, display: &'a mut dyn Display) -> Self {
        self.display = Some(display);
        self
    }

    /// Called after each frame is shown. Returning `false` stops playback.
    pub fn on_new_frame(mut self, callback: impl FnMut(&FrameEvent<'_>) -> bool + 'a) -> Self {
        self.on_new_frame = Some(Box::new(callback));
        self
    }

    pub fn with_logger(mut self, logger: impl PlaybackLogger + 'a) -> Self {
        self.logger = Box::new(logger);
        self
    }

    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Setting the returned flag stops playback before the next frame.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn options(&self) -> &PlayOptions {
        &self.options
    }

    /// Plays any sequence. Cueing to `start_frame` reads forward, so it
    /// fails with `NotSeekable` when the sequence is already past it.
    pub fn play<S: FrameSource>(
        &mut self,
        seq: &mut VideoSequence<S>,
    ) -> Result<PlaybackSummary, VideoError> {
        if let Some(start) = self.options.start_frame {
            seq.skip_to(start)?;
        }
        self.run(seq)
    }

    /// Plays a seekable sequence, seeking to `start_frame` first.
    pub fn play_seekable<S: SeekableSource>(
        &mut self,
        seq: &mut VideoSequence<S>,
    ) -> Result<PlaybackSummary, VideoError> {
        if let Some(start) = self.options.start_frame {
            seq.seek(start)?;
        }
        self.run(seq)
    }

    pub fn play_video(&mut self, video: &mut Video) -> Result<PlaybackSummary, VideoError> {
        match video {
            Video::Seekable(seq) => self.play_seekable(seq),
            Video::Live(seq) => self.play(seq),
        }
    }

    fn run<S: FrameSource>(
        &mut self,
        seq: &mut VideoSequence<S>,
    ) -> Result<PlaybackSummary, VideoError> {
        let total = seq.frame_count();
        let delay = self.options.delay;
        let end_frame = self.options.end_frame;
        let annotate = self.options.annotate;

        let mut window = match self.display.as_deref_mut() {
            Some(display) => Some(Window::open(display, self.options.window_title.as_str())?),
            None => None,
        };

        seq.set_state(if self.options.start_paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        });
        info!(
            "Playing from frame {} ({})",
            seq.position(),
            if delay.is_zero() {
                "no delay".to_string()
            } else {
                format!("{} ms delay", delay.as_millis())
            }
        );

        let mut frames_played = 0;
        let mut last_frame_index = None;
        let mut key = None;

        let stop_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if end_frame.is_some_and(|end| seq.position() > end) {
                break StopReason::EndFrame;
            }

            let t0 = Instant::now();
            let frame = match seq.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::Exhausted,
                Err(err) => {
                    seq.pause();
                    self.logger.summary();
                    warn!("Playback interrupted before frame {}: {err}", seq.position());
                    return Err(err);
                }
            };
            self.logger.timing("decode", elapsed_ms(t0));
            if end_frame.is_some_and(|end| frame.index() > end) {
                break StopReason::EndFrame;
            }

            let mut annotations = AnnotationLayer::new();
            if annotate {
                let (x, y) = FRAME_LABEL_POSITION;
                annotations.text(
                    format!("Frame: {}", frame.index()),
                    Point::new(x, y),
                    WHITE,
                    Some(BLACK),
                );
            }

            if let Some(window) = window.as_mut() {
                let t0 = Instant::now();
                if let Err(err) = window.show(&frame, Some(&annotations), Duration::ZERO) {
                    seq.pause();
                    self.logger.summary();
                    return Err(err);
                }
                self.logger.timing("display", elapsed_ms(t0));
            }

            frames_played += 1;
            last_frame_index = Some(frame.index());
            self.logger.progress(frames_played, total);
            if let Some(buffer) = seq.buffer() {
                self.logger.metric("buffer_len", buffer.len() as f64);
            }

            let pressed = key.take();
            if let Some(callback) = self.on_new_frame.as_mut() {
                let t0 = Instant::now();
                let event = FrameEvent {
                    frame: &frame,
                    annotations: &annotations,
                    key: pressed,
                    buffer: seq.buffer(),
                };
                let keep_going = callback(&event);
                self.logger.timing("callback", elapsed_ms(t0));
                if !keep_going {
                    break StopReason::Callback;
                }
            }

            let command = loop {
                match self.controller.wait(seq.state(), delay) {
                    PlaybackCommand::Pause => {
                        if seq.state() != PlaybackState::Paused {
                            debug!("Paused at frame {}", frame.index());
                        }
                        seq.set_state(PlaybackState::Paused);
                    }
                    other => break other,
                }
            };
            match command {
                PlaybackCommand::Continue => seq.set_state(PlaybackState::Playing),
                PlaybackCommand::Step | PlaybackCommand::Pause => {
                    seq.set_state(PlaybackState::Paused)
                }
                PlaybackCommand::Key(c) => key = Some(c),
                PlaybackCommand::Quit => break StopReason::Quit,
                PlaybackCommand::Abort => {
                    seq.pause();
                    self.logger.summary();
                    info!("Playback aborted at frame {}", frame.index());
                    return Err(VideoError::PlaybackAborted);
                }
            }
        };

        drop(window);
        seq.pause();
        self.logger.summary();
        info!("Playback stopped ({stop_reason:?}) after {frames_played} frames");
        Ok(PlaybackSummary {
            frames_played,
            last_frame_index,
            stop_reason,
        })
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

impl<S: FrameSource> VideoSequence<S> {
    /// Plays headless with auto-continue, cueing forward to `start_frame`.
    pub fn play(&mut self, options: PlayOptions) -> Result<PlaybackSummary, VideoError> {
        Player::new(options).play(self)
    }
}

impl Video {
    /// Plays headless with auto-continue, seeking when the source allows.
    pub fn play(&mut self, options: PlayOptions) -> Result<PlaybackSummary, VideoError> {
        Player::new(options).play_video(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::display::NullDisplay;
    use crate::video::domain::playback_control::ScriptedController;
    use crate::video::infrastructure::frame_stack_source::FrameStackSource;
    use crate::video::infrastructure::source_factory::open;
    use crate::video::infrastructure::test_video::clip;
    use crate::video::domain::source_descriptor::SourceDescriptor;
    use crate::shared::source_metadata::SourceMetadata;
    use std::sync::atomic::AtomicUsize;

    fn stack(n: usize) -> VideoSequence<FrameStackSource> {
        let frames = (0..n).map(|i| Frame::zeros(4, 4, 3, i)).collect();
        VideoSequence::new(FrameStackSource::new(frames).unwrap())
    }

    /// Frame stack whose listed frames fail to decode.
    struct Corrupted {
        inner: FrameStackSource,
        corrupt: Vec<usize>,
    }

    impl FrameSource for Corrupted {
        fn metadata(&self) -> &SourceMetadata {
            self.inner.metadata()
        }

        fn read_next(&mut self) -> Result<Option<Frame>, VideoError> {
            match self.inner.read_next()? {
                Some(frame) if self.corrupt.contains(&frame.index()) => {
                    Err(VideoError::decode(frame.index(), "bad packet"))
                }
                other => Ok(other),
            }
        }

        fn close(&mut self) {
            self.inner.close()
        }
    }

    impl SeekableSource for Corrupted {
        fn len(&self) -> usize {
            self.inner.len()
        }

        fn seek(&mut self, index: usize) -> Result<(), VideoError> {
            self.inner.seek(index)
        }
    }

    struct SummaryCounter(Arc<AtomicUsize>);

    impl PlaybackLogger for SummaryCounter {
        fn progress(&mut self, _current: usize, _total: Option<usize>) {}
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
        fn summary(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn no_delay() -> PlayOptions {
        PlayOptions {
            delay: Duration::ZERO,
            ..PlayOptions::default()
        }
    }

    #[test]
    fn test_plays_bounded_range() {
        let mut seq = stack(10);
        let mut seen = Vec::new();
        Player::new(PlayOptions::range(2, Some(5), Duration::ZERO))
            .on_new_frame(|e| {
                seen.push(e.frame.index());
                true
            })
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(seen, vec![2, 3, 4, 5]);
        // frame 6 was not consumed
        assert_eq!(seq.position(), 6);
    }

    #[test]
    fn test_plays_bounded_range_from_video_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut video = open(&SourceDescriptor::File(clip(dir.path(), 10))).unwrap();
        let mut seen = Vec::new();
        let summary = Player::new(PlayOptions::range(2, Some(5), Duration::ZERO))
            .on_new_frame(|e| {
                seen.push(e.frame.index());
                true
            })
            .play_video(&mut video)
            .unwrap();
        assert_eq!(seen, vec![2, 3, 4, 5]);
        assert_eq!(summary.stop_reason, StopReason::EndFrame);
        assert_eq!(summary.last_frame_index, Some(5));
    }

    #[test]
    fn test_exhaustion_summary() {
        let mut seq = stack(3);
        let summary = seq.play(no_delay()).unwrap();
        assert_eq!(
            summary,
            PlaybackSummary {
                frames_played: 3,
                last_frame_index: Some(2),
                stop_reason: StopReason::Exhausted,
            }
        );
        assert_eq!(seq.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_cueing_skips_callback_and_display() {
        let mut display = NullDisplay::new();
        let mut seq = stack(6);
        let mut calls = 0;
        {
            let mut player = Player::new(PlayOptions::range(4, None, Duration::ZERO))
                .with_display(&mut display)
                .on_new_frame(|_| {
                    calls += 1;
                    true
                });
            player.play_seekable(&mut seq).unwrap();
        }
        assert_eq!(calls, 2);
        assert_eq!(display.shown(), 2);
        assert!(!display.is_open("Video"));
    }

    #[test]
    fn test_callback_can_stop() {
        let mut seq = stack(10);
        let summary = Player::new(no_delay())
            .on_new_frame(|e| e.frame.index() < 3)
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(summary.stop_reason, StopReason::Callback);
        assert_eq!(summary.last_frame_index, Some(3));
        assert_eq!(seq.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_quit_command() {
        let mut seq = stack(10);
        let controller = ScriptedController::new([PlaybackCommand::Continue, PlaybackCommand::Quit]);
        let summary = Player::new(no_delay())
            .with_controller(controller)
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(summary.frames_played, 2);
        assert_eq!(summary.stop_reason, StopReason::Quit);
    }

    #[test]
    fn test_decode_error_pauses_and_resumes_after_bad_frame() {
        let frames = (0..4).map(|i| Frame::zeros(2, 2, 3, i)).collect();
        let mut seq = VideoSequence::new(Corrupted {
            inner: FrameStackSource::new(frames).unwrap(),
            corrupt: vec![1],
        });
        let summaries = Arc::new(AtomicUsize::new(0));
        let mut seen = Vec::new();

        let result = Player::new(no_delay())
            .with_logger(SummaryCounter(summaries.clone()))
            .on_new_frame(|e| {
                seen.push(e.frame.index());
                true
            })
            .play_seekable(&mut seq);
        assert!(matches!(result, Err(VideoError::DecodeError { index: 1, .. })));
        assert_eq!(seq.state(), PlaybackState::Paused);
        assert_eq!(seq.position(), 2);
        assert_eq!(summaries.load(Ordering::Relaxed), 1);

        let summary = Player::new(no_delay())
            .on_new_frame(|e| {
                seen.push(e.frame.index());
                true
            })
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(seen, vec![0, 2, 3]);
        assert_eq!(summary.frames_played, 2);
        assert_eq!(summary.stop_reason, StopReason::Exhausted);
    }

    #[test]
    fn test_abort_command_is_an_error() {
        let mut seq = stack(10);
        let controller = ScriptedController::new([PlaybackCommand::Abort]);
        let result = Player::new(no_delay())
            .with_controller(controller)
            .play_seekable(&mut seq);
        assert!(matches!(result, Err(VideoError::PlaybackAborted)));
    }

    #[test]
    fn test_key_reaches_next_callback() {
        let mut seq = stack(3);
        let mut keys = Vec::new();
        Player::new(no_delay())
            .with_controller(ScriptedController::new([PlaybackCommand::Key('x')]))
            .on_new_frame(|e| {
                keys.push(e.key);
                true
            })
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(keys, vec![None, Some('x'), None]);
    }

    #[test]
    fn test_pause_then_step_states() {
        use std::sync::Mutex;

        struct Recording {
            inner: ScriptedController,
            states: Arc<Mutex<Vec<PlaybackState>>>,
        }
        impl PlaybackController for Recording {
            fn wait(&mut self, state: PlaybackState, delay: Duration) -> PlaybackCommand {
                self.states.lock().unwrap().push(state);
                self.inner.wait(state, delay)
            }
        }

        let states = Arc::new(Mutex::new(Vec::new()));
        let mut seq = stack(3);
        Player::new(no_delay())
            .with_controller(Recording {
                inner: ScriptedController::new([
                    PlaybackCommand::Pause,
                    PlaybackCommand::Step,
                    PlaybackCommand::Continue,
                ]),
                states: states.clone(),
            })
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(
            *states.lock().unwrap(),
            vec![
                PlaybackState::Playing,
                PlaybackState::Paused,
                PlaybackState::Paused,
                PlaybackState::Playing,
            ]
        );
    }

    #[test]
    fn test_start_paused_waits_in_paused_state() {
        let mut seq = stack(1);
        let states = Arc::new(std::sync::Mutex::new(None));
        let recorded = states.clone();
        struct FirstState(Arc<std::sync::Mutex<Option<PlaybackState>>>);
        impl PlaybackController for FirstState {
            fn wait(&mut self, state: PlaybackState, _delay: Duration) -> PlaybackCommand {
                self.0.lock().unwrap().get_or_insert(state);
                PlaybackCommand::Continue
            }
        }
        Player::new(PlayOptions {
            start_paused: true,
            ..no_delay()
        })
        .with_controller(FirstState(recorded))
        .play_seekable(&mut seq)
        .unwrap();
        assert_eq!(*states.lock().unwrap(), Some(PlaybackState::Paused));
    }

    #[test]
    fn test_cancel_flag_stops_before_next_frame() {
        let mut seq = stack(10);
        let flag = Arc::new(AtomicBool::new(false));
        let setter = flag.clone();
        let summary = Player::new(no_delay())
            .with_cancel_flag(flag)
            .on_new_frame(move |e| {
                if e.frame.index() == 1 {
                    setter.store(true, Ordering::Relaxed);
                }
                true
            })
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(summary.stop_reason, StopReason::Cancelled);
        assert_eq!(summary.frames_played, 2);
    }

    #[test]
    fn test_annotation_and_buffer_in_event() {
        let mut seq = stack(4).with_buffer(2).unwrap();
        let mut lens = Vec::new();
        let mut labelled = true;
        Player::new(no_delay())
            .on_new_frame(|e| {
                lens.push(e.buffer.map_or(0, FrameBuffer::len));
                labelled &= e.annotations.len() == 1;
                true
            })
            .play_seekable(&mut seq)
            .unwrap();
        assert_eq!(lens, vec![1, 2, 2, 2]);
        assert!(labelled);
    }

    #[test]
    fn test_live_play_cues_forward() {
        let mut video = Video::live(FrameStackSource::new(
            (0..5).map(|i| Frame::zeros(2, 2, 3, i)).collect(),
        )
        .unwrap());
        let summary = video
            .play(PlayOptions::range(3, None, Duration::ZERO))
            .unwrap();
        assert_eq!(summary.frames_played, 2);
        assert_eq!(summary.last_frame_index, Some(4));
    }

    #[test]
    fn test_seekable_replay_after_exhaustion() {
        let mut video = Video::seekable(FrameStackSource::new(
            (0..3).map(|i| Frame::zeros(2, 2, 3, i)).collect(),
        )
        .unwrap());
        video.play(no_delay()).unwrap();
        let summary = video
            .play(PlayOptions::range(1, None, Duration::ZERO))
            .unwrap();
        assert_eq!(summary.frames_played, 2);
    }
}
