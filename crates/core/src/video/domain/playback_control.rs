#[cfg(test)]
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// What the user asked the player to do after the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Resume (or keep) playing.
    Continue,
    /// Advance a single frame and stay paused.
    Step,
    Pause,
    /// Stop playback and return to the caller.
    Quit,
    /// Stop playback with [`VideoError::PlaybackAborted`].
    ///
    /// [`VideoError::PlaybackAborted`]: crate::shared::error::VideoError::PlaybackAborted
    Abort,
    /// Any other key; advances one frame and is handed to the frame callback.
    Key(char),
}

impl PlaybackCommand {
    /// Keyboard mapping: space pauses, `c` continues, `s` steps, `q` quits,
    /// `a` aborts.
    pub fn from_key(key: char) -> Self {
        match key {
            ' ' => PlaybackCommand::Pause,
            'c' => PlaybackCommand::Continue,
            's' => PlaybackCommand::Step,
            'q' => PlaybackCommand::Quit,
            'a' => PlaybackCommand::Abort,
            other => PlaybackCommand::Key(other),
        }
    }
}

/// Source of user commands between frames, and owner of the inter-frame wait.
pub trait PlaybackController: Send {
    /// Called after each frame. While `Playing`, blocks for at most `delay`
    /// and returns `Continue` if nothing was requested. While `Paused`,
    /// blocks until a command arrives.
    fn wait(&mut self, state: PlaybackState, delay: Duration) -> PlaybackCommand;
}

/// Never pauses; sleeps for the delay between frames.
#[derive(Debug, Default)]
pub struct AutoPlayController;

impl PlaybackController for AutoPlayController {
    fn wait(&mut self, state: PlaybackState, delay: Duration) -> PlaybackCommand {
        if state == PlaybackState::Playing && !delay.is_zero() {
            std::thread::sleep(delay);
        }
        PlaybackCommand::Continue
    }
}

/// Replays a fixed list of commands without waiting, then continues.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedController {
    commands: VecDeque<PlaybackCommand>,
    waits: Vec<PlaybackState>,
}

#[cfg(test)]
impl ScriptedController {
    pub(crate) fn new(commands: impl IntoIterator<Item = PlaybackCommand>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            waits: Vec::new(),
        }
    }

    /// The state passed to each `wait` call, in order.
    pub(crate) fn waits(&self) -> &[PlaybackState] {
        &self.waits
    }
}

#[cfg(test)]
impl PlaybackController for ScriptedController {
    fn wait(&mut self, state: PlaybackState, _delay: Duration) -> PlaybackCommand {
        self.waits.push(state);
        self.commands
            .pop_front()
            .unwrap_or(PlaybackCommand::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Instant;

    #[rstest]
    #[case(' ', PlaybackCommand::Pause)]
    #[case('c', PlaybackCommand::Continue)]
    #[case('s', PlaybackCommand::Step)]
    #[case('q', PlaybackCommand::Quit)]
    #[case('a', PlaybackCommand::Abort)]
    #[case('x', PlaybackCommand::Key('x'))]
    fn test_from_key(#[case] key: char, #[case] expected: PlaybackCommand) {
        assert_eq!(PlaybackCommand::from_key(key), expected);
    }

    #[test]
    fn test_auto_play_always_continues() {
        let mut controller = AutoPlayController;
        assert_eq!(
            controller.wait(PlaybackState::Paused, Duration::ZERO),
            PlaybackCommand::Continue
        );
    }

    #[test]
    fn test_auto_play_sleeps_while_playing() {
        let mut controller = AutoPlayController;
        let start = Instant::now();
        controller.wait(PlaybackState::Playing, Duration::from_millis(15));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_scripted_controller_then_continue() {
        let mut controller =
            ScriptedController::new([PlaybackCommand::Pause, PlaybackCommand::Quit]);
        let d = Duration::ZERO;
        assert_eq!(controller.wait(PlaybackState::Playing, d), PlaybackCommand::Pause);
        assert_eq!(controller.wait(PlaybackState::Paused, d), PlaybackCommand::Quit);
        assert_eq!(controller.wait(PlaybackState::Playing, d), PlaybackCommand::Continue);
        assert_eq!(
            controller.waits(),
            &[
                PlaybackState::Playing,
                PlaybackState::Paused,
                PlaybackState::Playing
            ]
        );
    }
}
