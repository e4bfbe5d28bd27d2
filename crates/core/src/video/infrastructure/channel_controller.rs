use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::video::domain::playback_control::{PlaybackCommand, PlaybackController, PlaybackState};

/// Receives commands from another thread, for example a keyboard reader.
///
/// While playing, the inter-frame delay doubles as the receive timeout. Once
/// every sender is gone the controller behaves like auto play.
pub struct ChannelController {
    commands: Receiver<PlaybackCommand>,
}

impl ChannelController {
    pub fn new(commands: Receiver<PlaybackCommand>) -> Self {
        Self { commands }
    }
}

impl PlaybackController for ChannelController {
    fn wait(&mut self, state: PlaybackState, delay: Duration) -> PlaybackCommand {
        match state {
            PlaybackState::Paused => self.commands.recv().unwrap_or(PlaybackCommand::Continue),
            _ if delay.is_zero() => match self.commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => PlaybackCommand::Continue,
            },
            _ => {
                let started = Instant::now();
                match self.commands.recv_timeout(delay) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => PlaybackCommand::Continue,
                    Err(RecvTimeoutError::Disconnected) => {
                        if let Some(rest) = delay.checked_sub(started.elapsed()) {
                            std::thread::sleep(rest);
                        }
                        PlaybackCommand::Continue
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_times_out_to_continue() {
        let (_tx, rx) = crossbeam_channel::unbounded();
        let mut controller = ChannelController::new(rx);
        let started = Instant::now();
        assert_eq!(
            controller.wait(PlaybackState::Playing, Duration::from_millis(10)),
            PlaybackCommand::Continue
        );
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_playing_returns_pending_command() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(PlaybackCommand::Quit).unwrap();
        let mut controller = ChannelController::new(rx);
        assert_eq!(
            controller.wait(PlaybackState::Playing, Duration::ZERO),
            PlaybackCommand::Quit
        );
    }

    #[test]
    fn test_paused_blocks_until_command() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut controller = ChannelController::new(rx);
        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            tx.send(PlaybackCommand::Step).unwrap();
        });
        assert_eq!(
            controller.wait(PlaybackState::Paused, Duration::ZERO),
            PlaybackCommand::Step
        );
        sender.join().unwrap();
    }

    #[test]
    fn test_disconnected_continues() {
        let (tx, rx) = crossbeam_channel::unbounded::<PlaybackCommand>();
        drop(tx);
        let mut controller = ChannelController::new(rx);
        assert_eq!(
            controller.wait(PlaybackState::Paused, Duration::ZERO),
            PlaybackCommand::Continue
        );
        let started = Instant::now();
        assert_eq!(
            controller.wait(PlaybackState::Playing, Duration::from_millis(10)),
            PlaybackCommand::Continue
        );
        assert!(started.elapsed() >= Duration::from_millis(10));
    }
}
