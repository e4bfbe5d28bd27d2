use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by frame sources, sequences and playback.
///
/// Every error is returned from the call that triggered it. Nothing in this
/// crate retries on the caller's behalf.
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("source unavailable: {descriptor}: {reason}")]
    SourceUnavailable { descriptor: String, reason: String },
    #[error("failed to decode frame {index}: {reason}")]
    DecodeError { index: usize, reason: String },
    #[error("frame {index} is outside the sequence bounds [{start}, {end}]")]
    OutOfRange {
        index: usize,
        start: usize,
        end: usize,
    },
    #[error("source does not support seeking")]
    NotSeekable,
    #[error("sequence has been closed")]
    Closed,
    #[error("playback aborted by user")]
    PlaybackAborted,
    #[error("failed to encode {path}: {reason}")]
    EncodeError { path: PathBuf, reason: String },
    #[error("display error: {0}")]
    Display(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VideoError {
    pub(crate) fn unavailable(descriptor: impl ToString, reason: impl ToString) -> Self {
        VideoError::SourceUnavailable {
            descriptor: descriptor.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(path: &std::path::Path, reason: impl ToString) -> Self {
        VideoError::EncodeError {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(index: usize, reason: impl ToString) -> Self {
        VideoError::DecodeError {
            index,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_bounds() {
        let err = VideoError::OutOfRange {
            index: 12,
            start: 0,
            end: 9,
        };
        assert_eq!(
            err.to_string(),
            "frame 12 is outside the sequence bounds [0, 9]"
        );
    }

    #[test]
    fn test_unavailable_helper() {
        let err = VideoError::unavailable("/missing.mp4", "No such file or directory");
        assert!(matches!(err, VideoError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("/missing.mp4"));
    }

    #[test]
    fn test_io_error_exposes_source() {
        use std::error::Error as _;
        let err = VideoError::Io {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.source().is_some());
    }
}
