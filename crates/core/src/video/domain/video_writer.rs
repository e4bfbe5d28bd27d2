use std::path::Path;

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;

/// Encodes a run of frames into a movie file.
pub trait VideoWriter: Send {
    /// Starts a new file. `metadata` gives the frame size every written
    /// frame must have, and the frame rate.
    fn open(&mut self, path: &Path, metadata: &SourceMetadata) -> Result<(), VideoError>;

    fn write(&mut self, frame: &Frame) -> Result<(), VideoError>;

    /// Flushes the encoder and finalises the file. Idempotent.
    fn close(&mut self) -> Result<(), VideoError>;
}
