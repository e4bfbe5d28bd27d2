pub mod display;
pub mod frame_buffer;
pub mod frame_source;
pub mod image_writer;
pub mod playback_control;
pub mod source_descriptor;
pub mod video;
pub mod video_sequence;
pub mod video_writer;
