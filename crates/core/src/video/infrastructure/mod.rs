pub mod channel_controller;
mod ffmpeg_decoder;
pub mod ffmpeg_live_source;
pub mod ffmpeg_video_source;
pub mod ffmpeg_video_writer;
pub mod frame_stack_source;
pub mod image_dir_display;
pub mod image_file_list_source;
pub mod image_file_writer;
pub mod source_factory;
#[cfg(test)]
pub(crate) mod test_video;
