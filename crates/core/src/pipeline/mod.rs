pub mod export_frames_use_case;
pub mod playback_logger;
pub mod player;
pub mod save_video_use_case;
