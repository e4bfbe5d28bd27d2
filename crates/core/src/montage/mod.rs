pub mod image_montage;
pub mod video_montage;
