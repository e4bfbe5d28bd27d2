pub mod annotation;
pub mod constants;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod source_metadata;
