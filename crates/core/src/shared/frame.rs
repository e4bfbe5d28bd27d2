use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::error::VideoError;

/// A single decoded frame: contiguous bytes in row-major order.
///
/// `channels` is 1 (gray), 2 (gray + alpha), 3 (RGB) or 4 (RGBA). The
/// index is the frame's position in its source; it is assigned by the
/// source and carried through resizing and conversion.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp: Option<Duration>,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp: None,
        }
    }

    /// A black frame of the given geometry.
    pub fn zeros(width: u32, height: u32, channels: u8, index: usize) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![0; len], width, height, channels, index)
    }

    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Wraps a decoded image, keeping its channel layout where possible.
    ///
    /// 16-bit and float images are narrowed to 8-bit RGB(A).
    pub fn from_image(img: DynamicImage, index: usize) -> Self {
        let (width, height) = (img.width(), img.height());
        let (data, channels) = match img {
            DynamicImage::ImageLuma8(buf) => (buf.into_raw(), 1),
            DynamicImage::ImageLumaA8(buf) => (buf.into_raw(), 2),
            DynamicImage::ImageRgb8(buf) => (buf.into_raw(), 3),
            DynamicImage::ImageRgba8(buf) => (buf.into_raw(), 4),
            other if other.color().has_alpha() => (other.to_rgba8().into_raw(), 4),
            other => (other.to_rgb8().into_raw(), 3),
        };
        Self::new(data, width, height, channels, index)
    }

    pub fn to_image(&self) -> Result<DynamicImage, VideoError> {
        let (w, h) = (self.width, self.height);
        let data = self.data.clone();
        let img = match self.channels {
            1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
            n => {
                return Err(VideoError::InvalidArgument(format!(
                    "unsupported channel count {n}"
                )))
            }
        };
        img.ok_or_else(|| {
            VideoError::InvalidArgument("frame data does not match its dimensions".into())
        })
    }

    /// Stretches the frame to exactly `width` x `height`.
    pub fn resized(&self, width: u32, height: u32) -> Result<Frame, VideoError> {
        if (width, height) == self.size() {
            return Ok(self.clone());
        }
        let img = self
            .to_image()?
            .resize_exact(width, height, FilterType::Triangle);
        Ok(self.rewrap(img))
    }

    /// Scales the frame to fit inside `width` x `height` preserving aspect
    /// ratio, centred on a black canvas of exactly that size.
    pub fn letterboxed(&self, width: u32, height: u32) -> Result<Frame, VideoError> {
        if width == 0 || height == 0 {
            return Err(VideoError::InvalidArgument(format!(
                "target size {width}x{height} is empty"
            )));
        }
        if (width, height) == self.size() {
            return Ok(self.clone());
        }
        let scale = f64::min(
            width as f64 / self.width as f64,
            height as f64 / self.height as f64,
        );
        let scaled_w = ((self.width as f64 * scale) as u32).clamp(1, width);
        let scaled_h = ((self.height as f64 * scale) as u32).clamp(1, height);
        let scaled = self.resized(scaled_w, scaled_h)?;

        let mut canvas = Frame::zeros(width, height, self.channels, self.index);
        canvas.timestamp = self.timestamp;
        let x = (width - scaled_w) / 2;
        let y = (height - scaled_h) / 2;
        canvas.paste(&scaled, x, y);
        Ok(canvas)
    }

    /// Converts to single-channel luminance.
    pub fn to_gray(&self) -> Result<Frame, VideoError> {
        if self.channels == 1 {
            return Ok(self.clone());
        }
        let img = DynamicImage::ImageLuma8(self.to_image()?.to_luma8());
        Ok(self.rewrap(img))
    }

    /// Converts to 3-channel RGB, dropping alpha and expanding gray.
    pub fn to_rgb(&self) -> Result<Frame, VideoError> {
        if self.channels == 3 {
            return Ok(self.clone());
        }
        let img = DynamicImage::ImageRgb8(self.to_image()?.to_rgb8());
        Ok(self.rewrap(img))
    }

    /// Copies `src` into this frame with its top-left corner at (`x`, `y`).
    ///
    /// Pixels falling outside this frame are clipped. Both frames must have
    /// the same channel count.
    pub fn paste(&mut self, src: &Frame, x: u32, y: u32) {
        debug_assert_eq!(self.channels, src.channels, "channel counts must match");
        if x >= self.width || y >= self.height {
            return;
        }
        let w = src.width.min(self.width - x) as usize;
        let h = src.height.min(self.height - y) as usize;
        let (x, y) = (x as usize, y as usize);
        let src_view = src.as_ndarray();
        let mut dst_view = self.as_ndarray_mut();
        dst_view
            .slice_mut(ndarray::s![y..y + h, x..x + w, ..])
            .assign(&src_view.slice(ndarray::s![0..h, 0..w, ..]));
    }

    fn rewrap(&self, img: DynamicImage) -> Frame {
        let mut frame = Frame::from_image(img, self.index);
        frame.timestamp = self.timestamp;
        frame
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
