//! Codec engine backed by the image, fast_image_resize, and webp crates
//!
//! Resampling always goes through fast_image_resize with a Lanczos3
//! convolution. Crop-to-fill sets a centered crop box on the source view
//! so the output matches the requested dimensions exactly. JPEG and WebP
//! encodes honor the quality setting; PNG is lossless and ignores it.

use std::io::Cursor;
use std::num::NonZeroU32;

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;

use super::CodecEngine;
use crate::error::RepixError;
use crate::options::OutputFormat;

/// Quality applied before the first `set_quality` call (no compression)
const DEFAULT_QUALITY: u8 = 100;

pub struct ImageRsEngine {
    in_flight: Option<DynamicImage>,
    format: OutputFormat,
    quality: u8,
}

impl Default for ImageRsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageRsEngine {
    pub fn new() -> Self {
        Self {
            in_flight: None,
            format: OutputFormat::Jpeg,
            quality: DEFAULT_QUALITY,
        }
    }

    fn current(&self) -> Result<&DynamicImage, RepixError> {
        self.in_flight
            .as_ref()
            .ok_or_else(|| RepixError::decode_failed("no in-flight image"))
    }

    /// Resample the in-flight image to exactly (dst_w, dst_h).
    ///
    /// With `crop` set, a centered crop box trims the source to the
    /// destination aspect ratio first.
    fn resample(&mut self, dst_w: u32, dst_h: u32, crop: bool) -> Result<(), RepixError> {
        let img = self.current()?;
        let src_w = NonZeroU32::new(img.width())
            .ok_or_else(|| RepixError::resize_failed("source width is 0"))?;
        let src_h = NonZeroU32::new(img.height())
            .ok_or_else(|| RepixError::resize_failed("source height is 0"))?;
        let dst_w = NonZeroU32::new(dst_w)
            .ok_or_else(|| RepixError::resize_failed("target width is 0"))?;
        let dst_h = NonZeroU32::new(dst_h)
            .ok_or_else(|| RepixError::resize_failed("target height is 0"))?;

        let src_image = Image::from_vec_u8(src_w, src_h, img.to_rgba8().into_raw(), PixelType::U8x4)
            .map_err(|e| RepixError::resize_failed(format!("source buffer: {:?}", e)))?;

        let mut src_view = src_image.view();
        if crop {
            src_view.set_crop_box_to_fit_dst_size(dst_w, dst_h, None);
        }

        let mut dst_image = Image::new(dst_w, dst_h, PixelType::U8x4);
        let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
        resizer
            .resize(&src_view, &mut dst_image.view_mut())
            .map_err(|e| RepixError::resize_failed(format!("resize: {:?}", e)))?;

        let rgba = image::RgbaImage::from_raw(dst_w.get(), dst_h.get(), dst_image.into_vec())
            .ok_or_else(|| RepixError::resize_failed("output buffer size mismatch"))?;

        self.in_flight = Some(DynamicImage::ImageRgba8(rgba));
        Ok(())
    }
}

/// Best-fit target dimensions: scale by the smaller bound ratio, round,
/// and floor at one pixel so degenerate ratios stay encodable
fn best_fit_dimensions(src_w: u32, src_h: u32, bound_w: u32, bound_h: u32) -> (u32, u32) {
    let wratio = bound_w as f64 / src_w as f64;
    let hratio = bound_h as f64 / src_h as f64;
    let ratio = wratio.min(hratio);

    let out_w = ((src_w as f64 * ratio).round() as u32).max(1);
    let out_h = ((src_h as f64 * ratio).round() as u32).max(1);
    (out_w, out_h)
}

impl CodecEngine for ImageRsEngine {
    fn decode(&mut self, data: &[u8]) -> Result<(u32, u32), RepixError> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| RepixError::decode_failed(e.to_string()))?
            .decode()
            .map_err(|e| RepixError::decode_failed(e.to_string()))?;

        let dims = (img.width(), img.height());
        self.in_flight = Some(img);
        Ok(dims)
    }

    fn set_format(&mut self, format: OutputFormat) -> Result<(), RepixError> {
        self.format = format;
        Ok(())
    }

    fn set_quality(&mut self, quality: u8) -> Result<(), RepixError> {
        self.quality = quality.clamp(1, 100);
        Ok(())
    }

    fn resize_best_fit(&mut self, width: u32, height: u32) -> Result<(u32, u32), RepixError> {
        let img = self.current()?;
        let (out_w, out_h) = best_fit_dimensions(img.width(), img.height(), width, height);

        if (out_w, out_h) != (img.width(), img.height()) {
            self.resample(out_w, out_h, false)?;
        }
        Ok((out_w, out_h))
    }

    fn resize_exact(&mut self, width: u32, height: u32) -> Result<(), RepixError> {
        let img = self.current()?;
        if (width, height) != (img.width(), img.height()) {
            self.resample(width, height, true)?;
        }
        Ok(())
    }

    fn encode(&mut self) -> Result<Vec<u8>, RepixError> {
        let img = self.current()?;
        let (w, h) = (img.width(), img.height());

        match self.format {
            OutputFormat::Jpeg => {
                use image::codecs::jpeg::JpegEncoder;
                use image::ImageEncoder as _;

                // JPEG has no alpha channel
                let rgb = img.to_rgb8().into_raw();
                let mut output = Cursor::new(Vec::new());
                JpegEncoder::new_with_quality(&mut output, self.quality)
                    .write_image(&rgb, w, h, image::ColorType::Rgb8)
                    .map_err(|e| RepixError::encode_failed("jpeg", e.to_string()))?;
                Ok(output.into_inner())
            }
            OutputFormat::Png => {
                use image::codecs::png::PngEncoder;
                use image::ImageEncoder as _;

                let rgba = img.to_rgba8().into_raw();
                let mut output = Cursor::new(Vec::new());
                PngEncoder::new(&mut output)
                    .write_image(&rgba, w, h, image::ColorType::Rgba8)
                    .map_err(|e| RepixError::encode_failed("png", e.to_string()))?;
                Ok(output.into_inner())
            }
            OutputFormat::WebP => {
                let rgba = img.to_rgba8();
                let encoder = webp::Encoder::from_rgba(rgba.as_raw(), w, h);
                let memory = encoder.encode(self.quality as f32);
                Ok(memory.to_vec())
            }
        }
    }

    fn release(&mut self) {
        self.in_flight = None;
        self.quality = DEFAULT_QUALITY;
    }
}
