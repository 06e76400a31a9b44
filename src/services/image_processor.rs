// src/services/image_processor.rs
use crate::errors::WardrobeError;
use crate::models::BoundingBox;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat, Rgba, RgbaImage, imageops};
use log::warn;

/// Composite preview geometry: fixed canvas width, one fixed-height slot per
/// item, uniform padding between slots.
pub const COMPOSITE_WIDTH: u32 = 400;
pub const SLOT_HEIGHT: u32 = 200;
pub const SLOT_PADDING: u32 = 8;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), WardrobeError> {
        let img = image::load_from_memory(data)
            .map_err(|e| WardrobeError::ImageProcessing(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();

        if width > 4096 || height > 4096 {
            return Err(WardrobeError::ImageProcessing(
                "Image dimensions exceed 4096x4096".to_string(),
            ));
        }

        Ok((width, height))
    }

    /// Shrink an image so neither side exceeds `max_size`, re-encoding as
    /// JPEG. Used before shipping a photo to the vision backend and before
    /// storing it.
    pub fn downscale(&self, data: &[u8], max_size: u32) -> Result<Vec<u8>, WardrobeError> {
        let img = image::load_from_memory(data)
            .map_err(|e| WardrobeError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();

        if width <= max_size && height <= max_size {
            return Ok(data.to_vec());
        }

        let ratio = (max_size as f32 / width.max(height) as f32).min(1.0);
        let new_width = ((width as f32 * ratio) as u32).max(1);
        let new_height = ((height as f32 * ratio) as u32).max(1);

        let resized = img
            .resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
            .to_rgb8();

        let mut output = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                WardrobeError::ImageProcessing(format!("Failed to encode resized image: {}", e))
            })?;

        Ok(output)
    }

    /// Cut a detected item's thumbnail out of the outfit photo using its
    /// normalized bounding box. Any failure, or the absence of a box, falls
    /// back to the full photo rather than losing the item.
    pub fn crop_region(&self, data: &[u8], bounding_box: Option<&BoundingBox>) -> Vec<u8> {
        let Some(bounding_box) = bounding_box else {
            return data.to_vec();
        };

        match self.try_crop(data, bounding_box) {
            Ok(cropped) => cropped,
            Err(e) => {
                warn!("Crop failed, keeping the full image: {}", e);
                data.to_vec()
            }
        }
    }

    fn try_crop(&self, data: &[u8], bounding_box: &BoundingBox) -> Result<Vec<u8>, WardrobeError> {
        let img = image::load_from_memory(data)
            .map_err(|e| WardrobeError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();
        let left = (bounding_box.left.clamp(0.0, 1.0) * width as f32) as u32;
        let top = (bounding_box.top.clamp(0.0, 1.0) * height as f32) as u32;
        let right = (bounding_box.right.clamp(0.0, 1.0) * width as f32) as u32;
        let bottom = (bounding_box.bottom.clamp(0.0, 1.0) * height as f32) as u32;

        let crop_width = right.saturating_sub(left).max(1);
        let crop_height = bottom.saturating_sub(top).max(1);

        let cropped = img
            .crop_imm(left.min(width - 1), top.min(height - 1), crop_width, crop_height)
            .to_rgb8();

        let mut output = Vec::new();
        cropped
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                WardrobeError::ImageProcessing(format!("Failed to encode cropped image: {}", e))
            })?;

        Ok(output)
    }

    /// Stack item images vertically on a white canvas, each letterboxed into
    /// its slot. Undecodable images are skipped so the composite degrades to
    /// fewer rows; None only when nothing decodes.
    pub fn composite_preview(&self, images: &[Vec<u8>]) -> Option<Vec<u8>> {
        let decoded: Vec<DynamicImage> = images
            .iter()
            .filter_map(|data| match image::load_from_memory(data) {
                Ok(img) => Some(img),
                Err(e) => {
                    warn!("Skipping undecodable item image in composite: {}", e);
                    None
                }
            })
            .collect();

        if decoded.is_empty() {
            return None;
        }

        let rows = decoded.len() as u32;
        let height = rows * SLOT_HEIGHT + (rows - 1) * SLOT_PADDING;
        let mut canvas = RgbaImage::from_pixel(COMPOSITE_WIDTH, height, Rgba([255, 255, 255, 255]));

        for (index, img) in decoded.iter().enumerate() {
            let scaled = img
                .resize(
                    COMPOSITE_WIDTH - 2 * SLOT_PADDING,
                    SLOT_HEIGHT - 2 * SLOT_PADDING,
                    image::imageops::FilterType::Lanczos3,
                )
                .to_rgba8();

            let x = (COMPOSITE_WIDTH - scaled.width()) / 2;
            let slot_top = index as u32 * (SLOT_HEIGHT + SLOT_PADDING);
            let y = slot_top + (SLOT_HEIGHT - scaled.height()) / 2;

            imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
        }

        let mut output = Vec::new();
        canvas
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
            .ok()?;
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut out), ImgFormat::Png)
            .unwrap();
        out
    }

    fn dimensions(data: &[u8]) -> (u32, u32) {
        image::load_from_memory(data).unwrap().dimensions()
    }

    #[test]
    fn composite_width_is_constant_and_height_scales_with_rows() {
        let processor = ImageProcessor::new();

        // Wildly different aspect ratios; the canvas must not care.
        let one = processor
            .composite_preview(&[png_bytes(640, 120)])
            .unwrap();
        assert_eq!(dimensions(&one), (400, 200));

        let three = processor
            .composite_preview(&[png_bytes(640, 120), png_bytes(50, 300), png_bytes(200, 200)])
            .unwrap();
        assert_eq!(dimensions(&three), (400, 3 * 200 + 2 * 8));
    }

    #[test]
    fn undecodable_images_reduce_the_row_count() {
        let processor = ImageProcessor::new();
        let garbage = vec![0u8, 1, 2, 3];

        let composite = processor
            .composite_preview(&[png_bytes(100, 100), garbage, png_bytes(100, 100)])
            .unwrap();
        assert_eq!(dimensions(&composite), (400, 2 * 200 + 8));
    }

    #[test]
    fn composite_of_nothing_decodable_is_none() {
        let processor = ImageProcessor::new();
        assert!(processor.composite_preview(&[vec![0u8, 1, 2]]).is_none());
        assert!(processor.composite_preview(&[]).is_none());
    }

    #[test]
    fn crop_extracts_the_boxed_region() {
        let processor = ImageProcessor::new();
        let photo = png_bytes(100, 50);
        let bounding_box = BoundingBox::new(0.5, 0.0, 1.0, 1.0);

        let cropped = processor.crop_region(&photo, Some(&bounding_box));
        assert_eq!(dimensions(&cropped), (50, 50));
    }

    #[test]
    fn crop_without_box_or_with_bad_data_returns_input() {
        let processor = ImageProcessor::new();
        let photo = png_bytes(10, 10);
        assert_eq!(processor.crop_region(&photo, None), photo);

        let garbage = vec![9u8, 9, 9];
        let bounding_box = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(processor.crop_region(&garbage, Some(&bounding_box)), garbage);
    }

    #[test]
    fn downscale_leaves_small_images_untouched() {
        let processor = ImageProcessor::new();
        let photo = png_bytes(100, 100);
        assert_eq!(processor.downscale(&photo, 2048).unwrap(), photo);
    }

    #[test]
    fn downscale_caps_the_longer_side() {
        let processor = ImageProcessor::new();
        let photo = png_bytes(400, 100);
        let shrunk = processor.downscale(&photo, 200).unwrap();
        let (width, height) = dimensions(&shrunk);
        assert_eq!(width, 200);
        assert!(height <= 100);
    }
}
