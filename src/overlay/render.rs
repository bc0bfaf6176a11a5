use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::compose::{compose, Placement};
use super::font::{list_files_with_extensions, resolve_font, ResolvedFont};
use super::layout::{anchor_position, clamp_to_image, max_text_width, wrap_text, BoxRect, TextLayout};
use super::params::OverlayParams;
use super::RenderError;
use crate::settings::Settings;

pub const SAMPLE_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Where the source image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Upload(Vec<u8>),
    Sample(String),
}

#[derive(Debug, Clone)]
pub struct Renderer {
    settings: Arc<Settings>,
}

impl Renderer {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Runs the whole pipeline and returns JPEG bytes.
    pub fn render(
        &self,
        source: Option<ImageSource>,
        params: &OverlayParams,
    ) -> Result<Vec<u8>, RenderError> {
        let source = source.ok_or_else(|| RenderError::Validation("no image selected".to_string()))?;
        let mut image = self.load_image(&source)?;
        let font = resolve_font(params.font_name.as_deref(), &self.settings);
        let composed = render_rgba(&mut image, params, &font)?;
        let bytes = encode_jpeg(composed, self.settings.jpeg_quality)?;
        info!(
            "rendered {}x{} image ({} bytes, {})",
            image.width(),
            image.height(),
            bytes.len(),
            font.source
        );
        Ok(bytes)
    }

    fn load_image(&self, source: &ImageSource) -> Result<RgbaImage> {
        match source {
            ImageSource::Upload(bytes) => {
                let decoded = image::load_from_memory(bytes)
                    .with_context(|| "failed to decode uploaded image")?;
                Ok(decoded.to_rgba8())
            }
            ImageSource::Sample(name) => {
                let path = resolve_sample_path(&self.settings.sample_dir, name)?;
                debug!("loading sample image {}", path.display());
                let decoded = image::open(&path)
                    .with_context(|| format!("failed to open sample image: {}", path.display()))?;
                Ok(decoded.to_rgba8())
            }
        }
    }
}

/// Lays out the text and composites it onto `image`.
pub fn render_rgba(
    image: &mut RgbaImage,
    params: &OverlayParams,
    font: &ResolvedFont,
) -> Result<RgbaImage> {
    let (width, height) = image.dimensions();
    let font_size = params.font_size as f32;
    let measure = |text: &str| font.measure(text, font_size);

    let max_width = max_text_width(width, params.box_width_percent, params.bg_padding);
    let lines = wrap_text(&params.text, max_width, measure);
    let layout = TextLayout::measure(lines, params.font_size, measure);
    let placement = place_block(&layout, (width, height), params);
    debug!(
        "laid out {} line(s) as {}x{} at ({}, {})",
        layout.lines.len(),
        layout.width,
        layout.height,
        placement.x,
        placement.y
    );
    compose(image, &layout, placement, params, font)
}

pub fn place_block(layout: &TextLayout, image: (u32, u32), params: &OverlayParams) -> Placement {
    let block = (layout.width, layout.height);
    let anchored = anchor_position(
        params.position,
        image,
        block,
        (params.x_offset, params.y_offset),
    );
    let (x, y) = clamp_to_image(anchored, block, image, params.bg_padding);
    Placement {
        x,
        y,
        rect: BoxRect::around((x, y), layout, params.bg_padding),
    }
}

/// Drops alpha and encodes as JPEG.
pub fn encode_jpeg(image: RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    rgb.write_with_encoder(encoder)
        .with_context(|| "failed to encode JPEG")?;
    Ok(bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum SampleLookupError {
    #[error("sample image name is empty")]
    Empty,
    #[error("sample image not found: {0}")]
    NotFound(String),
    #[error("sample image path is not allowed: {0}")]
    Forbidden(String),
}

/// Joins `name` onto the sample directory and refuses paths that leave it.
pub fn resolve_sample_path(sample_dir: &Path, name: &str) -> Result<PathBuf, SampleLookupError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SampleLookupError::Empty);
    }
    let not_found = |_| SampleLookupError::NotFound(name.to_string());
    let canonical_dir = std::fs::canonicalize(sample_dir).map_err(not_found)?;
    let canonical_path = std::fs::canonicalize(sample_dir.join(name)).map_err(not_found)?;
    if !canonical_path.starts_with(&canonical_dir) {
        return Err(SampleLookupError::Forbidden(name.to_string()));
    }
    if !canonical_path.is_file() {
        return Err(SampleLookupError::NotFound(name.to_string()));
    }
    Ok(canonical_path)
}

/// Sample image file names, sorted.
pub fn list_sample_images(sample_dir: &Path) -> Result<Vec<String>> {
    let files = list_files_with_extensions(sample_dir, SAMPLE_IMAGE_EXTENSIONS)?;
    Ok(files
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .collect())
}
