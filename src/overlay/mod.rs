mod color;
mod compose;
mod font;
mod layout;
mod params;
mod render;

pub use color::{parse_hex_color, Rgb};
pub use compose::{alpha_composite, blur_region, compose, rounded_rect_path, Placement};
pub use font::{
    font_sources, load_font_metrics, measure_text_width_px, resolve_font, FontCatalog,
    FontMetrics, FontSource, ResolvedFont,
};
pub use layout::{
    anchor_position, clamp_to_image, max_text_width, wrap_text, BoxRect, LayoutLine, TextLayout,
    EDGE_MARGIN, LINE_SPACING,
};
pub use params::{OverlayParams, Position, TextAlign, DEFAULT_TEXT};
pub use render::{
    encode_jpeg, list_sample_images, place_block, render_rgba, resolve_sample_path, ImageSource,
    Renderer, SampleLookupError,
};

/// Failure of a render request.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The request cannot be rendered as given (no image source).
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
