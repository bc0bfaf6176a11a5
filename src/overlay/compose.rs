use anyhow::{anyhow, Context, Result};
use image::{imageops, Rgba, RgbaImage};
use std::sync::Arc;
use tiny_skia::{FillRule, Mask, Paint, Path, PathBuilder, Pixmap, Rect, Transform};
use tracing::warn;
use usvg::{Options, Tree};

use super::color::{parse_hex_color, Rgb};
use super::font::ResolvedFont;
use super::layout::{BoxRect, LayoutLine, TextLayout};
use super::params::OverlayParams;

pub const OUTLINE_RGB: Rgb = Rgb(0, 0, 0);
pub const OUTLINE_ALPHA: u8 = 200;
/// Stroke offsets run from `-OUTLINE_REACH` to `+OUTLINE_REACH` on both axes.
pub const OUTLINE_REACH: i64 = 2;

// Room around each line so the outline copies are never cut at the SVG viewport.
const LINE_MARGIN: i64 = 4;

/// Where the text block and its background box ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub rect: BoxRect,
}

/// Draws the box and text for `layout` at `placement` and returns the
/// composited image. `image` is modified in place by the blur patch.
pub fn compose(
    image: &mut RgbaImage,
    layout: &TextLayout,
    placement: Placement,
    params: &OverlayParams,
    font: &ResolvedFont,
) -> Result<RgbaImage> {
    let text_color = parse_hex_color(&params.text_color)
        .with_context(|| "failed to parse text_color")?;
    let bg_color = parse_hex_color(&params.bg_color).with_context(|| "failed to parse bg_color")?;

    if params.bg_blur > 0 {
        blur_region(image, placement.rect, params.bg_blur, params.bg_radius)?;
    }

    let (width, height) = image.dimensions();
    let mut overlay = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("invalid overlay size {}x{}", width, height))?;
    draw_box(
        &mut overlay,
        placement.rect,
        params.bg_radius,
        bg_color,
        params.bg_opacity,
    );
    draw_lines(&mut overlay, layout, placement, params, text_color, font);

    let overlay = pixmap_to_rgba(&overlay)?;
    let mut composed = image.clone();
    alpha_composite(&mut composed, &overlay);
    Ok(composed)
}

/// Rounded rectangle path; the radius is capped at half the shorter side.
pub fn rounded_rect_path(left: f32, top: f32, right: f32, bottom: f32, radius: f32) -> Option<Path> {
    let rect = Rect::from_ltrb(left, top, right, bottom)?;
    let radius = radius
        .max(0.0)
        .min(rect.width() / 2.0)
        .min(rect.height() / 2.0);
    if radius <= 0.0 {
        return Some(PathBuilder::from_rect(rect));
    }
    // cubic approximation of a quarter circle
    let k = radius * 0.552_284_8;
    let mut pb = PathBuilder::new();
    pb.move_to(left + radius, top);
    pb.line_to(right - radius, top);
    pb.cubic_to(right - radius + k, top, right, top + radius - k, right, top + radius);
    pb.line_to(right, bottom - radius);
    pb.cubic_to(right, bottom - radius + k, right - radius + k, bottom, right - radius, bottom);
    pb.line_to(left + radius, bottom);
    pb.cubic_to(left + radius - k, bottom, left, bottom - radius + k, left, bottom - radius);
    pb.line_to(left, top + radius);
    pb.cubic_to(left, top + radius - k, left + radius - k, top, left + radius, top);
    pb.close();
    pb.finish()
}

/// Blurs the part of `image` under `rect` and blends it back through a
/// rounded-corner mask.
pub fn blur_region(image: &mut RgbaImage, rect: BoxRect, blur: u32, radius: u32) -> Result<()> {
    let (width, height) = image.dimensions();
    let Some((x, y, w, h)) = rect.clipped(width, height) else {
        return Ok(());
    };
    let region = imageops::crop_imm(&*image, x, y, w, h).to_image();
    // past the region size every pixel already averages the whole patch
    let sigma = blur.min(w.max(h)) as f32;
    let blurred = imageops::fast_blur(&region, sigma);

    let mut mask = Mask::new(w, h).ok_or_else(|| anyhow!("invalid blur mask size {}x{}", w, h))?;
    let path = rounded_rect_path(0.0, 0.0, w as f32, h as f32, radius as f32)
        .ok_or_else(|| anyhow!("failed to build blur mask path"))?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

    let coverage = mask.data();
    for (px, py, blurred_pixel) in blurred.enumerate_pixels() {
        let m = coverage[(py * w + px) as usize] as u32;
        if m == 0 {
            continue;
        }
        let target = image.get_pixel_mut(x + px, y + py);
        for channel in 0..4 {
            let over = blurred_pixel[channel] as u32;
            let under = target[channel] as u32;
            target[channel] = ((over * m + under * (255 - m) + 127) / 255) as u8;
        }
    }
    Ok(())
}

fn draw_box(overlay: &mut Pixmap, rect: BoxRect, radius: u32, color: Rgb, opacity: u8) {
    let Some(path) = rounded_rect_path(
        rect.left as f32,
        rect.top as f32,
        rect.right as f32,
        rect.bottom as f32,
        radius as f32,
    ) else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.0, color.1, color.2, opacity);
    paint.anti_alias = true;
    overlay.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
}

fn draw_lines(
    overlay: &mut Pixmap,
    layout: &TextLayout,
    placement: Placement,
    params: &OverlayParams,
    color: Rgb,
    font: &ResolvedFont,
) {
    let font_size = params.font_size as f32;
    let options = Options {
        fontdb: Arc::new(font.database()),
        ..Options::default()
    };
    let mut cursor_y = placement.y;
    for (idx, line) in layout.lines.iter().enumerate() {
        if !line.is_blank() {
            let line_x = placement.x + params.text_align.offset(layout.width, line.width);
            let svg = line_svg(line, layout.line_height, font_size, color, font);
            match Tree::from_str(&svg, &options) {
                Ok(tree) => {
                    let transform = Transform::from_translate(
                        (line_x - LINE_MARGIN) as f32,
                        (cursor_y - LINE_MARGIN) as f32,
                    );
                    resvg::render(&tree, transform, &mut overlay.as_mut());
                }
                Err(err) => warn!("skipping line {}: {}", idx + 1, err),
            }
        }
        cursor_y += layout.line_height;
    }
}

fn line_svg(
    line: &LayoutLine,
    line_height: i64,
    font_size: f32,
    color: Rgb,
    font: &ResolvedFont,
) -> String {
    let width = line.width + LINE_MARGIN * 2;
    let height = line_height + LINE_MARGIN * 2;
    let baseline = LINE_MARGIN as f32 + font.ascent_px(font_size);
    let escaped = escape_xml(&line.text);
    let family = escape_xml(&font.family);

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width.max(1),
        h = height.max(1)
    ));
    svg.push_str(&format!(
        r#"<g fill="{fill}" opacity="{opacity:.4}">"#,
        fill = OUTLINE_RGB.to_hex(),
        opacity = OUTLINE_ALPHA as f32 / 255.0
    ));
    for dx in -OUTLINE_REACH..=OUTLINE_REACH {
        for dy in -OUTLINE_REACH..=OUTLINE_REACH {
            svg.push_str(&text_element(
                LINE_MARGIN as f32 + dx as f32,
                baseline + dy as f32,
                font_size,
                &family,
                None,
                &escaped,
            ));
        }
    }
    svg.push_str("</g>");
    svg.push_str(&text_element(
        LINE_MARGIN as f32,
        baseline,
        font_size,
        &family,
        Some(&color.to_hex()),
        &escaped,
    ));
    svg.push_str("</svg>");
    svg
}

fn text_element(
    x: f32,
    y: f32,
    font_size: f32,
    family: &str,
    fill: Option<&str>,
    text: &str,
) -> String {
    let fill = fill
        .map(|value| format!(r#" fill="{}""#, value))
        .unwrap_or_default();
    format!(
        r#"<text x="{x}" y="{y}" font-size="{size}" font-family="{family}" xml:space="preserve"{fill}>{text}</text>"#,
        x = x,
        y = y,
        size = font_size,
        family = family,
        fill = fill,
        text = text
    )
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage> {
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        raw.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
        .ok_or_else(|| anyhow!("failed to build image buffer from overlay"))
}

/// Source-over compositing of `overlay` onto `base` (straight alpha).
/// Fully transparent overlay pixels leave `base` untouched.
pub fn alpha_composite(base: &mut RgbaImage, overlay: &RgbaImage) {
    for (dst, src) in base.pixels_mut().zip(overlay.pixels()) {
        *dst = blend_over(*dst, *src);
    }
}

fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_a = src[3] as f32 / 255.0;
    if src_a <= 0.0 {
        return dst;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    let blend = |s: u8, d: u8| -> u8 {
        let value = (s as f32 * src_a + d as f32 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
