use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use ttf_parser::name_id;
use ttf_parser::Face;
use usvg::fontdb;

use crate::settings::Settings;

pub const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent_px(&self, font_size: f32) -> f32 {
        let units = self.units_per_em.max(1) as f32;
        (self.ascender.max(0) as f32) * (font_size / units)
    }
}

impl fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontMetrics")
            .field("family", &self.family)
            .field("units_per_em", &self.units_per_em)
            .field("face_index", &self.face_index)
            .finish()
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(data)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Font files found in the font directory, sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct FontCatalog {
    entries: Vec<PathBuf>,
}

impl FontCatalog {
    pub fn scan(dir: &Path) -> Result<Self> {
        let entries = list_files_with_extensions(dir, FONT_EXTENSIONS)?;
        Ok(Self { entries })
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect()
    }

    /// Matches on file name or file stem, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Path> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|path| {
                let file_name = path.file_name().map(|v| v.to_string_lossy());
                let stem = path.file_stem().map(|v| v.to_string_lossy());
                file_name.is_some_and(|v| v.eq_ignore_ascii_case(name))
                    || stem.is_some_and(|v| v.eq_ignore_ascii_case(name))
            })
            .map(PathBuf::as_path)
    }
}

pub(crate) fn list_files_with_extensions(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| "failed to read directory entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    Catalog(String),
    File(PathBuf),
    Family(String),
    Builtin,
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::Catalog(name) => write!(f, "catalog font '{}'", name),
            FontSource::File(path) => write!(f, "font file {}", path.display()),
            FontSource::Family(name) => write!(f, "system family '{}'", name),
            FontSource::Builtin => f.write_str("built-in metrics"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedFont {
    pub metrics: Option<FontMetrics>,
    pub family: String,
    pub source: FontSource,
}

impl ResolvedFont {
    pub fn builtin(family: &str) -> Self {
        Self {
            metrics: None,
            family: family.to_string(),
            source: FontSource::Builtin,
        }
    }

    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        measure_text_width_px(text, font_size, self.metrics.as_ref())
    }

    pub fn ascent_px(&self, font_size: f32) -> f32 {
        self.metrics
            .as_ref()
            .map(|metrics| metrics.ascent_px(font_size))
            .unwrap_or(font_size * 0.8)
    }

    /// Font database handed to the SVG text renderer.
    pub fn database(&self) -> fontdb::Database {
        let mut db = fontdb::Database::new();
        match &self.metrics {
            Some(metrics) => db.load_font_data(metrics.data().to_vec()),
            None => db.load_system_fonts(),
        }
        db
    }
}

/// Ordered list of sources tried for a request.
pub fn font_sources(font_name: Option<&str>, settings: &Settings) -> Vec<FontSource> {
    let mut sources = Vec::new();
    if let Some(name) = font_name.map(str::trim).filter(|name| !name.is_empty()) {
        sources.push(FontSource::Catalog(name.to_string()));
    }
    for path in &settings.fallback_font_paths {
        sources.push(FontSource::File(path.clone()));
    }
    sources.push(FontSource::Family(settings.fallback_font_family.clone()));
    sources.push(FontSource::Builtin);
    sources
}

/// Walks the fallback chain. Never fails: the last source is the built-in metrics.
pub fn resolve_font(font_name: Option<&str>, settings: &Settings) -> ResolvedFont {
    for source in font_sources(font_name, settings) {
        let attempt = match &source {
            FontSource::Catalog(name) => FontCatalog::scan(&settings.font_dir).and_then(|catalog| {
                let path = catalog.find(name).ok_or_else(|| {
                    anyhow!("font not found in {}", settings.font_dir.display())
                })?;
                load_font_metrics(path)
            }),
            FontSource::File(path) => load_font_metrics(path),
            FontSource::Family(family) => load_font_metrics_from_family(family),
            FontSource::Builtin => break,
        };
        match attempt {
            Ok(metrics) => {
                debug!("using {}", source);
                let family = metrics
                    .family()
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| settings.fallback_font_family.clone());
                return ResolvedFont {
                    metrics: Some(metrics),
                    family,
                    source,
                };
            }
            Err(err) => warn!("font fallback: {} unavailable: {:#}", source, err),
        }
    }
    ResolvedFont::builtin(&settings.fallback_font_family)
}

/// Width of a single wrapped line in pixels. Without metrics the width is
/// estimated from character classes.
pub fn measure_text_width_px(text: &str, font_size: f32, font: Option<&FontMetrics>) -> f32 {
    match font.and_then(|font| font.line_advance_px(text, font_size)) {
        Some(width) => width,
        None => text.chars().map(estimated_em_width).sum::<f32>() * font_size,
    }
}

impl FontMetrics {
    fn line_advance_px(&self, text: &str, font_size: f32) -> Option<f32> {
        let face = Face::parse(&self.data, self.face_index).ok()?;
        let units: u64 = text
            .chars()
            .map(|ch| {
                let advance = match ch {
                    ' ' => None,
                    _ => face
                        .glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph)),
                };
                advance.unwrap_or(self.space_advance) as u64
            })
            .sum();
        Some(units as f32 * font_size / self.units_per_em.max(1) as f32)
    }
}

// em fractions for the builtin font; CJK ideographs and kana are full width
fn estimated_em_width(ch: char) -> f32 {
    match ch {
        c if c.is_whitespace() => 0.25,
        c if c.is_ascii_alphanumeric() => 0.55,
        c if c.is_ascii() => 0.35,
        '\u{3040}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{4E00}'..='\u{9FFF}' => 1.0,
        _ => 0.9,
    }
}

/// First parseable face of a font file or collection.
fn load_font_metrics_from_data(data: Vec<u8>) -> Result<FontMetrics> {
    let data = Arc::new(data);
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    (0..count)
        .find_map(|index| metrics_for_face(&data, index).ok())
        .ok_or_else(|| anyhow!("failed to parse font data"))
}

fn metrics_for_face(data: &Arc<Vec<u8>>, index: u32) -> Result<FontMetrics> {
    let face = Face::parse(data, index).map_err(|err| anyhow!("{}", err))?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    Ok(FontMetrics {
        data: Arc::clone(data),
        units_per_em,
        space_advance,
        ascender: face.ascender(),
        family: family_name(&face),
        face_index: index,
    })
}

fn load_font_metrics_from_family(family: &str) -> Result<FontMetrics> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    metrics_for_face(&Arc::new(data), face_index)
}

/// Typographic family when present, else the plain family name.
fn family_name(face: &Face<'_>) -> Option<String> {
    let named = |id: u16| {
        face.names()
            .into_iter()
            .filter(|name| name.name_id == id)
            .find_map(|name| name.to_string())
    };
    named(name_id::TYPOGRAPHIC_FAMILY).or_else(|| named(name_id::FAMILY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn catalog_lists_only_font_files_sorted() {
        let dir = tempdir().expect("tempdir");
        for name in ["b.TTF", "a.otf", "notes.txt", "c.ttc"] {
            std::fs::write(dir.path().join(name), b"x").expect("write");
        }
        std::fs::create_dir(dir.path().join("nested.ttf")).expect("mkdir");

        let catalog = FontCatalog::scan(dir.path()).expect("scan");
        assert_eq!(catalog.names(), vec!["a.otf", "b.TTF", "c.ttc"]);
        assert!(catalog.find("B.ttf").is_some());
        assert!(catalog.find("a").is_some());
        assert!(catalog.find("notes").is_none());
        assert!(catalog.find("  ").is_none());
    }

    #[test]
    fn catalog_of_missing_directory_is_empty() {
        let dir = tempdir().expect("tempdir");
        let catalog = FontCatalog::scan(&dir.path().join("missing")).expect("scan");
        assert!(catalog.names().is_empty());
    }

    #[test]
    fn sources_are_ordered_and_end_with_builtin() {
        let settings = Settings {
            fallback_font_paths: vec![PathBuf::from("/a.ttf"), PathBuf::from("/b.ttf")],
            ..Settings::default()
        };
        let sources = font_sources(Some("Roboto"), &settings);
        assert_eq!(
            sources,
            vec![
                FontSource::Catalog("Roboto".to_string()),
                FontSource::File(PathBuf::from("/a.ttf")),
                FontSource::File(PathBuf::from("/b.ttf")),
                FontSource::Family("sans-serif".to_string()),
                FontSource::Builtin,
            ]
        );
        assert_eq!(font_sources(Some(" "), &settings).len(), 4);
    }

    #[test]
    fn broken_font_files_fall_through_without_error() {
        let dir = tempdir().expect("tempdir");
        let bogus = dir.path().join("Broken.ttf");
        std::fs::write(&bogus, b"not a font").expect("write");
        let settings = Settings {
            font_dir: dir.path().to_path_buf(),
            fallback_font_paths: vec![bogus, dir.path().join("missing.ttf")],
            fallback_font_family: "no-such-family-for-tests".to_string(),
            ..Settings::default()
        };
        let resolved = resolve_font(Some("Broken"), &settings);
        assert!(matches!(
            resolved.source,
            FontSource::Family(_) | FontSource::Builtin
        ));
    }

    #[test]
    fn estimated_width_scales_with_font_size() {
        let small = measure_text_width_px("Hello world", 10.0, None);
        let large = measure_text_width_px("Hello world", 20.0, None);
        assert!(small > 0.0);
        assert!((large - small * 2.0).abs() < 0.001);
        assert_eq!(measure_text_width_px("", 40.0, None), 0.0);
    }

    #[test]
    fn estimated_width_by_character_class() {
        assert!((measure_text_width_px("a", 10.0, None) - 5.5).abs() < 0.001);
        assert!((measure_text_width_px(" ", 10.0, None) - 2.5).abs() < 0.001);
        assert!((measure_text_width_px("\u{3042}", 10.0, None) - 10.0).abs() < 0.001);
        assert!((measure_text_width_px("\u{00E9}", 10.0, None) - 9.0).abs() < 0.001);
    }
}
