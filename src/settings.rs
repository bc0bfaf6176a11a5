use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Clone)]
pub struct Settings {
    pub addr: String,
    pub max_upload_bytes: usize,
    pub sample_dir: PathBuf,
    pub font_dir: PathBuf,
    pub fallback_font_paths: Vec<PathBuf>,
    pub fallback_font_family: String,
    pub jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:5000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            sample_dir: PathBuf::from("sample_images"),
            font_dir: PathBuf::from("fonts"),
            fallback_font_paths: Vec::new(),
            fallback_font_family: "sans-serif".to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    paths: Option<PathSettings>,
    fonts: Option<FontSettings>,
    output: Option<OutputSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PathSettings {
    sample_images: Option<String>,
    fonts: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSettings {
    fallback_paths: Option<Vec<String>>,
    fallback_family: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    jpeg_quality: Option<u8>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let embedded: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded settings")?;
    settings.merge(embedded);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            settings.merge_file(&path)?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.addr = addr;
                }
            }
            if let Some(limit) = server.max_upload_bytes {
                if limit > 0 {
                    self.max_upload_bytes = limit;
                }
            }
        }
        if let Some(paths) = incoming.paths {
            if let Some(dir) = paths.sample_images {
                if !dir.trim().is_empty() {
                    self.sample_dir = PathBuf::from(dir);
                }
            }
            if let Some(dir) = paths.fonts {
                if !dir.trim().is_empty() {
                    self.font_dir = PathBuf::from(dir);
                }
            }
        }
        if let Some(fonts) = incoming.fonts {
            if let Some(list) = fonts.fallback_paths {
                self.fallback_font_paths = list
                    .into_iter()
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from)
                    .collect();
            }
            if let Some(family) = fonts.fallback_family {
                if !family.trim().is_empty() {
                    self.fallback_font_family = family;
                }
            }
        }
        if let Some(output) = incoming.output {
            if let Some(quality) = output.jpeg_quality {
                if (1..=100).contains(&quality) {
                    self.jpeg_quality = quality;
                }
            }
        }
    }

    /// Creates the sample and font directories when missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.sample_dir, &self.font_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".text-overlay-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn embedded_settings_match_defaults() {
        let mut settings = Settings::default();
        let embedded: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("parse");
        settings.merge(embedded);
        assert_eq!(settings.addr, "0.0.0.0:5000");
        assert_eq!(settings.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(settings.jpeg_quality, 95);
        assert_eq!(settings.sample_dir, PathBuf::from("sample_images"));
        assert!(!settings.fallback_font_paths.is_empty());
    }

    #[test]
    fn extra_file_overrides_and_ignores_blank_values() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("extra.toml");
        fs::write(
            &path,
            r#"
[server]
addr = "127.0.0.1:8080"

[paths]
sample_images = ""
fonts = "my-fonts"

[output]
jpeg_quality = 0
"#,
        )
        .expect("write settings");

        let settings = load_settings(Some(&path)).expect("load");
        assert_eq!(settings.addr, "127.0.0.1:8080");
        assert_eq!(settings.font_dir, PathBuf::from("my-fonts"));
        assert_eq!(settings.sample_dir, PathBuf::from("sample_images"));
        assert_eq!(settings.jpeg_quality, DEFAULT_JPEG_QUALITY);
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let err = load_settings(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn ensure_dirs_creates_missing_directories() {
        let dir = tempdir().expect("tempdir");
        let settings = Settings {
            sample_dir: dir.path().join("samples"),
            font_dir: dir.path().join("fonts"),
            ..Settings::default()
        };
        settings.ensure_dirs().expect("ensure dirs");
        assert!(settings.sample_dir.is_dir());
        assert!(settings.font_dir.is_dir());
    }
}
