use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;

pub mod logging;
pub mod overlay;
pub mod server;
pub mod settings;

pub use overlay::{ImageSource, OverlayParams, Position, RenderError, Renderer, TextAlign};
pub use server::run_server;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings_path: Option<String>,
    pub addr: Option<String>,
    pub data: Option<String>,
    pub output: String,
    pub text: Option<String>,
    pub font_name: Option<String>,
    pub font_size: Option<u32>,
    pub position: Option<String>,
}

/// Serves HTTP, or renders `config.data` to `config.output` when set.
pub async fn run(config: Config) -> Result<Option<String>> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    if let Some(addr) = config.addr.as_deref().filter(|addr| !addr.trim().is_empty()) {
        settings.addr = addr.to_string();
    }

    let Some(data) = config.data.as_deref() else {
        run_server(settings).await?;
        return Ok(None);
    };

    let bytes =
        std::fs::read(data).with_context(|| format!("failed to read image: {}", data))?;
    let params = params_from_config(&config)?;
    let renderer = Renderer::new(Arc::new(settings));
    let output = tokio::task::spawn_blocking(move || {
        renderer.render(Some(ImageSource::Upload(bytes)), &params)
    })
    .await
    .map_err(|err| anyhow!("render task failed: {}", err))?
    .map_err(|err| anyhow!("{}", err))?;

    std::fs::write(&config.output, &output)
        .with_context(|| format!("failed to write output: {}", config.output))?;
    Ok(Some(config.output.clone()))
}

fn params_from_config(config: &Config) -> Result<OverlayParams> {
    let mut params = OverlayParams::default();
    if let Some(text) = config.text.as_deref() {
        params.text = text.to_string();
    }
    params.font_name = config.font_name.clone();
    if let Some(size) = config.font_size {
        if size == 0 {
            return Err(anyhow!("font size must be positive"));
        }
        params.font_size = size;
    }
    if let Some(position) = config.position.as_deref() {
        params.position = Position::parse(position)
            .ok_or_else(|| anyhow!("unknown position '{}'", position))?;
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn config_overrides_defaults() {
        let config = Config {
            text: Some("Hello".to_string()),
            font_size: Some(12),
            position: Some("bottom-right".to_string()),
            ..Config::default()
        };
        let params = params_from_config(&config).expect("params");
        assert_eq!(params.text, "Hello");
        assert_eq!(params.font_size, 12);
        assert_eq!(params.position, Position::BottomRight);
    }

    #[test]
    fn config_rejects_bad_values() {
        let config = Config {
            position: Some("middle".to_string()),
            ..Config::default()
        };
        assert!(params_from_config(&config).is_err());
        let config = Config {
            font_size: Some(0),
            ..Config::default()
        };
        assert!(params_from_config(&config).is_err());
    }

    #[tokio::test]
    async fn offline_render_writes_jpeg() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("in.png");
        RgbaImage::from_pixel(64, 48, Rgba([30, 60, 90, 255]))
            .save(&input)
            .expect("save");
        let output = dir.path().join("out.jpg");
        let config = Config {
            data: Some(input.to_string_lossy().to_string()),
            output: output.to_string_lossy().to_string(),
            text: Some("ok".to_string()),
            font_size: Some(12),
            ..Config::default()
        };
        let written = run(config).await.expect("run");
        assert_eq!(written.as_deref(), Some(output.to_string_lossy().as_ref()));
        let decoded = image::open(&output).expect("decode output");
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }
}
