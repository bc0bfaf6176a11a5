use anyhow::{anyhow, Result};
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::overlay::{ImageSource, OverlayParams, Position, RenderError, TextAlign, DEFAULT_TEXT};

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format!("{:#}", err))
    }
}

impl From<RenderError> for ServerError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Validation(message) => ServerError::bad_request(message),
            RenderError::Failed(err) => err.into(),
        }
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Fields of a `/process` submission.
#[derive(Debug, Default)]
pub(crate) struct ProcessForm {
    pub(crate) fields: HashMap<String, String>,
    pub(crate) image: Option<Vec<u8>>,
}

impl ProcessForm {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = ProcessForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let has_file_name = field
                    .file_name()
                    .map(|value| !value.trim().is_empty())
                    .unwrap_or(false);
                let bytes = field.bytes().await?;
                if has_file_name {
                    form.image = Some(bytes.to_vec());
                }
                continue;
            }
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
        Ok(form)
    }

    /// Uploaded file first, then a named sample.
    pub(crate) fn image_source(&self) -> Option<ImageSource> {
        if let Some(bytes) = &self.image {
            return Some(ImageSource::Upload(bytes.clone()));
        }
        self.fields
            .get("sample_image")
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(|name| ImageSource::Sample(name.to_string()))
    }

    pub(crate) fn params(&self) -> Result<OverlayParams> {
        let defaults = OverlayParams::default();
        let text = self
            .fields
            .get("text")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TEXT.to_string());
        let font_name = self
            .fields
            .get("font_name")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(OverlayParams {
            text: text.replace("\r\n", "\n"),
            font_name,
            font_size: self.number("font_size", defaults.font_size)?.max(1),
            text_color: self.string("text_color", &defaults.text_color),
            bg_color: self.string("bg_color", &defaults.bg_color),
            bg_opacity: self
                .number::<i64>("bg_opacity", defaults.bg_opacity as i64)?
                .clamp(0, 255) as u8,
            bg_radius: self.number("bg_radius", defaults.bg_radius)?,
            bg_padding: self.number("bg_padding", defaults.bg_padding)?,
            bg_blur: self.number("bg_blur", defaults.bg_blur)?,
            box_width_percent: self
                .number("box_width_percent", defaults.box_width_percent)?
                .clamp(1, 100),
            position: self
                .fields
                .get("position")
                .map(|value| Position::parse_or_center(value))
                .unwrap_or(defaults.position),
            text_align: self
                .fields
                .get("text_align")
                .map(|value| TextAlign::parse_or_center(value))
                .unwrap_or(defaults.text_align),
            x_offset: self.number("x_offset", defaults.x_offset)?,
            y_offset: self.number("y_offset", defaults.y_offset)?,
        })
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    /// Blank values fall back to the default; anything else must parse.
    fn number<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.fields.get(name).map(|value| value.trim()) {
            None | Some("") => Ok(default),
            Some(value) => value
                .parse::<T>()
                .map_err(|err| anyhow!("invalid {} '{}': {}", name, value, err)),
        }
    }
}
