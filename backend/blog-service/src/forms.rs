//! Form parsing and validation.
//!
//! The post form arrives as `multipart/form-data` (it carries an optional
//! image); the comment form is urlencoded. Validation failures are collected
//! per field and rendered back into the form context.

use std::collections::BTreeMap;

use actix_multipart::Multipart;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, Result};
use crate::models::{Group, PostView};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Upper bound for non-file multipart fields
const MAX_TEXT_FIELD_BYTES: usize = 256 * 1024;

/// Per-field error lists, keyed by field name
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::default();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

/// A file part of a multipart submission
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
    /// Bytes streamed for the part, including any dropped past the limit
    pub size: usize,
    /// Set when the part exceeded the upload limit and was cut short
    pub truncated: bool,
}

/// Raw post form submission
#[derive(Debug, Default, Clone, Validate)]
pub struct PostFormData {
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
    /// Group id as submitted; empty means "no group"
    pub group: Option<String>,
    pub image: Option<UploadedFile>,
    /// `image-clear` checkbox of the edit form
    pub clear_image: bool,
}

impl PostFormData {
    /// Read every part of a multipart payload; unknown fields are drained and ignored
    pub async fn from_multipart(mut payload: Multipart, max_upload_bytes: usize) -> Result<Self> {
        let mut form = PostFormData::default();

        while let Some(field) = payload.next().await {
            let mut field =
                field.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);

            let limit = if name == "image" {
                max_upload_bytes
            } else {
                MAX_TEXT_FIELD_BYTES
            };
            let mut data = Vec::new();
            let mut size = 0usize;
            let mut truncated = false;
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
                size += chunk.len();
                if truncated || data.len() + chunk.len() > limit {
                    truncated = true;
                    continue;
                }
                data.extend_from_slice(&chunk);
            }

            match name.as_str() {
                "text" => {
                    if truncated {
                        return Err(AppError::BadRequest("text field too large".into()));
                    }
                    form.text = String::from_utf8_lossy(&data).into_owned();
                }
                "group" => {
                    form.group = Some(String::from_utf8_lossy(&data).into_owned());
                }
                "image" => {
                    // browsers send an empty part when no file was chosen
                    let filename = filename.unwrap_or_default();
                    if !filename.is_empty() || !data.is_empty() || truncated {
                        form.image = Some(UploadedFile {
                            filename,
                            data,
                            size,
                            truncated,
                        });
                    }
                }
                "image-clear" => {
                    let value = String::from_utf8_lossy(&data);
                    form.clear_image = matches!(value.trim(), "on" | "true" | "1");
                }
                other => {
                    tracing::debug!(field = other, "Ignoring unknown form field");
                }
            }
        }

        Ok(form)
    }

    /// Trim text and run the derive validators
    pub fn validate_fields(&mut self) -> FormErrors {
        self.text = self.text.trim().to_string();
        match self.validate() {
            Ok(()) => FormErrors::default(),
            Err(errors) => errors.into(),
        }
    }

    /// Parse the submitted group id; `Ok(None)` for an empty selection
    pub fn group_id(&self) -> std::result::Result<Option<i64>, &'static str> {
        match self.group.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| INVALID_CHOICE),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupChoice {
    pub id: i64,
    pub title: String,
}

impl From<&Group> for GroupChoice {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            title: group.to_string(),
        }
    }
}

/// Post form as rendered into a page context
#[derive(Debug, Clone, Serialize)]
pub struct PostFormContext {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
    pub group_choices: Vec<GroupChoice>,
    pub errors: FormErrors,
}

impl PostFormContext {
    pub fn empty(groups: &[Group]) -> Self {
        Self {
            text: String::new(),
            group: None,
            image: None,
            group_choices: groups.iter().map(GroupChoice::from).collect(),
            errors: FormErrors::default(),
        }
    }

    pub fn for_post(post: &PostView, groups: &[Group]) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
            image: post.image.clone(),
            ..Self::empty(groups)
        }
    }

    /// Re-render a rejected submission
    pub fn bound(
        data: &PostFormData,
        image: Option<String>,
        groups: &[Group],
        errors: FormErrors,
    ) -> Self {
        Self {
            text: data.text.clone(),
            group: data.group.clone().filter(|g| !g.trim().is_empty()),
            image,
            group_choices: groups.iter().map(GroupChoice::from).collect(),
            errors,
        }
    }
}

/// Urlencoded comment submission
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    pub fn validate_fields(&mut self) -> FormErrors {
        self.text = self.text.trim().to_string();
        match self.validate() {
            Ok(()) => FormErrors::default(),
            Err(errors) => errors.into(),
        }
    }
}

/// Empty comment form rendered on the post detail page
#[derive(Debug, Default, Clone, Serialize)]
pub struct CommentFormContext {
    pub text: String,
    pub errors: FormErrors,
}
