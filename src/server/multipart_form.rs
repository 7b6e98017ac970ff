//! Buffered multipart forms.
//!
//! The whole form is read before any handler logic runs, so a body above the upload
//! limit fails here and nothing has been written to disk yet.

use crate::ingestion::UploadedFile;
use axum::extract::multipart::{Multipart, MultipartError};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = normalize_name(field.name().unwrap_or_default());
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let data = field.bytes().await?.to_vec();
                    form.files
                        .entry(name)
                        .or_default()
                        .push(UploadedFile { filename, data });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    /// First value of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value of a text field, `None` when missing or empty.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.text(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Every value submitted under `name` (or `name[]`).
    pub fn texts(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Integer values of a repeated field; unparseable entries are skipped.
    pub fn ids(&self, name: &str) -> Vec<i64> {
        self.texts(name)
            .iter()
            .filter_map(|v| v.trim().parse().ok())
            .collect()
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.take_files(name).into_iter().next()
    }

    #[cfg(test)]
    pub fn push_text(&mut self, name: &str, values: &[&str]) {
        self.fields
            .entry(normalize_name(name))
            .or_default()
            .extend(values.iter().map(|v| v.to_string()));
    }
}

/// HTML forms name repeated fields `x[]`; both spellings map to `x`.
fn normalize_name(name: &str) -> String {
    name.strip_suffix("[]").unwrap_or(name).to_string()
}

/// Parses a decimal number accepting either `.` or `,` as separator.
pub fn parse_decimal(value: &str) -> Option<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
