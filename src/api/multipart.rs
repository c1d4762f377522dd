// multipart/form-data parsing for the face upload routes

use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};

use crate::error::{AppError, AppResult};
use crate::models::{parse_id, EnrollmentRequest, IdentificationRequest, ImageUpload};

pub const FACE_FIELD: &str = "face";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Text fields plus the optional `face` file of one form submission.
#[derive(Debug, Default)]
pub struct FaceForm {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

fn bad_form(e: MultipartError) -> AppError {
    AppError::Validation(format!("Malformed form data: {}", e.body_text()))
}

impl FaceForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = FaceForm::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == FACE_FIELD {
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let data = field.bytes().await.map_err(bad_form)?;
                form.image = Some(ImageUpload { data, content_type });
            } else if !name.is_empty() {
                let text = field.text().await.map_err(bad_form)?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    fn text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    fn id(&mut self, name: &str) -> AppResult<Option<i64>> {
        match self.fields.remove(name) {
            Some(raw) => parse_id(&raw)
                .map_err(|_| AppError::Validation(format!("{} must be an integer", name))),
            None => Ok(None),
        }
    }

    pub fn into_enrollment(mut self) -> AppResult<EnrollmentRequest> {
        Ok(EnrollmentRequest {
            org_id: self.id("orgId")?,
            email: self.text("email"),
            first_name: self.text("firstName"),
            last_name: self.text("lastName"),
            image: self.image.take(),
        })
    }

    pub fn into_identification(mut self) -> AppResult<IdentificationRequest> {
        Ok(IdentificationRequest {
            org_id: self.id("orgId")?,
            image: self.image.take(),
        })
    }
}
