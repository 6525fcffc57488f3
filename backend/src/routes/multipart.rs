//! Multipart form helpers shared by upload routes

use crate::error::{ApiError, ApiResult};
use axum::extract::multipart::{Field, Multipart, MultipartError};
use nutriscan_shared::models::FoodImage;
use nutriscan_shared::validation::ValidationError;
use std::collections::HashMap;

/// Multipart form split into the image part and text fields
///
/// Text fields may repeat; values keep their submission order.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<FoodImage>,
    pub fields: HashMap<String, Vec<String>>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart, image_field: &str) -> ApiResult<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == image_field {
                form.image = Some(read_image(field).await?);
            } else if !name.is_empty() {
                let value = field.text().await.map_err(bad_multipart)?;
                form.fields.entry(name).or_default().push(value);
            }
        }
        Ok(form)
    }

    /// The image part, or a validation error naming the field
    pub fn take_image(&mut self, image_field: &str) -> ApiResult<FoodImage> {
        self.image
            .take()
            .ok_or_else(|| ApiError::from(ValidationError::missing(image_field)))
    }

    /// First non-blank value of a field that must be present
    pub fn required_text(&self, name: &str) -> ApiResult<String> {
        self.text(name)
            .ok_or_else(|| ApiError::from(ValidationError::missing(name)))
    }

    /// First non-blank value of a text field
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.iter().map(|v| v.trim()).find(|v| !v.is_empty()))
            .map(str::to_string)
    }

    /// Every value of a field, also splitting comma-separated lists
    pub fn list(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .into_iter()
            .flatten()
            .flat_map(|v| v.split(','))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Optional numeric field; present but unparsable is an error
    pub fn number(&self, name: &str) -> ApiResult<Option<f64>> {
        self.text(name)
            .map(|raw| {
                raw.parse::<f64>().map_err(|_| {
                    ApiError::from(ValidationError::new(name, format!("{} must be a number", name)))
                })
            })
            .transpose()
    }
}

async fn read_image(field: Field<'_>) -> ApiResult<FoodImage> {
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(bad_multipart)?;
    Ok(FoodImage::new(bytes.to_vec(), mime_type))
}

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> UploadForm {
        let mut form = UploadForm::default();
        for (name, value) in fields {
            form.fields
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        form
    }

    #[test]
    fn test_missing_image_names_the_field() {
        let err = form(&[]).take_image("file").unwrap_err();
        match err {
            ApiError::InvalidField(err) => {
                assert_eq!(err.field, "file");
                assert_eq!(err.user_message(), "사진: missing required field: file");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_blank_required_text_is_missing() {
        let form = form(&[("food_name", "  ")]);
        assert!(matches!(
            form.required_text("food_name"),
            Err(ApiError::InvalidField(ref err)) if err.field == "food_name"
        ));
    }

    #[test]
    fn test_unparsable_number_names_the_field() {
        let form = form(&[("sodium_mg", "lots"), ("sugar_g", "12.5")]);
        assert_eq!(form.number("sugar_g").unwrap(), Some(12.5));
        assert_eq!(form.number("fat_g").unwrap(), None);
        assert!(matches!(
            form.number("sodium_mg"),
            Err(ApiError::InvalidField(ref err)) if err.display_label == "나트륨"
        ));
    }

    #[test]
    fn test_list_splits_comma_separated_values() {
        let form = form(&[("diseases", "dm, htn"), ("diseases", "osas")]);
        assert_eq!(form.list("diseases"), ["dm", "htn", "osas"]);
    }
}
