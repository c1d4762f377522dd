use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Accepts ids sent as JSON numbers or numeric strings; blank strings count as absent.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) => parse_id(&text).map_err(D::Error::custom),
    }
}

/// Parses an id from form or JSON text.
pub fn parse_id(text: &str) -> Result<Option<i64>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| format!("invalid number: {}", trimmed))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrgRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgLoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub org_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub org_id: Option<i64>,
    /// Seconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_id")]
    pub start_date: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgScopedRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub org_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub event_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub member_id: Option<i64>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendanceRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub event_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub org_id: Option<i64>,
}

/// Raw image bytes received in the `face` form field.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct EnrollmentRequest {
    pub org_id: Option<i64>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Default)]
pub struct IdentificationRequest {
    pub org_id: Option<i64>,
    pub image: Option<ImageUpload>,
}
