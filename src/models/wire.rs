// src/models/wire.rs

//! Backend wire shapes.
//!
//! Every field is optional: list endpoints return fewer fields than detail
//! endpoints, and the mappers must stay total on whatever subset arrives.
//! Absence is preserved (`None`) so the cache merge can tell "not returned"
//! apart from "returned empty".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Accept an id encoded as a JSON number or string.
pub fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept a timestamp as an RFC 3339 string or epoch milliseconds.
/// Anything else (including Jackson's array form) becomes `None`.
pub fn de_opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => parse_datetime(&s),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Spring serializes LocalDateTime without an offset; treat it as UTC.
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Paged response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelopeDto<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,

    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default)]
    pub size: Option<u32>,

    #[serde(default)]
    pub total_elements: Option<u64>,

    #[serde(default)]
    pub total_pages: Option<u32>,

    #[serde(default)]
    pub first: Option<bool>,

    #[serde(default)]
    pub last: Option<bool>,
}

/// A complaint as returned by list and detail endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintDto {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub priority: Option<String>,

    #[serde(default)]
    pub categories: Option<Vec<CategoryDto>>,

    #[serde(default)]
    pub prediction: Option<PredictionDto>,

    #[serde(default)]
    pub location: Option<LocationDto>,

    #[serde(default)]
    pub assignments: Option<AssignmentsDto>,

    #[serde(default)]
    pub messages: Option<Vec<MessageDto>>,

    #[serde(default)]
    pub attachments: Option<Vec<AttachmentDto>>,

    #[serde(default)]
    pub timeline: Option<Vec<EventDto>>,

    #[serde(default)]
    pub audit_log: Option<Vec<EventDto>>,

    #[serde(default)]
    pub preferred_visit_slot: Option<String>,

    #[serde(default)]
    pub anonymous: Option<bool>,

    #[serde(default)]
    pub needs_review: Option<bool>,

    #[serde(default)]
    pub review_reason: Option<String>,

    #[serde(default)]
    pub sla: Option<SlaDto>,

    #[serde(default)]
    pub feedback_rating: Option<i32>,

    #[serde(default)]
    pub feedback_comment: Option<String>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub resolved_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Category assignment: an object with a primary flag, or a bare label.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryDto {
    Tag(CategoryTagDto),
    Plain(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTagDto {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default, alias = "isPrimary")]
    pub primary: Option<bool>,

    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDto {
    #[serde(default)]
    pub labels: Option<Vec<LabelDto>>,

    #[serde(default)]
    pub overall_confidence: Option<f64>,

    #[serde(default)]
    pub severity_score: Option<f64>,

    #[serde(default)]
    pub failure_reason: Option<String>,

    #[serde(default)]
    pub prediction_failed: Option<bool>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub predicted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelDto {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationDto {
    #[serde(default)]
    pub hostel: Option<String>,

    #[serde(default)]
    pub building: Option<String>,

    #[serde(default)]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentsDto {
    #[serde(default)]
    pub owner: Option<UserDto>,

    #[serde(default)]
    pub collaborators: Option<Vec<UserDto>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub sender: Option<SenderDto>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub internal: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SenderDto {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub file_name: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub uploader_name: Option<String>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub url: Option<String>,
}

/// Timeline and audit-log entries share one wire shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,

    #[serde(default, alias = "type")]
    pub event_type: Option<String>,

    #[serde(default)]
    pub actor: Option<ActorDto>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub old_value: Option<String>,

    #[serde(default)]
    pub new_value: Option<String>,

    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorDto {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaDto {
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub acknowledge_due_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub resolve_due_at: Option<DateTime<Utc>>,
}

/// A manual-review queue row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueItemDto {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub complaint_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub priority: Option<String>,

    #[serde(default)]
    pub needs_review: Option<bool>,

    #[serde(default)]
    pub review_reason: Option<String>,

    #[serde(default)]
    pub location: Option<LocationDto>,

    #[serde(default)]
    pub labels: Option<Vec<ReviewLabelDto>>,

    #[serde(default)]
    pub overall_confidence: Option<f64>,

    #[serde(default)]
    pub severity_score: Option<f64>,

    #[serde(default)]
    pub highlighted_keywords: Option<Vec<String>>,

    #[serde(default)]
    pub suggested_routing: Option<SuggestedRoutingDto>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewLabelDto {
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestedRoutingDto {
    #[serde(default)]
    pub owner: Option<UserDto>,

    #[serde(default)]
    pub collaborators: Option<Vec<UserDto>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDto {
    #[serde(default)]
    pub open: Option<u64>,

    #[serde(default)]
    pub unassigned: Option<u64>,

    #[serde(default)]
    pub sla_breaches: Option<u64>,

    #[serde(default)]
    pub avg_resolution_hours: Option<f64>,

    #[serde(default)]
    pub manual_review_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPointDto {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub created_count: Option<u64>,

    #[serde(default)]
    pub resolved_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryCountDto {
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub count: Option<u64>,
}

/// Login and signup both answer with a session envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseDto {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub user: Option<UserDto>,
}
