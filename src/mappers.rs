// src/mappers.rs

//! Pure transforms from backend wire shapes to domain models.
//!
//! Every function here is total: absent, null, and malformed optional data
//! map to defaults, never to errors. Nothing in this module performs I/O.

use crate::models::ticket::{
    title_case_tokens, title_case_word, Assignment, Attachment, AuditEntry, CategoryTag,
    Confidence, LabelScore, Location, Message, Priority, SenderKind, Sla, Ticket, TicketStatus,
    TimelineEvent, CONFIDENCE_THRESHOLD,
};
use crate::models::user::{Role, UserRef};
use crate::models::wire::{
    AssignmentsDto, AttachmentDto, CategoryCountDto, CategoryDto, ComplaintDto, EventDto,
    LocationDto, MessageDto, PageEnvelopeDto, PredictionDto, ReviewQueueItemDto, SummaryDto,
    TrendPointDto, UserDto,
};
use crate::models::{
    CategorySlice, PageMeta, ReviewItem, SummaryKpis, TrendPoint,
};

/// Normalize a category label for display; the synonym bucket collapses to
/// "Others".
pub fn category_label(raw: &str) -> String {
    let normalized = raw.trim().to_uppercase();
    if matches!(normalized.as_str(), "LIBRARY" | "MESS" | "OTHER" | "OTHERS") {
        return "Others".to_string();
    }
    title_case_tokens(raw)
}

/// Display label back to the wire form: trim, uppercase, spaces to
/// underscores.
pub fn to_wire_category(label: &str) -> String {
    label.trim().to_uppercase().replace(' ', "_")
}

/// Normalize a confidence value to an integer percent.
///
/// Accepts either a 0..=1 fraction or a 0..=100 percent; clamps and rounds.
/// Absent or non-finite input maps to 0. Idempotent over its own output.
pub fn as_percent(value: Option<f64>) -> u8 {
    let n = match value {
        Some(v) if v.is_finite() => v,
        _ => return 0,
    };
    let normalized = if n <= 1.0 { n * 100.0 } else { n };
    normalized.clamp(0.0, 100.0).round() as u8
}

pub fn map_user(dto: UserDto) -> UserRef {
    UserRef {
        id: dto.id.unwrap_or_default(),
        name: dto.name.unwrap_or_default(),
        email: dto.email,
        role: dto.role.as_deref().map(Role::from_wire).unwrap_or_default(),
        department: dto.department,
    }
}

fn map_assignments(dto: AssignmentsDto) -> Assignment {
    Assignment {
        owner: dto.owner.map(map_user),
        collaborators: dto
            .collaborators
            .unwrap_or_default()
            .into_iter()
            .map(map_user)
            .collect(),
    }
}

fn map_location(dto: LocationDto) -> Location {
    Location {
        hostel: dto.hostel,
        building: dto.building,
        room: dto.room,
    }
}

fn category_parts(dto: &CategoryDto) -> (Option<&str>, bool, Option<f64>) {
    match dto {
        CategoryDto::Tag(tag) => (
            tag.category.as_deref(),
            tag.primary.unwrap_or(false),
            tag.confidence,
        ),
        CategoryDto::Plain(label) => (Some(label.as_str()), false, None),
    }
}

fn map_categories(dtos: &[CategoryDto]) -> Vec<CategoryTag> {
    dtos.iter()
        .filter_map(|dto| {
            let (label, primary, confidence) = category_parts(dto);
            label.map(|label| CategoryTag {
                label: category_label(label),
                primary,
                confidence,
            })
        })
        .collect()
}

/// Build the confidence block from the prediction, falling back to the
/// category assignments for per-label scores when the classifier sent none.
pub fn map_prediction(
    prediction: Option<&PredictionDto>,
    categories: &[CategoryDto],
) -> Confidence {
    let mut labels: Vec<LabelScore> = prediction
        .and_then(|p| p.labels.as_deref())
        .unwrap_or_default()
        .iter()
        .filter_map(|l| {
            l.label.as_deref().map(|label| LabelScore {
                label: category_label(label),
                score: as_percent(l.confidence),
            })
        })
        .collect();
    if labels.is_empty() {
        labels = categories
            .iter()
            .filter_map(|dto| {
                let (label, _, confidence) = category_parts(dto);
                label.map(|label| LabelScore {
                    label: category_label(label),
                    score: as_percent(confidence),
                })
            })
            .collect();
    }

    let overall = as_percent(prediction.and_then(|p| p.overall_confidence));
    Confidence {
        overall,
        labels,
        below_threshold: overall > 0 && overall < CONFIDENCE_THRESHOLD,
        severity_score: prediction.and_then(|p| p.severity_score),
        prediction_failed: prediction.and_then(|p| p.prediction_failed).unwrap_or(false),
        failure_reason: prediction.and_then(|p| p.failure_reason.clone()),
        predicted_at: prediction.and_then(|p| p.predicted_at),
    }
}

pub fn map_messages(dtos: Vec<MessageDto>) -> Vec<Message> {
    dtos.into_iter()
        .map(|dto| {
            let sender_role = dto.sender.as_ref().and_then(|s| s.role.as_deref());
            Message {
                id: dto.id.unwrap_or_default(),
                sender: if sender_role == Some("ROLE_USER") {
                    SenderKind::Student
                } else {
                    SenderKind::Admin
                },
                sender_name: dto
                    .sender
                    .and_then(|s| s.name)
                    .unwrap_or_else(|| "System".to_string()),
                text: dto.message.unwrap_or_default(),
                created_at: dto.created_at,
                internal: dto.internal.unwrap_or(false),
            }
        })
        .collect()
}

/// Human phrase for one timeline event.
fn timeline_action(event: &EventDto) -> String {
    let new_value = event.new_value.as_deref();
    match event.event_type.as_deref() {
        Some("STATUS_CHANGED") => format!(
            "Status changed to {}",
            TicketStatus::from_wire(new_value).label()
        ),
        Some("ASSIGNED") => "Assignment updated".to_string(),
        Some("CREATED") => "Complaint submitted".to_string(),
        Some("MESSAGE_ADDED") => "Message added".to_string(),
        Some("ATTACHMENT_ADDED") => "Attachment added".to_string(),
        Some("PREDICTION_COMPLETED") => "Prediction completed".to_string(),
        Some("PREDICTION_FAILED") => "Prediction failed".to_string(),
        Some("REVIEW_REQUIRED") => "Sent to manual review".to_string(),
        Some("REVIEW_APPROVED") => "Manual review approved".to_string(),
        Some("ESCALATED") => "Escalated".to_string(),
        Some("RESOLVED") => "Marked resolved".to_string(),
        Some("CLOSED") => "Closed".to_string(),
        Some("REOPENED") => "Reopened".to_string(),
        Some("FEEDBACK_ADDED") => "Feedback added".to_string(),
        Some(other) => title_case_word(&other.replace('_', " ")),
        None => "Updated".to_string(),
    }
}

pub fn map_timeline(dtos: Vec<EventDto>) -> Vec<TimelineEvent> {
    dtos.into_iter()
        .map(|dto| {
            let action = timeline_action(&dto);
            let detail = dto
                .detail
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| {
                    [dto.old_value.as_deref(), dto.new_value.as_deref()]
                        .into_iter()
                        .flatten()
                        .filter(|v| !v.is_empty())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                });
            TimelineEvent {
                id: dto.id.unwrap_or_default(),
                kind: dto
                    .event_type
                    .as_deref()
                    .unwrap_or("UPDATED")
                    .to_lowercase(),
                actor: dto
                    .actor
                    .and_then(|a| a.name)
                    .unwrap_or_else(|| "System".to_string()),
                action,
                timestamp: dto.created_at,
                detail,
            }
        })
        .collect()
}

pub fn map_audit(dtos: Vec<EventDto>) -> Vec<AuditEntry> {
    dtos.into_iter()
        .map(|dto| AuditEntry {
            id: dto.id.unwrap_or_default(),
            actor: dto
                .actor
                .and_then(|a| a.name)
                .unwrap_or_else(|| "System".to_string()),
            field: dto
                .event_type
                .as_deref()
                .unwrap_or("UPDATE")
                .replace('_', " ")
                .to_lowercase(),
            from: dto
                .old_value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "-".to_string()),
            to: dto
                .new_value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "-".to_string()),
            timestamp: dto.created_at,
        })
        .collect()
}

pub fn map_attachments(dtos: Vec<AttachmentDto>) -> Vec<Attachment> {
    dtos.into_iter()
        .map(|dto| {
            let size = dto.size.unwrap_or(0);
            let is_image = dto
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.starts_with("image/"));
            Attachment {
                id: dto.id.unwrap_or_default(),
                name: dto.file_name.unwrap_or_default(),
                mime_type: dto.mime_type,
                size_kb: ((size as f64 / 1024.0).round() as u64).max(1),
                uploaded_by: dto.uploader_name.unwrap_or_else(|| "User".to_string()),
                uploaded_at: dto.created_at,
                is_image,
                url: dto.url,
            }
        })
        .collect()
}

/// Map one complaint projection to a domain ticket.
///
/// Returns `None` when the projection has no id; such rows cannot be keyed
/// into the canonical map and are dropped.
pub fn map_ticket(dto: ComplaintDto) -> Option<Ticket> {
    let id = dto.id?;
    let category_dtos = dto.categories.unwrap_or_default();
    let mut categories = map_categories(&category_dtos);
    let confidence = map_prediction(dto.prediction.as_ref(), &category_dtos);
    if categories.is_empty() && !confidence.is_empty() {
        // The classifier ran but attached nothing; keep the catch-all bucket.
        categories.push(CategoryTag {
            label: "Others".to_string(),
            primary: true,
            confidence: None,
        });
    }

    let mut ticket = Ticket::shell(id);
    ticket.title = dto.title.unwrap_or_default();
    ticket.description = dto.description.unwrap_or_default();
    ticket.status = TicketStatus::from_wire(dto.status.as_deref());
    ticket.priority = Priority::from_wire(dto.priority.as_deref());
    ticket.categories = categories;
    ticket.confidence = confidence;
    ticket.location = dto.location.map(map_location).unwrap_or_default();
    ticket.assignees = dto.assignments.map(map_assignments);
    ticket.messages = dto.messages.map(map_messages);
    ticket.attachments = dto.attachments.map(map_attachments);
    ticket.timeline = dto.timeline.map(map_timeline);
    ticket.audit_log = dto.audit_log.map(map_audit);
    ticket.preferred_visit_slot = dto.preferred_visit_slot;
    ticket.anonymous = dto.anonymous;
    ticket.needs_review = dto.needs_review;
    ticket.review_reason = dto.review_reason;
    ticket.sla = dto.sla.map(|sla| Sla {
        acknowledge_due_at: sla.acknowledge_due_at,
        resolve_due_at: sla.resolve_due_at,
    });
    ticket.feedback_rating = dto.feedback_rating;
    ticket.feedback_comment = dto.feedback_comment;
    ticket.created_at = dto.created_at;
    ticket.updated_at = dto.updated_at;
    ticket.resolved_at = dto.resolved_at;
    ticket.closed_at = dto.closed_at;
    Some(ticket)
}

/// Map a review-queue row to reviewer state plus the classifier's draft
/// ticket.
///
/// The draft carries only what the queue endpoint returns; conversation
/// fields stay absent so merging the draft can never erase detail data.
pub fn map_review_item(dto: ReviewQueueItemDto) -> Option<(ReviewItem, Ticket)> {
    let ticket_id = dto.complaint_id.clone()?;
    let labels = dto.labels.unwrap_or_default();

    let draft_dto = ComplaintDto {
        id: Some(ticket_id.clone()),
        title: dto.title,
        description: dto.description,
        status: dto.status,
        priority: dto.priority,
        categories: Some(
            labels
                .iter()
                .enumerate()
                .filter_map(|(idx, l)| {
                    l.label.clone().map(|label| {
                        CategoryDto::Tag(crate::models::wire::CategoryTagDto {
                            category: Some(label),
                            primary: Some(idx == 0),
                            confidence: l.score,
                        })
                    })
                })
                .collect(),
        ),
        prediction: Some(PredictionDto {
            labels: Some(
                labels
                    .iter()
                    .filter_map(|l| {
                        l.label.clone().map(|label| crate::models::wire::LabelDto {
                            label: Some(label),
                            confidence: l.score,
                        })
                    })
                    .collect(),
            ),
            overall_confidence: dto.overall_confidence,
            severity_score: dto.severity_score,
            failure_reason: None,
            prediction_failed: Some(false),
            predicted_at: None,
        }),
        location: dto.location,
        assignments: dto.suggested_routing.map(|routing| AssignmentsDto {
            owner: routing.owner,
            collaborators: routing.collaborators,
        }),
        needs_review: dto.needs_review,
        review_reason: dto.review_reason,
        created_at: dto.created_at,
        updated_at: dto.updated_at,
        ..ComplaintDto::default()
    };

    let review = ReviewItem {
        ticket_id,
        highlighted_keywords: dto.highlighted_keywords.unwrap_or_default(),
        internal_notes: String::new(),
        spam: false,
    };
    map_ticket(draft_dto).map(|draft| (review, draft))
}

/// Pagination metadata with client defaults for absent envelope fields.
pub fn map_page_meta<T>(envelope: &PageEnvelopeDto<T>) -> PageMeta {
    PageMeta {
        page: envelope.page.unwrap_or(0),
        size: envelope.size.unwrap_or(20),
        total_elements: envelope.total_elements.unwrap_or(0),
        total_pages: envelope.total_pages.unwrap_or(1),
        first: envelope.first.unwrap_or(true),
        last: envelope.last.unwrap_or(true),
    }
}

pub fn map_summary(dto: SummaryDto) -> SummaryKpis {
    SummaryKpis {
        open: dto.open.unwrap_or(0),
        unassigned: dto.unassigned.unwrap_or(0),
        sla_breaches: dto.sla_breaches.unwrap_or(0),
        avg_resolution_hours: dto.avg_resolution_hours.unwrap_or(0.0),
        manual_review_count: dto.manual_review_count.unwrap_or(0),
    }
}

pub fn map_trends(dtos: Vec<TrendPointDto>) -> Vec<TrendPoint> {
    dtos.into_iter()
        .map(|dto| TrendPoint {
            day: dto.bucket.unwrap_or_default(),
            created: dto.created_count.unwrap_or(0),
            resolved: dto.resolved_count.unwrap_or(0),
        })
        .collect()
}

pub fn map_category_counts(dtos: Vec<CategoryCountDto>) -> Vec<CategorySlice> {
    dtos.into_iter()
        .filter_map(|dto| {
            dto.category.map(|category| CategorySlice {
                name: category.replace('_', " "),
                count: dto.count.unwrap_or(0),
            })
        })
        .collect()
}
