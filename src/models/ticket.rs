// src/models/ticket.rs

//! The canonical ticket model and its merge semantics.
//!
//! A `Ticket` in the cache is assembled from projections of varying depth:
//! list rows, review-queue drafts, and full detail responses. Fields a
//! projection did not carry are `None`, and [`Ticket::merge_from`] only
//! overwrites a field when the incoming projection actually carried it, so
//! a later shallow row can never erase detail data already held.

use chrono::{DateTime, Utc};

use crate::models::user::UserRef;

/// Classifier confidence (percent) below which a ticket is routed to
/// manual review.
pub const CONFIDENCE_THRESHOLD: u8 = 72;

/// Lifecycle state of a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketStatus {
    New,
    Acknowledged,
    InProgress,
    NeedsInfo,
    Resolved,
    Closed,
    Reopened,
    Escalated,
    /// Vocabulary drift from the server; holds the humanized label.
    Other(String),
}

impl TicketStatus {
    /// Parse a wire token or display label; missing/empty maps to `New`.
    pub fn from_wire(raw: Option<&str>) -> Self {
        let token = match raw {
            Some(s) if !s.trim().is_empty() => {
                s.trim().to_uppercase().replace([' ', '-'], "_")
            }
            _ => return Self::New,
        };
        match token.as_str() {
            "NEW" => Self::New,
            "ACKNOWLEDGED" => Self::Acknowledged,
            "IN_PROGRESS" => Self::InProgress,
            "NEEDS_INFO" => Self::NeedsInfo,
            "RESOLVED" => Self::Resolved,
            "CLOSED" => Self::Closed,
            "REOPENED" => Self::Reopened,
            "ESCALATED" => Self::Escalated,
            _ => Self::Other(title_case_tokens(&token)),
        }
    }

    /// Display label ("In Progress").
    pub fn label(&self) -> &str {
        match self {
            Self::New => "New",
            Self::Acknowledged => "Acknowledged",
            Self::InProgress => "In Progress",
            Self::NeedsInfo => "Needs Info",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
            Self::Reopened => "Reopened",
            Self::Escalated => "Escalated",
            Self::Other(label) => label,
        }
    }

    /// Wire token ("IN_PROGRESS").
    pub fn wire_token(&self) -> String {
        self.label().trim().to_uppercase().replace(' ', "_")
    }

    /// Resolved or Closed; the states that imply closure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Newly filed or bounced back; the "open" dashboard bucket.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::Acknowledged | Self::Reopened)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordinal ticket priority; missing or unknown values default to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_uppercase()) {
            Some(token) => match token.as_str() {
                "LOW" => Self::Low,
                "HIGH" => Self::High,
                "CRITICAL" => Self::Critical,
                _ => Self::Medium,
            },
            None => Self::Medium,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    pub fn wire_token(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Title-case one token: "PROGRESS" -> "Progress".
pub(crate) fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Title-case every underscore-separated token: "NEEDS_INFO" -> "Needs Info".
pub(crate) fn title_case_tokens(raw: &str) -> String {
    raw.split('_')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A category attached to a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTag {
    /// Display label ("Plumbing", "Others")
    pub label: String,

    /// Primary category flag
    pub primary: bool,

    /// Per-category classifier confidence, when the backend sent one
    pub confidence: Option<f64>,
}

/// One classifier label with its normalized percent score.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: u8,
}

/// Classification confidence block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Confidence {
    /// Overall confidence, percent 0..=100
    pub overall: u8,

    /// Per-label scores, percent
    pub labels: Vec<LabelScore>,

    /// True when overall is non-zero but under [`CONFIDENCE_THRESHOLD`]
    pub below_threshold: bool,

    /// Raw severity score, unnormalized
    pub severity_score: Option<f64>,

    /// Classifier failed outright
    pub prediction_failed: bool,

    /// Failure reason reported by the classifier
    pub failure_reason: Option<String>,

    /// When the classifier last ran
    pub predicted_at: Option<DateTime<Utc>>,
}

impl Confidence {
    /// True when the projection carried no classification signal at all.
    pub fn is_empty(&self) -> bool {
        self.overall == 0 && self.labels.is_empty() && !self.prediction_failed
    }
}

/// Where on campus the problem is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub hostel: Option<String>,
    pub building: Option<String>,
    pub room: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.hostel.is_none() && self.building.is_none() && self.room.is_none()
    }

    /// "Hostel A / Block B / 101" with absent parts skipped.
    pub fn display(&self) -> String {
        [&self.hostel, &self.building, &self.room]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Owner and collaborators responsible for a ticket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    pub owner: Option<UserRef>,
    pub collaborators: Vec<UserRef>,
}

/// Which side of the desk a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    Student,
    Admin,
}

/// A conversation message on a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender: SenderKind,
    pub sender_name: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Internal notes are only returned by the admin detail endpoint
    pub internal: bool,
}

/// An uploaded file on a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub mime_type: Option<String>,
    /// Rounded up; never zero for a real file
    pub size_kb: u64,
    pub uploaded_by: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub is_image: bool,
    pub url: Option<String>,
}

/// A human-readable timeline entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub id: String,
    /// Lowercased event code ("status_changed")
    pub kind: String,
    pub actor: String,
    /// Phrase for display ("Status changed to Resolved")
    pub action: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub detail: String,
}

/// An audit-log entry (admin detail only).
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: String,
    pub actor: String,
    pub field: String,
    pub from: String,
    pub to: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// SLA clocks attached by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sla {
    pub acknowledge_due_at: Option<DateTime<Utc>>,
    pub resolve_due_at: Option<DateTime<Utc>>,
}

impl Sla {
    /// The next meaningful deadline: resolution due, else acknowledgement due.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.resolve_due_at.or(self.acknowledge_due_at)
    }
}

/// Derived closure information, present only for terminal tickets.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub note: String,
    pub attachments: Vec<Attachment>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// The canonical ticket.
///
/// `Option` on a field means "the richest projection seen so far may not
/// have carried it"; scalar fields are present in every projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub categories: Vec<CategoryTag>,
    pub confidence: Confidence,
    pub location: Location,
    pub assignees: Option<Assignment>,
    pub messages: Option<Vec<Message>>,
    pub attachments: Option<Vec<Attachment>>,
    pub timeline: Option<Vec<TimelineEvent>>,
    pub audit_log: Option<Vec<AuditEntry>>,
    pub preferred_visit_slot: Option<String>,
    pub anonymous: Option<bool>,
    pub needs_review: Option<bool>,
    pub review_reason: Option<String>,
    pub sla: Option<Sla>,
    pub feedback_rating: Option<i32>,
    pub feedback_comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// An empty ticket shell for the given id.
    pub fn shell(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            status: TicketStatus::New,
            priority: Priority::Medium,
            categories: Vec::new(),
            confidence: Confidence::default(),
            location: Location::default(),
            assignees: None,
            messages: None,
            attachments: None,
            timeline: None,
            audit_log: None,
            preferred_visit_slot: None,
            anonymous: None,
            needs_review: None,
            review_reason: None,
            sla: None,
            feedback_rating: None,
            feedback_comment: None,
            created_at: None,
            updated_at: None,
            resolved_at: None,
            closed_at: None,
        }
    }

    /// Merge a newer projection of the same ticket into this one.
    ///
    /// Scalar fields (title, description, status, priority) always take the
    /// newer value since every projection carries them. Optional fields are
    /// overwritten only when the newer projection carried them; an absent
    /// field never erases data. Categories, confidence and location are
    /// block-replaced only when the incoming block is informative.
    pub fn merge_from(&mut self, newer: Ticket) {
        debug_assert_eq!(self.id, newer.id);

        self.title = newer.title;
        self.description = newer.description;
        self.status = newer.status;
        self.priority = newer.priority;

        if !newer.categories.is_empty() {
            self.categories = newer.categories;
        }
        if !newer.confidence.is_empty() {
            self.confidence = newer.confidence;
        }
        if !newer.location.is_empty() {
            self.location = newer.location;
        }

        merge_opt(&mut self.assignees, newer.assignees);
        merge_opt(&mut self.messages, newer.messages);
        merge_opt(&mut self.attachments, newer.attachments);
        merge_opt(&mut self.timeline, newer.timeline);
        merge_opt(&mut self.audit_log, newer.audit_log);
        merge_opt(&mut self.preferred_visit_slot, newer.preferred_visit_slot);
        merge_opt(&mut self.anonymous, newer.anonymous);
        merge_opt(&mut self.needs_review, newer.needs_review);
        merge_opt(&mut self.review_reason, newer.review_reason);
        merge_opt(&mut self.sla, newer.sla);
        merge_opt(&mut self.feedback_rating, newer.feedback_rating);
        merge_opt(&mut self.feedback_comment, newer.feedback_comment);
        merge_opt(&mut self.created_at, newer.created_at);
        merge_opt(&mut self.updated_at, newer.updated_at);
        merge_opt(&mut self.resolved_at, newer.resolved_at);
        merge_opt(&mut self.closed_at, newer.closed_at);
    }

    /// Closure information, derived instead of stored: present exactly when
    /// the status is terminal. The note falls back from the latest public
    /// message to the feedback comment to a fixed phrase.
    pub fn resolution(&self) -> Option<Resolution> {
        if !self.status.is_terminal() {
            return None;
        }
        let latest_public = self
            .messages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|m| !m.internal)
            .max_by_key(|m| m.created_at);
        let note = latest_public
            .map(|m| m.text.clone())
            .or_else(|| self.feedback_comment.clone())
            .unwrap_or_else(|| "Resolution completed.".to_string());
        Some(Resolution {
            note,
            attachments: Vec::new(),
            resolved_at: self.resolved_at.or(self.updated_at),
        })
    }

    /// Display labels of all attached categories.
    pub fn category_labels(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.label.as_str()).collect()
    }

    /// The primary category label, falling back to the first.
    pub fn primary_category(&self) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.primary)
            .or_else(|| self.categories.first())
            .map(|c| c.label.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous.unwrap_or(false)
    }

    /// Flagged for the manual-review queue.
    pub fn in_review(&self) -> bool {
        self.needs_review.unwrap_or(false)
    }
}

fn merge_opt<T>(current: &mut Option<T>, newer: Option<T>) {
    if newer.is_some() {
        *current = newer;
    }
}

/// Status bucket counts for the student dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserMetrics {
    /// New, Acknowledged or Reopened
    pub open: usize,
    pub in_progress: usize,
    /// Resolved or Closed
    pub resolved: usize,
    pub needs_info: usize,
}

impl UserMetrics {
    /// Bucket a set of tickets by lifecycle state.
    pub fn from_tickets<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> Self {
        let mut metrics = Self::default();
        for ticket in tickets {
            match ticket.status {
                TicketStatus::New | TicketStatus::Acknowledged | TicketStatus::Reopened => {
                    metrics.open += 1
                }
                TicketStatus::InProgress => metrics.in_progress += 1,
                TicketStatus::Resolved | TicketStatus::Closed => metrics.resolved += 1,
                TicketStatus::NeedsInfo => metrics.needs_info += 1,
                _ => {}
            }
        }
        metrics
    }
}
