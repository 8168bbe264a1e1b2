// src/models/request.rs

//! Caller-side request types for mutating operations.

use crate::error::{ApiError, Result};
use crate::models::ticket::{Location, Priority};

/// A new complaint to submit.
#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub location: Location,
    pub preferred_visit_slot: Option<String>,
    pub anonymous: bool,
    /// Uploaded after creation; triggers a classifier re-run
    pub attachments: Vec<NewAttachment>,
}

impl NewTicket {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ApiError::validation("title must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::validation("description must not be empty"));
        }
        Ok(())
    }
}

/// An attachment to upload as one part of a multipart request.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Ownership change for a ticket.
#[derive(Debug, Clone)]
pub struct AssignRequest {
    pub owner_user_id: i64,
    pub collaborator_user_ids: Vec<i64>,
    pub reason: Option<String>,
}

impl AssignRequest {
    pub fn new(owner_user_id: i64) -> Self {
        Self {
            owner_user_id,
            collaborator_user_ids: Vec::new(),
            reason: None,
        }
    }
}

/// Escalation request; defaults to the overdue-resolution path.
#[derive(Debug, Clone)]
pub struct EscalationRequest {
    pub level: String,
    pub escalated_to_role: String,
    pub reason: Option<String>,
}

impl Default for EscalationRequest {
    fn default() -> Self {
        Self {
            level: "RESOLVE_OVERDUE".to_string(),
            escalated_to_role: "ROLE_SUPER_ADMIN".to_string(),
            reason: None,
        }
    }
}

/// A reviewer's decision on a queued ticket.
#[derive(Debug, Clone, Default)]
pub struct ReviewDecision {
    /// Corrected category labels, primary first; empty keeps the draft's
    pub categories: Vec<String>,
    pub priority: Option<Priority>,
    pub owner_user_id: Option<i64>,
    pub collaborator_user_ids: Vec<i64>,
    pub internal_notes: Option<String>,
    /// Not supported by the backend; approval rejects it up front
    pub mark_spam: bool,
}

impl ReviewDecision {
    /// True when approval must write corrections before approving.
    pub fn has_edits(&self) -> bool {
        !self.categories.is_empty() || self.priority.is_some() || self.owner_user_id.is_some()
    }
}
