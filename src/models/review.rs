// src/models/review.rs

//! Manual-review queue models.

use crate::models::page::PageMeta;
use crate::models::ticket::Ticket;

/// Reviewer-facing state for one queued ticket. The classifier draft itself
/// lives in the canonical ticket map under `ticket_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem {
    /// Id of the complaint awaiting review
    pub ticket_id: String,

    /// Keywords the classifier flagged in the text
    pub highlighted_keywords: Vec<String>,

    /// Reviewer's local working notes; survives queue reloads
    pub internal_notes: String,

    /// Reviewer-local spam marker
    pub spam: bool,
}

/// One review-queue row joined with its draft ticket.
#[derive(Debug, Clone)]
pub struct ReviewEntry {
    pub review: ReviewItem,

    /// Draft resolved from the canonical map; `None` if it was evicted
    pub ticket: Option<Ticket>,
}

/// Read-side snapshot of the manual-review page.
#[derive(Debug, Clone, Default)]
pub struct ReviewQueueView {
    pub entries: Vec<ReviewEntry>,
    pub meta: PageMeta,
}
