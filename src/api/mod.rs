// src/api/mod.rs

//! Backend access: the [`ComplaintsBackend`] seam and its HTTP implementation.
//!
//! The cache talks to the backend exclusively through this trait, in domain
//! types; the wire shapes and mappers stay an implementation detail of
//! [`http::HttpBackend`]. Tests drive the cache with a scripted fake instead.

pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    AssignRequest, AuthSession, CategorySlice, EscalationRequest, NewAttachment, NewTicket,
    PageMeta, Priority, ReviewDecision, ReviewItem, SummaryKpis, Ticket, TicketFilters,
    TicketStatus, TrendPoint, UserRef,
};

pub use http::HttpBackend;

/// One loaded page of tickets plus its pagination metadata.
pub type TicketPage = (Vec<Ticket>, PageMeta);

/// One loaded review-queue page: reviewer rows joined with their draft
/// tickets.
pub type ReviewPage = (Vec<(ReviewItem, Ticket)>, PageMeta);

/// Everything the client needs from the complaints backend.
#[async_trait]
pub trait ComplaintsBackend: Send + Sync {
    // auth

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthSession>;

    /// Validate the current credential and fetch the profile behind it.
    async fn me(&self) -> Result<UserRef>;

    // student surface

    async fn list_my_tickets(&self, filters: &TicketFilters) -> Result<TicketPage>;

    async fn fetch_ticket(&self, id: &str) -> Result<Ticket>;

    /// Submit a new complaint. Attachments are uploaded separately; see
    /// [`ComplaintsBackend::upload_attachments`].
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket>;

    async fn add_message(&self, id: &str, text: &str, internal: bool) -> Result<()>;

    /// Upload files to a complaint; `rerun_prediction` asks the classifier
    /// to run again over the enriched complaint.
    async fn upload_attachments(
        &self,
        id: &str,
        files: Vec<NewAttachment>,
        rerun_prediction: bool,
    ) -> Result<()>;

    async fn reopen_ticket(&self, id: &str, reason: &str) -> Result<()>;

    async fn send_feedback(&self, id: &str, rating: i32, comment: Option<&str>) -> Result<()>;

    // admin surface

    async fn admin_inbox(&self, filters: &TicketFilters) -> Result<TicketPage>;

    /// Admin detail; includes internal notes and the audit log.
    async fn fetch_admin_ticket(&self, id: &str) -> Result<Ticket>;

    async fn assign_ticket(&self, id: &str, request: &AssignRequest) -> Result<()>;

    async fn set_status(&self, id: &str, status: &TicketStatus, comment: &str) -> Result<()>;

    async fn escalate_ticket(&self, id: &str, request: &EscalationRequest) -> Result<()>;

    async fn resolve_ticket(&self, id: &str, note: &str, attachment_ids: &[String]) -> Result<()>;

    /// Classification override for a ticket outside the review flow. The
    /// first category is recorded as primary.
    async fn update_classification(
        &self,
        id: &str,
        categories: &[String],
        priority: Option<Priority>,
    ) -> Result<()>;

    // manual review

    async fn review_queue(&self, page: u32, size: u32) -> Result<ReviewPage>;

    async fn edit_review(&self, id: &str, decision: &ReviewDecision) -> Result<()>;

    async fn approve_review(&self, id: &str, internal_notes: Option<&str>) -> Result<()>;

    // analytics

    async fn analytics_summary(&self) -> Result<SummaryKpis>;

    async fn analytics_trends(&self, days: u32) -> Result<Vec<TrendPoint>>;

    async fn analytics_by_category(&self) -> Result<Vec<CategorySlice>>;
}
