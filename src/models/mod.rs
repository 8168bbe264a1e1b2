// src/models/mod.rs

//! Data models: domain types the cache and callers work with, plus the
//! backend wire shapes they are mapped from.

pub mod analytics;
pub mod page;
pub mod request;
pub mod review;
pub mod ticket;
pub mod user;
pub mod wire;

pub use analytics::{AdminMetrics, AnalyticsView, CategorySlice, SummaryKpis, TrendPoint};
pub use page::{PageMeta, PageView, TicketFilters};
pub use request::{
    AssignRequest, EscalationRequest, NewAttachment, NewTicket, ReviewDecision,
};
pub use review::{ReviewEntry, ReviewItem, ReviewQueueView};
pub use ticket::{
    Assignment, Attachment, AuditEntry, CategoryTag, Confidence, LabelScore, Location, Message,
    Priority, Resolution, SenderKind, Sla, Ticket, TicketStatus, TimelineEvent, UserMetrics,
    CONFIDENCE_THRESHOLD,
};
pub use user::{AuthSession, Role, UserRef};
