// src/models/page.rs

//! Pagination metadata, list filters, and the read-side page view.

use crate::models::ticket::{Priority, Ticket, TicketStatus};

/// Pagination metadata for a loaded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            page: 0,
            size: 20,
            total_elements: 0,
            total_pages: 1,
            first: true,
            last: true,
        }
    }
}

/// Filters for ticket list endpoints. Fields that do not apply to a given
/// list are simply ignored by the server. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilters {
    pub status: Option<TicketStatus>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    /// Admin inbox: classifier confidence band ("LOW", "MEDIUM", "HIGH")
    pub confidence_level: Option<String>,
    pub assigned_to: Option<String>,
    pub location: Option<String>,
    pub needs_review: Option<bool>,
    /// Free-text search
    pub search: Option<String>,
    /// Inclusive creation-date bounds, ISO dates
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl TicketFilters {
    /// Filters addressing a specific page with defaults applied.
    pub fn page_request(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            ..Self::default()
        }
    }

    /// Effective page index (default 0).
    pub fn page_or_default(&self) -> u32 {
        self.page.unwrap_or(0)
    }

    /// Effective page size (default 20).
    pub fn size_or_default(&self) -> u32 {
        self.size.unwrap_or(20)
    }
}

/// A read-side snapshot of one page: tickets resolved through the canonical
/// map at read time, plus the pagination metadata of the last load.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub tickets: Vec<Ticket>,
    pub meta: PageMeta,
}
