// src/models/analytics.rs

//! Admin analytics models.

use crate::models::ticket::Ticket;

/// Headline KPIs from the analytics summary endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryKpis {
    pub open: u64,
    pub unassigned: u64,
    pub sla_breaches: u64,
    pub avg_resolution_hours: f64,
    pub manual_review_count: u64,
}

/// Created/resolved counts for one trend bucket (a day).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendPoint {
    pub day: String,
    pub created: u64,
    pub resolved: u64,
}

/// Ticket count for one category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySlice {
    /// Display name, underscores replaced with spaces
    pub name: String,
    pub count: u64,
}

/// Read-side snapshot of the analytics dashboard: KPIs, a week of trend
/// points, the category distribution, and the current critical tickets.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsView {
    pub summary: Option<SummaryKpis>,
    pub trends: Vec<TrendPoint>,
    pub categories: Vec<CategorySlice>,
    pub critical_alerts: Vec<Ticket>,
}

/// Admin dashboard metrics: the analytics summary when loaded, otherwise a
/// zeroed fallback that still reports the live review-queue depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminMetrics {
    pub open: u64,
    pub unassigned: u64,
    pub sla_breaches: u64,
    pub avg_resolution_hours: f64,
    pub manual_review_count: u64,
}

impl AdminMetrics {
    pub fn from_summary(summary: &SummaryKpis) -> Self {
        Self {
            open: summary.open,
            unassigned: summary.unassigned,
            sla_breaches: summary.sla_breaches,
            avg_resolution_hours: summary.avg_resolution_hours,
            manual_review_count: summary.manual_review_count,
        }
    }

    pub fn fallback(review_queue_len: usize) -> Self {
        Self {
            manual_review_count: review_queue_len as u64,
            ..Self::default()
        }
    }
}
