// src/cache.rs

//! The ticket cache: one canonical ticket map plus id-referencing views.
//!
//! Every loaded projection of a complaint merges into the canonical map
//! keyed by ticket id; pages, the review queue, and analytics alerts hold
//! ids only and resolve through the map at read time. A ticket updated by
//! any operation is therefore current in every view that references it,
//! with no per-view copies to reconcile.
//!
//! Mutations are two-phase: the write goes to the backend first, then the
//! affected ticket is re-fetched and merged. There are no optimistic local
//! writes. When the write lands but the re-fetch fails, the operation still
//! succeeds and reports [`MutationOutcome::RefreshFailed`] so callers can
//! surface "saved, view may be stale" instead of an error.
//!
//! Concurrent merges follow arrival order: the last projection to arrive
//! wins field-by-field under [`Ticket::merge_from`]. Responses are not
//! reordered by server timestamps.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::api::ComplaintsBackend;
use crate::error::{ApiError, Result};
use crate::models::{
    AdminMetrics, AnalyticsView, AssignRequest, CategorySlice, EscalationRequest, NewAttachment,
    NewTicket, PageMeta, PageView, Priority, ReviewDecision, ReviewEntry, ReviewItem,
    ReviewQueueView, SummaryKpis, Ticket, TicketFilters, TicketStatus, TrendPoint, UserMetrics,
};

/// How a two-phase mutation ended. The write itself succeeded either way.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The follow-up re-fetch landed; this is the fresh ticket.
    Refreshed(Ticket),
    /// The write landed but the re-fetch failed; cached data is stale until
    /// the next successful load.
    RefreshFailed { error: ApiError },
}

impl MutationOutcome {
    pub fn ticket(&self) -> Option<&Ticket> {
        match self {
            Self::Refreshed(ticket) => Some(ticket),
            Self::RefreshFailed { .. } => None,
        }
    }

    pub fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed(_))
    }
}

#[derive(Default)]
struct PageRecord {
    ids: Vec<String>,
    meta: PageMeta,
}

#[derive(Default)]
struct ReviewRecord {
    items: Vec<ReviewItem>,
    meta: PageMeta,
    /// Reviewer's working notes by ticket id; survives queue reloads.
    notes: HashMap<String, String>,
}

struct AnalyticsSnapshot {
    summary: SummaryKpis,
    trends: Vec<TrendPoint>,
    categories: Vec<CategorySlice>,
    critical_ids: Vec<String>,
}

#[derive(Default)]
struct CacheState {
    canonical: HashMap<String, Ticket>,
    user_page: PageRecord,
    admin_page: PageRecord,
    review: ReviewRecord,
    analytics: Option<AnalyticsSnapshot>,
    last_user_filters: TicketFilters,
    last_admin_filters: TicketFilters,
}

impl CacheState {
    fn merge(&mut self, incoming: Ticket) {
        match self.canonical.entry(incoming.id.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().merge_from(incoming),
            Entry::Vacant(entry) => {
                entry.insert(incoming);
            }
        }
    }

    fn resolve(&self, record: &PageRecord) -> PageView {
        PageView {
            tickets: record
                .ids
                .iter()
                .filter_map(|id| self.canonical.get(id))
                .cloned()
                .collect(),
            meta: record.meta,
        }
    }
}

/// Owned, injectable client-side state. All methods take `&self`; the lock
/// is internal and never held across an await.
pub struct TicketCache {
    backend: Arc<dyn ComplaintsBackend>,
    state: RwLock<CacheState>,
    admin_scope: AtomicBool,
}

impl TicketCache {
    pub fn new(backend: Arc<dyn ComplaintsBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(CacheState::default()),
            admin_scope: AtomicBool::new(false),
        }
    }

    /// Switch between the student and admin surfaces. Detail fetches and
    /// post-mutation refreshes go to the admin endpoints when set.
    pub fn set_admin_scope(&self, admin: bool) {
        self.admin_scope.store(admin, Ordering::SeqCst);
    }

    pub fn admin_scope(&self) -> bool {
        self.admin_scope.load(Ordering::SeqCst)
    }

    // ----- loads ------------------------------------------------------------

    /// Load the signed-in student's ticket page and remember the filters for
    /// later implicit reloads.
    pub async fn load_user_tickets(&self, filters: TicketFilters) -> Result<PageView> {
        let (tickets, meta) = self.backend.list_my_tickets(&filters).await?;
        let mut state = self.state_mut();
        state.last_user_filters = filters;
        state.user_page.ids = tickets.iter().map(|t| t.id.clone()).collect();
        state.user_page.meta = meta;
        for ticket in tickets {
            state.merge(ticket);
        }
        Ok(state.resolve(&state.user_page))
    }

    /// Load the admin triage inbox page.
    pub async fn load_admin_inbox(&self, filters: TicketFilters) -> Result<PageView> {
        let (tickets, meta) = self.backend.admin_inbox(&filters).await?;
        let mut state = self.state_mut();
        state.last_admin_filters = filters;
        state.admin_page.ids = tickets.iter().map(|t| t.id.clone()).collect();
        state.admin_page.meta = meta;
        for ticket in tickets {
            state.merge(ticket);
        }
        Ok(state.resolve(&state.admin_page))
    }

    /// Load the manual-review queue page. Draft tickets merge into the
    /// canonical map like any other projection, and reviewer notes kept
    /// locally are overlaid onto the fresh rows.
    pub async fn load_review_queue(&self, page: u32, size: u32) -> Result<ReviewQueueView> {
        let (rows, meta) = self.backend.review_queue(page, size).await?;
        let mut state = self.state_mut();
        let mut items = Vec::with_capacity(rows.len());
        for (mut item, draft) in rows {
            if let Some(notes) = state.review.notes.get(&item.ticket_id) {
                if !notes.is_empty() {
                    item.internal_notes = notes.clone();
                }
            }
            state.merge(draft);
            items.push(item);
        }
        state.review.items = items;
        state.review.meta = meta;
        Ok(self.review_view(&state))
    }

    /// Load one ticket's detail through the endpoint for the current scope
    /// and merge it into the canonical map.
    pub async fn load_ticket(&self, id: &str) -> Result<Ticket> {
        let ticket = if self.admin_scope() {
            self.backend.fetch_admin_ticket(id).await?
        } else {
            self.backend.fetch_ticket(id).await?
        };
        let mut state = self.state_mut();
        state.merge(ticket);
        Ok(state
            .canonical
            .get(id)
            .cloned()
            .unwrap_or_else(|| Ticket::shell(id)))
    }

    /// Load the analytics dashboard: KPIs, a week of trends, the category
    /// distribution, and the current critical tickets, fetched together.
    /// Any one failure fails the whole load.
    pub async fn load_analytics(&self) -> Result<AnalyticsView> {
        let critical_filter = TicketFilters {
            priority: Some(Priority::Critical),
            page: Some(0),
            size: Some(5),
            ..TicketFilters::default()
        };
        let (summary, trends, categories, (alerts, _)) = tokio::try_join!(
            self.backend.analytics_summary(),
            self.backend.analytics_trends(7),
            self.backend.analytics_by_category(),
            self.backend.admin_inbox(&critical_filter),
        )?;

        let mut state = self.state_mut();
        let critical_ids: Vec<String> = alerts.iter().map(|t| t.id.clone()).collect();
        for ticket in alerts {
            state.merge(ticket);
        }
        state.analytics = Some(AnalyticsSnapshot {
            summary,
            trends,
            categories,
            critical_ids,
        });
        Ok(self.analytics_view(&state))
    }

    /// Initial load after authentication. Students get their ticket page;
    /// admins get the inbox, the review queue and analytics, tolerating
    /// individual failures.
    pub async fn bootstrap(&self) -> Result<()> {
        if !self.admin_scope() {
            self.load_user_tickets(TicketFilters::page_request(0, 20))
                .await?;
            return Ok(());
        }

        let (inbox, review, analytics) = tokio::join!(
            self.load_admin_inbox(TicketFilters::page_request(0, 20)),
            self.load_review_queue(0, 20),
            self.load_analytics(),
        );
        for (name, result) in [
            ("admin inbox", inbox.map(|_| ())),
            ("review queue", review.map(|_| ())),
            ("analytics", analytics.map(|_| ())),
        ] {
            if let Err(e) = result {
                log::warn!("Bootstrap load of {name} failed: {e}");
            }
        }
        Ok(())
    }

    // ----- mutations --------------------------------------------------------

    /// Submit a new complaint. Attachments upload after creation with a
    /// classifier re-run, then the enriched detail is fetched. The student
    /// page reloads under its last filters when it has content.
    pub async fn create_ticket(&self, new_ticket: NewTicket) -> Result<Ticket> {
        new_ticket.validate()?;
        let mut created = self.backend.create_ticket(&new_ticket).await?;
        let id = created.id.clone();

        if !new_ticket.attachments.is_empty() {
            self.backend
                .upload_attachments(&id, new_ticket.attachments, true)
                .await?;
            created = self.backend.fetch_ticket(&id).await?;
        }

        let reload = {
            let mut state = self.state_mut();
            state.merge(created.clone());
            !state.user_page.ids.is_empty()
        };
        if reload {
            let filters = self.last_user_filters();
            if let Err(e) = self.load_user_tickets(filters).await {
                log::warn!("Reloading the ticket list after create failed: {e}");
            }
        }
        Ok(created)
    }

    /// Post a conversation message, then refresh the ticket.
    pub async fn add_message(
        &self,
        id: &str,
        text: &str,
        internal: bool,
    ) -> Result<MutationOutcome> {
        self.backend.add_message(id, text, internal).await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Upload additional files to an existing ticket without a classifier
    /// re-run, then refresh it.
    pub async fn add_attachments(
        &self,
        id: &str,
        files: Vec<NewAttachment>,
    ) -> Result<MutationOutcome> {
        self.backend.upload_attachments(id, files, false).await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Change a ticket's lifecycle state. The comment defaults to the
    /// acting role's label when the caller gives none.
    pub async fn change_status(
        &self,
        id: &str,
        status: TicketStatus,
        comment: Option<&str>,
    ) -> Result<MutationOutcome> {
        self.backend
            .set_status(id, &status, comment.unwrap_or("Admin"))
            .await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Reassign ownership of a ticket.
    pub async fn assign(&self, id: &str, mut request: AssignRequest) -> Result<MutationOutcome> {
        if request.reason.is_none() {
            request.reason = Some("Assignment updated".to_string());
        }
        self.backend.assign_ticket(id, &request).await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    pub async fn escalate(
        &self,
        id: &str,
        request: EscalationRequest,
    ) -> Result<MutationOutcome> {
        self.backend.escalate_ticket(id, &request).await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Resolve a ticket with a note; closure evidence files upload after
    /// the resolve lands, without a classifier re-run.
    pub async fn resolve(
        &self,
        id: &str,
        note: &str,
        files: Vec<NewAttachment>,
    ) -> Result<MutationOutcome> {
        self.backend.resolve_ticket(id, note, &[]).await?;
        if !files.is_empty() {
            self.backend.upload_attachments(id, files, false).await?;
        }
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Rate a resolved ticket. The acknowledgement body is ignored; the
    /// refreshed detail is the source of truth.
    pub async fn send_feedback(
        &self,
        id: &str,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<MutationOutcome> {
        self.backend.send_feedback(id, rating, comment).await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Reopen a closed ticket.
    pub async fn reopen(&self, id: &str, reason: Option<&str>) -> Result<MutationOutcome> {
        self.backend
            .reopen_ticket(id, reason.unwrap_or("Reopened by user"))
            .await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Correct a ticket's categories and priority.
    ///
    /// A ticket sitting in the manual-review queue is corrected through the
    /// review edit endpoint, keeping its current assignee, and the queue
    /// page is reloaded alongside the ticket. Anything else goes through
    /// the direct classification override.
    pub async fn update_classification(
        &self,
        id: &str,
        categories: Vec<String>,
        priority: Option<Priority>,
    ) -> Result<MutationOutcome> {
        let (in_review, owner_id, collaborator_ids) = {
            let state = self.state();
            let ticket = state.canonical.get(id);
            let in_review = ticket.map(Ticket::in_review).unwrap_or(false);
            let assignment = ticket.and_then(|t| t.assignees.as_ref());
            let owner_id = assignment
                .and_then(|a| a.owner.as_ref())
                .and_then(|owner| owner.id.parse::<i64>().ok());
            let collaborator_ids = assignment
                .map(|a| {
                    a.collaborators
                        .iter()
                        .filter_map(|c| c.id.parse::<i64>().ok())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            (in_review, owner_id, collaborator_ids)
        };

        if in_review {
            let decision = ReviewDecision {
                categories,
                priority,
                owner_user_id: owner_id,
                collaborator_user_ids: collaborator_ids,
                internal_notes: Some("Admin: classification updated".to_string()),
                mark_spam: false,
            };
            self.backend.edit_review(id, &decision).await?;
            let outcome = self.refresh_after_mutation(id).await;
            let (page, size) = self.review_page_request();
            if let Err(e) = self.load_review_queue(page, size).await {
                log::warn!("Review queue reload after edit failed: {e}");
            }
            return Ok(outcome);
        }

        self.backend
            .update_classification(id, &categories, priority)
            .await?;
        Ok(self.refresh_after_mutation(id).await)
    }

    /// Approve a queued ticket, writing any corrections first.
    ///
    /// Spam cannot be recorded server-side, so a spam decision is rejected
    /// before anything is sent. After approval the queue, the inbox, and
    /// the ticket all reload; secondary view failures are logged, not
    /// surfaced.
    pub async fn approve_review(
        &self,
        id: &str,
        decision: &ReviewDecision,
    ) -> Result<MutationOutcome> {
        if decision.mark_spam {
            return Err(ApiError::validation(
                "marking a complaint as spam is not supported by the backend yet",
            ));
        }

        if decision.has_edits() {
            self.backend.edit_review(id, decision).await?;
        }
        self.backend
            .approve_review(id, decision.internal_notes.as_deref())
            .await?;

        let outcome = self.refresh_after_mutation(id).await;
        let (page, size) = self.review_page_request();
        let admin_filters = self.last_admin_filters();
        let (queue, inbox) = tokio::join!(
            self.load_review_queue(page, size),
            self.load_admin_inbox(admin_filters),
        );
        if let Err(e) = queue {
            log::warn!("Review queue reload after approval failed: {e}");
        }
        if let Err(e) = inbox {
            log::warn!("Inbox reload after approval failed: {e}");
        }
        Ok(outcome)
    }

    /// Record reviewer working notes for a queued ticket; kept across queue
    /// reloads until the session ends.
    pub fn set_review_notes(&self, id: &str, notes: &str) {
        let mut state = self.state_mut();
        state.review.notes.insert(id.to_string(), notes.to_string());
        if let Some(item) = state.review.items.iter_mut().find(|i| i.ticket_id == id) {
            item.internal_notes = notes.to_string();
        }
    }

    /// Toggle the reviewer-local spam marker on a queued ticket.
    pub fn mark_review_spam(&self, id: &str, spam: bool) {
        let mut state = self.state_mut();
        if let Some(item) = state.review.items.iter_mut().find(|i| i.ticket_id == id) {
            item.spam = spam;
        }
    }

    /// Drop a row from the local queue view without touching the backend.
    pub fn remove_review_item(&self, id: &str) {
        let mut state = self.state_mut();
        state.review.items.retain(|i| i.ticket_id != id);
    }

    // ----- reads ------------------------------------------------------------

    pub fn ticket(&self, id: &str) -> Option<Ticket> {
        self.state().canonical.get(id).cloned()
    }

    /// The student page, resolved through the canonical map.
    pub fn user_tickets(&self) -> PageView {
        let state = self.state();
        state.resolve(&state.user_page)
    }

    /// The admin inbox page, resolved through the canonical map.
    pub fn admin_tickets(&self) -> PageView {
        let state = self.state();
        state.resolve(&state.admin_page)
    }

    pub fn review_queue(&self) -> ReviewQueueView {
        self.review_view(&self.state())
    }

    pub fn analytics(&self) -> AnalyticsView {
        self.analytics_view(&self.state())
    }

    /// Every cached ticket, most recently updated first. Tickets that never
    /// reported an update time sort last.
    pub fn all_tickets(&self) -> Vec<Ticket> {
        let state = self.state();
        let mut tickets: Vec<Ticket> = state.canonical.values().cloned().collect();
        tickets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        tickets
    }

    /// Dashboard buckets derived from the student page, not the whole map.
    pub fn user_metrics(&self) -> UserMetrics {
        let view = self.user_tickets();
        UserMetrics::from_tickets(&view.tickets)
    }

    /// Admin KPIs from the analytics summary; before the summary loads the
    /// zeroed fallback still reports the live review-queue depth.
    pub fn admin_metrics(&self) -> AdminMetrics {
        let state = self.state();
        match &state.analytics {
            Some(snapshot) => AdminMetrics::from_summary(&snapshot.summary),
            None => AdminMetrics::fallback(state.review.items.len()),
        }
    }

    pub fn last_user_filters(&self) -> TicketFilters {
        self.state().last_user_filters.clone()
    }

    pub fn last_admin_filters(&self) -> TicketFilters {
        self.state().last_admin_filters.clone()
    }

    /// Drop all cached state. Used at logout and after an unauthorized
    /// teardown.
    pub fn clear(&self) {
        *self.state_mut() = CacheState::default();
    }

    // ----- internals --------------------------------------------------------

    /// Phase two of every mutation: re-fetch the ticket and merge. A fetch
    /// failure here never fails the operation; the write already landed.
    async fn refresh_after_mutation(&self, id: &str) -> MutationOutcome {
        match self.load_ticket(id).await {
            Ok(ticket) => MutationOutcome::Refreshed(ticket),
            Err(error) => {
                log::warn!("Ticket {id} was updated but the refresh failed: {error}");
                MutationOutcome::RefreshFailed { error }
            }
        }
    }

    fn review_page_request(&self) -> (u32, u32) {
        let state = self.state();
        (state.review.meta.page, state.review.meta.size)
    }

    fn review_view(&self, state: &CacheState) -> ReviewQueueView {
        ReviewQueueView {
            entries: state
                .review
                .items
                .iter()
                .map(|item| ReviewEntry {
                    review: item.clone(),
                    ticket: state.canonical.get(&item.ticket_id).cloned(),
                })
                .collect(),
            meta: state.review.meta,
        }
    }

    fn analytics_view(&self, state: &CacheState) -> AnalyticsView {
        match &state.analytics {
            Some(snapshot) => AnalyticsView {
                summary: Some(snapshot.summary.clone()),
                trends: snapshot.trends.clone(),
                categories: snapshot.categories.clone(),
                critical_alerts: snapshot
                    .critical_ids
                    .iter()
                    .filter_map(|id| state.canonical.get(id))
                    .cloned()
                    .collect(),
            },
            None => AnalyticsView::default(),
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ReviewPage, TicketPage};
    use crate::models::{
        AuthSession, CategoryTag, Message, NewTicket, SenderKind, TicketStatus, UserRef,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn ts(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn detail_ticket(id: &str, status: TicketStatus, updated: i64) -> Ticket {
        let mut ticket = Ticket::shell(id);
        ticket.title = format!("Ticket {id}");
        ticket.description = "Detail description".to_string();
        ticket.status = status;
        ticket.categories = vec![CategoryTag {
            label: "Electrical".to_string(),
            primary: true,
            confidence: None,
        }];
        ticket.messages = Some(vec![Message {
            id: format!("{id}-m1"),
            sender: SenderKind::Student,
            sender_name: "Asha".to_string(),
            text: "Original report".to_string(),
            created_at: Some(ts(updated - 10)),
            internal: false,
        }]);
        ticket.attachments = Some(Vec::new());
        ticket.updated_at = Some(ts(updated));
        ticket
    }

    /// A list projection: scalars only, detail groups absent.
    fn list_row(ticket: &Ticket) -> Ticket {
        let mut row = Ticket::shell(&ticket.id);
        row.title = ticket.title.clone();
        row.description = ticket.description.clone();
        row.status = ticket.status.clone();
        row.priority = ticket.priority;
        row.categories = ticket.categories.clone();
        row.updated_at = ticket.updated_at;
        row
    }

    #[derive(Default)]
    struct FakeState {
        tickets: HashMap<String, Ticket>,
        user_ids: Vec<String>,
        admin_ids: Vec<String>,
        review_rows: Vec<(ReviewItem, Ticket)>,
        summary: Option<SummaryKpis>,
        fail_detail: bool,
        fail_summary: bool,
        next_id: u32,
        calls: Vec<String>,
    }

    struct FakeBackend {
        state: Mutex<FakeState>,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(FakeState {
                    next_id: 100,
                    ..FakeState::default()
                }),
            })
        }

        fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
            f(&mut self.state.lock().unwrap())
        }

        fn calls(&self) -> Vec<String> {
            self.with(|s| s.calls.clone())
        }

        fn seed_ticket(&self, ticket: Ticket, on_user_page: bool, on_admin_page: bool) {
            self.with(|s| {
                if on_user_page {
                    s.user_ids.push(ticket.id.clone());
                }
                if on_admin_page {
                    s.admin_ids.push(ticket.id.clone());
                }
                s.tickets.insert(ticket.id.clone(), ticket);
            });
        }

        fn page_of(state: &FakeState, ids: &[String]) -> TicketPage {
            let tickets = ids
                .iter()
                .filter_map(|id| state.tickets.get(id))
                .map(list_row)
                .collect::<Vec<_>>();
            let meta = PageMeta {
                total_elements: tickets.len() as u64,
                ..PageMeta::default()
            };
            (tickets, meta)
        }
    }

    fn unsupported<T>() -> Result<T> {
        Err(ApiError::validation("not scripted for this test"))
    }

    #[async_trait]
    impl ComplaintsBackend for FakeBackend {
        async fn login(&self, _email: &str, _password: &str) -> Result<AuthSession> {
            unsupported()
        }

        async fn signup(&self, _name: &str, _email: &str, _password: &str) -> Result<AuthSession> {
            unsupported()
        }

        async fn me(&self) -> Result<UserRef> {
            unsupported()
        }

        async fn list_my_tickets(&self, _filters: &TicketFilters) -> Result<TicketPage> {
            self.with(|s| {
                s.calls.push("list_my_tickets".to_string());
                Ok(Self::page_of(s, &s.user_ids))
            })
        }

        async fn fetch_ticket(&self, id: &str) -> Result<Ticket> {
            self.with(|s| {
                s.calls.push(format!("fetch_ticket {id}"));
                if s.fail_detail {
                    return Err(ApiError::http(500, "detail unavailable", None));
                }
                s.tickets
                    .get(id)
                    .cloned()
                    .ok_or_else(|| ApiError::http(404, "not found", None))
            })
        }

        async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket> {
            self.with(|s| {
                s.next_id += 1;
                let id = s.next_id.to_string();
                let mut created = Ticket::shell(&id);
                created.title = ticket.title.clone();
                created.description = ticket.description.clone();
                created.updated_at = Some(ts(1_000));
                s.tickets.insert(id.clone(), created.clone());
                // a new complaint shows up on its owner's page
                s.user_ids.push(id.clone());
                s.calls.push(format!("create_ticket {id}"));
                Ok(created)
            })
        }

        async fn add_message(&self, id: &str, text: &str, _internal: bool) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!("add_message {id}"));
                if let Some(ticket) = s.tickets.get_mut(id) {
                    let messages = ticket.messages.get_or_insert_with(Vec::new);
                    messages.push(Message {
                        id: format!("{id}-m{}", messages.len() + 1),
                        sender: SenderKind::Admin,
                        sender_name: "Meera".to_string(),
                        text: text.to_string(),
                        created_at: Some(ts(2_000)),
                        internal: false,
                    });
                    ticket.updated_at = Some(ts(2_000));
                }
                Ok(())
            })
        }

        async fn upload_attachments(
            &self,
            id: &str,
            files: Vec<NewAttachment>,
            rerun_prediction: bool,
        ) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!(
                    "upload_attachments {id} files={} rerun={rerun_prediction}",
                    files.len()
                ));
                Ok(())
            })
        }

        async fn reopen_ticket(&self, id: &str, _reason: &str) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!("reopen_ticket {id}"));
                if let Some(ticket) = s.tickets.get_mut(id) {
                    ticket.status = TicketStatus::Reopened;
                }
                Ok(())
            })
        }

        async fn send_feedback(&self, id: &str, rating: i32, _comment: Option<&str>) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!("send_feedback {id} rating={rating}"));
                if let Some(ticket) = s.tickets.get_mut(id) {
                    ticket.feedback_rating = Some(rating);
                }
                Ok(())
            })
        }

        async fn admin_inbox(&self, filters: &TicketFilters) -> Result<TicketPage> {
            self.with(|s| {
                s.calls.push(format!(
                    "admin_inbox priority={:?}",
                    filters.priority.map(|p| p.wire_token())
                ));
                Ok(Self::page_of(s, &s.admin_ids))
            })
        }

        async fn fetch_admin_ticket(&self, id: &str) -> Result<Ticket> {
            self.with(|s| {
                s.calls.push(format!("fetch_admin_ticket {id}"));
                if s.fail_detail {
                    return Err(ApiError::http(500, "detail unavailable", None));
                }
                s.tickets
                    .get(id)
                    .cloned()
                    .ok_or_else(|| ApiError::http(404, "not found", None))
            })
        }

        async fn assign_ticket(&self, id: &str, request: &AssignRequest) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!(
                    "assign_ticket {id} owner={} reason={:?}",
                    request.owner_user_id, request.reason
                ));
                Ok(())
            })
        }

        async fn set_status(
            &self,
            id: &str,
            status: &TicketStatus,
            _comment: &str,
        ) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!("set_status {id} {}", status.wire_token()));
                if let Some(ticket) = s.tickets.get_mut(id) {
                    ticket.status = status.clone();
                    ticket.updated_at = Some(ts(3_000));
                }
                Ok(())
            })
        }

        async fn escalate_ticket(&self, id: &str, _request: &EscalationRequest) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!("escalate_ticket {id}"));
                if let Some(ticket) = s.tickets.get_mut(id) {
                    ticket.status = TicketStatus::Escalated;
                }
                Ok(())
            })
        }

        async fn resolve_ticket(
            &self,
            id: &str,
            _note: &str,
            _attachment_ids: &[String],
        ) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!("resolve_ticket {id}"));
                if let Some(ticket) = s.tickets.get_mut(id) {
                    ticket.status = TicketStatus::Resolved;
                }
                Ok(())
            })
        }

        async fn update_classification(
            &self,
            id: &str,
            categories: &[String],
            _priority: Option<Priority>,
        ) -> Result<()> {
            self.with(|s| {
                s.calls
                    .push(format!("update_classification {id} {categories:?}"));
                Ok(())
            })
        }

        async fn review_queue(&self, _page: u32, _size: u32) -> Result<ReviewPage> {
            self.with(|s| {
                s.calls.push("review_queue".to_string());
                let meta = PageMeta {
                    total_elements: s.review_rows.len() as u64,
                    ..PageMeta::default()
                };
                Ok((s.review_rows.clone(), meta))
            })
        }

        async fn edit_review(&self, id: &str, decision: &ReviewDecision) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!(
                    "edit_review {id} categories={:?} owner={:?}",
                    decision.categories, decision.owner_user_id
                ));
                Ok(())
            })
        }

        async fn approve_review(&self, id: &str, _internal_notes: Option<&str>) -> Result<()> {
            self.with(|s| {
                s.calls.push(format!("approve_review {id}"));
                s.review_rows.retain(|(item, _)| item.ticket_id != id);
                Ok(())
            })
        }

        async fn analytics_summary(&self) -> Result<SummaryKpis> {
            self.with(|s| {
                s.calls.push("analytics_summary".to_string());
                if s.fail_summary {
                    return Err(ApiError::http(503, "summary unavailable", None));
                }
                s.summary
                    .clone()
                    .ok_or_else(|| ApiError::http(503, "summary unavailable", None))
            })
        }

        async fn analytics_trends(&self, days: u32) -> Result<Vec<TrendPoint>> {
            self.with(|s| {
                s.calls.push(format!("analytics_trends {days}"));
                Ok(vec![TrendPoint {
                    day: "2025-03-01".to_string(),
                    created: 4,
                    resolved: 2,
                }])
            })
        }

        async fn analytics_by_category(&self) -> Result<Vec<CategorySlice>> {
            self.with(|s| {
                s.calls.push("analytics_by_category".to_string());
                Ok(vec![CategorySlice {
                    name: "NETWORK WIFI".to_string(),
                    count: 3,
                }])
            })
        }
    }

    fn make_cache(backend: &Arc<FakeBackend>) -> TicketCache {
        TicketCache::new(Arc::clone(backend) as Arc<dyn ComplaintsBackend>)
    }

    #[tokio::test]
    async fn status_change_is_visible_in_every_view() {
        let backend = FakeBackend::new();
        let detail = detail_ticket("7", TicketStatus::New, 500);
        backend.seed_ticket(detail, true, true);

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_user_tickets(TicketFilters::page_request(0, 20)).await.unwrap();
        cache.load_admin_inbox(TicketFilters::page_request(0, 20)).await.unwrap();

        let outcome = cache
            .change_status("7", TicketStatus::Resolved, None)
            .await
            .unwrap();
        assert!(outcome.is_refreshed());

        // both pages resolve through the canonical map, so the change shows
        // everywhere without reloading the pages themselves
        assert_eq!(cache.user_tickets().tickets[0].status, TicketStatus::Resolved);
        assert_eq!(cache.admin_tickets().tickets[0].status, TicketStatus::Resolved);
        assert_eq!(cache.ticket("7").unwrap().status, TicketStatus::Resolved);
    }

    #[tokio::test]
    async fn list_reload_never_erases_detail_fields() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("7", TicketStatus::New, 500), true, false);

        let cache = make_cache(&backend);
        // detail first, then the shallow list projection arrives
        cache.load_ticket("7").await.unwrap();
        cache.load_user_tickets(TicketFilters::page_request(0, 20)).await.unwrap();

        let cached = cache.ticket("7").unwrap();
        assert!(cached.messages.is_some(), "messages survive the list reload");
        assert_eq!(cached.messages.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mutation_with_failed_refresh_reports_stale_not_error() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("7", TicketStatus::New, 500), false, true);

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_ticket("7").await.unwrap();

        backend.with(|s| s.fail_detail = true);
        let outcome = cache
            .change_status("7", TicketStatus::InProgress, Some("taking it"))
            .await
            .unwrap();

        match outcome {
            MutationOutcome::RefreshFailed { error } => assert_eq!(error.status(), Some(500)),
            MutationOutcome::Refreshed(_) => panic!("refresh should have failed"),
        }
        // cache still shows the last known state, not the new one
        assert_eq!(cache.ticket("7").unwrap().status, TicketStatus::New);
    }

    #[tokio::test]
    async fn create_uploads_refetches_and_reloads_the_user_page() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("1", TicketStatus::New, 100), true, false);

        let cache = make_cache(&backend);
        cache.load_user_tickets(TicketFilters::page_request(0, 20)).await.unwrap();

        let created = cache
            .create_ticket(NewTicket {
                title: "Water cooler leaking".to_string(),
                description: "Puddle near the stairs".to_string(),
                attachments: vec![NewAttachment {
                    file_name: "photo.jpg".to_string(),
                    mime_type: "image/jpeg".to_string(),
                    bytes: vec![1, 2, 3],
                }],
                ..NewTicket::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id, "101");
        let calls = backend.calls();
        assert!(calls.contains(&"upload_attachments 101 files=1 rerun=true".to_string()));
        assert!(calls.contains(&"fetch_ticket 101".to_string()));
        // user page had content, so it reloads under the last filters
        assert_eq!(calls.iter().filter(|c| c.as_str() == "list_my_tickets").count(), 2);

        // the created ticket is readable immediately and the reloaded page
        // lists it
        let cached = cache.ticket("101").expect("created ticket is cached");
        assert_eq!(cached.title, "Water cooler leaking");
        assert_eq!(cached.description, "Puddle near the stairs");
        assert!(cache.user_tickets().tickets.iter().any(|t| t.id == "101"));
    }

    #[tokio::test]
    async fn create_without_prior_page_skips_the_reload() {
        let backend = FakeBackend::new();
        let cache = make_cache(&backend);

        cache
            .create_ticket(NewTicket {
                title: "t".to_string(),
                description: "d".to_string(),
                ..NewTicket::default()
            })
            .await
            .unwrap();

        assert!(!backend.calls().contains(&"list_my_tickets".to_string()));
    }

    #[tokio::test]
    async fn review_reload_keeps_notes_and_draft_merge_preserves_detail() {
        let backend = FakeBackend::new();
        let detail = detail_ticket("12", TicketStatus::New, 700);
        backend.seed_ticket(detail.clone(), false, true);

        let mut draft = list_row(&detail);
        draft.needs_review = Some(true);
        backend.with(|s| {
            s.review_rows.push((
                ReviewItem {
                    ticket_id: "12".to_string(),
                    highlighted_keywords: vec!["leak".to_string()],
                    internal_notes: String::new(),
                    spam: false,
                },
                draft,
            ))
        });

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_ticket("12").await.unwrap();
        cache.load_review_queue(0, 20).await.unwrap();
        cache.set_review_notes("12", "checking with facilities");
        cache.load_review_queue(0, 20).await.unwrap();

        let view = cache.review_queue();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].review.internal_notes, "checking with facilities");

        // the draft projection carried no messages, so the detail survives
        let cached = view.entries[0].ticket.as_ref().unwrap();
        assert!(cached.messages.is_some());
        assert!(cached.in_review());
    }

    #[tokio::test]
    async fn spam_approval_is_rejected_before_any_call() {
        let backend = FakeBackend::new();
        let cache = make_cache(&backend);

        let err = cache
            .approve_review(
                "12",
                &ReviewDecision {
                    mark_spam: true,
                    ..ReviewDecision::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn spam_marker_and_dismissal_stay_local() {
        let backend = FakeBackend::new();
        let detail = detail_ticket("12", TicketStatus::New, 700);
        backend.seed_ticket(detail.clone(), false, true);
        backend.with(|s| {
            s.review_rows.push((
                ReviewItem {
                    ticket_id: "12".to_string(),
                    highlighted_keywords: Vec::new(),
                    internal_notes: String::new(),
                    spam: false,
                },
                list_row(&detail),
            ))
        });

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_review_queue(0, 20).await.unwrap();
        let loads_before = backend.calls().len();

        cache.mark_review_spam("12", true);
        assert!(cache.review_queue().entries[0].review.spam);

        cache.remove_review_item("12");
        assert!(cache.review_queue().entries.is_empty());
        assert_eq!(backend.calls().len(), loads_before, "no backend traffic");
    }

    #[tokio::test]
    async fn approval_with_edits_writes_them_first() {
        let backend = FakeBackend::new();
        let detail = detail_ticket("12", TicketStatus::New, 700);
        backend.seed_ticket(detail.clone(), false, true);
        backend.with(|s| {
            s.review_rows.push((
                ReviewItem {
                    ticket_id: "12".to_string(),
                    highlighted_keywords: Vec::new(),
                    internal_notes: String::new(),
                    spam: false,
                },
                list_row(&detail),
            ))
        });

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_review_queue(0, 20).await.unwrap();

        cache
            .approve_review(
                "12",
                &ReviewDecision {
                    categories: vec!["Electrical".to_string()],
                    priority: Some(Priority::High),
                    ..ReviewDecision::default()
                },
            )
            .await
            .unwrap();

        let calls = backend.calls();
        let edit_pos = calls.iter().position(|c| c.starts_with("edit_review 12"));
        let approve_pos = calls.iter().position(|c| c.starts_with("approve_review 12"));
        assert!(edit_pos.unwrap() < approve_pos.unwrap());
        // queue and inbox both reload afterwards
        assert_eq!(calls.iter().filter(|c| c.as_str() == "review_queue").count(), 2);
        assert!(calls.iter().any(|c| c.starts_with("admin_inbox")));
        // the queue is empty after approval
        assert!(cache.review_queue().entries.is_empty());
    }

    #[tokio::test]
    async fn classification_fix_routes_through_review_when_queued() {
        let backend = FakeBackend::new();
        let mut detail = detail_ticket("12", TicketStatus::New, 700);
        detail.needs_review = Some(true);
        backend.seed_ticket(detail, false, true);

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_ticket("12").await.unwrap();

        cache
            .update_classification("12", vec!["Electrical".to_string()], Some(Priority::High))
            .await
            .unwrap();

        let calls = backend.calls();
        assert!(calls.iter().any(|c| c.starts_with("edit_review 12")));
        assert!(!calls.iter().any(|c| c.starts_with("update_classification")));
    }

    #[tokio::test]
    async fn classification_fix_patches_directly_when_not_queued() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("9", TicketStatus::New, 700), false, true);

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_ticket("9").await.unwrap();

        cache
            .update_classification("9", vec!["Plumbing".to_string()], None)
            .await
            .unwrap();

        let calls = backend.calls();
        assert!(calls.iter().any(|c| c.starts_with("update_classification 9")));
        assert!(!calls.iter().any(|c| c.starts_with("edit_review")));
    }

    #[tokio::test]
    async fn admin_metrics_fall_back_to_queue_depth() {
        let backend = FakeBackend::new();
        let detail = detail_ticket("12", TicketStatus::New, 700);
        backend.seed_ticket(detail.clone(), false, true);
        backend.with(|s| {
            s.review_rows.push((
                ReviewItem {
                    ticket_id: "12".to_string(),
                    highlighted_keywords: Vec::new(),
                    internal_notes: String::new(),
                    spam: false,
                },
                list_row(&detail),
            ))
        });

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        cache.load_review_queue(0, 20).await.unwrap();

        let fallback = cache.admin_metrics();
        assert_eq!(fallback.manual_review_count, 1);
        assert_eq!(fallback.open, 0);

        backend.with(|s| {
            s.summary = Some(SummaryKpis {
                open: 9,
                unassigned: 2,
                sla_breaches: 1,
                avg_resolution_hours: 12.0,
                manual_review_count: 5,
            })
        });
        cache.load_analytics().await.unwrap();
        let metrics = cache.admin_metrics();
        assert_eq!(metrics.open, 9);
        assert_eq!(metrics.manual_review_count, 5);
    }

    #[tokio::test]
    async fn analytics_load_is_all_or_nothing() {
        let backend = FakeBackend::new();
        backend.with(|s| s.fail_summary = true);

        let cache = make_cache(&backend);
        cache.set_admin_scope(true);
        assert!(cache.load_analytics().await.is_err());
        assert!(cache.analytics().summary.is_none());
    }

    #[tokio::test]
    async fn bootstrap_routes_by_scope() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("1", TicketStatus::New, 100), true, true);

        let student_cache = make_cache(&backend);
        student_cache.bootstrap().await.unwrap();
        let calls = backend.calls();
        assert!(calls.contains(&"list_my_tickets".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("admin_inbox")));

        backend.with(|s| s.calls.clear());

        let admin_cache = make_cache(&backend);
        admin_cache.set_admin_scope(true);
        // analytics summary is missing; bootstrap still succeeds
        admin_cache.bootstrap().await.unwrap();
        let calls = backend.calls();
        assert!(calls.iter().any(|c| c.starts_with("admin_inbox")));
        assert!(calls.contains(&"review_queue".to_string()));
        assert!(!admin_cache.admin_tickets().tickets.is_empty());
    }

    #[tokio::test]
    async fn all_tickets_sort_most_recent_first() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("1", TicketStatus::New, 100), true, false);
        backend.seed_ticket(detail_ticket("2", TicketStatus::New, 300), true, false);
        backend.seed_ticket(detail_ticket("3", TicketStatus::New, 200), true, false);

        let cache = make_cache(&backend);
        cache.load_user_tickets(TicketFilters::page_request(0, 20)).await.unwrap();

        let ids: Vec<String> = cache.all_tickets().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[tokio::test]
    async fn user_metrics_derive_from_the_user_page_only() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("1", TicketStatus::New, 100), true, false);
        backend.seed_ticket(detail_ticket("2", TicketStatus::Resolved, 200), true, false);
        // on the admin page, not the student's
        backend.seed_ticket(detail_ticket("3", TicketStatus::InProgress, 300), false, true);

        let cache = make_cache(&backend);
        cache.load_user_tickets(TicketFilters::page_request(0, 20)).await.unwrap();
        cache.load_admin_inbox(TicketFilters::page_request(0, 20)).await.unwrap();

        let metrics = cache.user_metrics();
        assert_eq!(metrics.open, 1);
        assert_eq!(metrics.resolved, 1);
        assert_eq!(metrics.in_progress, 0, "admin page tickets do not count");
    }

    #[tokio::test]
    async fn add_message_returns_the_refreshed_ticket() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("7", TicketStatus::InProgress, 500), true, false);

        let cache = make_cache(&backend);
        cache.load_ticket("7").await.unwrap();

        let outcome = cache.add_message("7", "Any update?", false).await.unwrap();
        let ticket = outcome.ticket().unwrap();
        let messages = ticket.messages.as_deref().unwrap();
        assert_eq!(messages.last().unwrap().text, "Any update?");
    }

    #[tokio::test]
    async fn clear_wipes_every_view() {
        let backend = FakeBackend::new();
        backend.seed_ticket(detail_ticket("1", TicketStatus::New, 100), true, true);

        let cache = make_cache(&backend);
        cache.load_user_tickets(TicketFilters::page_request(0, 20)).await.unwrap();
        cache.load_admin_inbox(TicketFilters::page_request(0, 20)).await.unwrap();
        cache.clear();

        assert!(cache.ticket("1").is_none());
        assert!(cache.user_tickets().tickets.is_empty());
        assert!(cache.admin_tickets().tickets.is_empty());
        assert!(cache.all_tickets().is_empty());
    }
}
