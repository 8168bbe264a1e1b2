// src/api/http.rs

//! HTTP implementation of [`ComplaintsBackend`].
//!
//! Each method builds the endpoint's query/body, runs it through
//! [`Transport`], and maps the wire payload into domain types. Optional
//! body fields the caller did not provide are pruned instead of sent as
//! nulls, matching what the backend expects from its own frontend.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{ComplaintsBackend, ReviewPage, TicketPage};
use crate::error::{ApiError, Result};
use crate::mappers;
use crate::models::wire::{
    CategoryCountDto, ComplaintDto, LoginResponseDto, PageEnvelopeDto, ReviewQueueItemDto,
    SummaryDto, TrendPointDto, UserDto,
};
use crate::models::{
    AssignRequest, AuthSession, CategorySlice, EscalationRequest, NewAttachment, NewTicket,
    Priority, ReviewDecision, SummaryKpis, Ticket, TicketFilters, TicketStatus, TrendPoint,
    UserRef,
};
use crate::transport::{Query, Transport};

/// The real backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    transport: Transport,
}

impl HttpBackend {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    fn user_list_query(filters: &TicketFilters) -> Query {
        let mut query = Query::new();
        query.push("mine", "true");
        query.push_opt(
            "status",
            filters.status.as_ref().map(TicketStatus::wire_token),
        );
        query.push_opt(
            "category",
            filters.category.as_deref().map(mappers::to_wire_category),
        );
        query.push_opt("q", filters.search.as_deref());
        query.push_opt("from", filters.from.as_deref());
        query.push_opt("to", filters.to.as_deref());
        query.push("page", filters.page_or_default());
        query.push("size", filters.size_or_default());
        query
    }

    fn inbox_query(filters: &TicketFilters) -> Query {
        let mut query = Query::new();
        query.push_opt(
            "status",
            filters.status.as_ref().map(TicketStatus::wire_token),
        );
        query.push_opt(
            "category",
            filters.category.as_deref().map(mappers::to_wire_category),
        );
        query.push_opt("priority", filters.priority.map(|p| p.wire_token()));
        query.push_opt("confidenceLevel", filters.confidence_level.as_deref());
        query.push_opt("assignedTo", filters.assigned_to.as_deref());
        query.push_opt("location", filters.location.as_deref());
        query.push_opt("needsReview", filters.needs_review);
        query.push_opt("q", filters.search.as_deref());
        query.push("page", filters.page_or_default());
        query.push("size", filters.size_or_default());
        query
    }

    fn map_ticket_page(envelope: PageEnvelopeDto<ComplaintDto>) -> TicketPage {
        let meta = mappers::map_page_meta(&envelope);
        let tickets = envelope
            .content
            .into_iter()
            .filter_map(mappers::map_ticket)
            .collect();
        (tickets, meta)
    }

    fn session_from(dto: LoginResponseDto) -> Result<AuthSession> {
        let access_token = dto
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::validation("auth response carried no access token"))?;
        let user = dto
            .user
            .map(mappers::map_user)
            .ok_or_else(|| ApiError::validation("auth response carried no user profile"))?;
        Ok(AuthSession {
            access_token,
            token_type: dto.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at: dto.expires_at,
            user,
        })
    }
}

/// Drop null entries from a JSON object so absent optionals are not sent.
fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
        }
        other => other,
    }
}

#[async_trait]
impl ComplaintsBackend for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let dto: LoginResponseDto = self
            .transport
            .post(
                "/api/auth/login",
                &json!({ "email": email, "password": password }),
            )
            .await?;
        Self::session_from(dto)
    }

    async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthSession> {
        let dto: LoginResponseDto = self
            .transport
            .post(
                "/api/auth/signup",
                &json!({ "name": name, "email": email, "password": password }),
            )
            .await?;
        Self::session_from(dto)
    }

    async fn me(&self) -> Result<UserRef> {
        let dto: UserDto = self.transport.get("/api/auth/me", &Query::new()).await?;
        Ok(mappers::map_user(dto))
    }

    async fn list_my_tickets(&self, filters: &TicketFilters) -> Result<TicketPage> {
        let envelope: PageEnvelopeDto<ComplaintDto> = self
            .transport
            .get("/api/complaints", &Self::user_list_query(filters))
            .await?;
        Ok(Self::map_ticket_page(envelope))
    }

    async fn fetch_ticket(&self, id: &str) -> Result<Ticket> {
        let dto: ComplaintDto = self
            .transport
            .get(&format!("/api/complaints/{id}"), &Query::new())
            .await?;
        mappers::map_ticket(dto)
            .ok_or_else(|| ApiError::validation("complaint response carried no id"))
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket> {
        ticket.validate()?;
        let body = prune_nulls(json!({
            "title": ticket.title,
            "description": ticket.description,
            "hostel": ticket.location.hostel,
            "building": ticket.location.building,
            "room": ticket.location.room,
            "preferredVisitSlot": ticket.preferred_visit_slot,
            "anonymous": ticket.anonymous,
        }));
        let dto: ComplaintDto = self.transport.post("/api/complaints", &body).await?;
        mappers::map_ticket(dto)
            .ok_or_else(|| ApiError::validation("created complaint carried no id"))
    }

    async fn add_message(&self, id: &str, text: &str, internal: bool) -> Result<()> {
        self.transport
            .post_discard(
                &format!("/api/complaints/{id}/messages"),
                &json!({ "message": text, "internal": internal }),
            )
            .await
    }

    async fn upload_attachments(
        &self,
        id: &str,
        files: Vec<NewAttachment>,
        rerun_prediction: bool,
    ) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let mut query = Query::new();
        query.push("rerunPrediction", rerun_prediction);
        self.transport
            .upload::<Value>(&format!("/api/complaints/{id}/attachments"), &query, files)
            .await
            .map(|_| ())
    }

    async fn reopen_ticket(&self, id: &str, reason: &str) -> Result<()> {
        self.transport
            .post_discard(
                &format!("/api/complaints/{id}/reopen"),
                &json!({ "reason": reason }),
            )
            .await
    }

    async fn send_feedback(&self, id: &str, rating: i32, comment: Option<&str>) -> Result<()> {
        let body = prune_nulls(json!({ "rating": rating, "comment": comment }));
        self.transport
            .post_discard(&format!("/api/complaints/{id}/feedback"), &body)
            .await
    }

    async fn admin_inbox(&self, filters: &TicketFilters) -> Result<TicketPage> {
        let envelope: PageEnvelopeDto<ComplaintDto> = self
            .transport
            .get("/api/admin/inbox", &Self::inbox_query(filters))
            .await?;
        Ok(Self::map_ticket_page(envelope))
    }

    async fn fetch_admin_ticket(&self, id: &str) -> Result<Ticket> {
        let dto: ComplaintDto = self
            .transport
            .get(&format!("/api/admin/complaints/{id}"), &Query::new())
            .await?;
        mappers::map_ticket(dto)
            .ok_or_else(|| ApiError::validation("complaint response carried no id"))
    }

    async fn assign_ticket(&self, id: &str, request: &AssignRequest) -> Result<()> {
        let body = prune_nulls(json!({
            "ownerUserId": request.owner_user_id,
            "collaboratorUserIds": request.collaborator_user_ids,
            "reason": request.reason,
        }));
        self.transport
            .post_discard(&format!("/api/admin/complaints/{id}/assign"), &body)
            .await
    }

    async fn set_status(&self, id: &str, status: &TicketStatus, comment: &str) -> Result<()> {
        self.transport
            .post_discard(
                &format!("/api/admin/complaints/{id}/status"),
                &json!({ "status": status.wire_token(), "comment": comment }),
            )
            .await
    }

    async fn escalate_ticket(&self, id: &str, request: &EscalationRequest) -> Result<()> {
        let body = prune_nulls(json!({
            "level": request.level,
            "escalatedToRole": request.escalated_to_role,
            "reason": request.reason,
        }));
        self.transport
            .post_discard(&format!("/api/admin/complaints/{id}/escalate"), &body)
            .await
    }

    async fn resolve_ticket(&self, id: &str, note: &str, attachment_ids: &[String]) -> Result<()> {
        self.transport
            .post_discard(
                &format!("/api/admin/complaints/{id}/resolve"),
                &json!({ "resolutionNote": note, "attachmentIds": attachment_ids }),
            )
            .await
    }

    async fn update_classification(
        &self,
        id: &str,
        categories: &[String],
        priority: Option<Priority>,
    ) -> Result<()> {
        let wire: Vec<String> = categories
            .iter()
            .map(|c| mappers::to_wire_category(c))
            .collect();
        let body = prune_nulls(json!({
            "categories": wire,
            "primaryCategory": wire.first(),
            "priority": priority.map(|p| p.wire_token()),
        }));
        self.transport
            .patch::<Value>(&format!("/api/admin/complaints/{id}"), &body)
            .await
            .map(|_| ())
    }

    async fn review_queue(&self, page: u32, size: u32) -> Result<ReviewPage> {
        let mut query = Query::new();
        query.push("page", page);
        query.push("size", size);
        let envelope: PageEnvelopeDto<ReviewQueueItemDto> = self
            .transport
            .get("/api/admin/review-queue", &query)
            .await?;
        let meta = mappers::map_page_meta(&envelope);
        let entries = envelope
            .content
            .into_iter()
            .filter_map(mappers::map_review_item)
            .collect();
        Ok((entries, meta))
    }

    async fn edit_review(&self, id: &str, decision: &ReviewDecision) -> Result<()> {
        let categories: Vec<String> = decision
            .categories
            .iter()
            .map(|c| mappers::to_wire_category(c))
            .collect();
        let body = prune_nulls(json!({
            "categories": categories,
            "primaryCategory": categories.first(),
            "priority": decision.priority.map(|p| p.wire_token()),
            "ownerUserId": decision.owner_user_id,
            "collaboratorUserIds": decision.collaborator_user_ids,
            "internalNotes": decision.internal_notes,
        }));
        self.transport
            .post_discard(&format!("/api/admin/review-queue/{id}/edit"), &body)
            .await
    }

    async fn approve_review(&self, id: &str, internal_notes: Option<&str>) -> Result<()> {
        let body = prune_nulls(json!({ "internalNotes": internal_notes }));
        self.transport
            .post_discard(&format!("/api/admin/review-queue/{id}/approve"), &body)
            .await
    }

    async fn analytics_summary(&self) -> Result<SummaryKpis> {
        let dto: SummaryDto = self
            .transport
            .get("/api/admin/analytics/summary", &Query::new())
            .await?;
        Ok(mappers::map_summary(dto))
    }

    async fn analytics_trends(&self, days: u32) -> Result<Vec<TrendPoint>> {
        let mut query = Query::new();
        query.push("days", days);
        let dtos: Vec<TrendPointDto> = self
            .transport
            .get("/api/admin/analytics/trends", &query)
            .await?;
        Ok(mappers::map_trends(dtos))
    }

    async fn analytics_by_category(&self) -> Result<Vec<CategorySlice>> {
        let dtos: Vec<CategoryCountDto> = self
            .transport
            .get("/api/admin/analytics/by-category", &Query::new())
            .await?;
        Ok(mappers::map_category_counts(dtos))
    }
}
