//! SCMS CLI
//!
//! Command-line client for the campus complaint-tracking service.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use scms_client::{
    cache::MutationOutcome,
    classify::{Classifier, KeywordClassifier, Suggestion},
    client::ScmsClient,
    config::ClientConfig,
    error::{ApiError, Result},
    models::{
        AnalyticsView, AssignRequest, EscalationRequest, Location, NewAttachment, NewTicket,
        PageView, Priority, ReviewDecision, ReviewQueueView, Ticket, TicketFilters, TicketStatus,
    },
};
use unicode_segmentation::UnicodeSegmentation;

/// scms - Student Complaint Management System client
#[derive(Parser, Debug)]
#[command(name = "scms", version, about = "Campus complaint tracking client")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "scms.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Create an account and sign in with it
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign out and drop the persisted session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Submit a new complaint
    Submit {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        hostel: Option<String>,

        #[arg(long)]
        building: Option<String>,

        #[arg(long)]
        room: Option<String>,

        /// Preferred visit slot, e.g. "Weekdays 4-6pm"
        #[arg(long)]
        visit_slot: Option<String>,

        /// Hide your identity from staff
        #[arg(long)]
        anonymous: bool,

        /// File to attach (repeatable)
        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// List your tickets
    Tickets {
        /// Status filter, e.g. IN_PROGRESS
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Free-text search
        #[arg(long)]
        query: Option<String>,

        /// Created on or after this ISO date
        #[arg(long)]
        from: Option<String>,

        /// Created on or before this ISO date
        #[arg(long)]
        to: Option<String>,

        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        size: u32,
    },

    /// Show one ticket in full
    Show { id: String },

    /// Post a message on a ticket
    Message {
        id: String,

        text: String,

        /// Visible to staff only
        #[arg(long)]
        internal: bool,
    },

    /// Rate a resolved ticket
    Feedback {
        id: String,

        /// Rating from 1 to 5
        #[arg(long)]
        rating: i32,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Reopen a closed ticket
    Reopen {
        id: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Attach more files to a ticket
    Attach {
        id: String,

        /// Files to upload
        files: Vec<PathBuf>,
    },

    /// List the staff triage inbox
    Inbox {
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// LOW, MEDIUM, HIGH or CRITICAL
        #[arg(long)]
        priority: Option<String>,

        /// Classifier confidence band: LOW, MEDIUM or HIGH
        #[arg(long)]
        confidence: Option<String>,

        #[arg(long)]
        assigned_to: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// Only tickets flagged for manual review
        #[arg(long)]
        needs_review: bool,

        /// Free-text search
        #[arg(long)]
        query: Option<String>,

        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        size: u32,
    },

    /// Assign a ticket to an owner
    Assign {
        id: String,

        /// Owner user id
        #[arg(long)]
        owner: i64,

        /// Collaborator user id (repeatable)
        #[arg(long)]
        collaborator: Vec<i64>,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Change a ticket's status
    Status {
        id: String,

        /// New status, e.g. IN_PROGRESS or "In Progress"
        status: String,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Escalate a ticket
    Escalate {
        id: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Resolve a ticket with a closing note
    Resolve {
        id: String,

        note: String,

        /// Evidence file to attach (repeatable)
        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// Work the manual-review queue
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },

    /// Show the analytics dashboard
    Analytics,

    /// Preview how a complaint would be classified
    Classify {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        hostel: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ReviewAction {
    /// List queued tickets
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        size: u32,
    },

    /// Approve a queued ticket, optionally correcting it first
    Approve {
        id: String,

        /// Corrected category, primary first (repeatable)
        #[arg(long)]
        category: Vec<String>,

        /// Corrected priority
        #[arg(long)]
        priority: Option<String>,

        /// Reviewer notes recorded with the approval
        #[arg(long)]
        notes: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ClientConfig::load_or_default(&cli.config);
    let client = ScmsClient::new(&config)?;
    log::debug!("Using API at {}", config.api.root());

    let result = run(cli.command, &client).await;
    if result.is_err() && client.reset_if_unauthorized() {
        log::error!("The server rejected the stored session; sign in again with `scms login`.");
    }
    result
}

async fn run(command: Command, client: &ScmsClient) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = client.login(&email, &password).await?;
            println!(
                "Signed in as {} ({})",
                session.user.name,
                session.user.role.as_wire()
            );
        }

        Command::Signup {
            name,
            email,
            password,
        } => {
            let session = client.signup(&name, &email, &password).await?;
            println!("Account created; signed in as {}", session.user.name);
        }

        Command::Logout => {
            client.logout().await?;
            println!("Signed out.");
        }

        Command::Whoami => {
            if client.resume().await? {
                if let Some(user) = client.user() {
                    println!("{} ({})", user.name, user.role.as_wire());
                    if let Some(email) = &user.email {
                        println!("{email}");
                    }
                    if let Some(department) = &user.department {
                        println!("Department: {department}");
                    }
                }
            } else {
                println!("Not signed in.");
            }
        }

        Command::Submit {
            title,
            description,
            hostel,
            building,
            room,
            visit_slot,
            anonymous,
            attach,
        } => {
            require_session(client).await?;
            let attachments = read_attachments(&attach)?;
            let ticket = client
                .cache()
                .create_ticket(NewTicket {
                    title,
                    description,
                    location: Location {
                        hostel,
                        building,
                        room,
                    },
                    preferred_visit_slot: visit_slot,
                    anonymous,
                    attachments,
                })
                .await?;
            println!("Created ticket #{}", ticket.id);
            print_ticket(&ticket);
        }

        Command::Tickets {
            status,
            category,
            query,
            from,
            to,
            page,
            size,
        } => {
            require_session(client).await?;
            let filters = TicketFilters {
                status: parse_status_filter(status),
                category: parse_text_filter(category),
                search: parse_text_filter(query),
                from: parse_text_filter(from),
                to: parse_text_filter(to),
                ..TicketFilters::page_request(page, size)
            };
            let view = client.cache().load_user_tickets(filters).await?;
            print_page(&view);
        }

        Command::Show { id } => {
            require_session(client).await?;
            let ticket = client.cache().load_ticket(&id).await?;
            print_ticket(&ticket);
        }

        Command::Message { id, text, internal } => {
            require_session(client).await?;
            let outcome = client.cache().add_message(&id, &text, internal).await?;
            print_outcome("Message posted", &outcome);
        }

        Command::Feedback {
            id,
            rating,
            comment,
        } => {
            require_session(client).await?;
            let outcome = client
                .cache()
                .send_feedback(&id, rating, comment.as_deref())
                .await?;
            print_outcome("Feedback recorded", &outcome);
        }

        Command::Reopen { id, reason } => {
            require_session(client).await?;
            let outcome = client.cache().reopen(&id, reason.as_deref()).await?;
            print_outcome("Ticket reopened", &outcome);
        }

        Command::Attach { id, files } => {
            if files.is_empty() {
                return Err(ApiError::validation("no files given"));
            }
            require_session(client).await?;
            let files = read_attachments(&files)?;
            let outcome = client.cache().add_attachments(&id, files).await?;
            print_outcome("Attachments uploaded", &outcome);
        }

        Command::Inbox {
            status,
            category,
            priority,
            confidence,
            assigned_to,
            location,
            needs_review,
            query,
            page,
            size,
        } => {
            require_session(client).await?;
            let filters = TicketFilters {
                status: parse_status_filter(status),
                category: parse_text_filter(category),
                priority: parse_priority_filter(priority),
                confidence_level: parse_text_filter(confidence).map(|c| c.to_uppercase()),
                assigned_to: parse_text_filter(assigned_to),
                location: parse_text_filter(location),
                needs_review: needs_review.then_some(true),
                search: parse_text_filter(query),
                ..TicketFilters::page_request(page, size)
            };
            let view = client.cache().load_admin_inbox(filters).await?;
            print_page(&view);
        }

        Command::Assign {
            id,
            owner,
            collaborator,
            reason,
        } => {
            require_session(client).await?;
            let outcome = client
                .cache()
                .assign(
                    &id,
                    AssignRequest {
                        owner_user_id: owner,
                        collaborator_user_ids: collaborator,
                        reason,
                    },
                )
                .await?;
            print_outcome("Assignment updated", &outcome);
        }

        Command::Status {
            id,
            status,
            comment,
        } => {
            require_session(client).await?;
            let status = TicketStatus::from_wire(Some(&status));
            let outcome = client
                .cache()
                .change_status(&id, status, comment.as_deref())
                .await?;
            print_outcome("Status updated", &outcome);
        }

        Command::Escalate { id, reason } => {
            require_session(client).await?;
            let request = EscalationRequest {
                reason,
                ..EscalationRequest::default()
            };
            let outcome = client.cache().escalate(&id, request).await?;
            print_outcome("Ticket escalated", &outcome);
        }

        Command::Resolve { id, note, attach } => {
            require_session(client).await?;
            let files = read_attachments(&attach)?;
            let outcome = client.cache().resolve(&id, &note, files).await?;
            print_outcome("Ticket resolved", &outcome);
        }

        Command::Review { action } => match action {
            ReviewAction::List { page, size } => {
                require_session(client).await?;
                let view = client.cache().load_review_queue(page, size).await?;
                print_review(&view);
            }
            ReviewAction::Approve {
                id,
                category,
                priority,
                notes,
            } => {
                require_session(client).await?;
                let decision = ReviewDecision {
                    categories: category,
                    priority: priority.as_deref().map(|p| Priority::from_wire(Some(p))),
                    internal_notes: notes,
                    ..ReviewDecision::default()
                };
                let outcome = client.cache().approve_review(&id, &decision).await?;
                print_outcome("Review approved", &outcome);
            }
        },

        Command::Analytics => {
            require_session(client).await?;
            let view = client.cache().load_analytics().await?;
            print_analytics(&view);
        }

        Command::Classify {
            title,
            description,
            hostel,
        } => {
            let location = Location {
                hostel,
                ..Location::default()
            };
            let suggestion = KeywordClassifier::new()
                .classify(&title, &description, &location)
                .await;
            print_suggestion(&suggestion);
        }
    }

    Ok(())
}

/// Resume the persisted session or bail with a sign-in hint.
async fn require_session(client: &ScmsClient) -> Result<()> {
    if client.resume().await? {
        return Ok(());
    }
    Err(ApiError::unauthenticated(
        "no active session; run `scms login` first",
    ))
}

/// Drop empty and "All" placeholder filter values.
fn parse_text_filter(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return None;
    }
    Some(trimmed.to_string())
}

fn parse_status_filter(raw: Option<String>) -> Option<TicketStatus> {
    parse_text_filter(raw).map(|s| TicketStatus::from_wire(Some(&s)))
}

fn parse_priority_filter(raw: Option<String>) -> Option<Priority> {
    parse_text_filter(raw).map(|p| Priority::from_wire(Some(&p)))
}

fn read_attachments(paths: &[PathBuf]) -> Result<Vec<NewAttachment>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("attachment")
                .to_string();
            Ok(NewAttachment {
                mime_type: guess_mime(path).to_string(),
                file_name,
                bytes,
            })
        })
        .collect()
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt" | "log") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Grapheme-safe truncation for table cells.
fn truncate(text: &str, max: usize) -> String {
    if text.graphemes(true).count() <= max {
        return text.to_string();
    }
    let cut: String = text.graphemes(true).take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn print_outcome(label: &str, outcome: &MutationOutcome) {
    match outcome {
        MutationOutcome::Refreshed(ticket) => {
            println!("{label}.");
            println!(
                "#{}  [{}] {}  {}",
                ticket.id,
                ticket.status.label(),
                ticket.priority.label(),
                truncate(&ticket.title, 56)
            );
        }
        MutationOutcome::RefreshFailed { error } => {
            println!("{label}; the change is saved, but refreshing the ticket failed: {error}");
            println!("Reload the ticket to see the current state.");
        }
    }
}

fn print_page(view: &PageView) {
    if view.tickets.is_empty() {
        println!("No tickets.");
        return;
    }
    println!(
        "{:<8} {:<12} {:<9} {:<16} {}",
        "ID", "STATUS", "PRIORITY", "CATEGORY", "TITLE"
    );
    for ticket in &view.tickets {
        println!(
            "{:<8} {:<12} {:<9} {:<16} {}",
            truncate(&ticket.id, 8),
            truncate(ticket.status.label(), 12),
            ticket.priority.label(),
            truncate(ticket.primary_category().unwrap_or("-"), 16),
            truncate(&ticket.title, 48),
        );
    }
    println!(
        "Page {} of {} ({} total)",
        view.meta.page + 1,
        view.meta.total_pages.max(1),
        view.meta.total_elements
    );
}

fn print_ticket(ticket: &Ticket) {
    println!("#{}  {}", ticket.id, ticket.title);
    println!("Status: {}   Priority: {}", ticket.status, ticket.priority);
    if !ticket.categories.is_empty() {
        println!("Categories: {}", ticket.category_labels().join(", "));
    }
    if !ticket.location.is_empty() {
        println!("Location: {}", ticket.location.display());
    }
    if !ticket.confidence.is_empty() {
        let mark = if ticket.confidence.below_threshold {
            " (below review threshold)"
        } else {
            ""
        };
        println!("Confidence: {}%{}", ticket.confidence.overall, mark);
    }
    if ticket.in_review() {
        println!("Flagged for manual review");
    }
    if let Some(assignment) = &ticket.assignees {
        if let Some(owner) = &assignment.owner {
            println!("Owner: {}", owner.name);
        }
        if !assignment.collaborators.is_empty() {
            let names: Vec<&str> = assignment
                .collaborators
                .iter()
                .map(|c| c.name.as_str())
                .collect();
            println!("Collaborators: {}", names.join(", "));
        }
    }
    if let Some(slot) = &ticket.preferred_visit_slot {
        println!("Preferred visit: {slot}");
    }
    if let Some(sla) = &ticket.sla {
        if let Some(due) = sla.due_at() {
            println!("Due: {}", due.format("%Y-%m-%d %H:%M"));
        }
    }
    if !ticket.description.is_empty() {
        println!("\n{}", ticket.description);
    }

    if let Some(messages) = &ticket.messages {
        if !messages.is_empty() {
            println!("\nConversation:");
            for message in messages {
                let when = message
                    .created_at
                    .map(|t| t.format("%m-%d %H:%M  ").to_string())
                    .unwrap_or_default();
                let tag = if message.internal { " [internal]" } else { "" };
                println!("  {}{}{}: {}", when, message.sender_name, tag, message.text);
            }
        }
    }
    if let Some(attachments) = &ticket.attachments {
        if !attachments.is_empty() {
            println!("\nAttachments:");
            for attachment in attachments {
                println!(
                    "  {} ({} KB, by {})",
                    attachment.name, attachment.size_kb, attachment.uploaded_by
                );
            }
        }
    }
    if let Some(timeline) = &ticket.timeline {
        if !timeline.is_empty() {
            println!("\nTimeline:");
            for event in timeline {
                let when = event
                    .timestamp
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("  {}  {}  {}", when, event.actor, event.action);
            }
        }
    }
    if let Some(resolution) = ticket.resolution() {
        println!("\nResolution: {}", resolution.note);
    }
    if let Some(rating) = ticket.feedback_rating {
        println!("Feedback: {rating}/5");
    }
}

fn print_review(view: &ReviewQueueView) {
    if view.entries.is_empty() {
        println!("Review queue is empty.");
        return;
    }
    println!("{:<8} {:<6} {:<24} {}", "ID", "CONF", "KEYWORDS", "TITLE");
    for entry in &view.entries {
        let (confidence, title) = match &entry.ticket {
            Some(ticket) => (
                format!("{}%", ticket.confidence.overall),
                truncate(&ticket.title, 40),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:<8} {:<6} {:<24} {}",
            truncate(&entry.review.ticket_id, 8),
            confidence,
            truncate(&entry.review.highlighted_keywords.join(","), 24),
            title,
        );
        if !entry.review.internal_notes.is_empty() {
            println!(
                "         notes: {}",
                truncate(&entry.review.internal_notes, 60)
            );
        }
    }
    println!(
        "Page {} of {} ({} total)",
        view.meta.page + 1,
        view.meta.total_pages.max(1),
        view.meta.total_elements
    );
}

fn print_analytics(view: &AnalyticsView) {
    match &view.summary {
        Some(summary) => {
            println!(
                "Open: {}   Unassigned: {}   SLA breaches: {}",
                summary.open, summary.unassigned, summary.sla_breaches
            );
            println!(
                "Avg resolution: {:.1}h   In manual review: {}",
                summary.avg_resolution_hours, summary.manual_review_count
            );
        }
        None => println!("No analytics summary."),
    }
    if !view.trends.is_empty() {
        println!("\nCreated / resolved per day:");
        for point in &view.trends {
            println!(
                "  {}  {:>3} / {:>3}",
                point.day, point.created, point.resolved
            );
        }
    }
    if !view.categories.is_empty() {
        println!("\nBy category:");
        for slice in &view.categories {
            println!("  {:<20} {}", slice.name, slice.count);
        }
    }
    if !view.critical_alerts.is_empty() {
        println!("\nCritical tickets:");
        for ticket in &view.critical_alerts {
            println!(
                "  #{}  [{}] {}",
                ticket.id,
                ticket.status.label(),
                truncate(&ticket.title, 56)
            );
        }
    }
}

fn print_suggestion(suggestion: &Suggestion) {
    println!("Categories: {}", suggestion.categories.join(", "));
    for label in &suggestion.confidence.labels {
        println!("  {:<16} {}%", label.label, label.score);
    }
    let mark = if suggestion.confidence.below_threshold {
        "  (would go to manual review)"
    } else {
        ""
    };
    println!(
        "Overall confidence: {}%{}",
        suggestion.confidence.overall, mark
    );
    println!(
        "Priority: {} - {}",
        suggestion.priority, suggestion.priority_reason
    );
    println!("Suggested owner: {}", suggestion.routing.owner);
    if !suggestion.routing.collaborators.is_empty() {
        println!(
            "Collaborators: {}",
            suggestion.routing.collaborators.join(", ")
        );
    }
}
