// src/classify.rs

//! Pluggable complaint classification.
//!
//! The backend runs its own classifier when a complaint is submitted; this
//! module is the client-side counterpart, used for the pre-submit preview
//! command and in tests. The contract is a trait so the keyword scorer can
//! be swapped for a remote model without touching callers; implementations
//! may be non-deterministic and nothing in the cache depends on them.

use async_trait::async_trait;
use regex::Regex;

use crate::models::{Confidence, LabelScore, Location, Priority, CONFIDENCE_THRESHOLD};

/// Points per matched keyword.
const KEYWORD_SCORE: u32 = 18;

/// Ceiling for any single label score.
const SCORE_CAP: u32 = 97;

/// A label must reach this score to be chosen outright.
const LABEL_CUTOFF: u32 = 55;

/// Weak fallback guesses are clamped into this band so they always read as
/// below the review threshold.
const WEAK_FLOOR: u32 = 18;
const WEAK_CAP: u32 = 54;

/// Score given to the location-implied Hostel label.
const HALL_SCORE: u32 = 62;

const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("Electrical", &["light", "switch", "power", "socket", "electric", "fan", "ac"]),
    ("Plumbing", &["water", "leak", "tap", "drain", "toilet", "washroom"]),
    ("Hostel", &["hostel", "room", "warden", "residence", "block"]),
    ("Internet", &["wifi", "internet", "network", "router"]),
    ("Security", &["security", "theft", "gate", "guard", "unsafe"]),
    ("Sanitation", &["clean", "garbage", "odor", "dirty", "sanitation"]),
    ("Classroom", &["classroom", "projector", "desk", "lecture", "lab"]),
    ("Library", &["library", "reading hall"]),
    ("Mess", &["mess", "food", "canteen", "dining"]),
    ("Transport", &["bus", "transport", "shuttle"]),
    ("Administration", &["certificate", "fee", "portal", "office"]),
    ("Harassment", &["harass", "abuse", "threat", "ragging"]),
];

const CRITICAL_TERMS: &[&str] = &["sparks", "fire", "unsafe"];
const HIGH_TERMS: &[&str] = &["urgent", "no water", "power outage", "theft"];

/// Suggested triage routing for a predicted category set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routing {
    /// Team suggested as owner
    pub owner: String,

    /// Teams suggested as collaborators
    pub collaborators: Vec<String>,
}

/// A classification suggestion for a complaint that has not been submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Predicted category labels, strongest first
    pub categories: Vec<String>,

    /// Overall and per-label confidence; `below_threshold` set means the
    /// complaint would land in manual review
    pub confidence: Confidence,

    pub priority: Priority,

    /// One-line explanation of the priority choice
    pub priority_reason: String,

    pub routing: Routing,
}

/// A classification capability.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, title: &str, description: &str, location: &Location) -> Suggestion;
}

/// Deterministic keyword scorer.
///
/// Each category rule scores [`KEYWORD_SCORE`] per distinct keyword found
/// in the combined title, description, and location text. Keywords match
/// on word boundaries, so "washroom" does not count as "room" and "fired"
/// does not read as "fire". Labels at or over [`LABEL_CUTOFF`] are chosen
/// (at most three); when none qualify, the two strongest raw scores are
/// kept as weak guesses clamped under the review threshold.
pub struct KeywordClassifier {
    rules: Vec<CategoryRule>,
    critical_terms: Vec<Regex>,
    high_terms: Vec<Regex>,
}

struct CategoryRule {
    label: &'static str,
    patterns: Vec<Regex>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        let rules = CATEGORY_RULES
            .iter()
            .map(|(label, keywords)| CategoryRule {
                label,
                patterns: compile_terms(keywords),
            })
            .collect();
        Self {
            rules,
            critical_terms: compile_terms(CRITICAL_TERMS),
            high_terms: compile_terms(HIGH_TERMS),
        }
    }

    fn infer_priority(&self, hay: &str, labels: &[String]) -> (Priority, &'static str) {
        let has_label = |l: &str| labels.iter().any(|chosen| chosen == l);
        if self.critical_terms.iter().any(|re| re.is_match(hay)) || has_label("Harassment") {
            return (
                Priority::Critical,
                "Safety-sensitive language detected and immediate risk may be present.",
            );
        }
        if self.high_terms.iter().any(|re| re.is_match(hay)) {
            return (
                Priority::High,
                "Complaint suggests service disruption or time-sensitive issue.",
            );
        }
        if has_label("Administration") || has_label("Mess") {
            return (
                Priority::Medium,
                "Operational issue detected; likely requires standard processing.",
            );
        }
        (
            Priority::Low,
            "Issue appears localized and non-critical from provided text.",
        )
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, title: &str, description: &str, location: &Location) -> Suggestion {
        let hay = [
            title,
            description,
            location.hostel.as_deref().unwrap_or_default(),
            location.building.as_deref().unwrap_or_default(),
            location.room.as_deref().unwrap_or_default(),
        ]
        .join(" ")
        .to_lowercase();

        let mut scores: Vec<(&'static str, u32)> = self
            .rules
            .iter()
            .map(|rule| {
                let hits = rule.patterns.iter().filter(|re| re.is_match(&hay)).count() as u32;
                (rule.label, (hits * KEYWORD_SCORE).min(SCORE_CAP))
            })
            .collect();
        scores.sort_by(|a, b| b.1.cmp(&a.1));

        let mut labels: Vec<LabelScore> = scores
            .iter()
            .filter(|(_, score)| *score >= LABEL_CUTOFF)
            .take(3)
            .map(|(label, score)| LabelScore {
                label: (*label).to_string(),
                score: *score as u8,
            })
            .collect();
        if labels.is_empty() {
            labels = scores
                .iter()
                .take(2)
                .map(|(label, score)| LabelScore {
                    label: (*label).to_string(),
                    score: (*score).clamp(WEAK_FLOOR, WEAK_CAP) as u8,
                })
                .collect();
        }

        // A hall-style hostel name implies the Hostel category even when no
        // keyword in the text did.
        let hostel_name = location.hostel.as_deref().unwrap_or_default().to_lowercase();
        if hostel_name.contains("hall") && !labels.iter().any(|l| l.label == "Hostel") {
            labels.push(LabelScore {
                label: "Hostel".to_string(),
                score: HALL_SCORE as u8,
            });
        }

        let overall = if labels.is_empty() {
            0
        } else {
            let sum: u32 = labels.iter().map(|l| u32::from(l.score)).sum();
            (f64::from(sum) / labels.len() as f64).round() as u8
        };

        let categories: Vec<String> = labels.iter().map(|l| l.label.clone()).collect();
        let (priority, reason) = self.infer_priority(&hay, &categories);
        let routing = infer_routing(&categories);

        Suggestion {
            categories,
            confidence: Confidence {
                overall,
                labels,
                below_threshold: overall > 0 && overall < CONFIDENCE_THRESHOLD,
                ..Confidence::default()
            },
            priority,
            priority_reason: reason.to_string(),
            routing,
        }
    }
}

fn compile_terms(terms: &[&str]) -> Vec<Regex> {
    terms
        .iter()
        .filter_map(|term| Regex::new(&format!(r"\b{}\b", regex::escape(term))).ok())
        .collect()
}

/// Map chosen categories to the teams that triage them. The facilities
/// desk owns anything without a dedicated team.
fn infer_routing(labels: &[String]) -> Routing {
    let has = |l: &str| labels.iter().any(|chosen| chosen == l);

    let mut owner = "Facilities Manager";
    let mut collaborators: Vec<&str> = Vec::new();

    if has("Electrical") {
        owner = "Electrical Supervisor";
        collaborators = if has("Hostel") {
            vec!["Hostel Warden"]
        } else {
            vec!["Facilities Manager"]
        };
    } else if has("Internet") {
        owner = "IT Support";
        if has("Hostel") {
            collaborators = vec!["Hostel Warden"];
        }
    } else if has("Security") || has("Harassment") {
        owner = "Security Office";
        collaborators = vec!["Manual Reviewer"];
    } else if has("Administration") {
        owner = "Manual Reviewer";
    } else if has("Hostel") {
        owner = "Hostel Warden";
        collaborators = vec!["Facilities Manager"];
    }

    Routing {
        owner: owner.to_string(),
        collaborators: collaborators.into_iter().map(String::from).collect(),
    }
}
