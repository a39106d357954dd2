//! Pure projection of raw case records into display summaries.
//!
//! No I/O and no side effects in [`project`]; the only async entry point is
//! the best-effort assignee enrichment, which is a presentation concern and
//! deliberately swallows lookup failures.

use serde::Serialize;
use serde_json::Value;
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    format_description::well_known::Rfc3339, macros::format_description,
};

use crate::lookup::{CaseLookup, types::CaseRecord};

/// Shown when a record carries no applicant name at all.
pub const GENERIC_APPLICANT_LABEL: &str = "Applicant";

/// Ordered extraction rules for the country: metadata keys first (in this
/// order), then the record's direct fields.
const METADATA_COUNTRY_KEYS: [&str; 4] = [
    "country",
    "applicant_country",
    "business_country",
    "country_of_registration",
];

const SHORT_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none] [month repr:short] [year]");
const NAIVE_TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Semantic color bucket for a status badge. Derived from the *raw* backend
/// status, before the display transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Success,
    Info,
    Danger,
    Warning,
}

/// Normalized application summary for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
    pub id: String,
    pub name: String,
    pub case_type: String,
    pub status: String,
    pub status_color: StatusColor,
    pub country: String,
    pub created_at: String,
    pub updated_at: String,
    pub completion_percentage: u8,
    pub risk_level: String,
    pub assigned_to: String,
    pub assigned_to_name: String,
}

pub fn project(record: &CaseRecord) -> CaseSummary {
    let raw_status = record.status.as_deref().unwrap_or("");
    CaseSummary {
        id: record.case_id.clone(),
        name: applicant_name(record),
        case_type: record.case_type.clone().unwrap_or_default(),
        status: raw_status.replace('_', " ").to_uppercase(),
        status_color: status_color(raw_status),
        country: resolve_country(record),
        created_at: format_short_date(record.created_at.as_deref()),
        updated_at: format_short_date(record.updated_at.as_deref()),
        completion_percentage: completion(record.progress_percentage),
        risk_level: record.risk_level.clone().unwrap_or_default(),
        assigned_to: record.assigned_to.clone().unwrap_or_default(),
        assigned_to_name: record.assigned_to_name.clone().unwrap_or_default(),
    }
}

pub fn status_color(raw_status: &str) -> StatusColor {
    let folded = raw_status.trim().to_lowercase();
    if folded == "approved" {
        StatusColor::Success
    } else if folded.contains("review") {
        StatusColor::Info
    } else if folded == "rejected" {
        StatusColor::Danger
    } else {
        StatusColor::Warning
    }
}

fn applicant_name(record: &CaseRecord) -> String {
    let first = record.applicant_first_name.as_deref().unwrap_or("").trim();
    let last = record.applicant_last_name.as_deref().unwrap_or("").trim();
    let joined = [first, last]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        GENERIC_APPLICANT_LABEL.to_string()
    } else {
        joined
    }
}

fn resolve_country(record: &CaseRecord) -> String {
    if let Some(found) = record.metadata.as_ref().and_then(metadata_country) {
        return found;
    }
    for direct in [record.country.as_deref(), record.applicant_country.as_deref()] {
        if let Some(value) = direct.map(str::trim).filter(|value| !value.is_empty()) {
            return value.to_string();
        }
    }
    String::new()
}

/// The metadata blob arrives either pre-parsed or as a JSON-encoded string.
/// Parse failures count as "no metadata".
fn metadata_country(metadata: &Value) -> Option<String> {
    let parsed: Value;
    let object = match metadata {
        Value::String(raw) => {
            parsed = serde_json::from_str(raw).ok()?;
            &parsed
        }
        other => other,
    };
    let map = object.as_object()?;
    METADATA_COUNTRY_KEYS.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    })
}

fn completion(progress: Option<f64>) -> u8 {
    progress.unwrap_or(0.0).round().clamp(0.0, 100.0) as u8
}

/// Short display date, empty for absent or unparseable timestamps. The
/// embedding UI re-formats for locale; the core never emits an
/// "Invalid Date" artifact.
fn format_short_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return String::new();
    };
    parse_timestamp(raw)
        .and_then(|timestamp| timestamp.format(&SHORT_DATE).ok())
        .unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(timestamp);
    }
    PrimitiveDateTime::parse(raw, NAIVE_TIMESTAMP)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Fills a missing handler display name from the profile service. Best
/// effort: any lookup failure leaves the summary untouched.
pub async fn enrich_assignee(summary: &mut CaseSummary, lookup: &dyn CaseLookup) {
    if summary.assigned_to.is_empty() || !summary.assigned_to_name.is_empty() {
        return;
    }
    match lookup.profile_by_id(&summary.assigned_to).await {
        Ok(profile) => {
            let name = profile.display_name();
            if !name.is_empty() {
                summary.assigned_to_name = name;
            }
        }
        Err(err) => {
            tracing::debug!(
                target: "projection",
                assigned_to = %summary.assigned_to,
                error = %err,
                "assignee_profile_unavailable"
            );
        }
    }
}
