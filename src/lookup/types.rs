//! Wire models for the case and profile services.
//!
//! The backends disagree on field spelling between API generations, so the
//! serde aliases accept every variant the dashboard has been observed to
//! receive. All models are read-only here: the core fetches and filters,
//! it never writes case records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A case as either read path returns it. `status` is a free-form backend
/// string and is only ever compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseRecord {
    #[serde(alias = "id")]
    pub case_id: String,
    #[serde(rename = "type", alias = "caseType")]
    pub case_type: Option<String>,
    pub status: Option<String>,
    pub partner_id: Option<String>,
    pub applicant_first_name: Option<String>,
    #[serde(alias = "applicantSurname")]
    pub applicant_last_name: Option<String>,
    pub applicant_email: Option<String>,
    pub country: Option<String>,
    pub applicant_country: Option<String>,
    /// Opaque blob. Some backends send it as an object, some as a
    /// JSON-encoded string; the projection layer copes with both.
    #[serde(alias = "metadataJson")]
    pub metadata: Option<Value>,
    pub progress_percentage: Option<f64>,
    pub risk_level: Option<String>,
    pub risk_score: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub assigned_to: Option<String>,
    pub assigned_to_name: Option<String>,
    pub assigned_at: Option<String>,
}

/// Paginated listing envelope shared by both read paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CasePage {
    pub items: Vec<CaseRecord>,
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(alias = "userId")]
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserProfile {
    /// Presentable name: trimmed first+last, else the email, else empty.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        let joined = [first, last]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return joined;
        }
        self.email.as_deref().unwrap_or("").trim().to_string()
    }
}
