//! Case resolution across the two eventually-consistent read paths.
//!
//! Order is fixed: direct by-id fetch, read-model search by email, primary
//! case store listing. Each later step runs only when the earlier one
//! produced nothing, and infrastructure unavailability of the read model
//! skips forward instead of aborting the chain.

use std::sync::Arc;

use crate::{
    identity::derive_identity,
    lookup::{CaseLookup, error::LookupError, types::CaseRecord},
};

/// Result page bound for the read-model email search.
const READ_MODEL_SEARCH_PAGE: usize = 10;
/// Result page bound for the primary-store recency scan.
const CASE_STORE_RECENT_PAGE: usize = 50;

/// A case belongs to a user when the applicant email matches
/// case-insensitively and the partner id is absent on either side or equals
/// the derived ownership token. An empty `derived_id` means "no filter
/// available": records are then matched on email alone.
pub fn belongs_to(record: &CaseRecord, email: &str, derived_id: &str) -> bool {
    let Some(applicant) = record.applicant_email.as_deref() else {
        return false;
    };
    if applicant.trim().to_lowercase() != email.trim().to_lowercase() {
        return false;
    }
    match record.partner_id.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(partner) => derived_id.is_empty() || partner.eq_ignore_ascii_case(derived_id),
    }
}

pub struct CaseResolver {
    lookup: Arc<dyn CaseLookup>,
}

impl CaseResolver {
    pub fn new(lookup: Arc<dyn CaseLookup>) -> Self {
        Self { lookup }
    }

    /// Locates the user's case, or `None` when no read path has caught up
    /// yet. "Not found" and "service unavailable" are absorbed here —
    /// both are ordinary states of an eventually-consistent system — while
    /// authentication failures and anything unexpected propagate.
    pub async fn resolve_case(
        &self,
        case_id: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<CaseRecord>, LookupError> {
        if let Some(case_id) = case_id.map(str::trim).filter(|id| !id.is_empty()) {
            // Direct id lookup is trusted: no ownership filter.
            match self.lookup.case_by_id(case_id).await {
                Ok(record) => return Ok(Some(record)),
                Err(err) if err.is_absorbable() => {
                    tracing::debug!(
                        target: "resolve",
                        case_id,
                        kind = ?err.kind,
                        "direct_lookup_miss"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) else {
            return Ok(None);
        };
        let derived_id = derive_identity(email);
        let partner_filter = (!derived_id.is_empty()).then_some(derived_id.as_str());

        match self
            .lookup
            .search_cases(email, partner_filter, READ_MODEL_SEARCH_PAGE)
            .await
        {
            Ok(items) => {
                // Backend result order is preserved; first owned record wins.
                if let Some(record) = first_owned(items, email, &derived_id) {
                    return Ok(Some(record));
                }
            }
            Err(err) if err.is_absorbable() => {
                tracing::debug!(
                    target: "resolve",
                    kind = ?err.kind,
                    "read_model_miss_falling_back"
                );
            }
            Err(err) => return Err(err),
        }

        match self.lookup.recent_cases(CASE_STORE_RECENT_PAGE).await {
            Ok(items) => Ok(first_owned(items, email, &derived_id)),
            Err(err) if err.is_absorbable() => {
                tracing::debug!(target: "resolve", kind = ?err.kind, "case_store_miss");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn first_owned(items: Vec<CaseRecord>, email: &str, derived_id: &str) -> Option<CaseRecord> {
    items
        .into_iter()
        .find(|record| belongs_to(record, email, derived_id))
}
