pub mod error;
pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::lookup::{
    error::LookupError,
    types::{CaseRecord, UserProfile},
};

/// Read-side surface over the two case read paths and the profile service.
///
/// Both case paths are eventually consistent with writes: a case that was
/// just created may be missing from either for a while, so "not found" is
/// ordinary data, not an exceptional condition. Implementations map that to
/// [`error::LookupErrorKind::NotFound`] and leave absorption to callers.
#[async_trait]
pub trait CaseLookup: Send + Sync {
    /// Direct fetch from the read-model service by case id.
    async fn case_by_id(&self, case_id: &str) -> Result<CaseRecord, LookupError>;

    /// Read-model search, bounded to `take` results. `partner_id` narrows
    /// the search server-side when an ownership token is available.
    async fn search_cases(
        &self,
        term: &str,
        partner_id: Option<&str>,
        take: usize,
    ) -> Result<Vec<CaseRecord>, LookupError>;

    /// Most recent cases from the primary case store, newest first.
    async fn recent_cases(&self, take: usize) -> Result<Vec<CaseRecord>, LookupError>;

    /// Profile of the authenticated user.
    async fn current_profile(&self) -> Result<UserProfile, LookupError>;

    /// Profile of an arbitrary user, for handler enrichment.
    async fn profile_by_id(&self, user_id: &str) -> Result<UserProfile, LookupError>;
}
