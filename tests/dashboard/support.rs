//! Scripted in-memory stand-in for the backend read paths.

use std::{collections::VecDeque, sync::Arc, sync::Mutex};

use async_trait::async_trait;
use caseline::{
    config::PollerConfig,
    lookup::{
        CaseLookup,
        error::{LookupError, not_found},
        types::{CaseRecord, UserProfile},
    },
    poller::ReconciliationPoller,
    resolve::CaseResolver,
    session::{SessionIdentity, StaticSessionProvider},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ById(String),
    Search {
        term: String,
        partner_id: Option<String>,
    },
    Recent,
    ProfileMe,
    ProfileById(String),
}

/// Responses are scripted per endpoint and consumed front to back. An empty
/// script yields the endpoint's natural "nothing there yet" answer.
#[derive(Default)]
pub struct MockLookup {
    calls: Mutex<Vec<Call>>,
    by_id: Mutex<VecDeque<Result<CaseRecord, LookupError>>>,
    search: Mutex<VecDeque<Result<Vec<CaseRecord>, LookupError>>>,
    recent: Mutex<VecDeque<Result<Vec<CaseRecord>, LookupError>>>,
    profiles: Mutex<VecDeque<Result<UserProfile, LookupError>>>,
}

impl MockLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_by_id(&self, response: Result<CaseRecord, LookupError>) {
        self.by_id.lock().unwrap().push_back(response);
    }

    pub fn push_search(&self, response: Result<Vec<CaseRecord>, LookupError>) {
        self.search.lock().unwrap().push_back(response);
    }

    pub fn push_recent(&self, response: Result<Vec<CaseRecord>, LookupError>) {
        self.recent.lock().unwrap().push_back(response);
    }

    pub fn push_profile(&self, response: Result<UserProfile, LookupError>) {
        self.profiles.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, Call::Search { .. }))
            .count()
    }
}

#[async_trait]
impl CaseLookup for MockLookup {
    async fn case_by_id(&self, case_id: &str) -> Result<CaseRecord, LookupError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::ById(case_id.to_string()));
        self.by_id
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("no scripted record")))
    }

    async fn search_cases(
        &self,
        term: &str,
        partner_id: Option<&str>,
        _take: usize,
    ) -> Result<Vec<CaseRecord>, LookupError> {
        self.calls.lock().unwrap().push(Call::Search {
            term: term.to_string(),
            partner_id: partner_id.map(ToString::to_string),
        });
        self.search
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn recent_cases(&self, _take: usize) -> Result<Vec<CaseRecord>, LookupError> {
        self.calls.lock().unwrap().push(Call::Recent);
        self.recent
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn current_profile(&self) -> Result<UserProfile, LookupError> {
        self.calls.lock().unwrap().push(Call::ProfileMe);
        self.profiles
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("no scripted profile")))
    }

    async fn profile_by_id(&self, user_id: &str) -> Result<UserProfile, LookupError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::ProfileById(user_id.to_string()));
        self.profiles
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_found("no scripted profile")))
    }
}

pub fn owned_case(case_id: &str, applicant_email: &str) -> CaseRecord {
    CaseRecord {
        case_id: case_id.to_string(),
        applicant_email: Some(applicant_email.to_string()),
        status: Some("in_progress".to_string()),
        ..CaseRecord::default()
    }
}

pub fn resolver_over(lookup: &Arc<MockLookup>) -> CaseResolver {
    let concrete: Arc<MockLookup> = Arc::clone(lookup);
    let lookup: Arc<dyn CaseLookup> = concrete;
    CaseResolver::new(lookup)
}

pub fn poller_over(lookup: &Arc<MockLookup>, email: &str) -> ReconciliationPoller {
    let session = Arc::new(StaticSessionProvider::new(SessionIdentity::new(
        email,
        "Test Partner",
    )));
    ReconciliationPoller::new(resolver_over(lookup), session, PollerConfig::default())
}
