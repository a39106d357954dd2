use std::sync::Arc;

use caseline::{
    lookup::error::service_unavailable,
    lookup::types::{CaseRecord, UserProfile},
    projection::{self, StatusColor},
};
use serde_json::json;

use crate::support::{Call, MockLookup};

fn submitted_record() -> CaseRecord {
    CaseRecord {
        case_id: "case-42".into(),
        status: Some("in progress".into()),
        progress_percentage: Some(42.0),
        country: None,
        metadata: Some(json!("{\"country\":\"ZA\"}")),
        ..CaseRecord::default()
    }
}

#[tokio::test]
async fn given_in_progress_record_then_summary_matches_display_contract() {
    let summary = projection::project(&submitted_record());

    assert_eq!(summary.status, "IN PROGRESS");
    assert_eq!(summary.completion_percentage, 42);
    assert_eq!(summary.country, "ZA");
    assert_eq!(summary.status_color, StatusColor::Warning);
    assert_eq!(summary.name, "Applicant");
}

#[tokio::test]
async fn given_same_record_then_projection_is_idempotent() {
    let record = submitted_record();
    assert_eq!(projection::project(&record), projection::project(&record));
}

#[tokio::test]
async fn given_string_and_object_metadata_then_country_resolution_agrees() {
    let mut as_object = submitted_record();
    as_object.metadata = Some(json!({"country": "ZA"}));

    assert_eq!(
        projection::project(&submitted_record()).country,
        projection::project(&as_object).country,
    );
}

#[tokio::test]
async fn given_unnamed_assignee_then_profile_service_fills_the_name() {
    let lookup = Arc::new(MockLookup::new());
    lookup.push_profile(Ok(UserProfile {
        id: "u-9".into(),
        email: Some("handler@example.com".into()),
        first_name: Some("Ada".into()),
        last_name: Some("Osei".into()),
    }));

    let mut record = submitted_record();
    record.assigned_to = Some("u-9".into());
    let mut summary = projection::project(&record);

    projection::enrich_assignee(&mut summary, lookup.as_ref()).await;

    assert_eq!(summary.assigned_to_name, "Ada Osei");
    assert_eq!(lookup.calls(), vec![Call::ProfileById("u-9".to_string())]);
}

#[tokio::test]
async fn given_profile_service_down_then_summary_is_left_untouched() {
    let lookup = Arc::new(MockLookup::new());
    lookup.push_profile(Err(service_unavailable("profiles down")));

    let mut record = submitted_record();
    record.assigned_to = Some("u-9".into());
    let mut summary = projection::project(&record);

    projection::enrich_assignee(&mut summary, lookup.as_ref()).await;

    assert_eq!(summary.assigned_to_name, "");
}

#[tokio::test]
async fn given_named_assignee_then_no_profile_call_is_made() {
    let lookup = Arc::new(MockLookup::new());

    let mut record = submitted_record();
    record.assigned_to = Some("u-9".into());
    record.assigned_to_name = Some("Already Named".into());
    let mut summary = projection::project(&record);

    projection::enrich_assignee(&mut summary, lookup.as_ref()).await;

    assert_eq!(summary.assigned_to_name, "Already Named");
    assert!(lookup.calls().is_empty());
}
