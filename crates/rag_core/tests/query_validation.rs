use rag_core::domain::{ConversationHistory, Query, MAX_TOP_K};
use rag_core::validate::{validate_history, validate_top_k};

#[test]
fn query_accepts_bounds_inclusive() {
    assert!(Query::new("docs", "What is 15% of 80?", 1).is_ok());
    assert!(Query::new("docs", "What is 15% of 80?", MAX_TOP_K).is_ok());
    let q = Query::new("docs", "q", 5).unwrap();
    assert!(q.return_sources);
}

#[test]
fn query_rejects_zero_and_oversized_top_k() {
    let err = Query::new("docs", "q", 0).unwrap_err();
    assert_eq!(err.code, "QUERY_INVALID");

    let err = Query::new("docs", "q", MAX_TOP_K + 1).unwrap_err();
    assert_eq!(err.code, "QUERY_INVALID");
    assert_eq!(err.details.as_deref(), Some("top_k=51"));

    assert!(validate_top_k(7).is_ok());
}

#[test]
fn query_rejects_blank_fields() {
    assert_eq!(Query::new("  ", "q", 5).unwrap_err().code, "QUERY_INVALID");
    assert_eq!(Query::new("docs", "\n", 5).unwrap_err().code, "QUERY_INVALID");
}

#[test]
fn empty_history_is_rejected() {
    assert_eq!(
        validate_history(&ConversationHistory::new()).unwrap_err().code,
        "QUERY_INVALID"
    );
    assert!(validate_history(&ConversationHistory::with_system("s")).is_ok());
}
