//! Uploaded-file flows, uploads and the session lifecycle.

mod common;

use std::sync::Arc;

use common::{user_file, Call, Endpoint, MockBackend};
use tracity_core::config::LimitsConfig;
use tracity_core::{ChartType, DataSource, Facet, SourceKind, UploadFile};
use tracity_explorer::session::{TOKEN_KEY, USER_KEY};
use tracity_explorer::{
    Explorer, FetchPhase, FileSessionStore, MemorySessionStore, SessionContext, Settled,
};

const MB: usize = 1024 * 1024;

fn signed_in() -> SessionContext {
    SessionContext::restore(MemorySessionStore::with_entries([
        (TOKEN_KEY, "tok-1"),
        (USER_KEY, r#"{"user_id":"u-1","email":"alice@example.com"}"#),
    ]))
}

fn explorer(backend: &Arc<MockBackend>, session: SessionContext) -> Explorer {
    Explorer::new(backend.clone(), Arc::new(session), &LimitsConfig::default())
}

fn position(calls: &[Call], pred: impl Fn(&Call) -> bool) -> usize {
    calls.iter().position(pred).expect("call not recorded")
}

#[tokio::test]
async fn user_file_rows_then_insights() {
    let backend = Arc::new(MockBackend::standard());
    let explorer = explorer(&backend, signed_in());
    explorer.refresh_catalog().await;

    assert_eq!(explorer.snapshot().await.catalog.user_files.len(), 1);
    assert_eq!(
        explorer.select_by_id(SourceKind::User, "f-1").await,
        Some(Settled::Ready)
    );

    let calls = backend.calls();
    let metadata = position(&calls, |c| matches!(c, Call::UserMetadata(_)));
    let data = position(&calls, |c| matches!(c, Call::UserData(_)));
    let insights = position(&calls, |c| matches!(c, Call::UserInsights(..)));
    assert!(metadata < data && data < insights);

    match &calls[insights] {
        Call::UserInsights(file_id, request) => {
            assert_eq!(file_id, "f-1");
            assert_eq!(request.filename, "sales.csv");
            assert_eq!(request.record_count, 2);
            assert_eq!(request.chart_type, ChartType::Bar);
        }
        other => panic!("unexpected call: {other:?}"),
    }

    let model = explorer.render_model().await;
    assert_eq!(model.rows.len(), 2);
    assert_eq!(model.record_label.as_deref(), Some("2 of 2 records"));
    let insights = model.insights.unwrap();
    assert_eq!(insights.summary, "scored sales.csv");
    assert_eq!(insights.comparison_insights.as_deref(), Some("North leads."));
    assert_eq!(insights.anomalies, vec!["Row 2 is an outlier".to_string()]);
    assert_eq!(insights.sample_size, Some(2));
}

#[tokio::test]
async fn unscored_file_gets_synthesized_insights() {
    let backend = Arc::new(MockBackend::standard());
    backend.fail(Endpoint::UserInsights);
    let explorer = explorer(&backend, signed_in());
    explorer.select_chart_type(ChartType::Pie).await;

    let settled = explorer
        .select_source(DataSource::User(user_file("f-1", "sales.csv", 2)))
        .await;
    assert_eq!(settled, Settled::Degraded);

    let state = explorer.snapshot().await;
    assert_eq!(state.data_phase, FetchPhase::Ready);
    let insights = state.insights.unwrap();
    assert!(insights
        .summary
        .starts_with("Comprehensive analysis of your uploaded file \"sales.csv\" with 2 records."));
    assert_eq!(insights.chart_type, "pie");
    assert_eq!(insights.trend, "Stable");
    assert_eq!(
        insights.key_findings,
        vec![
            "Dataset contains 2 total records",
            "File uploaded on 6/1/2024",
            "Data type: CSV",
            "Data structure has been optimized for visualization",
            "Recommended chart type: pie",
        ]
    );
    assert_eq!(insights.recommendations.len(), 4);
    assert!(insights.temporal_analysis.is_some());
}

#[tokio::test]
async fn user_file_without_session_requires_login() {
    let backend = Arc::new(MockBackend::standard());
    let explorer = explorer(&backend, SessionContext::anonymous());

    let settled = explorer
        .select_source(DataSource::User(user_file("f-1", "sales.csv", 2)))
        .await;
    assert_eq!(settled, Settled::LoginRequired);
    assert_eq!(backend.count(|c| matches!(c, Call::UserData(_))), 0);

    let state = explorer.snapshot().await;
    assert!(state.metadata.is_none());
    assert!(state.visualization.is_none());
}

#[tokio::test]
async fn user_filter_is_scoped_to_file() {
    let backend = Arc::new(MockBackend::standard());
    let explorer = explorer(&backend, signed_in());
    explorer
        .select_source(DataSource::User(user_file("f-1", "sales.csv", 2)))
        .await;
    explorer.select_chart_type(ChartType::Line).await;
    assert!(explorer.toggle(&Facet::State("North".into())).await);

    assert_eq!(explorer.apply_filters().await, Settled::Ready);

    let request = backend
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::UserFiltered(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.file_id, "f-1");
    assert_eq!(request.states, Some(vec!["North".to_string()]));
    assert_eq!(request.years, None);
    assert_eq!(request.limit, 100);
    assert_eq!(backend.count(|c| matches!(c, Call::Filtered(_) | Call::Enhanced(_))), 0);

    let state = explorer.snapshot().await;
    assert_eq!(
        state.visualization.unwrap().recommended_chart_type,
        ChartType::Line
    );
    assert_eq!(state.insights.unwrap().summary, "scored sales.csv");
}

#[tokio::test]
async fn clear_all_refetches_user_file_once() {
    let backend = Arc::new(MockBackend::standard());
    let explorer = explorer(&backend, signed_in());
    explorer
        .select_source(DataSource::User(user_file("f-1", "sales.csv", 2)))
        .await;
    explorer.toggle(&Facet::Year(2024)).await;
    backend.reset_calls();

    assert_eq!(explorer.clear_all().await, Settled::Ready);
    assert_eq!(backend.count(|c| matches!(c, Call::UserData(_))), 1);
    assert!(!explorer.snapshot().await.filter.has_selections());
}

#[tokio::test]
async fn upload_is_validated_before_any_request() {
    let backend = Arc::new(MockBackend::standard());
    let explorer = explorer(&backend, signed_in());

    let err = explorer
        .upload(UploadFile::new("data.exe", vec![0; 16]))
        .await
        .unwrap_err();
    assert_eq!(err.user_message("Upload failed"), "Only CSV and JSON files are allowed");

    let err = explorer
        .upload(UploadFile::new("data.csv", vec![0; 11 * MB]))
        .await
        .unwrap_err();
    assert_eq!(err.user_message("Upload failed"), "File size must be less than 10MB");

    assert_eq!(backend.count(|c| matches!(c, Call::Upload(_))), 0);

    let receipt = explorer
        .upload(UploadFile::new("data.csv", vec![0; 9 * MB]))
        .await
        .unwrap();
    assert_eq!(receipt.filename, "data.csv");
    assert_eq!(backend.count(|c| matches!(c, Call::Upload(_))), 1);
    assert_eq!(backend.count(|c| matches!(c, Call::UserFiles)), 1);
}

#[tokio::test]
async fn upload_network_failure_has_user_message() {
    let backend = Arc::new(MockBackend::standard());
    backend.fail(Endpoint::Upload);
    let explorer = explorer(&backend, signed_in());

    let err = explorer
        .upload(UploadFile::new("data.json", b"[]".to_vec()))
        .await
        .unwrap_err();
    assert_eq!(err.user_message("Upload failed"), "Network error. Please try again.");
}

#[tokio::test]
async fn upload_without_session_requires_login() {
    let backend = Arc::new(MockBackend::standard());
    let explorer = explorer(&backend, SessionContext::anonymous());

    let err = explorer
        .upload(UploadFile::new("data.csv", b"a,b\n1,2".to_vec()))
        .await
        .unwrap_err();
    assert!(err.requires_login());
}

#[tokio::test]
async fn login_exchange_persists_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = Arc::new(MockBackend::standard());
    let explorer = explorer(&backend, SessionContext::restore(FileSessionStore::new(&path)));

    assert_eq!(explorer.captcha().await.unwrap().question, "What is 3 + 4?");

    let err = explorer
        .login("alice@example.com", "secret", 6)
        .await
        .unwrap_err();
    assert_eq!(err.user_message("Login failed"), "Invalid captcha answer");
    assert!(!explorer.session().is_authenticated());

    let identity = explorer.login("alice@example.com", "secret", 7).await.unwrap();
    assert_eq!(identity.user_id, "u-1");
    assert!(explorer.session().is_authenticated());
    assert_eq!(explorer.snapshot().await.catalog.user_files.len(), 1);

    let restarted = SessionContext::restore(FileSessionStore::new(&path));
    assert_eq!(
        restarted.auth_headers().get("Authorization"),
        Some("Bearer tok-fresh")
    );
}

#[tokio::test]
async fn logout_always_completes_locally() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let session = SessionContext::restore(FileSessionStore::new(&path));
    session
        .login(
            tracity_explorer::Identity {
                user_id: "u-1".into(),
                email: "alice@example.com".into(),
            },
            "tok-1",
        )
        .unwrap();

    let backend = Arc::new(MockBackend::standard());
    backend.fail(Endpoint::Logout);
    let explorer = explorer(&backend, session);
    explorer.refresh_catalog().await;
    explorer
        .select_source(DataSource::User(user_file("f-1", "sales.csv", 2)))
        .await;

    explorer.logout().await;

    assert_eq!(backend.count(|c| matches!(c, Call::Logout)), 1);
    assert!(!explorer.session().is_authenticated());
    let state = explorer.snapshot().await;
    assert!(state.active.is_none());
    assert!(state.catalog.user_files.is_empty());
    assert!(!SessionContext::restore(FileSessionStore::new(&path)).is_authenticated());
}
