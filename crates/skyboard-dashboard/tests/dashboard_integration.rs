//! End-to-end dashboard flows against a mocked weather API.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use skyboard_core::{AppError, CommitMode, Config};
use skyboard_dashboard::{
    ActionStatus, CurrentWeatherView, DailyForecastView, Dashboard, Exporter, LocationResolver,
    UserHistory, ViewState, UNKNOWN_LOCATION,
};
use skyboard_weather::{ExportFilters, ExportFormat, WeatherApiClient};
use tokio::sync::watch;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> WeatherApiClient {
    WeatherApiClient::new(&server.uri(), None).unwrap()
}

fn berlin_current() -> serde_json::Value {
    json!({
        "apparent_temperature": 15.1,
        "relative_humidity_2m": 71.0,
        "temperature_2m": 16.3,
        "is_day": 1.0,
        "cloud_cover": 100.0,
        "weather_code": 3.0,
        "weather_condition": "Overcast",
        "pressure_msl": 1012.4,
        "wind_speed_10m": 9.7,
        "latitude": 52.52,
        "longitude": 13.405
    })
}

async fn mount_berlin(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .and(query_param("name", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_current()))
        .mount(server)
        .await;
}

/// Collect every status change until the indicator returns to `Idle`.
async fn record_until_idle(mut rx: watch::Receiver<ActionStatus>) -> Vec<ActionStatus> {
    let mut seen = Vec::new();
    while rx.changed().await.is_ok() {
        let status = *rx.borrow_and_update();
        seen.push(status);
        if status == ActionStatus::Idle {
            break;
        }
    }
    seen
}

#[tokio::test]
async fn test_typed_location_resolves_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .and(query_param("name", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(berlin_current()))
        .expect(1)
        .mount(&server)
        .await;

    let mut resolver =
        LocationResolver::new(client_for(&server), CommitMode::Debounce, Duration::from_millis(100));
    let mut rx = resolver.subscribe();

    for prefix in ["B", "Be", "Ber", "Berl", "Berli", "Berlin"] {
        resolver.set_input(prefix);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let state = rx.wait_for(|s| s.is_settled()).await.unwrap().clone();
    assert_eq!(state.latitude(), Some(52.52));
    assert_eq!(state.longitude(), Some(13.405));
    assert_eq!(state.error(), None);
    assert_eq!(
        state.map_url().as_deref(),
        Some("https://maps.google.com/maps?q=52.52,13.405&z=14&output=embed")
    );
}

#[tokio::test]
async fn test_unknown_location_shows_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .and(query_param("name", "Atlantis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": true,
            "detail": "not found"
        })))
        .mount(&server)
        .await;

    let mut resolver =
        LocationResolver::new(client_for(&server), CommitMode::Submit, Duration::from_millis(100));
    let state = resolver.resolve_now("Atlantis").await;

    assert_eq!(state.error(), Some("not found"));
    assert_eq!(state.latitude(), None);
    assert_eq!(state.longitude(), None);
    assert_eq!(state.map_url(), None);
}

#[tokio::test]
async fn test_slow_earlier_response_does_not_win() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .and(query_param("name", "Alpha"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"temperature_2m": 1.0, "latitude": 1.0, "longitude": 1.0}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .and(query_param("name", "Beta"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"temperature_2m": 2.0, "latitude": 2.0, "longitude": 2.0})),
        )
        .mount(&server)
        .await;

    let mut resolver =
        LocationResolver::new(client_for(&server), CommitMode::Submit, Duration::from_millis(100));
    resolver.set_input("Alpha");
    resolver.submit();
    let state = resolver.resolve_now("Beta").await;
    assert_eq!(state.latitude(), Some(2.0));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(resolver.state().name(), Some("Beta"));
    assert_eq!(resolver.state().latitude(), Some(2.0));
}

#[tokio::test]
async fn test_current_view_load_and_failure() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .and(query_param("name", "Nowhere"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let view = CurrentWeatherView::new(client_for(&server), Duration::from_millis(100));

    let state = view.set_location("Berlin").await;
    let conditions = state.data().unwrap();
    assert_eq!(conditions.temperature_2m, 16.3);
    assert_eq!(view.state(), state);
    assert_eq!(view.location(), "Berlin");

    let state = view.set_location("Nowhere").await;
    assert_eq!(state.error(), Some("HTTP error! status: 502"));

    assert_eq!(view.set_location("  ").await, ViewState::Empty);
    assert_eq!(view.state(), ViewState::Empty);
}

#[tokio::test]
async fn test_save_reading_reports_progress_then_clears() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    Mock::given(method("GET"))
        .and(path("/geodata"))
        .and(query_param("name", "Berlin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 7, "name": "Berlin", "lat": 52.52, "long": 13.405}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/weather/create"))
        .and(body_partial_json(json!({
            "temp": 16.3,
            "humidity": 71.0,
            "wind_speed": 9.7,
            "condition": "Overcast",
            "triggered_user": "alice",
            "api_source": "Open-Meteo",
            "loc_id": 7
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Weather record created successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let view = CurrentWeatherView::new(client_for(&server), Duration::from_millis(200));
    view.set_location("Berlin").await;

    let recorder = tokio::spawn(record_until_idle(view.save_status().subscribe()));
    assert!(view.save("alice").await.unwrap());
    assert_eq!(view.save_status().get(), ActionStatus::Success);

    let seen = recorder.await.unwrap();
    assert_eq!(
        seen,
        vec![
            ActionStatus::InProgress,
            ActionStatus::Success,
            ActionStatus::Idle
        ]
    );
}

#[tokio::test]
async fn test_save_is_noop_without_conditions_or_user() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    Mock::given(method("POST"))
        .and(path("/weather/create"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let view = CurrentWeatherView::new(client_for(&server), Duration::from_millis(100));
    assert!(!view.save("alice").await.unwrap());

    view.set_location("Berlin").await;
    assert!(!view.save("   ").await.unwrap());
    assert_eq!(view.save_status().get(), ActionStatus::Idle);
}

#[tokio::test]
async fn test_save_failure_sets_error() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    Mock::given(method("GET"))
        .and(path("/geodata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 404,
            "detail": "Location not found"
        })))
        .mount(&server)
        .await;

    let view = CurrentWeatherView::new(client_for(&server), Duration::from_millis(100));
    view.set_location("Berlin").await;

    let err = view.save("alice").await.unwrap_err();
    assert_eq!(err.to_string(), "Location not found");
    assert_eq!(view.save_status().get(), ActionStatus::Error);

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(view.save_status().get(), ActionStatus::Idle);
}

#[tokio::test]
async fn test_forecast_view_normalizes_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/daily"))
        .and(query_param("name", "Oslo"))
        .and(query_param("start_date", "2024-05-01"))
        .and(query_param("end_date", "2024-05-05"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily_time": [
                "2024-05-01T00:00:00+00:00",
                "2024-05-02T00:00:00+00:00",
                "2024-05-03T00:00:00+00:00"
            ],
            "daily_conditions": ["Partly cloudy", null, "Snow fall"],
            "temperature_2m_max": [14.2, 11.0, 2.0],
            "temperature_2m_min": [3.1, 1.0, -4.0]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let view = DailyForecastView::new(client_for(&server), 5);
    let state = view
        .set_location_from("Oslo", NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .await;

    let rows = state.data().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].description, "Partly cloudy");
    assert_eq!(rows[0].weather_code, 3);
    assert_eq!(rows[1].description, "Unknown");
    assert_eq!(rows[2].weather_code, 71);
    assert_eq!(rows[2].temperature_min, Some(-4.0));
}

#[tokio::test]
async fn test_history_load_names_and_delete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/user"))
        .and(query_param("user", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "loc_id": 1, "temp": 20.5, "condition": "Sunny"},
            {"id": 4, "loc_id": 2, "temp": 11.0, "condition": "Rain"},
            {"id": 3, "loc_id": 1, "temp": 18.0, "condition": "Cloudy"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geodata/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Berlin"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/geodata/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/weather/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Weather record deleted successfully"
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/weather/9"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut history = UserHistory::new(client_for(&server));
    let ids: Vec<i64> = history
        .load("alice")
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![9, 4, 3]);

    history.resolve_location_names().await;
    assert_eq!(history.cached_location_name(1), Some("Berlin"));
    assert_eq!(history.cached_location_name(2), None);
    assert_eq!(history.display_location(&history.records()[0]), "Berlin");
    assert_eq!(history.display_location(&history.records()[1]), UNKNOWN_LOCATION);
    // Cached: no second lookup for id 1
    assert_eq!(history.location_name(1).await, "Berlin");

    history.delete(4).await.unwrap();
    let ids: Vec<i64> = history.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![9, 3]);

    assert!(history.delete(9).await.is_err());
    assert_eq!(
        history.error(),
        Some("Failed to delete record: HTTP error! status: 500")
    );
    assert_eq!(history.records().len(), 2);
}

#[tokio::test]
async fn test_history_load_failure_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/user"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut history = UserHistory::new(client_for(&server));
    assert!(history.load("nobody").await.is_err());
    assert_eq!(
        history.error(),
        Some("Failed to fetch history: HTTP error! status: 404")
    );
    assert!(history.records().is_empty());
}

#[tokio::test]
async fn test_export_writes_file_and_tracks_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/csv"))
        .and(query_param("location", "Berlin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=weather_export_1.csv")
                .set_body_raw("id,temp\n1,20.5\n", "text/csv"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/export/xml"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 404,
            "detail": "No data found with the specified filters"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(client_for(&server), Duration::from_millis(100));
    let filters = ExportFilters {
        location: "Berlin".to_string(),
        ..Default::default()
    };

    let written = exporter
        .export_to_dir(ExportFormat::Csv, &filters, dir.path())
        .await
        .unwrap();
    assert_eq!(written, dir.path().join("weather_export_1.csv"));
    assert_eq!(std::fs::read_to_string(&written).unwrap(), "id,temp\n1,20.5\n");
    assert_eq!(exporter.status().get(), ActionStatus::Success);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(exporter.status().get(), ActionStatus::Idle);

    let err = exporter
        .export(ExportFormat::Xml, &ExportFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Application(ref d) if d == "No data found with the specified filters"));
    assert_eq!(exporter.status().get(), ActionStatus::Error);
}

#[tokio::test]
async fn test_export_write_failure_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=weather_export_1.json")
                .set_body_raw("[]", "application/json"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing").join("sub");
    let exporter = Exporter::new(client_for(&server), Duration::from_secs(60));
    let mut status_rx = exporter.status().subscribe();
    let first_outcome = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow_and_update();
            if matches!(status, ActionStatus::Success | ActionStatus::Error) {
                return Some(status);
            }
        }
        None
    });

    let err = exporter
        .export_to_dir(ExportFormat::Json, &ExportFilters::default(), &missing)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(exporter.status().get(), ActionStatus::Error);
    assert_eq!(first_outcome.await.unwrap(), Some(ActionStatus::Error));
    assert!(!missing.exists());
}

async fn mount_berlin_daily(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/weather/daily"))
        .and(query_param("name", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily_time": ["2024-05-01T00:00:00+00:00"],
            "daily_conditions": ["Clear sky"]
        })))
        .mount(server)
        .await;
}

async fn daily_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/weather/daily")
        .count()
}

#[tokio::test]
async fn test_submit_before_first_poll_loads_views() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    mount_berlin_daily(&server).await;

    let mut config = Config::default();
    config.dashboard.commit_mode = CommitMode::Submit;
    let mut dashboard = Dashboard::new(client_for(&server), &config);
    let mut current_rx = dashboard.current.subscribe();

    // Nothing is awaited between following and submitting
    let follower = dashboard.follow_commits();
    dashboard.resolver.set_input("Berlin");
    dashboard.resolver.submit();

    let current = tokio::time::timeout(
        Duration::from_secs(5),
        current_rx.wait_for(|s| s.is_settled()),
    )
    .await
    .expect("current view never loaded")
    .unwrap()
    .clone();
    assert_eq!(current.data().map(|c| c.temperature_2m), Some(16.3));

    follower.abort();
}

#[tokio::test]
async fn test_commit_before_following_is_loaded() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    mount_berlin_daily(&server).await;

    let mut config = Config::default();
    config.dashboard.commit_mode = CommitMode::Submit;
    let mut dashboard = Dashboard::new(client_for(&server), &config);

    dashboard.resolver.resolve_now("Berlin").await;
    let follower = dashboard.follow_commits();

    tokio::time::timeout(Duration::from_secs(5), dashboard.settle())
        .await
        .expect("views never loaded");
    assert_eq!(dashboard.current.state().data().map(|c| c.temperature_2m), Some(16.3));
    assert_eq!(dashboard.forecast.state().data().map(Vec::len), Some(1));

    follower.abort();
}

#[tokio::test]
async fn test_resubmitting_same_name_reloads_views() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    mount_berlin_daily(&server).await;

    let mut config = Config::default();
    config.dashboard.commit_mode = CommitMode::Submit;
    let mut dashboard = Dashboard::new(client_for(&server), &config);
    let follower = dashboard.follow_commits();

    dashboard.resolver.resolve_now("Berlin").await;
    dashboard.settle().await;
    assert_eq!(daily_requests(&server).await, 1);

    dashboard.resolver.resolve_now("Berlin").await;
    tokio::time::timeout(Duration::from_secs(5), dashboard.settle())
        .await
        .expect("retry never reloaded the views");
    assert_eq!(daily_requests(&server).await, 2);

    follower.abort();
}

#[tokio::test]
async fn test_settle_commits_debounced_input() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    mount_berlin_daily(&server).await;

    let mut config = Config::default();
    config.dashboard.commit_mode = CommitMode::Debounce;
    config.dashboard.debounce_ms = 60_000;
    let mut dashboard = Dashboard::new(client_for(&server), &config);
    let follower = dashboard.follow_commits();

    dashboard.resolver.set_input("Berlin");
    tokio::time::timeout(Duration::from_secs(5), dashboard.settle())
        .await
        .expect("settle did not flush the pending input");

    assert_eq!(dashboard.resolver.state().latitude(), Some(52.52));
    assert_eq!(dashboard.current.state().data().map(|c| c.temperature_2m), Some(16.3));

    follower.abort();
}

#[tokio::test]
async fn test_dashboard_reloads_views_on_commit() {
    let server = MockServer::start().await;
    mount_berlin(&server).await;
    Mock::given(method("GET"))
        .and(path("/weather/daily"))
        .and(query_param("name", "Berlin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily_time": ["2024-05-01T00:00:00+00:00"],
            "daily_conditions": ["Clear sky"]
        })))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.dashboard.commit_mode = CommitMode::Submit;
    let mut dashboard = Dashboard::new(client_for(&server), &config);
    let follower = dashboard.follow_commits();

    let mut current_rx = dashboard.current.subscribe();
    let mut forecast_rx = dashboard.forecast.subscribe();

    let state = dashboard.resolver.resolve_now("Berlin").await;
    assert_eq!(state.latitude(), Some(52.52));

    let current = current_rx.wait_for(|s| s.is_settled()).await.unwrap().clone();
    assert_eq!(current.data().map(|c| c.temperature_2m), Some(16.3));

    let forecast = forecast_rx.wait_for(|s| s.is_settled()).await.unwrap().clone();
    assert_eq!(forecast.data().map(Vec::len), Some(1));

    follower.abort();
}
