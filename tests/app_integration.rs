use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use cgdp::core::config::AppConfig;
use cgdp::server::{AppState, router};
use cgdp::store::CountryStore;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::info;
use wiremock::MockServer;

// Mock upstreams shared by the end-to-end tests
mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const COUNTRIES: &str = r#"[
        {
            "name": "Testland",
            "capital": "Test City",
            "region": "Testregion",
            "population": 1000000,
            "flag": "https://flags.example/tst.svg",
            "currencies": [{"code": "TST", "name": "Test dollar", "symbol": "T$"}],
            "independent": false
        },
        {
            "name": "Nocoinia",
            "region": "Testregion",
            "population": 5000,
            "flag": "https://flags.example/noc.svg"
        },
        {
            "name": "Faraway",
            "capital": "Far",
            "region": "Elsewhere",
            "population": 2500,
            "currencies": [{"code": "FAR"}]
        },
        {
            "name": "Ghostland",
            "region": "Elsewhere"
        }
    ]"#;

    pub const RATES: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "rates": {"USD": 1, "TST": 2, "EUR": 0.92}
    }"#;

    pub async fn countries_server(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/all"))
            .and(query_param(
                "fields",
                "name,capital,region,population,flag,currencies",
            ))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    pub async fn rates_server(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/latest/USD"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }
}

struct TestApp {
    router: Router,
    summary_path: PathBuf,
    _data_dir: TempDir,
}

async fn spawn_app(countries: &MockServer, rates: &MockServer) -> TestApp {
    let data_dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.providers.countries.base_url = countries.uri();
    config.providers.exchange_rates.base_url = rates.uri();
    config.request_timeout_secs = 5;
    config.data_path = Some(data_dir.path().display().to_string());

    let summary_path = config.summary_image_path().unwrap();
    let store = CountryStore::in_memory().await.unwrap();
    let refresher = cgdp::build_refresher(&config, store.clone(), &summary_path).unwrap();

    let router = router(AppState {
        store,
        refresher: Arc::new(refresher),
        summary_path: summary_path.clone(),
    });
    TestApp {
        router,
        summary_path,
        _data_dir: data_dir,
    }
}

async fn send(app: &TestApp, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &TestApp, method: Method, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test_log::test(tokio::test)]
async fn test_refresh_end_to_end() {
    let countries = test_utils::countries_server(200, test_utils::COUNTRIES).await;
    let rates = test_utils::rates_server(200, test_utils::RATES).await;
    let app = spawn_app(&countries, &rates).await;

    let (status, body) = send_json(&app, Method::POST, "/countries/refresh").await;
    info!(?body, "Refresh response");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Countries refreshed successfully");
    assert_eq!(body["total_countries"], 3);

    let (status, testland) = send_json(&app, Method::GET, "/countries/TESTLAND").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(testland["name"], "Testland");
    assert_eq!(testland["capital"], "Test City");
    assert_eq!(testland["currency_code"], "TST");
    assert_eq!(testland["exchange_rate"], 2.0);
    assert_eq!(testland["flag_url"], "https://flags.example/tst.svg");
    let gdp = testland["estimated_gdp"].as_f64().unwrap();
    assert!((500_000_000.0..=1_000_000_000.0).contains(&gdp), "gdp = {gdp}");
    assert_eq!(testland["last_refreshed_at"], body["last_refreshed_at"]);

    let (_, nocoinia) = send_json(&app, Method::GET, "/countries/nocoinia").await;
    assert!(nocoinia["currency_code"].is_null());
    assert_eq!(nocoinia["estimated_gdp"], 0.0);

    let (_, faraway) = send_json(&app, Method::GET, "/countries/faraway").await;
    assert_eq!(faraway["currency_code"], "FAR");
    assert!(faraway["exchange_rate"].is_null());
    assert!(faraway["estimated_gdp"].is_null());

    let (status, _) = send(&app, Method::GET, "/countries/ghostland").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, summary) = send_json(&app, Method::GET, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_countries"], 3);
    assert_eq!(summary["last_refreshed_at"], body["last_refreshed_at"]);

    let request = Request::builder()
        .uri("/countries/image")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let png = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    assert!(app.summary_path.exists());
}

#[test_log::test(tokio::test)]
async fn test_second_refresh_keeps_the_same_countries() {
    let countries = test_utils::countries_server(200, test_utils::COUNTRIES).await;
    let rates = test_utils::rates_server(200, test_utils::RATES).await;
    let app = spawn_app(&countries, &rates).await;

    send(&app, Method::POST, "/countries/refresh").await;
    let (_, first) = send_json(&app, Method::GET, "/countries").await;
    let (status, _) = send(&app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, second) = send_json(&app, Method::GET, "/countries").await;

    let ids_and_names = |list: &Value| -> Vec<(i64, String)> {
        list.as_array()
            .unwrap()
            .iter()
            .map(|c| {
                (
                    c["id"].as_i64().unwrap(),
                    c["name"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    };
    assert_eq!(ids_and_names(&first), ids_and_names(&second));
}

#[test_log::test(tokio::test)]
async fn test_rates_without_rates_key_is_unavailable() {
    let countries = test_utils::countries_server(200, test_utils::COUNTRIES).await;
    let rates = test_utils::rates_server(200, r#"{"result": "error"}"#).await;
    let app = spawn_app(&countries, &rates).await;

    let (status, body) = send_json(&app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "External data source unavailable");
    assert_eq!(
        body["details"],
        "Could not fetch data from exchange rates API"
    );

    let (_, list) = send_json(&app, Method::GET, "/countries").await;
    assert!(list.as_array().unwrap().is_empty());
    let (status, _) = send(&app, Method::GET, "/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/countries/image").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn test_countries_upstream_error_is_unavailable() {
    let countries = test_utils::countries_server(500, "oops").await;
    let rates = test_utils::rates_server(200, test_utils::RATES).await;
    let app = spawn_app(&countries, &rates).await;

    let (status, body) = send_json(&app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"], "Could not fetch data from countries API");
}

#[test_log::test(tokio::test)]
async fn test_failed_refresh_keeps_previous_data() {
    let countries = test_utils::countries_server(200, test_utils::COUNTRIES).await;
    let rates = test_utils::rates_server(200, test_utils::RATES).await;
    let app = spawn_app(&countries, &rates).await;

    send(&app, Method::POST, "/countries/refresh").await;
    let (_, before) = send_json(&app, Method::GET, "/countries").await;
    let (_, status_before) = send_json(&app, Method::GET, "/status").await;

    rates.reset().await;
    let (status, _) = send(&app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, after) = send_json(&app, Method::GET, "/countries").await;
    let (_, status_after) = send_json(&app, Method::GET, "/status").await;
    assert_eq!(before, after);
    assert_eq!(status_before, status_after);
}

#[test_log::test(tokio::test)]
async fn test_malformed_country_entry_does_not_block_refresh() {
    let body = r#"[
        {"name": "Good", "region": "Testregion", "population": 10, "currencies": [{"code": "TST"}]},
        {"name": "Oddland", "region": "Testregion", "population": 2500000.0},
        {"name": "Badcap", "capital": 42, "population": 5},
        null
    ]"#;
    let countries = test_utils::countries_server(200, body).await;
    let rates = test_utils::rates_server(200, test_utils::RATES).await;
    let app = spawn_app(&countries, &rates).await;

    let (status, response) = send_json(&app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["total_countries"], 2);

    let (_, list) = send_json(&app, Method::GET, "/countries").await;
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Good", "Oddland"]);

    let (_, oddland) = send_json(&app, Method::GET, "/countries/oddland").await;
    assert_eq!(oddland["population"], 2_500_000);
    assert_eq!(oddland["estimated_gdp"], 0.0);

    let (status, _) = send(&app, Method::GET, "/countries/badcap").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
