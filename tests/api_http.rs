// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// Upstreams and predictors are replaced with in-process stubs, and the
// router is exercised directly via tower::ServiceExt::oneshot.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt as _;

use socio_berries::api::{self, AppState};
use socio_berries::config::ScoringConstants;
use socio_berries::error::{BerriesError, Result as BerriesResult, Upstream};
use socio_berries::model::{Models, Prediction, Predictor};
use socio_berries::upstream::AccountDataSource;
use socio_berries::ScoringContext;

const BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone)]
struct StubSource {
    posts: Value,
    balances: Value,
    posts_status: Option<u16>,
    balances_status: Option<u16>,
    posts_delay: Duration,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubSource {
    fn healthy() -> Self {
        Self {
            posts: json!({
                "resources": [
                    { "type": "0x1::SocialMediaPlatform::Profile",
                      "data": { "followers_count": "120" } },
                    { "type": "0x1::SocialMediaPlatform::UserPosts",
                      "data": { "posts": [
                          { "like_count": "10", "comments": ["a", "b", "c"] },
                          { "like_count": "20", "comments": ["d"] }
                      ] } }
                ]
            }),
            balances: json!({
                "latest_balances": [
                    { "metadata": { "symbol": "APT" }, "amount_in_usd": 500 }
                ]
            }),
            posts_status: None,
            balances_status: None,
            posts_delay: Duration::ZERO,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AccountDataSource for StubSource {
    async fn fetch_user_posts(&self, address: &str) -> BerriesResult<Value> {
        self.seen.lock().unwrap().push(address.to_string());
        tokio::time::sleep(self.posts_delay).await;
        if let Some(status) = self.posts_status {
            return Err(BerriesError::UpstreamFetch {
                upstream: Upstream::UserPosts,
                status,
                url: "stub://posts".into(),
            });
        }
        Ok(self.posts.clone())
    }

    async fn fetch_coin_balances(&self, address: &str) -> BerriesResult<Value> {
        self.seen.lock().unwrap().push(address.to_string());
        if let Some(status) = self.balances_status {
            return Err(BerriesError::UpstreamFetch {
                upstream: Upstream::CoinBalances,
                status,
                url: "stub://balances".into(),
            });
        }
        Ok(self.balances.clone())
    }
}

/// Returns a fixed prediction and remembers every row it was asked about.
struct FixedPredictor {
    out: Prediction,
    rows: Mutex<Vec<Vec<f64>>>,
}

impl FixedPredictor {
    fn new(out: Prediction) -> Arc<Self> {
        Arc::new(Self {
            out,
            rows: Mutex::new(Vec::new()),
        })
    }
}

impl Predictor for FixedPredictor {
    fn predict(&self, row: &[f64]) -> anyhow::Result<Prediction> {
        self.rows.lock().unwrap().push(row.to_vec());
        Ok(self.out.clone())
    }
}

struct FailingPredictor;

impl Predictor for FailingPredictor {
    fn predict(&self, _row: &[f64]) -> anyhow::Result<Prediction> {
        anyhow::bail!("model exploded")
    }
}

fn build(
    source: StubSource,
    credibility: Arc<dyn Predictor>,
    influencer: Arc<dyn Predictor>,
) -> Router {
    let ctx = ScoringContext::new(
        Arc::new(source),
        Models::new(credibility, influencer),
        ScoringConstants::default(),
    );
    api::router(AppState::new(ctx))
}

async fn post_berries(app: Router, address: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/calculate_berries")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "account_address": address }).to_string()))
        .expect("build POST /calculate_berries");
    let resp = app.oneshot(req).await.expect("oneshot /calculate_berries");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Value = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build(
        StubSource::healthy(),
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn success_returns_both_scores_and_feeds_documented_rows() {
    let source = StubSource::healthy();
    let seen = source.seen.clone();
    let cred = FixedPredictor::new(Prediction::Matrix(vec![vec![0.8125]]));
    let infl = FixedPredictor::new(Prediction::Vector(vec![42.5]));

    let app = build(source, cred.clone(), infl.clone());
    let (status, v) = post_berries(app, "0xabc").await;

    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["credibility_weight"], json!(0.8125));
    assert_eq!(v["berries"], json!(42.5));

    assert_eq!(cred.rows.lock().unwrap().as_slice(), &[vec![500.0, 5000.0]]);
    assert_eq!(
        infl.rows.lock().unwrap().as_slice(),
        &[vec![120.0, 30.0, 4.0, 10.0, 15.0, 2.0, 0.8125]]
    );

    // Address is passed verbatim to both upstreams.
    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["0xabc".to_string(), "0xabc".to_string()]);
}

#[tokio::test]
async fn credibility_output_is_seventh_influencer_feature() {
    let v = 3.141_592_653_589_793_f64;
    let infl = FixedPredictor::new(Prediction::Vector(vec![1.0]));
    let app = build(
        StubSource::healthy(),
        FixedPredictor::new(Prediction::Vector(vec![v])),
        infl.clone(),
    );
    let (status, _) = post_berries(app, "0x1").await;
    assert_eq!(status, StatusCode::OK);
    let rows = infl.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], v);
}

#[tokio::test]
async fn upstream_failure_status_is_passed_through() {
    for (posts_status, balances_status, expected) in [
        (Some(404), None, StatusCode::NOT_FOUND),
        (None, Some(503), StatusCode::SERVICE_UNAVAILABLE),
        (Some(302), None, StatusCode::FOUND),
    ] {
        let mut source = StubSource::healthy();
        source.posts_status = posts_status;
        source.balances_status = balances_status;
        let infl = FixedPredictor::new(Prediction::Vector(vec![1.0]));
        let app = build(
            source,
            FixedPredictor::new(Prediction::Vector(vec![0.5])),
            infl.clone(),
        );

        let (status, v) = post_berries(app, "0xabc").await;
        assert_eq!(status, expected);
        assert!(v.get("berries").is_none(), "no zero-filled success body: {v}");
        let detail = v["detail"].as_str().expect("detail string");
        assert!(detail.starts_with("Error fetching external data"), "{detail}");
        assert!(infl.rows.lock().unwrap().is_empty(), "no inference after fetch failure");
    }
}

#[tokio::test]
async fn malformed_upstream_payload_is_500() {
    let mut source = StubSource::healthy();
    source.balances = json!({ "balances": [] });
    let app = build(
        source,
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let (status, v) = post_berries(app, "0xabc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = v["detail"].as_str().unwrap();
    assert!(
        detail.starts_with("Unexpected data structure in external API response"),
        "{detail}"
    );
    assert!(detail.contains("latest_balances"), "{detail}");
}

#[tokio::test]
async fn predictor_failure_is_internal_error() {
    let app = build(
        StubSource::healthy(),
        Arc::new(FailingPredictor),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let (status, v) = post_berries(app, "0xabc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = v["detail"].as_str().unwrap();
    assert!(detail.starts_with("Internal Server Error"), "{detail}");
    assert!(detail.contains("model exploded"), "{detail}");
}

#[tokio::test]
async fn empty_prediction_is_internal_error() {
    let app = build(
        StubSource::healthy(),
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Matrix(vec![])),
    );
    let (status, _) = post_berries(app, "0xabc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn empty_address_is_rejected_before_fetching() {
    let source = StubSource::healthy();
    let seen = source.seen.clone();
    let app = build(
        source,
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let (status, v) = post_berries(app, "").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(v["detail"].as_str().unwrap().contains("account_address"));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn whitespace_address_is_passed_through_verbatim() {
    let source = StubSource::healthy();
    let seen = source.seen.clone();
    let app = build(
        source,
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let (status, _) = post_berries(app, "   ").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &["   ".to_string(), "   ".to_string()]
    );
}

#[tokio::test]
async fn malformed_posts_payload_wins_over_balances_failure() {
    let mut source = StubSource::healthy();
    source.posts = json!({ "profile": {} });
    source.balances_status = Some(503);
    let app = build(
        source,
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let (status, v) = post_berries(app, "0xabc").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {v}");
    let detail = v["detail"].as_str().unwrap();
    assert!(detail.contains("resources"), "{detail}");
}

#[tokio::test]
async fn slow_posts_failure_wins_over_fast_balances_failure() {
    let mut source = StubSource::healthy();
    source.posts_status = Some(404);
    source.posts_delay = Duration::from_millis(50);
    source.balances_status = Some(503);
    let app = build(
        source,
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let (status, v) = post_berries(app, "0xabc").await;
    assert_eq!(status, StatusCode::NOT_FOUND, "body: {v}");
}

#[tokio::test]
async fn missing_field_in_request_body_is_client_error() {
    let app = build(
        StubSource::healthy(),
        FixedPredictor::new(Prediction::Vector(vec![0.5])),
        FixedPredictor::new(Prediction::Vector(vec![1.0])),
    );
    let req = Request::builder()
        .method("POST")
        .uri("/calculate_berries")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"address":"0x1"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_client_error(), "got {}", resp.status());
}
