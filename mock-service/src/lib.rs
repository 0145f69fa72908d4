use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lazy_static::lazy_static;
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Behaviour of the simulated coupon service.
#[derive(Debug, Clone, Copy)]
pub struct MockConfig {
    /// Mean response time of the coupon endpoints.
    pub latency: Duration,
    /// Standard deviation applied to `latency`.
    pub jitter: Duration,
    pub max_coupon_id: u64,
    pub max_member_id: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(5),
            jitter: Duration::ZERO,
            max_coupon_id: 351_160,
            max_member_id: 250_000,
        }
    }
}

pub async fn serve(listener: TcpListener, config: MockConfig) -> anyhow::Result<()> {
    axum::serve(listener, router(config)).await?;
    Ok(())
}

pub fn router(config: MockConfig) -> Router {
    Router::new()
        .route("/coupons/issuable", get(issuable))
        .route("/coupons/:coupon_id/issued-count", get(issued_count))
        .route("/coupons/:coupon_id/used-count", get(used_count))
        .route("/member-coupons/by-member-id", get(member_coupons))
        .route(
            "/marketing/max-coupon-discount-member",
            get(max_discount_member),
        )
        .route("/status/:status", get(status))
        .route(
            "/max/:max_tps/delay/ms/:delay_ms/scenario/:scenario_name",
            get(max),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(config)
}

/** Coupon endpoints **/

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponCount {
    pub coupon_id: u64,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuableCoupon {
    pub coupon_id: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCoupon {
    pub member_coupon_id: u64,
    pub coupon_id: u64,
    pub used: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxDiscountMember {
    pub member_id: u64,
    pub discount_amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberQuery {
    member_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    year: i32,
    month: u32,
}

#[debug_handler]
pub async fn issued_count(
    State(config): State<MockConfig>,
    Path(coupon_id): Path<u64>,
) -> Result<Json<CouponCount>, StatusCode> {
    record("issued_count");
    check_id(coupon_id, config.max_coupon_id)?;
    simulate(&config).await;
    Ok(Json(CouponCount {
        coupon_id,
        count: coupon_id * 7 % 1_000,
    }))
}

#[debug_handler]
pub async fn used_count(
    State(config): State<MockConfig>,
    Path(coupon_id): Path<u64>,
) -> Result<Json<CouponCount>, StatusCode> {
    record("used_count");
    check_id(coupon_id, config.max_coupon_id)?;
    simulate(&config).await;
    Ok(Json(CouponCount {
        coupon_id,
        count: coupon_id * 3 % 500,
    }))
}

#[debug_handler]
pub async fn issuable(State(config): State<MockConfig>) -> Json<Vec<IssuableCoupon>> {
    record("issuable");
    simulate(&config).await;
    Json(
        (1..=20)
            .map(|coupon_id| IssuableCoupon {
                coupon_id,
                name: format!("coupon-{coupon_id}"),
            })
            .collect(),
    )
}

#[debug_handler]
pub async fn member_coupons(
    State(config): State<MockConfig>,
    Query(query): Query<MemberQuery>,
) -> Result<Json<Vec<MemberCoupon>>, StatusCode> {
    record("member_coupons");
    check_id(query.member_id, config.max_member_id)?;
    simulate(&config).await;
    Ok(Json(
        (0..3)
            .map(|n| MemberCoupon {
                member_coupon_id: query.member_id * 3 + n,
                coupon_id: (query.member_id + n) % config.max_coupon_id + 1,
                used: n == 0,
            })
            .collect(),
    ))
}

#[debug_handler]
pub async fn max_discount_member(
    State(config): State<MockConfig>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MaxDiscountMember>, StatusCode> {
    record("max_discount_member");
    if !(1..=12).contains(&query.month) {
        return Err(StatusCode::BAD_REQUEST);
    }
    simulate(&config).await;
    Ok(Json(MaxDiscountMember {
        member_id: (query.year as u64 * 12 + query.month as u64) % config.max_member_id + 1,
        discount_amount: 1_000 * query.month as u64,
    }))
}

fn check_id(id: u64, max: u64) -> Result<(), StatusCode> {
    if (1..=max).contains(&id) {
        Ok(())
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn simulate(config: &MockConfig) {
    let latency = if config.jitter.is_zero() {
        config.latency
    } else {
        let secs = Normal::new(config.latency.as_secs_f64(), config.jitter.as_secs_f64())
            .map(|normal| normal.sample(&mut rand::thread_rng()).max(0.))
            .unwrap_or(config.latency.as_secs_f64());
        Duration::from_secs_f64(secs)
    };
    tokio::time::sleep(latency).await;
}

fn record(endpoint: &'static str) {
    counter!("mock-server.requests", "endpoint" => endpoint).increment(1);
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
}

/** Test endpoints **/

#[debug_handler]
pub async fn status(Path(status): Path<u16>) -> StatusCode {
    record("status");
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

lazy_static! {
    static ref MAX_MAP: Arc<RwLock<HashMap<String, DefaultDirectRateLimiter>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

/// Serves at most `max_tps` successful requests per second per scenario name and fails the rest.
#[debug_handler]
pub async fn max(
    Path((max_tps, delay_ms, scenario_name)): Path<(u32, u64, String)>,
) -> Result<(), StatusCode> {
    record("max");
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    let limiter = NonZeroU32::new(max_tps).ok_or(StatusCode::BAD_REQUEST)?;
    {
        let map = MAX_MAP
            .read()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if let Some(limiter) = map.get(&scenario_name) {
            return match limiter.check() {
                Ok(_) => Ok(()),
                Err(_) => {
                    debug!("Rate limit reached for {scenario_name}");
                    Err(StatusCode::INTERNAL_SERVER_ERROR)
                }
            };
        }
    }

    debug!("Creating rate limiter for {scenario_name}");
    MAX_MAP
        .write()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .insert(scenario_name, rate_limiter(limiter));
    Ok(())
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        gauge!("mock-server.tps").set(transactions as f64);
        debug!("{transactions} TPS");
    }
}
