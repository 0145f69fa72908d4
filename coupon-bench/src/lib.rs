//! Latency scenarios for the coupon service read endpoints.
//!
//! Every scenario picks a fresh random id per request so that the load is spread across the
//! indexed range instead of hitting one cached row.
use futures::future::{BoxFuture, FutureExt};
use rand::Rng;
use reqwest::Client;
use slobench::prelude::*;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

pub const BASE_URI: &str = "http://localhost:8080";

pub const COUPON_IDS: RangeInclusive<u64> = 1..=351_160;
pub const MEMBER_IDS: RangeInclusive<u64> = 1..=250_000;
pub const MONTHS: RangeInclusive<u32> = 1..=5;
pub const REPORT_YEAR: i32 = 2019;

pub type Request = BoxFuture<'static, Result<u16, reqwest::Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    IssuedCount,
    UsedCount,
    Issuable,
    MemberCoupons,
    MaxDiscountMember,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::IssuedCount,
        Endpoint::UsedCount,
        Endpoint::Issuable,
        Endpoint::MemberCoupons,
        Endpoint::MaxDiscountMember,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::IssuedCount => "coupon_issued_count",
            Endpoint::UsedCount => "coupon_used_count",
            Endpoint::Issuable => "issuable_coupons",
            Endpoint::MemberCoupons => "member_coupons",
            Endpoint::MaxDiscountMember => "max_discount_member",
        }
    }

    /// Maximum acceptable mean latency.
    pub fn threshold(&self) -> Duration {
        match self {
            // Scans every coupon in its issuance window.
            Endpoint::Issuable => Duration::from_millis(500),
            _ => Duration::from_millis(100),
        }
    }

    /// Path of the single request issued before the run.
    pub fn sentinel_path<G: Rng + ?Sized>(&self, rng: &mut G) -> String {
        match self {
            Endpoint::MaxDiscountMember => {
                format!("/marketing/max-coupon-discount-member?year={REPORT_YEAR}&month=1")
            }
            _ => self.load_path(rng),
        }
    }

    /// Path of one load request.
    pub fn load_path<G: Rng + ?Sized>(&self, rng: &mut G) -> String {
        match self {
            Endpoint::IssuedCount => {
                format!("/coupons/{}/issued-count", rng.gen_range(COUPON_IDS))
            }
            Endpoint::UsedCount => format!("/coupons/{}/used-count", rng.gen_range(COUPON_IDS)),
            Endpoint::Issuable => "/coupons/issuable".to_string(),
            Endpoint::MemberCoupons => format!(
                "/member-coupons/by-member-id?memberId={}",
                rng.gen_range(MEMBER_IDS)
            ),
            Endpoint::MaxDiscountMember => format!(
                "/marketing/max-coupon-discount-member?year={REPORT_YEAR}&month={}",
                rng.gen_range(MONTHS)
            ),
        }
    }
}

/// HTTP target shared by all workers of a scenario.
#[derive(Clone)]
pub struct Target {
    client: Client,
    base: Arc<str>,
}

impl Target {
    pub fn new(client: Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').into(),
        }
    }

    /// Issue a GET and read the full body. Resolves to the response status.
    pub fn get(&self, path: &str) -> Request {
        let req = self.client.get(format!("{}{path}", self.base));
        async move {
            let res = req.send().await?;
            let status = res.status().as_u16();
            res.bytes().await?;
            Ok(status)
        }
        .boxed()
    }
}

/// Build the benchmark scenario for `endpoint` with the default run configuration.
pub fn scenario(
    endpoint: Endpoint,
    target: Target,
) -> Scenario<
    impl Fn() -> Request + Send + Sync + Clone + 'static,
    impl Fn() -> Request + Send + Sync + Clone + 'static,
> {
    let sentinel_target = target.clone();
    let sentinel =
        move || sentinel_target.get(&endpoint.sentinel_path(&mut rand::thread_rng()));
    let load = move || target.get(&endpoint.load_path(&mut rand::thread_rng()));

    Scenario::new(endpoint.name(), sentinel, load)
        .threshold(endpoint.threshold())
        .config(RunConfig::default())
}
