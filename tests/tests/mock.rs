use coupon_bench::{scenario, Endpoint, Target};
use mock_service::MockConfig;
use reqwest::Client;
use slobench::prelude::*;
use slobench_tests::{closed_port, init, spawn_mock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn short<S, L>(scenario: Scenario<S, L>) -> Scenario<S, L> {
    scenario
        .concurrency(4)
        .warmup(Duration::from_millis(100))
        .duration(Duration::from_secs(1))
        .shutdown_grace(Duration::from_secs(2))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_endpoint_meets_its_threshold() {
    let base = spawn_mock(MockConfig::default()).await;
    let target = Target::new(Client::new(), &base);

    for endpoint in Endpoint::ALL {
        let report = short(scenario(endpoint, target.clone()))
            .await
            .unwrap_or_else(|err| panic!("{} failed: {err}", endpoint.name()));

        println!("{report}");
        assert_eq!(report.statistics.completed_workers, 4);
        assert!(report.statistics.request_count >= 4);
        assert_eq!(report.statistics.failure_count, 0);
        assert!(report.mean_latency >= Duration::from_millis(5));
    }

    let rendered = init().render();
    assert!(rendered.contains("slobench_success"), "{rendered}");
    assert!(rendered.contains("scenario=\"member_coupons\""), "{rendered}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_service_violates_slo() {
    let base = spawn_mock(MockConfig {
        latency: Duration::from_millis(150),
        ..Default::default()
    })
    .await;
    let target = Target::new(Client::new(), &base);

    let res = short(scenario(Endpoint::IssuedCount, target)).await;

    match res {
        Err(BenchError::SloViolation {
            scenario,
            mean,
            threshold,
        }) => {
            assert_eq!(scenario, "coupon_issued_count");
            assert!(mean >= Duration::from_millis(150));
            assert_eq!(threshold, Duration::from_millis(100));
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn server_error_sentinel_aborts_before_load() {
    let base = spawn_mock(MockConfig::default()).await;
    let target = Target::new(Client::new(), &base);

    let load_calls = Arc::new(AtomicU64::new(0));
    let (t, c) = (target.clone(), load_calls.clone());
    let res = short(Scenario::new(
        "broken_sentinel",
        move || target.get("/status/500"),
        move || {
            c.fetch_add(1, Ordering::Relaxed);
            t.get("/coupons/issuable")
        },
    ))
    .await;

    match res {
        Err(BenchError::Precondition {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 200);
            assert_eq!(actual, SentinelFailure::Status(500));
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(load_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_coupon_fails_sentinel() {
    let base = spawn_mock(MockConfig {
        max_coupon_id: 0,
        ..Default::default()
    })
    .await;
    let target = Target::new(Client::new(), &base);

    let res = short(scenario(Endpoint::UsedCount, target)).await;

    assert!(matches!(
        res,
        Err(BenchError::Precondition {
            actual: SentinelFailure::Status(404),
            ..
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_service_fails_sentinel() {
    let target = Target::new(Client::new(), &closed_port().await);

    let res = short(scenario(Endpoint::Issuable, target)).await;

    assert!(matches!(
        res,
        Err(BenchError::Precondition {
            actual: SentinelFailure::Transport(_),
            ..
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overloaded_service_failures_are_counted() {
    let base = spawn_mock(MockConfig::default()).await;
    let target = Target::new(Client::new(), &base);

    let client = Client::new();
    let url = format!("{base}/max/50/delay/ms/1/scenario/overloaded");
    let report = short(Scenario::new(
        "overloaded",
        move || target.get("/coupons/issuable"),
        move || {
            let req = client.get(&url);
            async move {
                let res = req.send().await?;
                if res.status().is_server_error() {
                    return Err(anyhow::anyhow!("server error {}", res.status()));
                }
                Ok::<(), anyhow::Error>(())
            }
        },
    ))
    .await
    .unwrap();

    let stats = &report.statistics;
    assert!(stats.request_count > 0);
    assert!(stats.failure_count > 0);
    assert_eq!(stats.completed_workers, 4);
    assert!(stats.error_rate() > 0. && stats.error_rate() < 1.);

    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["failure_count"], stats.failure_count);
    assert_eq!(json["workers"], 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abort_policy_reports_aborted_workers() {
    let base = spawn_mock(MockConfig::default()).await;
    let target = Target::new(Client::new(), &base);
    let dead = Target::new(Client::new(), &closed_port().await);

    let res = short(Scenario::new(
        "abort_on_error",
        move || target.get("/coupons/issuable"),
        move || dead.get("/"),
    ))
    .failure_policy(FailurePolicy::Abort)
    .await;

    match res {
        Err(BenchError::NoCompletedRequests {
            aborted_workers,
            failures,
            ..
        }) => {
            assert_eq!(aborted_workers, 4);
            assert_eq!(failures, 0);
        }
        other => panic!("unexpected result {other:?}"),
    }
}
