//! Shared setup for the end-to-end tests.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use mock_service::MockConfig;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

/// Install logging, a panic hook and an in-memory metrics recorder once per test binary.
pub fn init() -> &'static PrometheusHandle {
    static METRICS: OnceLock<PrometheusHandle> = OnceLock::new();

    METRICS.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("slobench=debug,mock_service=info,axum::rejection=trace")
            .try_init();

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _ = metrics::set_global_recorder(recorder);
        handle
    })
}

/// Start a mock coupon service on an ephemeral port and return its base URI.
pub async fn spawn_mock(config: MockConfig) -> String {
    init();

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock service");
    let addr: SocketAddr = listener.local_addr().expect("Mock service has no address");

    tokio::spawn(async move {
        if let Err(err) = mock_service::serve(listener, config).await {
            error!("Mock service stopped: {err}");
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://{addr}")
}

/// A base URI nothing is listening on.
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe socket");
    let addr = listener.local_addr().expect("Probe socket has no address");
    drop(listener);
    format!("http://{addr}")
}
