use coupon_bench::{scenario, Endpoint, Target, BASE_URI};
use reqwest::Client;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slobench=info,coupon_bench=info")),
        )
        .init();

    let target = Target::new(Client::builder().build()?, BASE_URI);

    let mut failed = 0;
    for endpoint in Endpoint::ALL {
        info!("Benchmarking {}", endpoint.name());
        match scenario(endpoint, target.clone()).await {
            Ok(report) => println!("{report}"),
            Err(err) => {
                error!("{err}");
                println!("{}: FAIL ({err})", endpoint.name());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        error!("{failed} of {} scenarios failed.", Endpoint::ALL.len());
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
