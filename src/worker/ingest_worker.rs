use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::models::PipelineConfig;
use crate::services::{run_all, CandleSource};

/// Run the pipeline forever, once per `config.run_interval`
#[instrument(skip(source, config))]
pub async fn run<S>(source: Arc<S>, config: PipelineConfig)
where
    S: CandleSource + 'static,
{
    run_iterations(source, config, None).await;
}

/// Run the pipeline `max_iterations` times, or forever when `None`
///
/// A failed iteration is logged and the loop carries on with the next one.
/// Returns the number of iterations completed.
pub async fn run_iterations<S>(source: Arc<S>, config: PipelineConfig, max_iterations: Option<u64>) -> u64
where
    S: CandleSource + 'static,
{
    info!(
        tickers = ?config.tickers,
        lookback_minutes = config.lookback_minutes,
        interval_secs = config.run_interval.as_secs(),
        "Starting ingest worker"
    );

    let mut iteration_count = 0u64;

    loop {
        iteration_count += 1;
        let loop_start = Instant::now();

        info!(iteration = iteration_count, "Ingest worker: Starting run");

        match run_all(Arc::clone(&source), &config).await {
            Ok(summary) => {
                for result in summary.results.iter().filter(|r| !r.is_success()) {
                    warn!(iteration = iteration_count, "Ingest worker: {}", result.describe());
                }
                info!(
                    iteration = iteration_count,
                    succeeded = summary.succeeded(),
                    failed = summary.failed(),
                    counts = ?summary.counts,
                    "Ingest worker: Run completed"
                );
            }
            Err(e) => {
                error!(iteration = iteration_count, error = %e, "Ingest worker: Run failed");
            }
        }

        let loop_duration = loop_start.elapsed();
        info!(
            iteration = iteration_count,
            duration_secs = loop_duration.as_secs_f64(),
            "Ingest worker: Iteration finished"
        );

        if max_iterations.is_some_and(|max| iteration_count >= max) {
            return iteration_count;
        }

        // Runs are spaced from the end of the previous run
        sleep(config.run_interval).await;
    }
}
