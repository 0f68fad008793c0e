//! Video summary worker binary.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vsum_ai_client::{ClaudeClient, ClovaSttClient};
use vsum_media::{check_ffmpeg, FfmpegRunner};
use vsum_storage::S3Client;
use vsum_worker::{
    connect_source, listen_for_shutdown, metrics, CallbackReporter, Collaborators, FfmpegTranscoder, JobOrchestrator,
    MessageLoop, ResultStore, S3ObjectStore, S3ResultStore, StagePolicies, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting vsum-worker");

    let config = WorkerConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!(
        app_env = %config.app_env,
        queue = ?config.queue.backend,
        concurrency = config.concurrency,
        result_upload = config.storage.result_upload_enabled,
        "Configuration loaded"
    );

    if let Some(port) = config.metrics_port {
        metrics::install_exporter(port).context("Failed to start metrics exporter")?;
        info!("Serving metrics on port {}", port);
    }

    if let Err(e) = check_ffmpeg() {
        warn!("{}; audio extraction will fail until ffmpeg is installed", e);
    }
    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("Failed to create work dir {}", config.work_dir.display()))?;

    let reporter = Arc::new(CallbackReporter::new(config.callback.clone())?);
    if reporter.health_check().await {
        info!("Backend health check passed");
    } else {
        warn!("Backend health check failed; continuing");
    }

    let storage = S3Client::new(&config.storage).await?;
    let result_store: Option<Arc<dyn ResultStore>> = if config.storage.result_upload_enabled {
        Some(Arc::new(S3ResultStore::new(
            storage.clone(),
            config.storage.result_bucket.clone(),
        )))
    } else {
        None
    };

    let collaborators = Collaborators {
        object_store: Arc::new(S3ObjectStore::new(storage, config.work_dir.clone())),
        transcoder: Arc::new(FfmpegTranscoder::new(
            FfmpegRunner::new().with_timeout(config.ffmpeg_timeout_secs),
        )),
        transcriber: Arc::new(ClovaSttClient::new(config.clova.clone())?),
        summarizer: Arc::new(ClaudeClient::new(config.claude.clone())?),
        result_store,
        reporter,
    };
    let orchestrator = Arc::new(
        JobOrchestrator::new(collaborators, StagePolicies::from_config(&config.stage))
            .with_expected_bucket(config.video_bucket.clone()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = listen_for_shutdown(shutdown_tx).context("Failed to install signal handlers")?;
    let mut loops = Vec::with_capacity(config.concurrency);
    for index in 0..config.concurrency {
        let source = connect_source(&config.queue, index)
            .await
            .context("Failed to connect work-item source")?;
        let message_loop = MessageLoop::new(
            format!("loop-{}", index),
            source,
            Arc::clone(&orchestrator),
            config.queue.sqs.wait_time,
        );
        let shutdown = shutdown_rx.clone();
        loops.push(tokio::spawn(async move { message_loop.run(shutdown).await }));
    }

    listener.await.ok();
    info!("Received shutdown signal, finishing in-flight jobs");

    for handle in loops {
        handle.await.ok();
    }

    info!("Worker shutdown complete");
    Ok(())
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aws_config=warn,aws_smithy_runtime=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}
