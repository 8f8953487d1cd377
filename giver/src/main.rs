mod config;

use clap::Parser;
use config::{Config, LoggingConfig, MetricsConfig};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Parser)]
#[command(about = "Streams each request on a registered path to all of its sinks")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "/etc/giver.yaml")]
    config: PathBuf,

    /// Redis connection string; overrides gateway.redis_url
    #[arg(long)]
    redis: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };
    if let Some(redis) = cli.redis {
        config.gateway.redis_url = Some(redis);
    }

    let sentry_guard = init_logging(&config.logging);
    if let Some(metrics) = &config.metrics {
        init_metrics(metrics);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        tokio::select! {
            result = gateway::run(config.gateway) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    });

    if let Err(e) = result {
        tracing::error!(error = %e, "giver stopped");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

fn init_logging(logging: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let sentry_guard = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });
    let sentry_layer = sentry_guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .with(sentry_layer)
        .init();

    sentry_guard
}

fn init_metrics(metrics: &MetricsConfig) {
    let recorder = metrics_exporter_statsd::StatsdBuilder::from(
        metrics.statsd_host.as_str(),
        metrics.statsd_port,
    )
    .build(Some("giver"));

    match recorder {
        Ok(recorder) => {
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::warn!("a metrics recorder was already installed");
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to build statsd recorder"),
    }
}
