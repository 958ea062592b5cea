use std::io;
use std::sync::Arc;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::defeat::Notifier;
use crate::env::{RaidSettings, RetrySettings, Settings};
use crate::ranking::ProfileProvider;
use crate::store::DocumentStore;

pub mod attack;
pub mod defeat;
pub mod env;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod ranking;
pub mod registry;
pub mod server;
pub mod store;

pub struct LoggerManager {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl LoggerManager {
    pub fn setup(settings: &Settings) -> Self {
        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            &settings.logging.directory,
            &settings.logging.filename,
        );
        let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(file_appender);

        // Log level from env filter, falling back to the configured level.
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.server.log_level));

        let console_layer = fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .pretty();

        let file_layer = fmt::layer()
            .with_writer(non_blocking_file_writer)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .pretty();

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        tracing::info!(
            "Logger initialized: console and file ({}/{}) output enabled.",
            settings.logging.directory,
            settings.logging.filename
        );

        Self { _guard: guard }
    }

    /// Manager that installs no global subscriber (tests).
    pub fn noop() -> Self {
        let (_writer, guard) = tracing_appender::non_blocking(io::sink());
        Self { _guard: guard }
    }
}

/// Dependencies threaded through every raid operation.
#[derive(Clone)]
pub struct RaidDeps {
    pub store: Arc<dyn DocumentStore>,
    pub raid: RaidSettings,
    pub retry: RetrySettings,
    pub notifier: Arc<dyn Notifier>,
    pub profiles: Arc<dyn ProfileProvider>,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub deps: Arc<RaidDeps>,
    pub logger_manager: Arc<LoggerManager>,
    pub metrics_registry: prometheus::Registry,
}
