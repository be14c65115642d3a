//! pooled-httpd
//!
//! A small HTTP/1.x server: static files, CGI scripts, multipart uploads,
//! and a POST echo, served by a fixed pool of worker threads.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ listener (mio poll, peek) ──▶ BoundedQueue ──▶ worker ×N
//!                                                                 │
//!                                      RequestReader ◀────────────┘
//!                                            │
//!                                            ▼
//!                                     Router ──▶ static | cgi | upload | echo | delete
//!                                            │
//!     Client ◀──────────── Response (sendfile for files) ◀────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pooled_httpd::config::{load_config, validate_config, ServerConfig};
use pooled_httpd::lifecycle::install_signal_handlers;
use pooled_httpd::observability::{init_logging, metrics};
use pooled_httpd::HttpServer;

#[derive(Parser)]
#[command(name = "pooled-httpd")]
#[command(about = "Thread-pooled HTTP/1.x server", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Document root directory
    #[arg(short, long)]
    root: Option<String>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(root) = self.root {
            config.content.document_root = root;
        }
        if let Some(workers) = self.workers {
            config.workers.pool_size = workers;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("pooled-httpd: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);

    if let Err(errors) = validate_config(&config) {
        for error in errors {
            eprintln!("pooled-httpd: invalid configuration: {}", error);
        }
        return ExitCode::FAILURE;
    }

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pooled-httpd starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        workers = config.workers.pool_size,
        queue_capacity = config.workers.queue_capacity,
        document_root = %config.content.document_root,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = match HttpServer::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = install_signal_handlers(server.shutdown_handle()) {
        tracing::warn!(error = %e, "Failed to install signal handlers; stop with SIGKILL");
    }

    match server.run() {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
