//! ---
//! lt_section: "01-core-functionality"
//! lt_subsection: "module"
//! lt_type: "source"
//! lt_scope: "code"
//! lt_description: "Tracing subscriber installation for host binaries."
//! lt_version: "v0.0.0-prealpha"
//! lt_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "LOGTRACK_LOG";
/// Every probe and module load goes through the HTTP client stack, whose
/// connection-level events would otherwise drown the host's own.
const DEFAULT_DIRECTIVE: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn";
/// One-shot commands only surface problems; verdicts go to stdout.
const CLI_DIRECTIVE: &str = "warn";

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
static CONSOLE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Available log formats for stdout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structured-json" | "json" => Ok(LogFormat::StructuredJson),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Initialize tracing for the long-running host.
///
/// * `LOGTRACK_LOG` overrides the log filter (e.g. `debug,reqwest=warn`). When
///   unset `RUST_LOG` is honoured, finally defaulting to `info` with the HTTP
///   client crates held at `warn`.
/// * stdout receives structured JSON or pretty output, and a rolling daily JSON
///   log file is written to `config.directory`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!("unable to create log directory {}", config.directory.display())
    })?;
    let prefix = config
        .file_prefix
        .clone()
        .unwrap_or_else(|| service_name.to_owned());

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = FILE_GUARD.set(file_guard);
    let _ = CONSOLE_GUARD.set(stdout_guard);

    // Keep targets: the availability core logs under `logtrack::remotes::*`.
    let console = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };
    let file = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer)
        .boxed();

    let directive = filter_directive(|key| std::env::var(key).ok(), DEFAULT_DIRECTIVE);
    tracing_subscriber::registry()
        .with(EnvFilter::new(&directive))
        .with(console)
        .with(file)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        filter = %directive,
        "tracing initialised"
    );
    Ok(())
}

/// Initialize tracing for one-shot commands such as `check`.
///
/// Output goes to stderr in pretty form and no log file is written, so stdout
/// stays reserved for the command's own (possibly JSON) output.
pub fn init_cli_tracing(service_name: &str) -> Result<()> {
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(stderr_guard);

    let directive = filter_directive(|key| std::env::var(key).ok(), CLI_DIRECTIVE);
    tracing_subscriber::registry()
        .with(EnvFilter::new(&directive))
        .with(fmt::layer().with_writer(stderr_writer).without_time())
        .try_init()
        .ok();
    debug!(service = %service_name, filter = %directive, "cli tracing initialised");
    Ok(())
}

/// Pick the filter directive: `LOGTRACK_LOG`, then `RUST_LOG`, then `fallback`.
/// An unparsable directive is reported and replaced by `fallback`.
fn filter_directive<F>(lookup: F, fallback: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let Some((source, directive)) = [LOG_ENV, "RUST_LOG"]
        .into_iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()).map(|v| (key, v)))
    else {
        return fallback.to_owned();
    };
    match EnvFilter::try_new(&directive) {
        Ok(_) => directive,
        Err(err) => {
            eprintln!("invalid {source} directive ({err}); defaulting to {fallback}");
            fallback.to_owned()
        }
    }
}
