#[cfg(feature = "trace")]
use std::path::Path;
#[cfg(feature = "trace")]
use std::sync::OnceLock;

#[cfg(feature = "trace")]
const TRACE_FILE: &str = "fst-suggest-trace.jsonl";

#[cfg(feature = "trace")]
static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Route spans and events to `<log_dir>/fst-suggest-trace.jsonl` as JSON
/// lines, filtered by `RUST_LOG` (`suggest_core=debug` if unset).
///
/// Returns `false` when the host has already installed a global subscriber,
/// which is left in place, or when the log file cannot be opened. Only the
/// first call in a process has any effect.
#[cfg(feature = "trace")]
pub fn init_tracing(log_dir: &Path) -> bool {
    *INSTALLED.get_or_init(|| install(log_dir))
}

#[cfg(feature = "trace")]
fn install(log_dir: &Path) -> bool {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(TRACE_FILE)
        .build(log_dir)
    {
        Ok(appender) => appender,
        Err(err) => {
            tracing::warn!(error = %err, dir = %log_dir.display(), "trace file not opened");
            return false;
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("suggest_core=debug"));

    let installed = tracing_subscriber::fmt()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(filter)
        .try_init();
    match installed {
        Ok(()) => {
            std::mem::forget(guard); // flushes for the life of the process
            true
        }
        Err(err) => {
            tracing::warn!(error = %err, "trace subscriber not installed");
            false
        }
    }
}

/// Tracing is compiled out without the `trace` feature; nothing is installed.
#[cfg(not(feature = "trace"))]
pub fn init_tracing(_log_dir: &std::path::Path) -> bool {
    false
}
