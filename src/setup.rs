use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE: &str = "bot.log";

fn open_log_file(path: &Path) -> Result<File, anyhow::Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))
}

/// Console logging, plus `bot.log` when `log_to_file` is set.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(log_to_file: bool) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = if log_to_file {
        let file = open_log_file(Path::new(LOG_FILE))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_is_appended() {
        let path = std::env::temp_dir().join(format!("rivbot-log-{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        open_log_file(&path).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
