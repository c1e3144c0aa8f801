//! Logging setup and formatting helpers.

use anyhow::Result;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. `RUST_LOG` wins; the default keeps the
/// crate at info and the browser driver quiet.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chromiumoxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Write the run-log header file. One per batch run.
pub fn init_run_log(log_file_path: &str) -> Result<()> {
    let header = format!(
        "{}\nExecução em lote - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, header)?;
    Ok(())
}

/// Truncate long text for log display.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_text("Ministério", 6), "Minist...");
        assert_eq!(truncate_text("DOU", 10), "DOU");
    }
}
