// ABOUTME: Shared logging setup for floatchat binaries
// ABOUTME: init() for stderr, init_file() for the interactive chat, init_for() for one-shot commands

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Standard logging to stderr at `level`, RUST_LOG overrides.
pub fn init(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .try_init();
}

/// File logging for the interactive chat, so log lines never interleave
/// with the transcript. Default: WARN, RUST_LOG override.
///
/// Writes to `{dir}/{app_name}.log`. If setup fails, prints a warning to
/// stderr and continues without logging.
pub fn init_file(dir: &Path, app_name: &str) -> Option<PathBuf> {
    match open_log_file(dir, app_name) {
        Ok((path, file)) => {
            let _ = tracing_subscriber::fmt()
                .with_writer(file)
                .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
                .with_ansi(false)
                .try_init();
            Some(path)
        }
        Err(e) => {
            eprintln!("Warning: failed to set up file logging: {e}");
            None
        }
    }
}

/// Path of the log file `init_file` writes to
pub fn log_file_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!("{app_name}.log"))
}

fn open_log_file(dir: &Path, app_name: &str) -> io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir)?;
    let path = log_file_path(dir, app_name);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Crate-filtered logging to stderr: `level` for the floatchat crates,
/// WARN for everything else (reqwest, hyper).
pub fn init_for(crate_prefixes: &[&str], level: Level) {
    let mut filter = EnvFilter::from_default_env().add_directive(Level::WARN.into());
    for prefix in crate_prefixes {
        let directive = format!("{prefix}={level}");
        match directive.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Warning: ignoring log directive {directive:?}: {e}"),
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
