use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:<5} [{T}] {t} - {m}{n}";

/// Default log file for a connection: its last `/` component plus `.log`.
pub fn log_file_name(conn: &str) -> String {
    let base = conn.rsplit('/').next().unwrap_or(conn);
    format!("{}.log", base)
}

/// Map `-v` occurrences to a level: info, debug, then trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Console plus file logging at `level`.
pub fn build_config(log_file: &Path, level: LevelFilter) -> Result<Config> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(log_file)
        .with_context(|| format!("cannot open log file {}", log_file.display()))?;
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("file", Box::new(file)))
        .build(Root::builder().appender("stdout").appender("file").build(level))?;
    Ok(config)
}

/// Install the global logger, from a log4rs YAML file when one is given, and route
/// panics into it.
pub fn init(log_config: Option<&Path>, log_file: &Path, level: LevelFilter) -> Result<()> {
    match log_config {
        Some(path) => {
            log4rs::init_file(path, Default::default())
                .with_context(|| format!("cannot load log configuration {}", path.display()))?
        }
        None => {
            log4rs::init_config(build_config(log_file, level)?)?;
        }
    }
    log_panics::init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        assert_eq!(log_file_name("punix:/var/run/openvswitch/br0.controller"),
                   "br0.controller.log");
        assert_eq!(log_file_name("ptcp:6633"), "ptcp:6633.log");
    }

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), LevelFilter::Info);
        assert_eq!(level_for(1), LevelFilter::Debug);
        assert_eq!(level_for(5), LevelFilter::Trace);
    }

    #[test]
    fn test_build_config() {
        let path = std::env::temp_dir()
            .join(format!("rust_ofp_bridge_logging_{}.log", std::process::id()));
        let config = build_config(&path, LevelFilter::Debug).unwrap();
        assert_eq!(config.root().level(), LevelFilter::Debug);
        assert_eq!(config.appenders().len(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
