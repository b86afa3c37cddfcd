//! log4rs setup shared by the binaries.

use crate::error::{BenchError, Result};
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

const LOGGING_PATTERN: &str = "{d} {l} {t} - {m}{n}";

/// Install the global logger: stderr at `log_level`, and everything at
/// `log_level` or above also to `file_path` when given.
///
/// Can only succeed once per process.
pub fn initialize_logger(log_level: LevelFilter, file_path: Option<&str>) -> Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
        .build();

    let mut config_builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(log_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = file_path {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
            .build(path)?;
        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    let config = config_builder
        .build(root.build(log_level))
        .map_err(|e| BenchError::Configuration(format!("logger configuration: {e}")))?;

    log4rs::init_config(config)
        .map_err(|e| BenchError::Configuration(format!("logger already installed: {e}")))?;
    Ok(())
}
