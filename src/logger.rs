use std::io::Write;

use colored::*;
use log::LevelFilter;

/// Installs `env_logger` with a colored one-line format.
///
/// `RUST_LOG` is read first and `level` overrides it for this crate. Markup
/// parsers and the HTTP stack are kept quiet unless they have errors to report.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("html5ever", LevelFilter::Error);
    builder.filter_module("selectors", LevelFilter::Warn);
    builder.filter_module("reqwest", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Warn);
    builder.filter_module("web_cloner", level);

    builder.format(|buf, record| {
        let level = record.level();
        let colored_level = match level {
            log::Level::Error => level.to_string().red(),
            log::Level::Warn => level.to_string().yellow(),
            log::Level::Info => level.to_string().green(),
            log::Level::Debug => level.to_string().blue(),
            log::Level::Trace => level.to_string().purple(),
        };

        writeln!(
            buf,
            "{} {} [{}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            record.target().cyan(),
            colored_level,
            record.args()
        )
    });

    builder.try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice_does_not_panic() {
        let first = init_logger(LevelFilter::Info);
        let second = init_logger(LevelFilter::Debug);
        // Only one logger can be installed per process.
        assert!(first.is_err() || second.is_err());
    }
}
