//! Log setup.

use fern::colors::{Color, ColoredLevelConfig};
use fern::Dispatch;

use log::info;

use crate::{Config, Result};

/// Start logging to stderr, and to the configured log file if there is one.
///
/// This can only be called once.
pub fn init(config: &Config) -> Result<()> {
    let level = config.log_level()?;

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let stderr = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%F %T"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = Dispatch::new()
        .level(level)
        // Hyper and the handlebars registry are very chatty below warn.
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("handlebars", log::LevelFilter::Warn)
        .chain(stderr);

    if let Some(ref path) = config.log_file {
        let msg = format!("Couldn't open log file at {}", path.display());
        let file = fern::log_file(path).map_err(|err| crate::Error::from_io_error(err, msg))?;

        dispatch = dispatch.chain(
            Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} {:<5} [{}] {}",
                        chrono::Local::now().format("%F %T"),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        );
    }

    dispatch.apply()?;

    info!("Logging at level {}", level);

    Ok(())
}
