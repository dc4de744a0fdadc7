use colored::{Color, Colorize};
use log::{Level, LevelFilter};
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

const LOG_FILE: &str = "chapchap.log";

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Magenta,
        Level::Trace => Color::BrightBlack,
    }
}

/// `api_subs::services::sub` -> `api_subs`
fn crate_name(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

/// Sends logs to stdout and the log file. Production drops debug output from
/// our crates and keeps only warnings from the HTTP and database stacks.
pub fn setup(is_production: bool) -> Result<(), fern::InitError> {
    let (ours, deps) = if is_production {
        (LevelFilter::Info, LevelFilter::Warn)
    } else {
        (LevelFilter::Debug, LevelFilter::Info)
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Utc::now().format("[%Y-%m-%d %H:%M:%S]"),
                crate_name(record.target()),
                record.level().to_string().color(level_color(record.level())),
                message
            ))
        })
        .level(ours)
        .level_for("hyper", LevelFilter::Off)
        .level_for("hyper_util", LevelFilter::Off)
        .level_for("actix_server", deps)
        .level_for("sqlx", LevelFilter::Warn)
        .level_for("reqwest", deps)
        .level_for("stripe", deps)
        .chain(std::io::stdout())
        .chain(fern::log_file(LOG_FILE)?)
        .apply()?;
    Ok(())
}

pub fn middleware(console_logging_enabled: bool) -> LoggerMiddleware {
    LoggerMiddleware::new(console_logging_enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_are_shortened_to_their_crate() {
        assert_eq!(crate_name("api_subs::services::sub"), "api_subs");
        assert_eq!(crate_name("chapchap"), "chapchap");
    }
}
