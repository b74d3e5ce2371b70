#![cfg(feature = "std")]

use std::env;
use log::{self, LevelFilter, Metadata, Record};

/// Log target prefix of this crate; everything else (mdns-sd, tokio) is a dependency.
const CRATE_TARGET: &str = "battleship_lan";

/// Dependencies are chatty at debug level, so they only get through from `warn` up.
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::Warn;

struct GameLogger {
    level: LevelFilter,
}

impl GameLogger {
    fn limit_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(CRATE_TARGET) {
            self.level
        } else {
            self.level.min(DEPENDENCY_LEVEL)
        }
    }
}

impl log::Log for GameLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        // stdout belongs to the game prompt
        if self.enabled(record.metadata()) {
            eprintln!("{} [{}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the stderr logger. `BATTLESHIP_LOG` sets the level for game messages
/// and defaults to `info`; dependencies log at `warn` at most.
pub fn init_logging() {
    let level = env::var("BATTLESHIP_LOG")
        .ok()
        .and_then(|lvl| lvl.parse().ok())
        .unwrap_or(LevelFilter::Info);
    let logger = Box::new(GameLogger { level });
    let _ = log::set_boxed_logger(logger).map(|()| log::set_max_level(level));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_are_capped_at_warn() {
        let logger = GameLogger { level: LevelFilter::Debug };
        assert_eq!(logger.limit_for("battleship_lan::player_node"), LevelFilter::Debug);
        assert_eq!(logger.limit_for("mdns_sd::service_daemon"), LevelFilter::Warn);

        let quiet = GameLogger { level: LevelFilter::Error };
        assert_eq!(quiet.limit_for("mdns_sd"), LevelFilter::Error);
    }
}
