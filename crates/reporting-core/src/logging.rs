use crate::config::LoggingConfig;
use tracing::Level;
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber from the config file's logging
/// section. Each comma-separated category becomes an allowed `target:`;
/// everything else is suppressed. Returns quietly if a subscriber is
/// already installed (tests set their own).
pub fn init_logging(cfg: &LoggingConfig) {
    let targets = category_filter(&cfg.categories);
    let fmt_layer = tracing_subscriber::fmt::layer().with_level(false);
    let result = if cfg.timestamp {
        tracing_subscriber::registry()
            .with(targets)
            .with(fmt_layer)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(targets)
            .with(fmt_layer.without_time())
            .try_init()
    };
    let _ = result;
}

fn category_filter(categories: &str) -> Targets {
    let mut targets = Targets::new();
    for cat in categories.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        targets = targets.with_target(cat, Level::TRACE);
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(targets: &Targets, target: &str) -> bool {
        targets.would_enable(target, &Level::INFO)
    }

    #[test]
    fn test_listed_categories_enabled() {
        let targets = category_filter("listen, sql ,error");
        assert!(enabled(&targets, "listen"));
        assert!(enabled(&targets, "sql"));
        assert!(enabled(&targets, "error"));
        assert!(!enabled(&targets, "path"));
    }

    #[test]
    fn test_empty_categories_enable_nothing() {
        let targets = category_filter("");
        assert!(!enabled(&targets, "error"));
    }
}
