//! Logger setup
//!
//! Android builds log to logcat through `android_logger`; everywhere else
//! `env_logger` writes to stderr and honours `RUST_LOG`.

use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
///
/// `filter` follows the `env_logger` filter syntax (e.g. "vr_warp=debug,wgpu=warn")
/// and is ignored on Android, where only `max_level` and `tag` apply.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub max_level: LevelFilter,
    pub tag: &'static str,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            max_level: LevelFilter::Info,
            tag: "VrWarp",
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        install(config);
        log::debug!("logging initialized");
    });
}

#[cfg(target_os = "android")]
fn install(config: LoggingConfig) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(config.max_level)
            .with_tag(config.tag),
    );
}

#[cfg(not(target_os = "android"))]
fn install(config: LoggingConfig) {
    let mut builder = env_logger::Builder::new();

    if let Some(filter) = config.filter {
        builder.parse_filters(&filter);
    } else if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(config.max_level);
    }

    // Another logger may already be installed by the host application
    if builder.try_init().is_err() {
        log::warn!("global logger already set, keeping it");
    }
}
