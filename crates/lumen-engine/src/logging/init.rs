use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
///
/// `env_filter` uses the `env_logger` directive syntax, e.g.
/// `"lumen_engine=debug,wgpu_core=warn"`. Without one, `RUST_LOG` is read.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Prefix records with a millisecond timestamp.
    pub timestamps: bool,
}

impl LoggingConfig {
    /// Engine records at `debug`, everything else at the default level.
    pub fn verbose() -> Self {
        Self {
            env_filter: Some("info,lumen_engine=debug".to_owned()),
            ..Self::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            timestamps: true,
        }
    }
}

// wgpu logs every pipeline and resource creation at info.
const QUIET_MODULES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger. Only the first call has an
/// effect; a logger installed by the host application is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        let directives = config
            .env_filter
            .or_else(|| std::env::var("RUST_LOG").ok());
        match directives {
            Some(directives) => {
                builder.parse_filters(&directives);
            }
            None => {
                builder.filter_level(LevelFilter::Info);
                for module in QUIET_MODULES {
                    builder.filter_module(module, LevelFilter::Warn);
                }
            }
        }

        builder.write_style(config.write_style);
        if config.timestamps {
            builder.format_timestamp_millis();
        } else {
            builder.format_timestamp(None);
        }

        match builder.try_init() {
            Ok(()) => log::debug!("logging initialized"),
            Err(_) => log::debug!("global logger already installed; keeping it"),
        }
    });
}
