use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared by the tierflow commands
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Subcommands that only inspect the configuration
#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Log level selected by the CLI flags, `None` defers to `RUST_LOG`
    pub fn log_level(args: &CommonArgs) -> Option<&'static str> {
        if args.quiet {
            Some("warn")
        } else if args.verbose {
            Some("debug")
        } else {
            None
        }
    }

    /// Initialize logging based on CLI arguments
    pub fn init_logging(args: &CommonArgs) {
        let filter = match log_level(args) {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")?
            }
            None => Configuration::load().context("Failed to load configuration")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("Tierflow Configuration:");
            println!("=======================");
            println!("Storage options:");
            for option in &config.catalog.options {
                println!(
                    "  {:<16} {:<18} storage={}/GB-month egress={}/GB latency={}ms",
                    option.id,
                    option.display_name,
                    option.storage_cost_per_gb_month,
                    option.egress_cost_per_gb,
                    option.avg_latency_ms
                );
            }
            println!("Fallback policy: {:?}", config.placement.fallback);
            println!("Recency policy: {:?}", config.placement.recency);
            println!("Cleanup delay: {:?}", config.migration.cleanup_delay);
            println!("Latency scale: {}", config.migration.latency_scale);
            println!(
                "Job store: {} ({})",
                config.job_store.dsn, config.job_store.path
            );
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        config.validate()?;

        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle the configuration-only subcommands
    pub fn handle_common_command(command: &CommonCommands, config: &Configuration) -> Result<()> {
        match command {
            CommonCommands::Config { json } => display_config(config, *json),
            CommonCommands::Validate => validate_config(config),
            CommonCommands::Version => {
                println!("{}", version_info());
                Ok(())
            }
        }
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    #[test]
    fn test_log_level_flags() {
        let quiet = CommonArgs {
            quiet: true,
            ..CommonArgs::default()
        };
        assert_eq!(utils::log_level(&quiet), Some("warn"));

        let verbose = CommonArgs {
            verbose: true,
            ..CommonArgs::default()
        };
        assert_eq!(utils::log_level(&verbose), Some("debug"));

        assert_eq!(utils::log_level(&CommonArgs::default()), None);
    }

    #[test]
    fn test_validate_default_config() {
        assert!(utils::validate_config(&Configuration::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut config = Configuration::default();
        config.catalog.options.clear();
        assert!(utils::validate_config(&config).is_err());

        let mut config = Configuration::default();
        config.migration.latency_scale = -1.0;
        assert!(utils::validate_config(&config).is_err());

        let mut config = Configuration::default();
        config.job_store.dsn = "gopher://jobs".to_string();
        assert!(utils::validate_config(&config).is_err());
    }

    #[test]
    fn test_load_config_rejects_negative_latency_scale() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "tierflow.toml",
                r#"
                [migration]
                cleanup_delay = "20ms"
                latency_scale = -1.0
                "#,
            )?;

            let err = utils::load_config(None).unwrap_err();
            assert!(err.to_string().contains("Latency scale"), "{err}");

            jail.create_file("valid.toml", "[migration]\ncleanup_delay = \"5ms\"\nlatency_scale = 0.5\n")?;
            let config = utils::load_config(Some(&PathBuf::from("valid.toml"))).unwrap();
            assert_eq!(config.migration.latency_scale, 0.5);
            Ok(())
        });
    }

    #[test]
    fn test_handle_validate_command() {
        let config = Configuration::default();
        assert!(utils::handle_common_command(&CommonCommands::Validate, &config).is_ok());

        let mut broken = Configuration::default();
        broken.catalog.options.clear();
        assert!(utils::handle_common_command(&CommonCommands::Validate, &broken).is_err());
    }

    #[test]
    fn test_version_info() {
        let version = utils::version_info();
        assert!(version.contains(env!("CARGO_PKG_VERSION")));
    }
}
