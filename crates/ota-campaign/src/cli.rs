use std::path::PathBuf;

use clap::Parser;
use ota_observe::LoggerFormat;

#[derive(Parser, Debug)]
#[command(name = "ota-campaign")]
#[command(about = "Push a firmware build to a fleet of controllers through the cloud relay")]
pub struct Cli {
    /// Path to the campaign configuration (YAML)
    #[arg(short, long, env = "OTA_CONFIG")]
    pub config: PathBuf,

    /// Build artifact URL (overrides software_build_url)
    #[arg(short = 'u', long = "build-url", env = "OTA_BUILD_URL")]
    pub build_url: Option<String>,

    /// Skip the confirmation prompt before updating
    #[arg(short = 'y', long = "yes", default_value_t = false)]
    pub yes: bool,

    /// Log filter directive, e.g. `warn` or `ota.core=debug`
    #[arg(long, env = "OTA_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log output format: text, json or journald
    #[arg(long, env = "OTA_LOG_FORMAT", default_value_t = LoggerFormat::Text)]
    pub log_format: LoggerFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use ota_observe::LoggerLevel;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "ota-campaign",
            "-c",
            "campaign.yaml",
            "-u",
            "https://files.example/b.tar",
            "-y",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("campaign.yaml"));
        assert_eq!(cli.build_url.as_deref(), Some("https://files.example/b.tar"));
        assert!(cli.yes);
        assert_eq!(cli.log_format, LoggerFormat::Json);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn log_level_targets_dotted_modules() {
        let cli = Cli::try_parse_from([
            "ota-campaign",
            "-c",
            "campaign.yaml",
            "--log-level",
            "ota.core=debug",
        ])
        .unwrap();
        let level = LoggerLevel::new(cli.log_level.as_str()).unwrap();
        assert_eq!(level.as_str(), "ota.core=debug");
    }

    #[test]
    fn config_is_required() {
        assert!(Cli::try_parse_from(["ota-campaign", "-y"]).is_err());
    }
}
