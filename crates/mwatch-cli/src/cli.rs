//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

/// Supervise a set of commands in one terminal panel
#[derive(Parser, Debug, Clone)]
#[command(name = "mwatch", version, about, long_about = None)]
pub struct Cli {
    /// TOML file listing the commands to supervise
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write diagnostics here instead of the configured log file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Ignore every watcher entry in the configuration
    #[arg(long)]
    pub no_watch: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["mwatch", "services.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("services.toml"));
        assert!(!cli.verbose);
        assert!(cli.log_file.is_none());
        assert!(!cli.no_watch);
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "mwatch",
            "-v",
            "--log-file",
            "/tmp/m.log",
            "--no-watch",
            "dev.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/m.log")));
        assert!(cli.no_watch);
        assert_eq!(cli.config, PathBuf::from("dev.toml"));
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["mwatch"]).is_err());
    }
}
