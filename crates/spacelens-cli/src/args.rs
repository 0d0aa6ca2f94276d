/// Command-line arguments.
///
/// Flags override the matching fields of the JSON configuration file, which
/// in turn overrides the built-in defaults.
use anyhow::Context;
use clap::Parser;
use spacelens_core::model::size::SizeMetric;
use spacelens_core::CoreConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Progressive disk usage explorer.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "spacelens",
    version,
    about = "Progressive disk usage explorer",
    after_help = "EXAMPLES:\n    \
        spacelens ~/Downloads\n    \
        spacelens / --limit 20 --tree --depth 2\n    \
        spacelens . --json > report.json\n    \
        spacelens /var --csv var.csv --allocated"
)]
pub struct Cli {
    /// Directory to explore (defaults to the current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Number of entries to list
    #[arg(short = 'n', long, value_name = "NUM")]
    pub limit: Option<usize>,

    /// Depth of the hierarchy view
    #[arg(short = 'd', long, value_name = "NUM")]
    pub depth: Option<usize>,

    /// Worker threads (defaults to one per logical CPU)
    #[arg(short = 'w', long, value_name = "NUM")]
    pub workers: Option<usize>,

    /// JSON configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Count allocated disk blocks instead of logical file lengths
    #[arg(long)]
    pub allocated: bool,

    /// Also print the hierarchy as an indented tree
    #[arg(short = 't', long)]
    pub tree: bool,

    /// Print the report as JSON instead of a table
    #[arg(long, conflicts_with = "tree")]
    pub json: bool,

    /// Write the listing to a CSV file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, default_value = "600", value_name = "SECS")]
    pub timeout: u64,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Configuration file (if any) with the command-line overrides applied.
    pub fn core_config(&self) -> anyhow::Result<CoreConfig> {
        let mut config = match &self.config {
            Some(path) => CoreConfig::from_json_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => CoreConfig::default(),
        };

        if let Some(limit) = self.limit {
            config.display_limit = limit;
        }
        if let Some(depth) = self.depth {
            config.hierarchy_depth = depth;
        }
        if let Some(workers) = self.workers {
            config.worker_threads = Some(workers);
        }
        if self.allocated {
            config.size_metric = SizeMetric::Allocated;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Maximum log level for the `-v` count.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("spacelens").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.core_config().unwrap(), CoreConfig::default());
        assert_eq!(cli.log_level(), tracing::Level::INFO);
        assert_eq!(cli.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&["/tmp", "-n", "5", "--depth", "1", "-w", "2", "--allocated"]);
        let config = cli.core_config().unwrap();
        assert_eq!(config.display_limit, 5);
        assert_eq!(config.hierarchy_depth, 1);
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.size_metric, SizeMetric::Allocated);
    }

    #[test]
    fn config_file_is_layered_under_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"display_limit": 7, "hierarchy_depth": 4}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path, "--depth", "2"]).core_config().unwrap();
        assert_eq!(config.display_limit, 7);
        assert_eq!(config.hierarchy_depth, 2);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = parse(&["--config", "/nonexistent/spacelens.json"])
            .core_config()
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/spacelens.json"));
    }

    #[test]
    fn json_conflicts_with_tree() {
        assert!(Cli::try_parse_from(["spacelens", "--json", "--tree"]).is_err());
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(parse(&["-v"]).log_level(), tracing::Level::DEBUG);
        assert_eq!(parse(&["-vvv"]).log_level(), tracing::Level::TRACE);
    }
}
