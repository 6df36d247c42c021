use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "rootcause", version, about = "Find the functions behind a CVE from its fix commits")]
pub struct Cli {
    /// Input JSON with `purl`, `repo` and `cve`
    #[arg(short, long)]
    pub input: PathBuf,

    /// Destination of the VEX JSON document
    #[arg(short, long)]
    pub output: PathBuf,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Intermediate consensus store (overrides analysis.store_path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_flags() {
        let cli = Cli::try_parse_from(["rootcause", "-i", "in.json", "-o", "out.json"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("in.json"));
        assert_eq!(cli.output, PathBuf::from("out.json"));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_optional_flags() {
        let cli = Cli::try_parse_from([
            "rootcause", "--input", "in.json", "--output", "out.json", "--config", "run.yaml",
            "--store", "tmp/store.txt", "-vv", "--log-format", "pretty",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("run.yaml")));
        assert_eq!(cli.store, Some(PathBuf::from("tmp/store.txt")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_output_rejected() {
        assert!(Cli::try_parse_from(["rootcause", "-i", "in.json"]).is_err());
    }
}
