//! Parsing Options.
//! `pn <NET_FILE> [-c config.toml] [-o report] [--dot tree.dot] [--max-nodes N]
//! [--max-depth N] [--memory-limit-mb N] [--tree-log]`
//!
//! Flags from the `PN_FLAGS` environment variable are parsed first, so flags
//! given on the command line override them.

use clap::{Arg, ArgAction, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;

use crate::config::AnalysisConfig;

fn make_options_parser() -> clap::Command {
    Command::new("pn")
        .no_binary_name(true)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Coverability tree and structural classification of Petri nets")
        .args_override_self(true)
        .arg(
            Arg::new("net")
                .value_name("NET_FILE")
                .help("Net to analyze (.json or .ron)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML file with analysis limits")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path to file where the report will be stored (plus FILE.json)"),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .value_name("FILE")
                .help("Write the coverability tree in Graphviz format")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("max-nodes")
                .long("max-nodes")
                .value_name("N")
                .help("Abort once the tree holds N nodes")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Abort when a branch gets deeper than N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("memory-limit-mb")
                .long("memory-limit-mb")
                .value_name("N")
                .help("Abort when resident memory exceeds N megabytes")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("tree-log")
                .long("tree-log")
                .help("Append the per-state listing to the report")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Options {
    pub net_file: PathBuf,
    pub config_file: Option<PathBuf>,
    pub output: Option<String>,
    pub dot_file: Option<PathBuf>,
    pub max_nodes: Option<usize>,
    pub max_depth: Option<usize>,
    pub memory_limit_mb: Option<u64>,
    pub tree_log: bool,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let net_file = matches
            .get_one::<PathBuf>("net")
            .cloned()
            .ok_or("missing NET_FILE")?;

        Ok(Options {
            net_file,
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            output: matches.get_one::<String>("output").cloned(),
            dot_file: matches.get_one::<PathBuf>("dot").cloned(),
            max_nodes: matches.get_one::<usize>("max-nodes").copied(),
            max_depth: matches.get_one::<usize>("max-depth").copied(),
            memory_limit_mb: matches.get_one::<u64>("memory-limit-mb").copied(),
            tree_log: matches.get_flag("tree-log"),
        })
    }

    /// Command-line values take precedence over the config file.
    pub fn apply_to(&self, config: &mut AnalysisConfig) {
        if let Some(limit) = self.max_nodes {
            config.max_nodes = Some(limit);
        }
        if let Some(limit) = self.max_depth {
            config.max_depth = Some(limit);
        }
        if let Some(limit) = self.memory_limit_mb {
            config.memory_limit_mb = Some(limit);
        }
        if self.tree_log {
            config.include_tree_log = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_str() {
        let options =
            Options::parse_from_str("net.json -o report.txt --max-nodes 50 --tree-log").unwrap();
        assert_eq!(options.net_file, PathBuf::from("net.json"));
        assert_eq!(options.output.as_deref(), Some("report.txt"));
        assert_eq!(options.max_nodes, Some(50));
        assert!(options.tree_log);

        let mut config = AnalysisConfig::default();
        options.apply_to(&mut config);
        assert_eq!(config.max_nodes, Some(50));
        assert_eq!(config.max_depth, Some(10_000));
        assert!(config.include_tree_log);
    }

    #[test]
    fn later_flags_win() {
        let options = Options::parse_from_str("--max-depth 3 net.ron --max-depth 7").unwrap();
        assert_eq!(options.max_depth, Some(7));
    }

    #[test]
    fn test_parse_from_str_err() {
        assert!(Options::parse_from_str("--max-nodes").is_err());
        assert!(Options::parse_from_str("net.json --max-nodes many").is_err());
        assert!(Options::parse_from_str("net.json \"unterminated").is_err());
    }

    #[test]
    fn test_parse_from_args_err() {
        let options = Options::parse_from_args(&["-k".to_owned(), "unknown".to_owned()]);
        assert!(options.is_err());
    }
}
