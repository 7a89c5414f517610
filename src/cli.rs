use std::path::PathBuf;
use std::time::Duration;

use clap::builder::RangedU64ValueParser;
use clap::Parser;
use rummage::{Results, SearchOptions, DEFAULT_CAPACITY};

#[derive(Parser, Debug)]
#[clap(name = "rummage")]
#[clap(about = "Find files whose names match a regular expression, searching a directory tree in the background")]
pub struct Cli {
    /// Directory to search
    pub directory: PathBuf,

    /// Regular expression the whole file name must match, e.g. '.*\.txt'
    pub pattern: String,

    /// Number of search workers
    #[arg(
        short = 'j',
        long,
        env = "RUMMAGE_THREADS",
        default_value_t = DEFAULT_CAPACITY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..),
    )]
    pub threads: usize,

    /// Maximum depth below the directory (1 = direct children only)
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,

    /// Follow symbolic links
    #[arg(short = 'L', long, default_value_t = false)]
    pub follow_links: bool,

    /// Stop after this many matches
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Give up after this many seconds
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print matches as they are found instead of all at the end
    #[arg(long, default_value_t = false)]
    pub stream: bool,

    /// Report directories that could not be read
    #[arg(long, default_value_t = false)]
    pub show_errors: bool,
}

impl Cli {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_depth:      self.max_depth,
            follow_links:   self.follow_links,
            limit:          self.limit,
            deadline:       self.timeout.map(Duration::from_secs),
            stream_matches: self.stream,
            collect_errors: self.show_errors,
        }
    }
}

/// Render a finished search the way the results pane always has:
/// a header, then one absolute path per line.
pub fn format_results(results: &Results) -> String {
    let mut out = String::from("Search Results:\n");
    if results.is_empty() {
        out.push_str("No matching files found.\n");
    } else {
        for path in &results.paths {
            out.push_str(&path.display().to_string());
            out.push('\n');
        }
    }
    out
}

/// One-line summary printed after the results.
pub fn format_summary(results: &Results) -> String {
    let mut line = format!(
        "{} match(es), {} file(s) and {} dir(s) scanned in {:.3}s",
        results.matches,
        results.stats.files,
        results.stats.dirs,
        results.stats.duration.as_secs_f64()
    );
    if results.limit_reached {
        line.push_str(" (limit reached)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_and_flags() {
        let cli = Cli::parse_from(["rummage", "/tmp", r".*\.txt", "-j", "3", "-d", "2", "--stream", "-t", "9"]);
        assert_eq!(cli.directory, PathBuf::from("/tmp"));
        assert_eq!(cli.pattern, r".*\.txt");
        assert_eq!(cli.threads, 3);

        let opts = cli.search_options();
        assert_eq!(opts.max_depth, Some(2));
        assert_eq!(opts.deadline, Some(Duration::from_secs(9)));
        assert!(opts.stream_matches);
        assert!(!opts.follow_links);
    }

    #[test]
    fn zero_threads_is_a_usage_error() {
        let err = Cli::try_parse_from(["rummage", "/tmp", ".*", "-j", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_results_say_so() {
        let out = format_results(&Results::default());
        assert_eq!(out, "Search Results:\nNo matching files found.\n");
    }

    #[test]
    fn results_list_one_path_per_line() {
        let results = Results {
            matches: 2,
            paths: vec!["/r/a.txt".into(), "/r/sub/c.txt".into()],
            ..Results::default()
        };
        assert_eq!(format_results(&results), "Search Results:\n/r/a.txt\n/r/sub/c.txt\n");
    }
}
