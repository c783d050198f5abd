use clap::Parser;

/// Live dashboard of the latest GitHub Actions run for every repository of one
/// or more users. Requires the GitHub CLI (`gh`) to be installed and logged in.
#[derive(Debug, Parser)]
#[command(name = "ghstatus", version, about)]
pub struct Cli {
    /// Seconds between full refreshes (>= 1)
    #[arg(short = 'p', long = "poll", value_name = "SECONDS", allow_negative_numbers = true)]
    pub poll_interval: Option<i64>,

    /// Maximum number of status queries running at once (>= 1)
    #[arg(short = 'c', long = "concurrency", value_name = "COUNT", allow_negative_numbers = true)]
    pub max_concurrent: Option<i64>,

    /// GitHub users or organizations whose repositories are shown
    #[arg(value_name = "USER")]
    pub users: Vec<String>,
}
