use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vv")]
#[command(about = "Visual verification runner - drives the gallery page and captures evidence")]
#[command(version)]
pub struct Cli {
    /// Address of the page under test
    #[arg(long, default_value = "http://localhost:8000")]
    pub url: String,

    /// Directory screenshots are written to
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Timeout for navigation and element waits (ms)
    #[arg(long, default_value = "30000", value_name = "MS")]
    pub timeout_ms: u64,

    /// Browser executable to launch instead of auto-discovery
    #[arg(long, value_name = "PATH")]
    pub executable: Option<PathBuf>,

    /// Run with a visible browser window
    #[arg(long)]
    pub headed: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
