pub mod cli;
pub mod file_config;

pub use file_config::{DigestConfig, FetchSettings, ServiceSettings, WordpressConfig};

#[cfg(feature = "cli")]
use crate::domain::model::RunMode;
#[cfg(feature = "cli")]
use clap::{ArgGroup, Parser};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "patch-digest")]
#[command(about = "Crawl patch-note posts, group them by day, and summarize them with a local LLM")]
#[command(group(ArgGroup::new("mode").args(["scrape_only", "process_only"])))]
pub struct CliArgs {
    #[arg(long, default_value = "parser.config.json", help = "Path to the JSON or TOML config file")]
    pub config: String,

    #[arg(long, help = "Only crawl and save daily content files")]
    pub scrape_only: bool,

    #[arg(long, help = "Only summarize previously saved content files")]
    pub process_only: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliArgs {
    pub fn mode(&self) -> RunMode {
        if self.scrape_only {
            RunMode::ScrapeOnly
        } else if self.process_only {
            RunMode::ProcessOnly
        } else {
            RunMode::Full
        }
    }
}
