use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "hconfig-remediation")]
#[command(about = "Generate remediation plans from running and compiled device configurations")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Diff running against compiled and write the remediation file.
    Remediate(RemediateArgs),
    /// Show the parsed tree of one configuration file.
    Inspect(InspectArgs),
    /// Print the configuration expected after applying the remediation.
    Future(FutureArgs),
}

/// Where platform options and tag rules come from. Generic defaults apply
/// when none is given.
#[derive(clap::Args, Debug)]
pub struct PlatformArgs {
    /// OS role whose vars directory holds the options and tag files.
    #[arg(long, conflicts_with_all = ["options", "platform", "tags"])]
    pub os_role: Option<String>,
    /// Directory containing the OS roles.
    #[arg(long, default_value = "roles")]
    pub roles_dir: PathBuf,
    /// Options file (YAML, or TOML by extension).
    #[arg(long, conflicts_with = "platform")]
    pub options: Option<PathBuf>,
    /// Tag rules file (YAML list, or TOML `[[rule]]` tables).
    #[arg(long)]
    pub tags: Option<PathBuf>,
    /// Embedded platform definition.
    #[arg(long, value_enum)]
    pub platform: Option<BuiltinPlatform>,
}

#[derive(Parser, Debug)]
pub struct RemediateArgs {
    #[arg(long)]
    pub hostname: String,
    #[arg(long)]
    pub running_config: PathBuf,
    #[arg(long)]
    pub compiled_config: PathBuf,
    /// File the remediation commands are written to.
    #[arg(long)]
    pub remediation_config: PathBuf,
    #[command(flatten)]
    pub platform: PlatformArgs,
    /// Only keep remediation lines carrying one of these tags.
    #[arg(long = "config-tag")]
    pub config_tags: Vec<String>,
    /// Drop remediation lines carrying one of these tags.
    #[arg(long = "exclude-tag")]
    pub exclude_tags: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Print action counts instead of the commands.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    #[command(flatten)]
    pub platform: PlatformArgs,
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct FutureArgs {
    #[arg(long)]
    pub hostname: String,
    #[arg(long)]
    pub running_config: PathBuf,
    #[arg(long)]
    pub compiled_config: PathBuf,
    #[command(flatten)]
    pub platform: PlatformArgs,
    /// Also write the predicted configuration to this file.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum BuiltinPlatform {
    Ios,
}

impl BuiltinPlatform {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ios => "ios",
        }
    }
}
