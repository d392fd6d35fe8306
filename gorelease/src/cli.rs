//! All the clap stuff for parsing/documenting the cli

use camino::Utf8PathBuf;
use clap::{
    builder::{PossibleValuesParser, TypedValueParser},
    Args, Parser, Subcommand, ValueEnum,
};
use gorelease::config::DEFAULT_CONFIG_PATH;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Clone, Debug)]
#[clap(version, about, long_about = None)]
#[clap(propagate_version = true)]
/// Build Go programs for every platform, and ship them.
///
/// gorelease reads a release config (`.gorelease.yaml` by default) describing
/// a `global` set of defaults and a list of `targets`, then compiles every
/// target for every requested os/arch pair.
pub struct Cli {
    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,

    /// How verbose logging should be (log level)
    #[clap(long, short)]
    #[clap(default_value_t = LevelFilter::WARN)]
    #[clap(value_parser = PossibleValuesParser::new(["off", "error", "warn", "info", "debug", "trace"]).map(|s| s.parse::<LevelFilter>().expect("possible values are valid")))]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub verbose: LevelFilter,

    /// The format of the output
    #[clap(long, short, value_enum)]
    #[clap(default_value_t = OutputFormat::Human)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub output_format: OutputFormat,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Build every target for every platform
    #[clap(disable_version_flag = true)]
    Build(BuildArgs),
    /// Show what would be built, without building it
    ///
    /// This resolves the config exactly like `build` does (including asking
    /// the toolchain for its platforms if the config says `all`), so it's a
    /// good way to check a config.
    #[clap(disable_version_flag = true)]
    Plan(BuildArgs),
    /// Build everything and upload it
    #[clap(disable_version_flag = true)]
    Release(ReleaseArgs),
    /// Print the JSON Schema for `--output-format=json`
    #[clap(disable_version_flag = true)]
    #[clap(hide = true)]
    ManifestSchema(ManifestSchemaArgs),
}

#[derive(Args, Clone, Debug)]
pub struct BuildArgs {
    /// The release config to read
    #[clap(long, short)]
    #[clap(default_value = DEFAULT_CONFIG_PATH)]
    pub config: Utf8PathBuf,

    /// The toolchain to compile with
    #[clap(long)]
    #[clap(default_value = "go")]
    pub toolchain: String,

    /// How many compiles to run at once
    ///
    /// With 1 (the default) targets are built one after another.
    #[clap(long, short)]
    #[clap(default_value_t = 1)]
    pub jobs: usize,

    /// Keep building other targets when one fails, and report every failure at the end
    #[clap(long)]
    pub keep_going: bool,

    /// Let targets without a `file` use the one from `global`
    #[clap(long)]
    pub inherit_file: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ReleaseArgs {
    /// Where to upload
    #[clap(subcommand)]
    pub host: HostCommands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum HostCommands {
    /// Upload to a Google Cloud Storage bucket
    Gcs(GcsArgs),
}

#[derive(Args, Clone, Debug)]
pub struct GcsArgs {
    /// The bucket to upload to
    #[clap(long, short)]
    pub bucket: String,

    #[clap(flatten)]
    pub build: BuildArgs,
}

#[derive(Args, Clone, Debug)]
pub struct ManifestSchemaArgs {
    /// Write the schema to this file instead of stdout
    #[clap(long)]
    pub output: Option<Utf8PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}
