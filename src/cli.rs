use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::dependency::{DependencyType, GroupDependencyType};
use crate::engine::Level;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-metrics")]
#[command(about = "Decode compiled Java classes and score their dependency health")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local Maven repository used to resolve coordinates.
    #[arg(long, value_name = "PATH")]
    pub m2: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Load a project and report per-node family metrics.
    Analyze(AnalyzeArgs),
    /// Print decoded class descriptors as JSON.
    Inspect {
        /// A class file, jar or directory.
        path: PathBuf,

        /// Only print the class with this dotted name.
        #[arg(long, value_name = "NAME")]
        class: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Extra source roots, appended to `--sources`.
    #[arg(value_name = "ROOT")]
    pub roots: Vec<PathBuf>,

    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    #[arg(long, value_name = "ROOT")]
    pub sources: Vec<PathBuf>,

    #[arg(long, value_name = "ROOT")]
    pub required: Vec<PathBuf>,

    #[arg(long, value_name = "ROOT")]
    pub libraries: Vec<PathBuf>,

    /// Maven coordinate `group:artifact:version`, added as a library.
    #[arg(long, value_name = "COORD")]
    pub maven: Vec<String>,

    #[arg(long, value_enum, default_value_t = LevelArg::Package)]
    pub level: LevelArg,

    /// Dependency kinds to count; several values are combined.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [FilterArg::All])]
    pub filter: Vec<FilterArg>,

    #[arg(long)]
    pub no_dip: bool,

    #[arg(long)]
    pub no_sdp: bool,

    #[arg(long)]
    pub no_adp: bool,

    #[arg(long)]
    pub no_sap: bool,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl AnalyzeArgs {
    pub fn filter_mask(&self) -> DependencyType {
        self.filter
            .iter()
            .fold(DependencyType::empty(), |mask, f| mask | f.mask())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Class,
    Package,
    Component,
    Group,
}

impl From<LevelArg> for Level {
    fn from(value: LevelArg) -> Self {
        match value {
            LevelArg::Class => Level::Class,
            LevelArg::Package => Level::Package,
            LevelArg::Component => Level::Component,
            LevelArg::Group => Level::Group,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    IntraPackageIntraComponent,
    InterPackageIntraComponent,
    IntraPackageInterComponent,
    InterPackageInterComponent,
    IntraComponent,
    InterComponent,
    IntraGroup,
    ExtraGroup,
    ExtraPackage,
    ExtraComponent,
    All,
}

impl FilterArg {
    pub fn mask(self) -> DependencyType {
        let group = match self {
            FilterArg::IntraPackageIntraComponent => GroupDependencyType::IntraPackageIntraComponent,
            FilterArg::InterPackageIntraComponent => GroupDependencyType::InterPackageIntraComponent,
            FilterArg::IntraPackageInterComponent => GroupDependencyType::IntraPackageInterComponent,
            FilterArg::InterPackageInterComponent => GroupDependencyType::InterPackageInterComponent,
            FilterArg::IntraComponent => GroupDependencyType::IntraComponent,
            FilterArg::InterComponent => GroupDependencyType::InterComponent,
            FilterArg::IntraGroup => GroupDependencyType::IntraGroup,
            FilterArg::ExtraGroup => GroupDependencyType::ExtraGroup,
            FilterArg::ExtraPackage => return DependencyType::EXTRA_PACKAGE,
            FilterArg::ExtraComponent => return DependencyType::EXTRA_COMPONENT,
            FilterArg::All => GroupDependencyType::All,
        };
        group.into()
    }
}
