//! Command-line parsing for the `etm` client.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! transforms and the engine client; `app` does the dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Carrier, DEFAULT_LABEL_COLUMN, ErrorHandling, FlowSign, ScenarioId, UnmappedPolicy};
use crate::engine::OrderKind;
use crate::myc::DEFAULT_POOL_SIZE;
use crate::transform::BALANCE_PRECISION;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "etm", version, about = "Energy Transition Model client and curve tools")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// Engine API base URL (overrides ETM_ENGINE_URL).
    #[arg(long, global = true, value_name = "URL")]
    pub engine_url: Option<String>,

    /// Personal access token (overrides ETM_ACCESS_TOKEN).
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate raw curves into categories using a mapping table.
    Categorise(CategoriseArgs),
    /// Scale curves by the share of every node except one.
    Regionalise(RegionaliseArgs),
    /// Scale curves by the share of a single node.
    Node(NodeArgs),
    /// Residual load per node (curves x fractions).
    Loads(LoadsArgs),
    /// Check that hourly curves balance.
    Balance(BalanceArgs),
    /// Scenario lifecycle on the engine.
    #[command(subcommand)]
    Scenario(ScenarioCommand),
    /// Saved scenarios of the account.
    #[command(subcommand)]
    Saved(SavedCommand),
    /// Download hourly curves of a scenario.
    Curves(CurvesArgs),
    /// Read and write input parameters.
    #[command(subcommand)]
    Params(ParamsCommand),
    /// Evaluate graph queries.
    Gquery(GqueryArgs),
    /// Manage custom curves.
    #[command(subcommand)]
    CustomCurve(CustomCurveCommand),
    /// Multi-year chart batch operations.
    #[command(subcommand)]
    Myc(MycCommand),
}

/// Where to write a curve set; stdout when absent.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Output file (`.json` for JSON, `.xlsx` for a workbook, CSV otherwise).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print a column summary instead of the curves.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct CategoriseArgs {
    /// Curve set CSV.
    #[arg(long, value_name = "CSV")]
    pub curves: PathBuf,

    /// Mapping CSV (`key`, label columns, optional `sign`).
    #[arg(long, value_name = "CSV")]
    pub mapping: PathBuf,

    /// Label column of the mapping.
    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    pub column: String,

    /// What to do with curve columns missing from the mapping.
    #[arg(long, value_enum, default_value_t = UnmappedPolicy::Strict)]
    pub unmapped: UnmappedPolicy,

    /// Sign convention for `.input (MW)` / `.output (MW)` columns.
    #[arg(long, value_enum, default_value_t = FlowSign::DemandNegative)]
    pub flow_sign: FlowSign,

    /// Keep the original key next to the label (`label|key`).
    #[arg(long)]
    pub keep_keys: bool,

    #[command(flatten)]
    pub out: OutputArgs,
}

/// Curve and fraction inputs shared by the regionalisation commands.
#[derive(Debug, Args, Clone)]
pub struct FractionInput {
    /// Categorised curve set CSV.
    #[arg(long, value_name = "CSV")]
    pub curves: PathBuf,

    /// Regionalisation CSV (rows = nodes, columns = categories).
    #[arg(long, value_name = "CSV")]
    pub fractions: PathBuf,

    /// Only use these curve columns.
    #[arg(long, value_delimiter = ',', value_name = "COLUMNS")]
    pub sectors: Option<Vec<String>>,

    /// Only use these row positions.
    #[arg(long, value_delimiter = ',', value_name = "ROWS")]
    pub hours: Option<Vec<usize>>,
}

#[derive(Debug, Parser, Clone)]
pub struct RegionaliseArgs {
    #[command(flatten)]
    pub input: FractionInput,

    /// Node left out of the residual (label or row position).
    #[arg(long, value_name = "NODE")]
    pub exclude: String,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct NodeArgs {
    #[command(flatten)]
    pub input: FractionInput,

    /// Node to extract (label or row position).
    #[arg(long, value_name = "NODE")]
    pub node: String,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct LoadsArgs {
    #[command(flatten)]
    pub input: FractionInput,

    /// Only compute these nodes.
    #[arg(long, value_delimiter = ',', value_name = "NODES")]
    pub nodes: Option<Vec<String>>,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct BalanceArgs {
    /// Curve set CSV.
    #[arg(long, value_name = "CSV")]
    pub curves: PathBuf,

    /// Decimals used when comparing row sums with zero.
    #[arg(long, default_value_t = BALANCE_PRECISION)]
    pub precision: i32,

    /// Reporting of unbalanced rows.
    #[arg(long, value_enum, default_value_t = ErrorHandling::Raise)]
    pub errors: ErrorHandling,
}

#[derive(Debug, Subcommand)]
pub enum ScenarioCommand {
    /// List the scenarios of the account behind the token.
    List,
    /// Create a new scenario.
    Create {
        /// Area code, e.g. `nl2019`.
        #[arg(long)]
        area: String,
        #[arg(long)]
        end_year: u32,
        #[command(flatten)]
        settings: ScenarioSettings,
    },
    /// Copy a scenario.
    Copy {
        id: ScenarioId,
        #[command(flatten)]
        settings: ScenarioSettings,
    },
    /// Print the scenario header.
    Show { id: ScenarioId },
    /// Delete a scenario.
    Delete { id: ScenarioId },
    /// Reset user values and orders.
    Reset { id: ScenarioId },
    /// Interpolate a 2050 scenario to another end year.
    Interpolate {
        id: ScenarioId,
        #[arg(long)]
        year: u32,
    },
    /// Print the model URL of a scenario.
    Url {
        id: ScenarioId,
        /// Link that loads the scenario in the model.
        #[arg(long)]
        load: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SavedCommand {
    /// List saved scenarios.
    List,
    /// Show one saved scenario.
    Show { id: u64 },
    /// Save a scenario under a title.
    Create {
        scenario: ScenarioId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        private: bool,
        #[arg(long)]
        description: Option<String>,
    },
    /// Point a saved scenario at another scenario.
    Update { id: u64, scenario: ScenarioId },
    /// Delete a saved scenario.
    Delete { id: u64 },
}

#[derive(Debug, Args, Clone)]
pub struct ScenarioSettings {
    /// Metadata entry, repeatable.
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,

    #[arg(long)]
    pub private: Option<bool>,

    #[arg(long)]
    pub keep_compatible: Option<bool>,
}

#[derive(Debug, Parser, Clone)]
pub struct CurvesArgs {
    pub id: ScenarioId,

    #[arg(long, value_enum, default_value_t = Carrier::Electricity)]
    pub carrier: Carrier,

    /// Download the hourly electricity price instead.
    #[arg(long, conflicts_with = "carrier")]
    pub price: bool,

    /// Download the household heat curves instead.
    #[arg(long, conflicts_with_all = ["carrier", "price"])]
    pub household_heat: bool,

    /// Categorise the curves with this mapping before output.
    #[arg(long, value_name = "CSV")]
    pub mapping: Option<PathBuf>,

    /// Label column of the mapping.
    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    pub column: String,

    /// Sign convention applied when a mapping is given.
    #[arg(long, value_enum, default_value_t = FlowSign::DemandNegative)]
    pub flow_sign: FlowSign,

    /// Drop curve columns missing from the mapping.
    #[arg(long, requires = "mapping")]
    pub drop_unmapped: bool,

    /// Check the hourly balance after download.
    #[arg(long)]
    pub check_balance: bool,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Debug, Subcommand)]
pub enum ParamsCommand {
    /// List user values (or all scenario parameters).
    List {
        id: ScenarioId,
        /// Include defaults of inputs the user did not touch.
        #[arg(long)]
        all: bool,
    },
    /// Show one input.
    Get { id: ScenarioId, key: String },
    /// Set user values from `KEY=VALUE` pairs and/or a parameter CSV column.
    Set {
        id: ScenarioId,
        #[arg(value_name = "KEY=VALUE")]
        values: Vec<String>,
        /// Parameter CSV; the column named after the scenario id is used.
        #[arg(long, value_name = "CSV")]
        file: Option<PathBuf>,
    },
    /// Show or change the heat network / forecast storage order.
    Order {
        id: ScenarioId,
        #[arg(value_enum)]
        kind: OrderKind,
        /// New order.
        #[arg(long, value_delimiter = ',', value_name = "ITEMS")]
        set: Option<Vec<String>>,
    },
}

#[derive(Debug, Parser, Clone)]
pub struct GqueryArgs {
    pub id: ScenarioId,

    #[arg(required = true)]
    pub gqueries: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum CustomCurveCommand {
    /// List custom curves.
    List {
        id: ScenarioId,
        /// Include unattached curves.
        #[arg(long)]
        all: bool,
    },
    /// Download an attached custom curve.
    Get {
        id: ScenarioId,
        key: String,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Upload a custom curve from a curve set CSV.
    Upload {
        id: ScenarioId,
        key: String,
        #[arg(long, value_name = "CSV")]
        file: PathBuf,
        /// Column to upload; defaults to the first.
        #[arg(long)]
        column: Option<String>,
    },
    /// Detach a custom curve.
    Delete { id: ScenarioId, key: String },
}

#[derive(Debug, Subcommand)]
pub enum MycCommand {
    /// Set user values per scenario from a parameter CSV (columns = scenario ids).
    Apply {
        #[arg(long, value_name = "CSV")]
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
        pool: usize,
    },
    /// Collect parameters of several scenarios into one CSV.
    Collect {
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<ScenarioId>,
        /// Include defaults of inputs the user did not touch.
        #[arg(long)]
        all: bool,
        /// Only these input keys.
        #[arg(long, value_delimiter = ',')]
        keys: Option<Vec<String>>,
        /// Collect these graph queries instead of inputs.
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["all", "keys"])]
        gqueries: Option<Vec<String>>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
        pool: usize,
    },
    /// Download the hourly curves of several scenarios, one file each.
    Curves {
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<ScenarioId>,
        #[arg(long, value_enum, default_value_t = Carrier::Electricity)]
        carrier: Carrier,
        /// Directory for `<id>_<carrier>.csv` files.
        #[arg(long, value_name = "DIR", default_value = ".")]
        dir: PathBuf,
        /// Write `.xlsx` workbooks instead of CSV.
        #[arg(long)]
        xlsx: bool,
        #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
        pool: usize,
    },
    /// Print the multi-year chart URL.
    Url {
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<ScenarioId>,
        /// Sub-path, e.g. a chart view.
        #[arg(long)]
        path: Option<String>,
        /// Query parameter, repeatable.
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
}
