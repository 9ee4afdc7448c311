// plantgeo CLI - GCPT coordinate crosswalks and plant name matching

mod crosswalk;
mod exit_codes;
mod matching;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use plantgeo_recon::{CrosswalkSource, ReconConfig};

use exit_codes::{
    EXIT_CONFIG_INVALID, EXIT_CONFIG_READ, EXIT_DB, EXIT_INPUT, EXIT_NO_REFERENCE, EXIT_OUTPUT,
    EXIT_SUCCESS, EXIT_USAGE,
};

/// Config file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "plantgeo.toml";

#[derive(Parser)]
#[command(name = "plantgeo")]
#[command(about = "Attach Global Coal Plant Tracker coordinates to other plant datasets")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// TOML config file (default: ./plantgeo.toml if present)
    #[arg(long, global = true, env = "PLANTGEO_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the GCPT workbook (overrides config)
    #[arg(long, global = true, env = "PLANTGEO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory crosswalk files are read from and written to (overrides config)
    #[arg(long, global = true, env = "PLANTGEO_CROSSWALK_DIR")]
    crosswalk_dir: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build source-specific crosswalk files from the GCPT workbook
    #[command(after_help = "\
Examples:
  plantgeo build
  plantgeo build --source eia
  plantgeo build --source entsoe --output-dir out/crosswalks --json")]
    Build {
        /// Which crosswalk to build
        #[arg(long, value_enum, default_value_t = SourceArg::All)]
        source: SourceArg,

        /// Output directory (default: crosswalk_dir from config)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fuzzy-match plant names against GCPT project names
    #[command(after_help = "\
Examples:
  plantgeo match Colstrip
  plantgeo match Navajo 'Four Corners' --cutoff 80 --limit 3
  plantgeo match Belchatow --country Poland --json")]
    Match {
        /// Plant names to look up
        #[arg(required = true)]
        names: Vec<String>,

        /// Restrict candidates to a GCPT country. Repeatable.
        #[arg(long = "country", value_name = "COUNTRY")]
        countries: Vec<String>,

        /// Minimum score, 0-100 (default: matching.score_cutoff)
        #[arg(long)]
        cutoff: Option<f64>,

        /// Maximum distinct names per query (default: matching.limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Look up GCPT units by composite EIA id ("<plant code>|<generator id>")
    #[command(after_help = "\
Examples:
  plantgeo lookup-ids '6076|1' '4941|1'
  plantgeo lookup-ids '6076|1' --json")]
    LookupIds {
        /// Composite ids, e.g. 6076|1
        #[arg(required = true)]
        ids: Vec<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Append GCPT coordinates to every row of a CSV or Excel file
    #[command(after_help = "\
Examples:
  plantgeo reconcile plants.csv --name-column plant_name -o plants_geo.csv
  plantgeo reconcile units.xlsx --name-column name --country-column country -o out.xlsx
  plantgeo reconcile eia860.csv --name-column plant --id-column unit_id")]
    Reconcile {
        /// Input table (.csv, .tsv, .xlsx, .xls, .ods)
        input: PathBuf,

        /// Column holding plant names
        #[arg(long)]
        name_column: String,

        /// Column holding GCPT country names; blank cells match any country
        #[arg(long)]
        country_column: Option<String>,

        /// Column holding composite EIA ids, resolved exactly before fuzzy matching
        #[arg(long)]
        id_column: Option<String>,

        /// Minimum score, 0-100 (default: matching.score_cutoff)
        #[arg(long)]
        cutoff: Option<f64>,

        /// Output file, .csv or .xlsx (omit for CSV on stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Load built crosswalks and the raw GCPT CSV into SQLite
    #[command(after_help = "\
Examples:
  plantgeo load-db
  plantgeo load-db --db data/plants.sqlite --skip-gcpt")]
    LoadDb {
        /// SQLite database file, created if missing
        #[arg(long, default_value = "data/plantgeo.sqlite")]
        db: PathBuf,

        /// Skip the gcpt_global table
        #[arg(long)]
        skip_gcpt: bool,

        /// Print load reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print how to download the GCPT workbook
    Download,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Eia,
    Entsoe,
    Npp,
    All,
}

impl SourceArg {
    pub fn sources(self) -> Vec<CrosswalkSource> {
        match self {
            SourceArg::Eia => vec![CrosswalkSource::Eia],
            SourceArg::Entsoe => vec![CrosswalkSource::Entsoe],
            SourceArg::Npp => vec![CrosswalkSource::Npp],
            SourceArg::All => CrosswalkSource::ALL.to_vec(),
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|mut config| {
        if let Some(dir) = cli.data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = cli.crosswalk_dir {
            config.crosswalk_dir = dir;
        }
        run(cli.command, config)
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands, mut config: ReconConfig) -> Result<(), CliError> {
    match command {
        Commands::Build { source, output_dir, json } => {
            crosswalk::cmd_build(&config, source, output_dir, json)
        }
        Commands::Match { names, countries, cutoff, limit, json } => {
            apply_overrides(&mut config, cutoff, limit)?;
            matching::cmd_match(&config, &names, &countries, json)
        }
        Commands::LookupIds { ids, json } => matching::cmd_lookup_ids(&config, &ids, json),
        Commands::Reconcile { input, name_column, country_column, id_column, cutoff, output } => {
            apply_overrides(&mut config, cutoff, None)?;
            let options = matching::ReconcileArgs { name_column, country_column, id_column };
            matching::cmd_reconcile(&config, &input, options, output.as_deref())
        }
        Commands::LoadDb { db, skip_gcpt, json } => crosswalk::cmd_load_db(&config, &db, skip_gcpt, json),
        Commands::Download => crosswalk::cmd_download(&config),
    }
}

/// Read `path`, or `./plantgeo.toml` when present, or fall back to defaults.
fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => PathBuf::from(DEFAULT_CONFIG_FILE),
        None => return Ok(ReconConfig::default()),
    };
    debug!("Reading config from {}", path.display());
    let text = std::fs::read_to_string(&path).map_err(|e| CliError {
        code: EXIT_CONFIG_READ,
        message: format!("cannot read config {}: {e}", path.display()),
        hint: None,
    })?;
    ReconConfig::from_toml(&text).map_err(|e| CliError {
        code: EXIT_CONFIG_INVALID,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

/// Command-line flags win over the config file; re-validate after applying.
fn apply_overrides(config: &mut ReconConfig, cutoff: Option<f64>, limit: Option<usize>) -> Result<(), CliError> {
    if let Some(cutoff) = cutoff {
        config.matching.score_cutoff = cutoff;
    }
    if let Some(limit) = limit {
        config.matching.limit = limit;
    }
    config.validate().map_err(|e| CliError::args(e.to_string()))
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self { code: EXIT_OUTPUT, message: msg.into(), hint: None }
    }

    pub fn db(msg: impl Into<String>) -> Self {
        Self { code: EXIT_DB, message: msg.into(), hint: None }
    }

    /// No usable GCPT data; always points at `plantgeo download`.
    pub fn no_reference(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_NO_REFERENCE,
            message: msg.into(),
            hint: Some("run `plantgeo download` for instructions on fetching the GCPT workbook".to_string()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
