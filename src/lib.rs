//! Vepi: a client for Vena's ETL and data export APIs.
//!
//! Vepi pushes tabular data into a Vena import template and pulls
//! intersection data and dimension hierarchies back out. Imports are
//! asynchronous on the Vena side; the client submits the job and then polls
//! it until it succeeds, fails or is cancelled.
//!
//! # Modules
//!
//! - [`config`]: Client configuration and polling options
//! - [`table`]: The tabular payload (`Table`, `Scalar`) and its CSV/JSON encodings
//! - [`transport`]: HTTP requests, the `Transport` trait and its `ureq` implementation
//! - [`import`]: File and direct-data imports
//! - [`job`]: Job status polling
//! - [`export`]: Paginated intersection export
//! - [`hierarchy`]: Dimension hierarchy flattening
//! - [`error`]: Error types for vepi operations
//!
//! # Example
//!
//! ```no_run
//! use vepi::table::{Scalar, Table};
//! use vepi::{ClientConfig, VenaClient};
//!
//! let config = ClientConfig::new("us1", "api-user", "api-key", "template-id")?;
//! let client = VenaClient::new(config);
//!
//! let table = Table::new(vec![
//!     ("Value", vec![Scalar::from("1000")]),
//!     ("Account", vec![Scalar::from("3910")]),
//! ])?;
//! let outcome = client.start_with_data(&table)?;
//! println!("job {} finished", outcome.job_id);
//! # Ok::<(), vepi::VenaError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod hierarchy;
pub mod import;
pub mod job;
pub mod table;
pub mod transport;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

pub use client::VenaClient;
pub use config::{ClientConfig, DataLayout, PollOptions};
pub use error::VenaError;
pub use job::{JobOutcome, JobStatus};
pub use table::{Scalar, Table};

/// The vepi CLI application.
#[derive(Parser)]
#[command(name = "vepi")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Connection and polling flags shared by every subcommand.
#[derive(clap::Args)]
struct ConnectionArgs {
    /// Vena hub (e.g. us1, eu1, ca3).
    #[arg(long, env = "VENA_HUB", global = true)]
    hub: Option<String>,

    /// API user from the Vena authentication token.
    #[arg(long, env = "VENA_API_USER", global = true)]
    api_user: Option<String>,

    /// API key from the Vena authentication token.
    #[arg(long, env = "VENA_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// ETL template ID.
    #[arg(long, env = "VENA_TEMPLATE_ID", global = true)]
    template_id: Option<String>,

    /// Model ID (required for export and hierarchy).
    #[arg(long, env = "VENA_MODEL_ID", global = true)]
    model_id: Option<String>,

    /// Override the API root URL.
    #[arg(long, env = "VENA_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Seconds between job status checks.
    #[arg(long, default_value_t = 3, global = true)]
    poll_interval_secs: u64,

    /// Give up waiting for a job after this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Upload a CSV file to the template and wait for the job.
    ImportFile(ImportFileArgs),
    /// Post a CSV file's rows as JSON data and wait for the job.
    ImportData(ImportDataArgs),
    /// Export the model's intersection data as CSV.
    Export(ExportArgs),
    /// Export the model's dimension hierarchies as CSV.
    Hierarchy(HierarchyArgs),
}

/// Arguments for the import-file subcommand.
#[derive(clap::Args)]
struct ImportFileArgs {
    /// CSV file to upload.
    input: PathBuf,

    /// File name reported to Vena (defaults to the input's name).
    #[arg(long)]
    file_name: Option<String>,
}

/// Arguments for the import-data subcommand.
#[derive(clap::Args)]
struct ImportDataArgs {
    /// CSV file with a header row.
    input: PathBuf,

    /// Row encoding of the JSON body.
    #[arg(long, value_enum, default_value = "records")]
    layout: LayoutArg,
}

/// Arguments for the export subcommand.
#[derive(clap::Args)]
struct ExportArgs {
    /// Intersections requested per page.
    #[arg(long, default_value_t = config::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Output CSV file (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Arguments for the hierarchy subcommand.
#[derive(clap::Args)]
struct HierarchyArgs {
    /// Output CSV file (stdout if omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Records,
    Arrays,
}

impl From<LayoutArg> for DataLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Records => DataLayout::Records,
            LayoutArg::Arrays => DataLayout::Arrays,
        }
    }
}

/// Run the vepi CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), VenaError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::ImportFile(args)) => run_import_file(&cli.connection, args),
        Some(Commands::ImportData(args)) => run_import_data(&cli.connection, args),
        Some(Commands::Export(args)) => run_export(&cli.connection, args),
        Some(Commands::Hierarchy(args)) => run_hierarchy(&cli.connection, args),
        None => {
            println!("vepi {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Import into and export from Vena.");
            println!();
            println!("Run 'vepi --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "vepi=debug" } else { "vepi=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when run() is embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_client(args: &ConnectionArgs) -> Result<VenaClient, VenaError> {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    let mut config = ClientConfig::new(
        field(&args.hub),
        field(&args.api_user),
        field(&args.api_key),
        field(&args.template_id),
    )?;
    if let Some(model_id) = &args.model_id {
        config = config.with_model_id(model_id.as_str());
    }
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url.as_str())?;
    }

    let mut poll = PollOptions::default()
        .with_poll_interval(Duration::from_secs(args.poll_interval_secs));
    if let Some(timeout) = args.timeout_secs {
        poll = poll.with_timeout(Duration::from_secs(timeout));
    }

    Ok(VenaClient::new(config).with_poll_options(poll))
}

fn run_import_file(connection: &ConnectionArgs, args: ImportFileArgs) -> Result<(), VenaError> {
    let client = build_client(connection)?;
    let outcome = match args.file_name.as_deref() {
        Some(name) => client.start_with_file_named(args.input.as_path(), name)?,
        None => client.start_with_file(args.input.as_path())?,
    };
    report_outcome(&outcome);
    Ok(())
}

fn run_import_data(connection: &ConnectionArgs, args: ImportDataArgs) -> Result<(), VenaError> {
    let client = build_client(connection)?.with_data_layout(args.layout.into());
    let table = table::read_csv(&args.input)?;
    let outcome = client.import_dataframe(&table)?;
    report_outcome(&outcome);
    Ok(())
}

fn run_export(connection: &ConnectionArgs, args: ExportArgs) -> Result<(), VenaError> {
    let client = build_client(connection)?;
    let table = client.export_data(args.page_size)?;
    emit_table(&table, args.output.as_ref())
}

fn run_hierarchy(connection: &ConnectionArgs, args: HierarchyArgs) -> Result<(), VenaError> {
    let client = build_client(connection)?;
    let table = client.get_dimension_hierarchy()?;
    emit_table(&table, args.output.as_ref())
}

fn report_outcome(outcome: &JobOutcome) {
    println!(
        "Job {} completed successfully ({} status checks, {:.1}s).",
        outcome.job_id,
        outcome.polls,
        outcome.elapsed.as_secs_f64()
    );
}

fn emit_table(table: &Table, output: Option<&PathBuf>) -> Result<(), VenaError> {
    match output {
        Some(path) => {
            table::write_csv(path, table)?;
            eprintln!("Wrote {} rows to {}", table.num_rows(), path.display());
            Ok(())
        }
        None => {
            let csv = table::to_csv_string(table)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(csv.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
