use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use wipsheet::cli;
use wipsheet::error::WipResult;

#[derive(Parser)]
#[command(name = "wipsheet")]
#[command(about = "Reconcile GL actuals into a WIP workbook without touching its formulas.")]
#[command(long_about = "wipsheet - Section reconciliation for WIP spreadsheets

Finds marked sections (e.g. 'Sub Labor Cost - 5040', 'Material - 5030') in a
month tab, diffs them against per-job target figures and rewrites only the
data cells. Formula rows, styles and macros are left as they are.

COMMANDS:
  sections  - Show located sections and their row classification
  preview   - Show the edits a target file would make (nothing is written)
  apply     - Apply the edits, save atomically and verify the saved file

EXAMPLES:
  wipsheet sections WIP.xlsm --sheet \"Jun 25\"
  wipsheet preview WIP.xlsm --sheet 2025-06 --targets june.yaml --report june.xlsx
  wipsheet apply WIP.xlsm --sheet \"June 2025\" --targets june.yaml

TARGET FILE:
  sections:
    - marker: \"5040\"
      rows:
        - { job: 100, value: 75 }
        - { job: 300, value: 10 }

Logging: RUST_LOG=wipsheet=debug, or -v / -vv.")]
#[command(version)]
struct Cli {
    /// Section layout file (YAML); defaults to the built-in 5040/5030 layout
    #[arg(short, long, global = true, env = "WIPSHEET_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show located sections, extents and row classes
    Sections {
        /// Workbook (.xlsx / .xlsm)
        workbook: PathBuf,

        /// Sheet name or month tag ("Jun 25", "June 2025", "2025-06"); defaults to the current month
        #[arg(short, long)]
        sheet: Option<String>,
    },

    #[command(long_about = "Preview the edit plan for a target file.

The month sheet is resolved (or created in memory from the template), every
section is planned and applied to a throwaway copy. The workbook on disk is
never written.

REPORT FORMATS:
  --report preview.xlsx   Excel table of every change
  --report preview.yaml   YAML
  --report preview.json   JSON")]
    /// Preview edits without writing
    Preview {
        /// Workbook (.xlsx / .xlsm)
        workbook: PathBuf,

        /// Sheet name or month tag; defaults to the current month
        #[arg(short, long)]
        sheet: Option<String>,

        /// Target tables (YAML or JSON)
        #[arg(short, long)]
        targets: PathBuf,

        /// Export the preview to .xlsx, .yaml or .json
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    #[command(long_about = "Apply a target file to the workbook.

All sections are located and planned before the first write; a missing
marker or a plan that would touch a formula cell aborts with the file
unchanged. The workbook is saved through a temporary file and re-read to
verify every written cell.")]
    /// Apply edits and save
    Apply {
        /// Workbook (.xlsx / .xlsm)
        workbook: PathBuf,

        /// Sheet name or month tag; defaults to the current month
        #[arg(short, long)]
        sheet: Option<String>,

        /// Target tables (YAML or JSON)
        #[arg(short, long)]
        targets: PathBuf,

        /// Write to this path instead of overwriting the workbook
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip re-reading the saved workbook
        #[arg(long)]
        no_verify: bool,
    },
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "wipsheet=warn",
        1 => "wipsheet=info",
        _ => "wipsheet=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> WipResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Sections { workbook, sheet } => cli::sections(workbook, sheet, cli.config),

        Commands::Preview {
            workbook,
            sheet,
            targets,
            report,
        } => cli::preview(workbook, sheet, targets, cli.config, report),

        Commands::Apply {
            workbook,
            sheet,
            targets,
            output,
            no_verify,
        } => cli::apply(workbook, sheet, targets, cli.config, output, no_verify),
    }
}
