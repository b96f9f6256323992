//! dcf-sheets CLI - inspect and fill valuation workbooks

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dcf_sheets::prelude::*;
use dcf_sheets::{CsvReadOptions, CsvReader};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dcf-sheets")]
#[command(author, version, about = "Inspect and fill spreadsheet valuation models")]
struct Cli {
    /// Log debug output (RUST_LOG still applies per module)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Create missing workbooks without asking
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of a workbook; the active sheet is marked with '*'
    Sheets {
        /// Workbook file (xlsx, xlsm, csv)
        input: PathBuf,
    },

    /// Print a sheet, or every sheet, as a table
    Show {
        input: PathBuf,

        /// Sheet to print (default: all sheets)
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Print the value behind a position, range, defined name or sheet
    ///
    /// Formula cells are evaluated.
    Get {
        input: PathBuf,

        /// e.g. B7, 'Inputs'!B2, A1:C3, Ticker
        index: String,
    },

    /// Write a value and save
    ///
    /// Text starting with '=' is stored as a formula; numbers and TRUE/FALSE
    /// are stored typed.
    Set {
        input: PathBuf,
        index: String,
        value: String,

        /// Write the result here instead of updating the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Append the sheets of one workbook to another
    Merge {
        /// Workbook merged into
        base: PathBuf,

        /// Workbook whose sheets are merged in
        other: PathBuf,

        /// Write the result here instead of updating the base workbook
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a CSV table into a sheet as a block
    Import {
        input: PathBuf,

        /// CSV file whose first line holds the column headers
        csv: PathBuf,

        /// Target sheet (created if missing; default: the active sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Top-left cell of the block
        #[arg(long, default_value = "A1")]
        start: String,

        /// Also write the CSV header line
        #[arg(long)]
        header: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = open_options(cli.yes);
    match cli.command {
        Commands::Sheets { input } => list_sheets(&input),
        Commands::Show { input, sheet } => show(&input, sheet.as_deref()),
        Commands::Get { input, index } => get(&input, &index),
        Commands::Set {
            input,
            index,
            value,
            output,
        } => set(&options, &input, &index, &value, output.as_deref()),
        Commands::Merge {
            base,
            other,
            output,
        } => merge(&base, &other, output.as_deref()),
        Commands::Import {
            input,
            csv,
            sheet,
            start,
            header,
        } => import(&options, &input, &csv, sheet.as_deref(), &start, header),
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn open_options(yes: bool) -> OpenOptions {
    let policy = if yes {
        CreatePolicy::Always
    } else {
        CreatePolicy::ask(|path| {
            let stdin = io::stdin();
            confirm_create(path, &mut stdin.lock(), &mut io::stderr())
        })
    };
    OpenOptions::new().create(policy)
}

/// Ask whether to create `path`; an empty answer counts as yes
fn confirm_create(path: &Path, input: &mut impl BufRead, prompt: &mut impl Write) -> bool {
    // prompt failures are not fatal
    let _ = write!(prompt, "Create a new workbook at {} (Y/n)? ", path.display());
    let _ = prompt.flush();

    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}

fn open_read(input: &Path) -> Result<Session> {
    Session::open(input, Mode::ReadOnly)
        .with_context(|| format!("Failed to open '{}'", input.display()))
}

fn list_sheets(input: &Path) -> Result<()> {
    let book = open_read(input)?;
    let active = book.active_sheet();

    for (i, name) in book.sheets().into_iter().enumerate() {
        let marker = if name == active { "*" } else { " " };
        println!("{}{}\t{}", marker, i, name);
    }
    Ok(())
}

fn show(input: &Path, sheet: Option<&str>) -> Result<()> {
    let book = open_read(input)?;
    match sheet {
        Some(name) => {
            let ws = book
                .worksheet(name)
                .with_context(|| format!("Sheet '{}' not found", name))?;
            print!("{}", ws.to_table());
        }
        None => print!("{}", book),
    }
    Ok(())
}

fn get(input: &Path, index: &str) -> Result<()> {
    // modify mode evaluates formulas against the file without writing it
    let mut book = Session::open(input, Mode::Mutable)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;

    let single_cell = match book.get(index).with_context(|| format!("No cell at '{}'", index))? {
        Lookup::Sheet(ws) => {
            print!("{}", ws.to_table());
            false
        }
        Lookup::Range(cells) => {
            for cell in cells {
                println!("{}\t{}", cell.position(), cell.value);
            }
            false
        }
        Lookup::Cell(_) => true,
    };

    if single_cell {
        let value = book
            .get_evaluated(index)
            .with_context(|| format!("Failed to evaluate '{}'", index))?;
        println!("{}", value);
    }
    Ok(())
}

fn set(
    options: &OpenOptions,
    input: &Path,
    index: &str,
    value: &str,
    output: Option<&Path>,
) -> Result<()> {
    let target = match output {
        Some(output) => {
            copy_workbook(input, output)?;
            output
        }
        None => input,
    };

    options.scope(target, Mode::Persistent, |book| {
        book.set(index, parse_value(value))
    })
    .with_context(|| format!("Failed to set '{}' in '{}'", index, target.display()))?;

    eprintln!("Set {} = {} in '{}'", index, value, target.display());
    Ok(())
}

fn merge(base: &Path, other: &Path, output: Option<&Path>) -> Result<()> {
    let target = match output {
        Some(output) => {
            copy_workbook(base, output)?;
            output
        }
        None => base,
    };

    let report = Session::scope(target, Mode::Persistent, |book| book.merge_file(other))
        .with_context(|| format!("Failed to merge '{}' into '{}'", other.display(), target.display()))?;

    for name in &report.appended {
        eprintln!("appended rows of '{}'", name);
    }
    for name in &report.created {
        eprintln!("created sheet '{}'", name);
    }
    for (name, err) in &report.failures {
        eprintln!("failed to merge '{}': {}", name, err);
    }
    if !report.is_clean() {
        bail!("{} sheet(s) could not be merged", report.failures.len());
    }
    Ok(())
}

fn import(
    options: &OpenOptions,
    input: &Path,
    csv: &Path,
    sheet: Option<&str>,
    start: &str,
    header: bool,
) -> Result<()> {
    let table = CsvReader::read_table_file(csv, &CsvReadOptions::default())
        .with_context(|| format!("Failed to read '{}'", csv.display()))?;

    options
        .scope(input, Mode::Persistent, |book| {
            let sheet = match sheet {
                Some(name) => {
                    if !book.contains(name) {
                        book.new_sheet(name)?;
                    }
                    name.to_string()
                }
                None => book.active_sheet().to_string(),
            };
            book.set_tabular_block(start, &sheet, &table, header)
        })
        .with_context(|| format!("Failed to import into '{}'", input.display()))?;

    eprintln!(
        "Wrote {} row(s) x {} column(s) at {} in '{}'",
        table.len(),
        table.width(),
        start,
        input.display()
    );
    Ok(())
}

/// Load `from` and write it to `to`, converting between formats if needed
fn copy_workbook(from: &Path, to: &Path) -> Result<()> {
    let workbook =
        Workbook::open(from).with_context(|| format!("Failed to open '{}'", from.display()))?;
    workbook
        .save(to)
        .with_context(|| format!("Failed to write '{}'", to.display()))
}

/// Typed value for command-line text
fn parse_value(text: &str) -> CellValue {
    if let Ok(n) = text.trim().parse::<f64>() {
        if n.is_finite() {
            return CellValue::Number(n);
        }
    }
    match text.trim().to_ascii_uppercase().as_str() {
        "TRUE" => CellValue::Boolean(true),
        "FALSE" => CellValue::Boolean(false),
        _ => CellValue::from(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("0.0725"), CellValue::Number(0.0725));
        assert_eq!(parse_value(" 12 "), CellValue::Number(12.0));
        assert_eq!(parse_value("true"), CellValue::Boolean(true));
        assert_eq!(parse_value("=SUM(A1:A3)"), CellValue::formula("SUM(A1:A3)"));
        assert_eq!(parse_value("ACME"), CellValue::string("ACME"));
        assert_eq!(parse_value("inf"), CellValue::string("inf"));
    }

    #[test]
    fn test_confirm_create() {
        let path = Path::new("model.xlsx");
        let mut prompt = Vec::new();

        assert!(confirm_create(path, &mut "\n".as_bytes(), &mut prompt));
        assert!(confirm_create(path, &mut "Y\n".as_bytes(), &mut Vec::new()));
        assert!(!confirm_create(path, &mut "n\n".as_bytes(), &mut Vec::new()));
        assert!(!confirm_create(path, &mut "later\n".as_bytes(), &mut Vec::new()));
        assert_eq!(
            String::from_utf8(prompt).unwrap(),
            "Create a new workbook at model.xlsx (Y/n)? "
        );
    }

    #[test]
    fn test_set_writes_to_output_only() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("template.xlsx");
        let output = dir.path().join("filled.xlsx");

        let mut wb = Workbook::new();
        wb.set("B2", 1).unwrap();
        wb.name("B2", "Beta_Equity", None).unwrap();
        wb.save(&input).unwrap();

        let options = OpenOptions::new();
        set(&options, &input, "Beta_Equity", "1.2", Some(&output)).unwrap();

        assert_eq!(Workbook::open(&input).unwrap().value("B2").unwrap(), CellValue::Number(1.0));
        assert_eq!(Workbook::open(&output).unwrap().value("B2").unwrap(), CellValue::Number(1.2));
    }

    #[test]
    fn test_import_creates_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("model.xlsx");
        let csv = dir.path().join("prices.csv");
        std::fs::write(&csv, "Year,Close\n2024,41.5\n").unwrap();

        let options = OpenOptions::new().create(CreatePolicy::Always);
        import(&options, &input, &csv, Some("Prices"), "B2", true).unwrap();

        let wb = Workbook::open(&input).unwrap();
        assert_eq!(wb.sheets(), vec!["Sheet1", "Prices"]);
        assert_eq!(wb.value("'Prices'!B2").unwrap(), CellValue::string("Year"));
        assert_eq!(wb.value("'Prices'!C3").unwrap(), CellValue::Number(41.5));
    }
}
