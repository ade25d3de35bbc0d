//! # regdash-cli
//!
//! Command-line front end for regdash: loads registration spreadsheets,
//! applies the shared filters and prints metrics as a table, JSON or CSV.

mod report;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use regdash_core::{
    aggregate, apply_filter, default_file_name, growth, market_share, preferred_measure,
    preferred_monthly_measure, select_measure, summarize, top_n, write_csv, CanonicalRecord,
    Dimension, FilterSelection, NormalizeOptions, Normalized, Normalizer, Period, PeriodRange,
};
use regdash_sheet::Book;
use report::{OutputFormat, Report};
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// regdash - vehicle registration dashboard metrics
#[derive(Parser, Debug)]
#[command(name = "regdash")]
#[command(author, version, about = "Vehicle registration metrics from spreadsheet exports", long_about = None)]
struct Cli {
    /// Normalizer configuration file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format (json, csv, table)
    #[arg(short = 'f', long = "format", global = true, default_value = "table")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show what was loaded: records, makers, years, categories, skipped sheets
    Load {
        #[command(flatten)]
        source: Source,
    },
    /// Headline figures for the filtered data
    Summary {
        #[command(flatten)]
        source: Source,
    },
    /// Sum values grouped by one or more dimensions
    Aggregate {
        #[command(flatten)]
        source: Source,
        /// Dimensions to group by (entity, category, period, year, quarter)
        #[arg(long, value_delimiter = ',', default_value = "year")]
        by: Vec<Dimension>,
    },
    /// Year-over-year (or quarter-over-quarter) growth
    Growth {
        #[command(flatten)]
        source: Source,
        /// Extra dimensions to split the series by
        #[arg(long, value_delimiter = ',')]
        by: Vec<Dimension>,
        /// Compare quarters instead of years
        #[arg(long)]
        quarterly: bool,
    },
    /// Market share of each maker in one year
    Share {
        #[command(flatten)]
        source: Source,
        /// Year to compute shares for (default: latest)
        #[arg(long)]
        year: Option<i32>,
        /// Only show the largest N makers
        #[arg(long)]
        top: Option<usize>,
    },
    /// Rank groups by value
    Top {
        #[command(flatten)]
        source: Source,
        /// Number of groups to show
        #[arg(short, default_value_t = 10)]
        n: usize,
        /// Dimension to rank
        #[arg(long, default_value = "entity")]
        by: Dimension,
    },
    /// Write the filtered records as CSV
    Export {
        #[command(flatten)]
        source: Source,
        /// Output file (default: vehicle_registrations_{min}_{max}.csv)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

/// Input files plus the shared filter flags.
#[derive(Args, Debug)]
struct Source {
    /// Workbooks (.xlsx, .xls, .ods), CSV files or directories of CSV files
    #[arg(required = true, value_name = "PATH")]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// First year to include
    #[arg(long, value_name = "YEAR")]
    from: Option<i32>,
    /// Last year to include
    #[arg(long, value_name = "YEAR")]
    to: Option<i32>,
    /// Makers to include (default: all)
    #[arg(long = "maker", value_name = "NAME")]
    makers: Vec<String>,
    /// Vehicle categories to include (default: all)
    #[arg(long = "category", value_name = "CODE")]
    categories: Vec<String>,
    /// Measure to sum: total, registrations, maker_monthly or category_monthly
    /// (default: the first of these present in the data)
    #[arg(long)]
    measure: Option<String>,
}

impl FilterArgs {
    /// Build the explicit selection: flags narrow the full sets.
    fn selection(&self, records: &[CanonicalRecord]) -> Result<FilterSelection> {
        let Some(mut selection) = FilterSelection::covering(records) else {
            bail!("No records to filter");
        };
        if self.from.is_some() || self.to.is_some() {
            let range = selection.period_range;
            selection = selection.with_period_range(PeriodRange::years(
                self.from.unwrap_or(range.min.year),
                self.to.unwrap_or(range.max.year),
            ));
        }
        if !self.makers.is_empty() {
            selection = selection.with_entities(self.makers.iter().cloned());
        }
        if !self.categories.is_empty() {
            selection = selection.with_categories(self.categories.iter().cloned());
        }
        Ok(selection)
    }

    fn measure<'a>(&'a self, records: &[CanonicalRecord]) -> &'a str {
        self.measure
            .as_deref()
            .unwrap_or_else(|| preferred_measure(records))
    }
}

/// Records loaded from the inputs and narrowed by the filter flags.
struct Loaded {
    normalized: Normalized,
    selection: FilterSelection,
    measure: String,
}

impl Loaded {
    /// Filtered records of the chosen measure.
    fn records(&self) -> Vec<&CanonicalRecord> {
        let filtered = apply_filter(&self.normalized.records, &self.selection);
        select_measure(filtered, &self.measure)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let options = match &cli.config {
        Some(path) => NormalizeOptions::from_json_file(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?,
        None => NormalizeOptions::default(),
    };

    let report = run(&cli.command, &Normalizer::new(options))?;
    if let Some(report) = report {
        report.write(cli.format, std::io::stdout().lock())?;
    }
    Ok(())
}

fn load(source: &Source, normalizer: &Normalizer) -> Result<Loaded> {
    let book = Book::from_paths(&source.inputs).context("Failed to load input files")?;
    tracing::info!(
        "Loaded {} sheet(s) from {} input(s)",
        book.sheet_count(),
        source.inputs.len()
    );

    let normalized = normalizer
        .normalize_book(&book)
        .context("Failed to normalize input")?;
    for skipped in &normalized.skipped {
        eprintln!("{} skipped sheet {skipped}", "warning:".yellow().bold());
    }

    let selection = source.filter.selection(&normalized.records)?;
    let measure = source.filter.measure(&normalized.records).to_string();
    Ok(Loaded {
        normalized,
        selection,
        measure,
    })
}

fn run(command: &Command, normalizer: &Normalizer) -> Result<Option<Report>> {
    match command {
        Command::Load { source } => {
            let loaded = load(source, normalizer)?;
            Ok(Some(overview(&loaded)))
        }
        Command::Summary { source } => {
            let loaded = load(source, normalizer)?;
            Ok(Some(summary(&loaded)?))
        }
        Command::Aggregate { source, by } => {
            let loaded = load(source, normalizer)?;
            Ok(Some(aggregate_report(&loaded, by)))
        }
        Command::Growth {
            source,
            by,
            quarterly,
        } => {
            let mut loaded = load(source, normalizer)?;
            if *quarterly && source.filter.measure.is_none() {
                if let Some(measure) = preferred_monthly_measure(&loaded.normalized.records) {
                    loaded.measure = measure.to_string();
                }
            }
            Ok(Some(growth_report(&loaded, by, *quarterly)?))
        }
        Command::Share { source, year, top } => {
            let loaded = load(source, normalizer)?;
            Ok(Some(share_report(&loaded, *year, *top)))
        }
        Command::Top { source, n, by } => {
            let loaded = load(source, normalizer)?;
            Ok(Some(top_report(&loaded, *by, *n)))
        }
        Command::Export { source, output } => {
            let loaded = load(source, normalizer)?;
            export(&loaded, output.as_ref())?;
            Ok(None)
        }
    }
}

fn overview(loaded: &Loaded) -> Report {
    let normalized = &loaded.normalized;
    let summary = summarize(&normalized.records);
    let years = summary
        .years
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let categories = normalized
        .categories
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let skipped = normalized
        .skipped
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");

    let mut report = Report::new(["item", "value"]).titled("Loaded data");
    report.push(vec![json!("records"), json!(normalized.records.len())]);
    report.push(vec![json!("makers"), json!(summary.entities)]);
    report.push(vec![json!("years"), json!(years)]);
    report.push(vec![json!("categories"), json!(categories)]);
    report.push(vec![json!("default measure"), json!(loaded.measure)]);
    report.push(vec![json!("dropped rows"), json!(normalized.dropped_rows)]);
    report.push(vec![json!("skipped sheets"), json!(skipped)]);

    report.with_json(json!({
        "records": normalized.records.len(),
        "makers": summary.entities,
        "years": summary.years,
        "categories": normalized.categories,
        "measure": loaded.measure,
        "dropped_rows": normalized.dropped_rows,
        "skipped": normalized.skipped,
    }))
}

fn summary(loaded: &Loaded) -> Result<Report> {
    let summary = summarize(loaded.records());
    let mut report = Report::new(["metric", "value"]).titled(format!("Summary ({})", loaded.measure));
    report.push(vec![json!("total"), json!(summary.total)]);
    report.push(vec![json!("makers"), json!(summary.entities)]);
    report.push(vec![json!("average per year"), json!(summary.average_per_year)]);
    if let Some(year) = summary.latest_year {
        report.push(vec![json!(format!("{year} total")), json!(summary.latest_total)]);
        report.push(vec![
            json!(format!("{year} change")),
            json!(summary.latest_absolute_delta),
        ]);
        report.push(vec![
            json!(format!("{year} change %")),
            json!(summary.latest_percent_delta),
        ]);
    }
    Ok(report.with_json(serde_json::to_value(&summary)?))
}

fn aggregate_report(loaded: &Loaded, by: &[Dimension]) -> Report {
    let aggregation = aggregate(loaded.records(), by);
    let mut headers: Vec<String> = by.iter().map(ToString::to_string).collect();
    headers.push(loaded.measure.clone());

    let mut report = Report::new(headers);
    for (key, value) in aggregation.iter() {
        let mut row: Vec<JsonValue> = key.parts().iter().map(|p| json!(p.to_string())).collect();
        row.push(json!(value));
        report.push(row);
    }
    report
}

fn growth_report(loaded: &Loaded, by: &[Dimension], quarterly: bool) -> Result<Report> {
    let series_dimension = if quarterly {
        Dimension::Quarter
    } else {
        Dimension::Year
    };
    let mut dimensions: Vec<Dimension> = by
        .iter()
        .copied()
        .filter(|&d| d != series_dimension)
        .collect();
    dimensions.push(series_dimension);

    let records: Vec<&CanonicalRecord> = loaded
        .records()
        .into_iter()
        .filter(|r| !quarterly || r.period.month.is_some())
        .collect();
    if quarterly && records.is_empty() {
        bail!("Quarterly growth needs monthly data; none matched the filters");
    }

    let series = growth(&aggregate(records, &dimensions), series_dimension)?;

    let mut headers: Vec<String> = dimensions.iter().map(ToString::to_string).collect();
    headers.extend(["value", "change", "change %"].map(String::from));
    let mut report = Report::new(headers);
    for s in &series {
        for point in &s.points {
            let mut row: Vec<JsonValue> = s.key.parts().iter().map(|p| json!(p.to_string())).collect();
            row.push(json!(point.at.to_string()));
            row.push(json!(point.value));
            row.push(json!(point.absolute_delta));
            row.push(json!(point.percent_delta));
            report.push(row);
        }
    }
    Ok(report.with_json(serde_json::to_value(&series)?))
}

fn share_report(loaded: &Loaded, year: Option<i32>, top: Option<usize>) -> Report {
    let records = loaded.records();
    let year = year.or_else(|| records.iter().map(|r| r.period.year).max());
    let Some(year) = year else {
        return Report::new(["maker", "value", "share %"]);
    };

    let mut shares = market_share(records, Period::year(year), &loaded.selection.entities);
    if let Some(top) = top {
        shares.truncate(top);
    }

    let mut report = Report::new(["maker", "value", "share %"]).titled(format!("Market share {year}"));
    for share in &shares {
        report.push(vec![json!(share.entity), json!(share.value), json!(share.share)]);
    }
    report
}

fn top_report(loaded: &Loaded, by: Dimension, n: usize) -> Report {
    let aggregation = aggregate(loaded.records(), &[by]);
    let mut report = Report::new(["rank".to_string(), by.to_string(), loaded.measure.clone()]);
    for (rank, (key, value)) in top_n(&aggregation, n).into_iter().enumerate() {
        report.push(vec![json!(rank + 1), json!(key.to_string()), json!(value)]);
    }
    report
}

fn export(loaded: &Loaded, output: Option<&PathBuf>) -> Result<()> {
    // Exports carry every measure; only the filter applies
    let records = apply_filter(&loaded.normalized.records, &loaded.selection);
    let path = match output {
        Some(path) => path.clone(),
        None => PathBuf::from(default_file_name(records.iter().copied())),
    };
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let count = write_csv(records, file)?;
    eprintln!("{} {count} records to {}", "Exported".green().bold(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regdash_sheet::{CellValue, Sheet};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_fixture(dir: &Path) -> PathBuf {
        let mut book = Book::new();
        for (year, a, b) in [(2021, 5, 3), (2022, 10, 1)] {
            let mut sheet = Sheet::new();
            sheet.row_append(vec!["Maker", "2WN", "3WT", "Year", "Total"]);
            sheet.row_append(vec![
                CellValue::from("A"),
                a.into(),
                0.into(),
                year.into(),
                a.into(),
            ]);
            sheet.row_append(vec![
                CellValue::from("B"),
                0.into(),
                b.into(),
                year.into(),
                b.into(),
            ]);
            book.add_sheet(&year.to_string(), sheet).unwrap();
        }
        let path = dir.join("registrations.xlsx");
        book.save_as_xlsx(&path).unwrap();
        path
    }

    fn write_monthly_fixture(dir: &Path) -> PathBuf {
        let mut book = Book::new();
        let mut makers = Sheet::new();
        makers.row_append(vec!["Maker", "JAN", "FEB", "MAR", "APR"]);
        makers.row_append(vec![CellValue::from("A"), 1.into(), 1.into(), 1.into(), 2.into()]);
        book.add_sheet("Maker Month 2022", makers).unwrap();

        let mut categories = Sheet::new();
        categories.row_append(vec!["Vehicle Category", "JAN", "FEB", "MAR", "APR"]);
        categories.row_append(vec![CellValue::from("LMV"), 5.into(), 5.into(), 5.into(), 5.into()]);
        book.add_sheet("Category Month 2022", categories).unwrap();

        let path = dir.join("monthly.xlsx");
        book.save_as_xlsx(&path).unwrap();
        path
    }

    fn source(path: &Path, filter: FilterArgs) -> Source {
        Source {
            inputs: vec![path.to_path_buf()],
            filter,
        }
    }

    fn cell_strings(report: &Report) -> Vec<Vec<String>> {
        report
            .rows
            .iter()
            .map(|row| row.iter().map(report::format_cell).collect())
            .collect()
    }

    // ========================================================================
    // CLI argument parsing tests
    // ========================================================================

    #[test]
    fn test_cli_parse_aggregate() {
        let cli = Cli::parse_from([
            "regdash",
            "aggregate",
            "data.xlsx",
            "--by",
            "maker,year",
            "--from",
            "2021",
            "--maker",
            "A",
            "--maker",
            "B",
        ]);
        match cli.command {
            Command::Aggregate { source, by } => {
                assert_eq!(by, vec![Dimension::Entity, Dimension::Year]);
                assert_eq!(source.filter.from, Some(2021));
                assert_eq!(source.filter.makers, vec!["A", "B"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_command() {
        let cli = Cli::parse_from(["regdash", "summary", "a.csv", "b.csv", "-f", "json", "-v"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        match cli.command {
            Command::Summary { source } => assert_eq!(source.inputs.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_dimension() {
        assert!(Cli::try_parse_from(["regdash", "aggregate", "a.csv", "--by", "colour"]).is_err());
    }

    #[test]
    fn test_cli_requires_inputs() {
        assert!(Cli::try_parse_from(["regdash", "summary"]).is_err());
    }

    // ========================================================================
    // Command tests
    // ========================================================================

    #[test]
    fn test_aggregate_by_year_uses_totals() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(dir.path());
        let loaded = load(&source(&path, FilterArgs::default()), &Normalizer::default()).unwrap();
        assert_eq!(loaded.measure, "total");

        let report = aggregate_report(&loaded, &[Dimension::Year]);
        assert_eq!(report.headers, vec!["year", "total"]);
        assert_eq!(
            cell_strings(&report),
            vec![vec!["2021", "8"], vec!["2022", "11"]]
        );
    }

    #[test]
    fn test_maker_filter_and_growth() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(dir.path());
        let filter = FilterArgs {
            makers: vec!["A".to_string()],
            ..FilterArgs::default()
        };
        let loaded = load(&source(&path, filter), &Normalizer::default()).unwrap();

        let report = growth_report(&loaded, &[], false).unwrap();
        assert_eq!(
            cell_strings(&report),
            vec![vec!["2021", "5", "-", "-"], vec!["2022", "10", "5", "100"]]
        );
    }

    #[test]
    fn test_category_filter_on_registrations() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(dir.path());
        let filter = FilterArgs {
            categories: vec!["3WT".to_string()],
            measure: Some("registrations".to_string()),
            ..FilterArgs::default()
        };
        let loaded = load(&source(&path, filter), &Normalizer::default()).unwrap();

        let report = aggregate_report(&loaded, &[Dimension::Category]);
        assert_eq!(cell_strings(&report), vec![vec!["3WT", "4"]]);
    }

    #[test]
    fn test_share_and_top() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(dir.path());
        let loaded = load(&source(&path, FilterArgs::default()), &Normalizer::default()).unwrap();

        let shares = share_report(&loaded, Some(2021), None);
        assert_eq!(
            cell_strings(&shares),
            vec![vec!["A", "5", "62.50"], vec!["B", "3", "37.50"]]
        );

        let top = top_report(&loaded, Dimension::Entity, 1);
        assert_eq!(cell_strings(&top), vec![vec!["1", "A", "15"]]);
    }

    #[test]
    fn test_year_range_filter() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(dir.path());
        let filter = FilterArgs {
            from: Some(2022),
            ..FilterArgs::default()
        };
        let loaded = load(&source(&path, filter), &Normalizer::default()).unwrap();
        let summary = summarize(loaded.records());
        assert_eq!(summary.years, vec![2022]);
        assert_eq!(summary.total, 11.0);
    }

    #[test]
    fn test_export_writes_filtered_records() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(dir.path());
        let filter = FilterArgs {
            makers: vec!["B".to_string()],
            ..FilterArgs::default()
        };
        let loaded = load(&source(&path, filter), &Normalizer::default()).unwrap();

        let output = dir.path().join("out.csv");
        export(&loaded, Some(&output)).unwrap();
        let records = regdash_core::read_csv(std::fs::File::open(&output).unwrap()).unwrap();
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.entity == "B"));
    }

    #[test]
    fn test_mixed_exports_sum_one_measure() {
        let dir = TempDir::new().unwrap();
        let source = Source {
            inputs: vec![write_fixture(dir.path()), write_monthly_fixture(dir.path())],
            filter: FilterArgs::default(),
        };
        let loaded = load(&source, &Normalizer::default()).unwrap();
        assert_eq!(loaded.measure, "total");
        assert_eq!(
            cell_strings(&aggregate_report(&loaded, &[Dimension::Year])),
            vec![vec!["2021", "8"], vec!["2022", "11"]]
        );

        let growth = Command::Growth {
            source,
            by: Vec::new(),
            quarterly: true,
        };
        let report = run(&growth, &Normalizer::default()).unwrap().unwrap();
        assert_eq!(
            cell_strings(&report),
            vec![
                vec!["2022-Q1", "3", "-", "-"],
                vec!["2022-Q2", "2", "-1", "-33.33"],
            ]
        );
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.xlsx");
        assert!(load(&source(&missing, FilterArgs::default()), &Normalizer::default()).is_err());
    }
}
