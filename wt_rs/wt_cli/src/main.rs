use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use dialoguer::Input;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wt_core::store::{self, DATE_FORMAT};
use wt_core::{
    moving_average, report_with, Field, HistoryStore, Measurement, ReportMode, ReportOptions,
    StatsSummary, TimeAxis, DEFAULT_WINDOW,
};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(author, version = APP_VERSION, about = "Weight and body-composition log", long_about = None)]
struct Cli {
    /// History CSV file (defaults to ~/.local/share/wt/weight_history.csv)
    #[arg(long, global = true, env = "WT_HISTORY_FILE", value_hint = ValueHint::FilePath)]
    file: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append today's measurement (prompts for every metric when WEIGHT is omitted)
    Log(LogArgs),
    /// Print the moving average of every metric
    Avg(AvgArgs),
    /// Print the rate of change of every metric
    Stats(StatsArgs),
}

#[derive(Parser, Debug)]
struct LogArgs {
    /// Weight in Kg; other metrics are recorded as NA
    weight: Option<f64>,

    /// Entry date (DD/MM/YYYY), defaults to today
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

#[derive(Parser, Debug)]
struct AvgArgs {
    /// Averaging window in entries
    #[arg(short, long, default_value_t = DEFAULT_WINDOW, value_parser = parse_window)]
    window: usize,

    /// Show the date closing each window
    #[arg(long, action = ArgAction::SetTrue)]
    dated: bool,
}

#[derive(Parser, Debug)]
struct StatsArgs {
    /// Minimum number of entries before stats are shown
    #[arg(short, long, default_value_t = DEFAULT_WINDOW, value_parser = parse_window)]
    window: usize,

    /// Report metrics without data instead of failing
    #[arg(long, action = ArgAction::SetTrue)]
    partial: bool,

    /// Fit against elapsed days instead of entry order
    #[arg(long, action = ArgAction::SetTrue)]
    calendar: bool,

    /// Fit the moving average instead of the raw entries
    #[arg(long, action = ArgAction::SetTrue)]
    smoothed: bool,

    /// Emit JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let store = match cli.file {
        Some(path) => HistoryStore::new(path),
        None => HistoryStore::default_location()?,
    };
    store
        .ensure_data_dir()
        .context("failed to initialise data directory")?;
    debug!("history file: {}", store.path().display());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Log(args) => handle_log(&store, args),
        Command::Avg(args) => handle_avg(&store, &args, &mut out),
        Command::Stats(args) => handle_stats(&store, &args, &mut out),
    }
}

fn handle_log(store: &HistoryStore, args: LogArgs) -> Result<()> {
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let entry = match args.weight {
        Some(weight) => {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(anyhow!("weight must be a positive number, got {}", weight));
            }
            Measurement::weight_only(date, weight)
        }
        None => prompt_measurement(date)?,
    };
    store
        .append(&entry)
        .with_context(|| format!("failed to append to {}", store.path().display()))?;
    info!(
        "Logged entry for {} to {}",
        entry.date.format(DATE_FORMAT),
        store.path().display()
    );
    Ok(())
}

fn prompt_measurement(date: NaiveDate) -> Result<Measurement> {
    println!("*** Please enter data...");
    let mut entry = Measurement::new(date, [None; Field::COUNT]);
    for (field, prompt) in [
        (Field::Weight, "Weight (Kg)"),
        (Field::BodyFat, "Body fat (%)"),
        (Field::WaterMass, "Water mass (%)"),
        (Field::MuscleMass, "Muscle mass (%)"),
    ] {
        let text: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|input: &String| -> Result<(), String> {
                parse_prompt_value(input).map(|_| ())
            })
            .interact_text()
            .context("failed to read input")?;
        let value = parse_prompt_value(&text).map_err(|e| anyhow!(e))?;
        entry = entry.with(field, value);
    }
    Ok(entry)
}

/// Empty input and `NA` leave the metric unset.
fn parse_prompt_value(input: &str) -> Result<Option<f64>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match store::parse_value(trimmed) {
        Some(Some(v)) if v < 0.0 => Err(format!("'{}' must not be negative", trimmed)),
        Some(value) => Ok(value),
        None => Err(format!("'{}' is not a number (use NA to skip)", trimmed)),
    }
}

fn handle_avg<W: Write>(store: &HistoryStore, args: &AvgArgs, out: &mut W) -> Result<()> {
    let history = store
        .load()
        .with_context(|| format!("failed to read {}", store.path().display()))?;
    write_avg(&history, args, out)
}

fn write_avg<W: Write>(history: &[Measurement], args: &AvgArgs, out: &mut W) -> Result<()> {
    if history.len() < args.window {
        writeln!(out, "Not enough data to show average.")?;
        return Ok(());
    }
    let rows = moving_average(history, args.window)?;
    debug!("{} averaged rows (window {})", rows.len(), args.window);
    out.write_all(render_average(&rows, args.dated).as_bytes())?;
    Ok(())
}

fn handle_stats<W: Write>(store: &HistoryStore, args: &StatsArgs, out: &mut W) -> Result<()> {
    let history = store
        .load()
        .with_context(|| format!("failed to read {}", store.path().display()))?;
    write_stats(&history, args, out)
}

fn write_stats<W: Write>(history: &[Measurement], args: &StatsArgs, out: &mut W) -> Result<()> {
    if history.len() < args.window {
        writeln!(out, "Not enough data to show stats.")?;
        return Ok(());
    }

    let smoothed;
    let source = if args.smoothed {
        smoothed = moving_average(history, args.window)?;
        smoothed.as_slice()
    } else {
        history
    };

    let options = ReportOptions {
        mode: if args.partial {
            ReportMode::Partial
        } else {
            ReportMode::FailFast
        },
        axis: if args.calendar {
            TimeAxis::CalendarDays
        } else {
            TimeAxis::SampleIndex
        },
    };
    let summary = report_with(source, &options).context("failed to compute stats")?;

    if args.json {
        let text = serde_json::to_string_pretty(&summary_json(&summary))?;
        writeln!(out, "{}", text)?;
    } else {
        out.write_all(render_stats(&summary).as_bytes())?;
    }
    Ok(())
}

fn cell(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.2} {}", v, unit),
        None => store::UNSET_TOKEN.to_string(),
    }
}

fn render_average(rows: &[Measurement], dated: bool) -> String {
    let mut text = String::from("===\n[Moving Average History]\n");
    let labels: Vec<&str> = Field::ALL.iter().map(|f| f.label()).collect();
    if dated {
        text.push_str(&format!("  Date, {}\n", labels.join(", ")));
    } else {
        text.push_str(&format!("  {}\n", labels.join(", ")));
    }
    for row in rows {
        let cells: Vec<String> = Field::ALL
            .iter()
            .map(|&f| cell(row.get(f), f.unit()))
            .collect();
        if dated {
            text.push_str(&format!(
                "  {}, {}\n",
                row.date.format(DATE_FORMAT),
                cells.join(", ")
            ));
        } else {
            text.push_str(&format!("  {}\n", cells.join(", ")));
        }
    }
    text.push_str("===\n");
    text
}

fn render_stats(summary: &StatsSummary) -> String {
    let step = summary.axis().step_name();
    let mut text = String::from("===\n[Stats]\n");
    for (field, outcome) in summary.iter() {
        match outcome {
            Ok(trend) => text.push_str(&format!(
                "  {} rate of change: {:.2} {}/{}\n",
                field.label(),
                trend.fit.slope,
                field.unit(),
                step
            )),
            Err(_) => text.push_str(&format!(
                "  {} rate of change: n/a (no data)\n",
                field.label()
            )),
        }
    }
    text.push_str("===\n");
    text
}

fn summary_json(summary: &StatsSummary) -> JsonValue {
    let mut fields = Map::new();
    for (field, outcome) in summary.iter() {
        let value = match outcome {
            Ok(trend) => json!({
                "slope": trend.fit.slope,
                "intercept": trend.fit.intercept,
                "samples": trend.samples,
            }),
            Err(err) => json!({ "error": err.to_string() }),
        };
        fields.insert(field.key().to_string(), value);
    }
    json!({
        "mode": summary.mode(),
        "axis": summary.axis(),
        "rates": JsonValue::Object(fields),
    })
}

fn parse_window(input: &str) -> Result<usize, String> {
    let value: usize = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid window '{}': expected a positive integer", input))?;
    if value == 0 {
        return Err("window must be at least 1".to_string());
    }
    Ok(value)
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid date '{}' (expected DD/MM/YYYY): {}", input, e))
}
