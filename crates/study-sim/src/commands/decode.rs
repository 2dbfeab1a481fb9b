use std::collections::BTreeSet;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use csv::{ReaderBuilder, WriterBuilder};
use log::{info, warn};
use study_flow::{cell_to_string, flatten_encoded, FlatRow, FIXED_COLUMNS};

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Payloads, one per line, or a CSV export when `--column` is given.
    #[arg(long)]
    pub input: PathBuf,
    /// Column of the CSV export holding the payloads.
    #[arg(long)]
    pub column: Option<String>,
    /// Destination CSV.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &DecodeArgs) -> Result<(), Box<dyn Error>> {
    let payloads = match &args.column {
        Some(column) => read_column(args, column)?,
        None => fs::read_to_string(&args.input)?
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    };

    let mut rows: Vec<FlatRow> = Vec::with_capacity(payloads.len());
    for (index, payload) in payloads.iter().enumerate() {
        match flatten_encoded(payload) {
            Ok(row) => rows.push(row),
            Err(err) => warn!("skipping payload {}: {err}", index + 1),
        }
    }

    let header = header_for(&rows);
    let mut writer = WriterBuilder::new().from_path(&args.out)?;
    writer.write_record(&header)?;
    for row in &rows {
        writer.write_record(
            header
                .iter()
                .map(|column| row.get(column).map(cell_to_string).unwrap_or_default()),
        )?;
    }
    writer.flush()?;
    info!(
        "decoded {} of {} payloads into {}",
        rows.len(),
        payloads.len(),
        args.out.display()
    );
    Ok(())
}

fn read_column(args: &DecodeArgs, column: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(&args.input)?;
    let position = reader
        .headers()?
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| format!("column {column:?} not found in {}", args.input.display()))?;
    let mut payloads = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(position).map(str::trim).filter(|v| !v.is_empty()) {
            payloads.push(value.to_string());
        }
    }
    Ok(payloads)
}

/// Fixed columns, then the sorted union of every row's rating columns.
fn header_for(rows: &[FlatRow]) -> Vec<String> {
    let ratings: BTreeSet<&String> = rows
        .iter()
        .flat_map(|row| row.keys().skip(FIXED_COLUMNS.len()))
        .collect();
    FIXED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(ratings.into_iter().cloned())
        .collect()
}
