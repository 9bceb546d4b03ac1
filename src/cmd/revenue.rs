//! Revenue command - revenue-impact estimates and their differences from a baseline estimator

use crate::cmd::{format_figure, read_input};
use crate::revenue::{Comparison, RevenueTable, Scenario, DEFAULT_BASELINE, FIGURES};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct RevenueCommand {
    /// CSV file of `label, estimator, v1..v4` rows. Reads from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Estimator the others are compared against
    #[arg(short, long, default_value = DEFAULT_BASELINE)]
    baseline: String,

    /// Output as JSON instead of formatted tables
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output the differences from the baseline as CSV
    #[arg(long)]
    csv: bool,

    /// Output the validated estimate rows in the flat input layout
    #[arg(long, conflicts_with_all = ["json", "csv"])]
    rows: bool,
}

#[derive(Tabled)]
struct EstimateRow {
    #[tabled(rename = "Scenario")]
    label: String,
    #[tabled(rename = "Estimator")]
    estimator: String,
    #[tabled(rename = "Year 1")]
    v1: String,
    #[tabled(rename = "Year 2")]
    v2: String,
    #[tabled(rename = "Year 3")]
    v3: String,
    #[tabled(rename = "Year 4")]
    v4: String,
    #[tabled(rename = "Total")]
    total: String,
}

/// Difference row for CSV output
#[derive(Serialize)]
struct DifferenceRecord {
    label: String,
    estimator: String,
    baseline: String,
    d1: Option<Decimal>,
    d2: Option<Decimal>,
    d3: Option<Decimal>,
    d4: Option<Decimal>,
    total: Option<Decimal>,
}

#[derive(Serialize)]
struct RevenueOutput<'a> {
    baseline: &'a str,
    estimators: Vec<&'a str>,
    scenarios: &'a [Scenario],
    comparisons: Vec<Comparison>,
}

impl RevenueCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let input = read_input(&self.file)?;
        let table = RevenueTable::read_csv(input.as_slice())?;
        let comparisons = table.compare(&self.baseline)?;

        if self.json {
            let output = RevenueOutput {
                baseline: &self.baseline,
                estimators: table.estimators(),
                scenarios: table.scenarios(),
                comparisons,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if self.csv {
            self.write_csv(&comparisons)?;
        } else if self.rows {
            table.write_csv(io::stdout())?;
        } else {
            self.print_tables(&table, &comparisons)?;
        }
        Ok(())
    }

    fn print_tables(&self, table: &RevenueTable, comparisons: &[Comparison]) -> anyhow::Result<()> {
        if table.is_empty() {
            println!("No revenue estimates found");
            return Ok(());
        }

        let rows = table
            .scenarios()
            .iter()
            .flat_map(|s| {
                s.estimates.iter().map(|e| -> anyhow::Result<EstimateRow> {
                    let total = e.total(&s.label)?;
                    Ok(estimate_row(&s.label, &e.estimator, &e.values, total))
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        println!();
        println!("REVENUE ESTIMATES");
        println!();
        println!("{}", styled(Table::new(rows)));

        println!();
        println!("DIFFERENCE FROM {}", self.baseline.to_uppercase());
        println!();
        if comparisons.is_empty() {
            println!("No scenarios with both {} and another estimator", self.baseline);
            return Ok(());
        }
        let rows: Vec<EstimateRow> = comparisons
            .iter()
            .map(|c| estimate_row(&c.label, &c.estimator, &c.differences, c.total_difference))
            .collect();
        println!("{}", styled(Table::new(rows)));
        Ok(())
    }

    fn write_csv(&self, comparisons: &[Comparison]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for c in comparisons {
            let [d1, d2, d3, d4] = c.differences;
            wtr.serialize(DifferenceRecord {
                label: c.label.clone(),
                estimator: c.estimator.clone(),
                baseline: self.baseline.clone(),
                d1,
                d2,
                d3,
                d4,
                total: c.total_difference,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn estimate_row(
    label: &str,
    estimator: &str,
    values: &[Option<Decimal>; FIGURES],
    total: Option<Decimal>,
) -> EstimateRow {
    let cell = |v: Option<Decimal>| v.map(format_figure).unwrap_or_else(|| "-".to_string());
    EstimateRow {
        label: label.to_string(),
        estimator: estimator.to_string(),
        v1: cell(values[0]),
        v2: cell(values[1]),
        v3: cell(values[2]),
        v4: cell(values[3]),
        total: cell(total),
    }
}

fn styled(mut table: Table) -> String {
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string()
}
