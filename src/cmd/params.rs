//! Params command - policy parameter values for a year, optionally under a reform

use crate::cmd::{format_figure, read_input};
use crate::naming::{Glossary, ParamName};
use crate::policy::reform::{read_reform_file, reform_digest};
use crate::policy::{Indexing, ParamValue, Parameters, Policy};
use anyhow::Context;
use chrono::Datelike;
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ParamsCommand {
    /// Calendar year (default: this year, limited to the budget window)
    #[arg(short, long)]
    year: Option<i32>,

    /// JSON reform file to apply, `//` comments allowed
    #[arg(short, long)]
    reform: Option<PathBuf>,

    /// Only show these parameters (e.g. _II_em)
    #[arg(short, long)]
    name: Vec<String>,

    /// Show every year of the budget window instead of a single year
    #[arg(long)]
    series: bool,

    /// First year of the budget window
    #[arg(long)]
    start_year: Option<i32>,

    /// Number of years in the budget window
    #[arg(long)]
    num_years: Option<usize>,

    /// JSON file with `inflation_rates` and/or `wage_growth_rates` keyed by year
    #[arg(long)]
    rates: Option<PathBuf>,

    /// JSON parameter file to use instead of current law
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct ParamRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Indexing")]
    indexing: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Debug, Tabled)]
struct SeriesRow {
    #[tabled(rename = "Year")]
    year: i32,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Inflation")]
    inflation_rate: String,
    #[tabled(rename = "Wage Growth")]
    wage_growth_rate: String,
}

/// Rates file layout, decimal rates keyed by calendar year
#[derive(Debug, Default, Deserialize)]
struct RatesFile {
    #[serde(default)]
    inflation_rates: Option<BTreeMap<i32, Decimal>>,
    #[serde(default)]
    wage_growth_rates: Option<BTreeMap<i32, Decimal>>,
}

/// `--series --json` layout
#[derive(Debug, Serialize)]
struct SeriesOutput<'a> {
    start_year: i32,
    end_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reform_digest: Option<String>,
    parameters: Vec<ParamSeries<'a>>,
}

#[derive(Debug, Serialize)]
struct ParamSeries<'a> {
    name: &'a str,
    indexing: Indexing,
    series: Vec<YearValue<'a>>,
}

#[derive(Debug, Serialize)]
struct YearValue<'a> {
    year: i32,
    value: &'a ParamValue,
    inflation_rate: Decimal,
    wage_growth_rate: Decimal,
}

#[derive(Debug, Serialize)]
struct ParamsOutput {
    year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reform_digest: Option<String>,
    parameters: Vec<ParamRow>,
}

impl ParamsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let mut policy = self.build_policy()?;

        let digest = match &self.reform {
            Some(path) => {
                let reform = read_reform_file(path)?;
                policy.implement_reform(&reform)?;
                log::info!("Applied reform for {} year(s)", reform.len());
                Some(reform_digest(&reform)?)
            }
            None => None,
        };

        let year = self.year.unwrap_or_else(|| default_year(&policy));
        policy.set_year(year)?;
        log::debug!(
            "Policy window {}..={}, showing {}",
            policy.start_year(),
            policy.end_year(),
            policy.current_year()
        );

        let names: Vec<String> = if self.name.is_empty() {
            policy.parameter_names().map(str::to_string).collect()
        } else {
            self.name.clone()
        };

        if self.series {
            return self.print_series(&policy, &names, digest);
        }

        let glossary = Glossary::default();
        let rows = names
            .iter()
            .map(|name| -> anyhow::Result<ParamRow> {
                let value = policy.value(name)?;
                let spec = policy.spec(name)?;
                let description = match ParamName::parse(name) {
                    Ok(parsed) => glossary.describe(&parsed),
                    Err(_) => spec.long_name.clone(),
                };
                Ok(ParamRow {
                    name: name.clone(),
                    value: display_value(value, &spec.col_label),
                    indexing: policy.indexing(name)?.to_string(),
                    description,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if self.json {
            let output = ParamsOutput {
                year,
                reform_digest: digest,
                parameters: rows,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!();
            match &digest {
                Some(d) => println!("POLICY PARAMETERS ({}) - reform {}", year, &d[..12]),
                None => println!("POLICY PARAMETERS ({}) - current law", year),
            }
            println!();
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }
        Ok(())
    }
}

impl ParamsCommand {
    fn build_policy(&self) -> anyhow::Result<Policy> {
        let mut builder = Policy::builder();
        if let Some(path) = &self.parameters {
            let parameters: Parameters = serde_json::from_slice(&read_input(path)?)
                .with_context(|| format!("invalid parameter file {}", path.display()))?;
            log::info!("Read {} parameters from {}", parameters.len(), path.display());
            builder = builder.parameters(parameters);
        }
        if let Some(start_year) = self.start_year {
            builder = builder.start_year(start_year);
        }
        if let Some(num_years) = self.num_years {
            builder = builder.num_years(num_years);
        }
        if let Some(path) = &self.rates {
            let rates: RatesFile = serde_json::from_slice(&read_input(path)?)
                .with_context(|| format!("invalid rates file {}", path.display()))?;
            if let Some(inflation) = rates.inflation_rates {
                builder = builder.inflation_rates(inflation);
            }
            if let Some(wage_growth) = rates.wage_growth_rates {
                builder = builder.wage_growth_rates(wage_growth);
            }
        }
        Ok(builder.build()?)
    }

    fn print_series(
        &self,
        policy: &Policy,
        names: &[String],
        digest: Option<String>,
    ) -> anyhow::Result<()> {
        let mut parameters = Vec::with_capacity(names.len());
        for name in names {
            let mut series = Vec::with_capacity(policy.num_years());
            let rates = policy.inflation_rates().iter().zip(policy.wage_growth_rates());
            for (year, (inflation, wage)) in (policy.start_year()..=policy.end_year()).zip(rates) {
                series.push(YearValue {
                    year,
                    value: policy.value_in(name, year)?,
                    inflation_rate: *inflation,
                    wage_growth_rate: *wage,
                });
            }
            parameters.push(ParamSeries {
                name,
                indexing: policy.indexing(name)?,
                series,
            });
        }

        if self.json {
            let output = SeriesOutput {
                start_year: policy.start_year(),
                end_year: policy.end_year(),
                reform_digest: digest,
                parameters,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        for param in parameters {
            let spec = policy.spec(param.name)?;
            let rows: Vec<SeriesRow> = param
                .series
                .iter()
                .map(|y| SeriesRow {
                    year: y.year,
                    value: display_value(y.value, &spec.col_label),
                    inflation_rate: y.inflation_rate.to_string(),
                    wage_growth_rate: y.wage_growth_rate.to_string(),
                })
                .collect();
            println!();
            println!("{} ({} indexing)", param.name, param.indexing);
            if !spec.long_name.is_empty() {
                println!("{}", spec.long_name);
            }
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }
        Ok(())
    }
}

/// This calendar year, clamped into the policy's budget window
fn default_year(policy: &Policy) -> i32 {
    chrono::Local::now()
        .year()
        .clamp(policy.start_year(), policy.end_year())
}

fn display_value(value: &ParamValue, labels: &[String]) -> String {
    match value {
        ParamValue::Scalar(v) => format_figure(*v),
        ParamValue::Vector(vs) if labels.len() == vs.len() => vs
            .iter()
            .zip(labels)
            .map(|(v, label)| format!("{}: {}", label, format_figure(*v)))
            .collect::<Vec<_>>()
            .join("\n"),
        ParamValue::Vector(vs) => vs
            .iter()
            .map(|v| format_figure(*v))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
