//! Revenue-impact tables
//!
//! Flat, headerless CSV rows of `label, estimator, v1, v2, v3, v4`: a policy
//! scenario, the estimator that produced the figures, and up to four
//! revenue-impact figures. Missing figures are left empty.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::str::FromStr;
use taxpol_derive::CsvColumns;

/// Number of revenue figures per row
pub const FIGURES: usize = 4;

/// Estimator that other estimators are compared against by default
pub const DEFAULT_BASELINE: &str = "Tax-Calculator";

/// Column of a CSV record, generated by `#[derive(CsvColumns)]`
#[derive(Debug, Clone, Copy)]
pub struct CsvColumn {
    pub position: usize,
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum RevenueError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line {line}: expected a label and an estimator, found {found} column(s)")]
    TooFewColumns { line: u64, found: usize },
    #[error("line {line}: at most 6 columns allowed, found {found}")]
    TooManyColumns { line: u64, found: usize },
    #[error("line {line}: empty {column}")]
    EmptyField { line: u64, column: &'static str },
    #[error("line {line}: invalid figure '{value}' in column {column}")]
    InvalidFigure {
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error("duplicate estimate from {estimator} for '{label}'")]
    DuplicateEstimate { label: String, estimator: String },
    #[error("figures from {estimator} for '{label}' are too large to combine")]
    Overflow { label: String, estimator: String },
}

/// One row of a revenue-impact table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, CsvColumns)]
pub struct RevenueRecord {
    /// Policy scenario description
    pub label: String,
    /// Name of the estimator that produced the figures (e.g. Tax-Calculator)
    pub estimator: String,
    /// Revenue impact, first year
    pub v1: Option<Decimal>,
    /// Revenue impact, second year
    pub v2: Option<Decimal>,
    /// Revenue impact, third year
    pub v3: Option<Decimal>,
    /// Revenue impact, fourth year
    pub v4: Option<Decimal>,
}

impl RevenueRecord {
    fn from_csv(record: &csv::StringRecord) -> Result<Self, RevenueError> {
        let line = record.position().map_or(0, |p| p.line());
        if record.len() < 2 {
            return Err(RevenueError::TooFewColumns {
                line,
                found: record.len(),
            });
        }
        if record.len() > FIGURES + 2 {
            return Err(RevenueError::TooManyColumns {
                line,
                found: record.len(),
            });
        }

        let columns = Self::csv_columns();
        let text = |i: usize| -> Result<String, RevenueError> {
            let value = record.get(i).unwrap_or("").trim();
            if value.is_empty() {
                return Err(RevenueError::EmptyField {
                    line,
                    column: columns[i].name,
                });
            }
            Ok(value.to_string())
        };
        let figure = |i: usize| -> Result<Option<Decimal>, RevenueError> {
            parse_figure(record.get(i).unwrap_or("")).map_err(|value| {
                RevenueError::InvalidFigure {
                    line,
                    column: columns[i].name,
                    value,
                }
            })
        };

        Ok(RevenueRecord {
            label: text(0)?,
            estimator: text(1)?,
            v1: figure(2)?,
            v2: figure(3)?,
            v3: figure(4)?,
            v4: figure(5)?,
        })
    }

    pub fn values(&self) -> [Option<Decimal>; FIGURES] {
        [self.v1, self.v2, self.v3, self.v4]
    }
}

/// Empty and "NA" cells are absent figures
fn parse_figure(cell: &str) -> Result<Option<Decimal>, String> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("n/a") {
        return Ok(None);
    }
    Decimal::from_str(cell)
        .or_else(|_| Decimal::from_scientific(cell))
        .map(Some)
        .map_err(|_| cell.to_string())
}

/// Figures from a single estimator for a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub estimator: String,
    pub values: [Option<Decimal>; FIGURES],
}

impl Estimate {
    /// Sum of the figures present, or None if all are missing. Errors if
    /// the sum does not fit in a `Decimal`.
    pub fn total(&self, label: &str) -> Result<Option<Decimal>, RevenueError> {
        checked_sum(&self.values).ok_or_else(|| RevenueError::Overflow {
            label: label.to_string(),
            estimator: self.estimator.clone(),
        })
    }
}

/// Sum of the figures present; outer None on overflow
fn checked_sum(figures: &[Option<Decimal>]) -> Option<Option<Decimal>> {
    figures
        .iter()
        .flatten()
        .try_fold(None, |acc: Option<Decimal>, v| {
            acc.unwrap_or(Decimal::ZERO).checked_add(*v).map(Some)
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub label: String,
    pub estimates: Vec<Estimate>,
}

impl Scenario {
    pub fn estimate(&self, estimator: &str) -> Option<&Estimate> {
        self.estimates.iter().find(|e| e.estimator == estimator)
    }
}

/// Difference between one estimator and the baseline for a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub label: String,
    pub estimator: String,
    /// `estimator - baseline` for each figure present in both
    pub differences: [Option<Decimal>; FIGURES],
    /// Sum of `differences`, None if no figure is present in both
    pub total_difference: Option<Decimal>,
}

/// Revenue estimates grouped by scenario, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RevenueTable {
    scenarios: Vec<Scenario>,
}

impl RevenueTable {
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, RevenueError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let records = rdr
            .records()
            .map(|r| RevenueRecord::from_csv(&r?))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("Read {} revenue estimate rows", records.len());
        Self::from_records(records)
    }

    pub fn from_records<I>(records: I) -> Result<Self, RevenueError>
    where
        I: IntoIterator<Item = RevenueRecord>,
    {
        let mut table = RevenueTable::default();
        for record in records {
            let values = record.values();
            let idx = match table.scenarios.iter().position(|s| s.label == record.label) {
                Some(idx) => idx,
                None => {
                    table.scenarios.push(Scenario {
                        label: record.label.clone(),
                        estimates: Vec::new(),
                    });
                    table.scenarios.len() - 1
                }
            };
            let scenario = &mut table.scenarios[idx];
            if scenario.estimate(&record.estimator).is_some() {
                return Err(RevenueError::DuplicateEstimate {
                    label: record.label,
                    estimator: record.estimator,
                });
            }
            scenario.estimates.push(Estimate {
                estimator: record.estimator,
                values,
            });
        }
        Ok(table)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Distinct estimator names in order of first appearance
    pub fn estimators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for estimate in self.scenarios.iter().flat_map(|s| &s.estimates) {
            if !names.contains(&estimate.estimator.as_str()) {
                names.push(&estimate.estimator);
            }
        }
        names
    }

    pub fn records(&self) -> impl Iterator<Item = RevenueRecord> + '_ {
        self.scenarios.iter().flat_map(|s| {
            s.estimates.iter().map(move |e| {
                let [v1, v2, v3, v4] = e.values;
                RevenueRecord {
                    label: s.label.clone(),
                    estimator: e.estimator.clone(),
                    v1,
                    v2,
                    v3,
                    v4,
                }
            })
        })
    }

    /// Write rows back in the flat headerless layout
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), RevenueError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for record in self.records() {
            wtr.serialize(record)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Compare every other estimator against `baseline`. Scenarios without
    /// a baseline estimate are skipped.
    pub fn compare(&self, baseline: &str) -> Result<Vec<Comparison>, RevenueError> {
        let mut comparisons = Vec::new();
        for scenario in &self.scenarios {
            let Some(base) = scenario.estimate(baseline) else {
                log::warn!("No {} estimate for '{}', skipping", baseline, scenario.label);
                continue;
            };
            for other in scenario.estimates.iter().filter(|e| e.estimator != baseline) {
                let overflow = || RevenueError::Overflow {
                    label: scenario.label.clone(),
                    estimator: other.estimator.clone(),
                };
                let mut differences = [None; FIGURES];
                for (i, diff) in differences.iter_mut().enumerate() {
                    if let (Some(o), Some(b)) = (other.values[i], base.values[i]) {
                        *diff = Some(o.checked_sub(b).ok_or_else(overflow)?);
                    }
                }
                let total_difference = checked_sum(&differences).ok_or_else(overflow)?;
                comparisons.push(Comparison {
                    label: scenario.label.clone(),
                    estimator: other.estimator.clone(),
                    differences,
                    total_difference,
                });
            }
        }
        Ok(comparisons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TABLE: &str = "\
Eliminate the deduction for state and local taxes,Tax-Calculator,71.2,76.5,81.3,86.0
Eliminate the deduction for state and local taxes,Tax Expenditure,68.0,72.1,,
\"Raise the top rate to 45%, above $1m\",Tax-Calculator,20.5,21.0,21.9,22.4
\"Raise the top rate to 45%, above $1m\",Budget Options,19.9,20.8
Eliminate the deduction for state and local taxes,Budget Options,70.0,NA,80.0,90.5
Repeal the AMT,Tax Expenditure,-30.1,-31.0,-32.2,-33.5
";

    fn table() -> RevenueTable {
        RevenueTable::read_csv(TABLE.as_bytes()).unwrap()
    }

    #[test]
    fn rows_grouped_by_scenario() {
        let table = table();
        let labels: Vec<_> = table.scenarios().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Eliminate the deduction for state and local taxes",
                "Raise the top rate to 45%, above $1m",
                "Repeal the AMT",
            ]
        );
        assert_eq!(table.scenarios()[0].estimates.len(), 3);
        assert_eq!(
            table.estimators(),
            vec!["Tax-Calculator", "Tax Expenditure", "Budget Options"]
        );
    }

    #[test]
    fn missing_figures_are_none() {
        let table = table();
        let salt = &table.scenarios()[0];
        assert_eq!(
            salt.estimate("Tax Expenditure").unwrap().values,
            [Some(dec!(68.0)), Some(dec!(72.1)), None, None]
        );
        assert_eq!(
            salt.estimate("Budget Options").unwrap().values,
            [Some(dec!(70.0)), None, Some(dec!(80.0)), Some(dec!(90.5))]
        );
        assert_eq!(
            table.scenarios()[1].estimate("Budget Options").unwrap().values,
            [Some(dec!(19.9)), Some(dec!(20.8)), None, None]
        );
    }

    #[test]
    fn totals() {
        let table = table();
        let salt = &table.scenarios()[0];
        let total = |estimator| salt.estimate(estimator).unwrap().total(&salt.label).unwrap();
        assert_eq!(total("Tax-Calculator"), Some(dec!(315.0)));
        assert_eq!(total("Tax Expenditure"), Some(dec!(140.1)));

        let empty = Estimate {
            estimator: "Nobody".to_string(),
            values: [None; FIGURES],
        };
        assert_eq!(empty.total("empty").unwrap(), None);
    }

    #[test]
    fn compare_against_baseline() {
        let comparisons = table().compare(DEFAULT_BASELINE).unwrap();
        // the AMT scenario has no Tax-Calculator row
        assert_eq!(comparisons.len(), 3);

        let te = &comparisons[0];
        assert_eq!(te.estimator, "Tax Expenditure");
        assert_eq!(
            te.differences,
            [Some(dec!(-3.2)), Some(dec!(-4.4)), None, None]
        );
        assert_eq!(te.total_difference, Some(dec!(-7.6)));

        let bo = &comparisons[1];
        assert_eq!(bo.estimator, "Budget Options");
        assert_eq!(
            bo.differences,
            [Some(dec!(-1.2)), None, Some(dec!(-1.3)), Some(dec!(4.5))]
        );
        assert_eq!(bo.total_difference, Some(dec!(2.0)));

        assert_eq!(comparisons[2].label, "Raise the top rate to 45%, above $1m");
    }

    #[test]
    fn overflowing_figures_are_errors() {
        let table = RevenueTable::read_csv(
            "s,Tax-Calculator,-79228162514264337593543950335\n\
             s,Other,79228162514264337593543950335,79228162514264337593543950335\n"
                .as_bytes(),
        )
        .unwrap();
        let scenario = &table.scenarios()[0];

        let err = scenario.estimate("Other").unwrap().total("s").unwrap_err();
        assert!(matches!(
            err,
            RevenueError::Overflow { ref label, ref estimator } if label == "s" && estimator == "Other"
        ));
        assert_eq!(
            scenario.estimate(DEFAULT_BASELINE).unwrap().total("s").unwrap(),
            Some(Decimal::MIN)
        );

        let err = table.compare(DEFAULT_BASELINE).unwrap_err();
        assert!(matches!(err, RevenueError::Overflow { ref estimator, .. } if estimator == "Other"));
    }

    #[test]
    fn compare_with_unknown_baseline_is_empty() {
        assert!(table().compare("Nobody").unwrap().is_empty());
    }

    #[test]
    fn write_csv_keeps_flat_layout() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(
            "Eliminate the deduction for state and local taxes,Tax-Calculator,71.2,76.5,81.3,86.0\n"
        ));
        assert!(text.contains("Tax Expenditure,68.0,72.1,,\n"));
        assert!(text.contains("\"Raise the top rate to 45%, above $1m\",Budget Options,19.9,20.8,,\n"));

        let reread = RevenueTable::read_csv(text.as_bytes()).unwrap();
        assert_eq!(reread, table());
    }

    #[test]
    fn malformed_rows() {
        let err = RevenueTable::read_csv("Only a label\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RevenueError::TooFewColumns { line: 1, found: 1 }));

        let err = RevenueTable::read_csv("a,b,1,2,3,4,5\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RevenueError::TooManyColumns { line: 1, found: 7 }));

        let err = RevenueTable::read_csv("a,,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RevenueError::EmptyField { column: "estimator", .. }));

        let err = RevenueTable::read_csv("a,b,1\na,c,lots\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            RevenueError::InvalidFigure { line: 2, column: "v1", ref value } if value == "lots"
        ));

        let err = RevenueTable::read_csv("a,b,1\na,b,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, RevenueError::DuplicateEstimate { .. }));
    }

    #[test]
    fn columns_describe_record() {
        let columns = RevenueRecord::csv_columns();
        let names: Vec<_> = columns.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["label", "estimator", "v1", "v2", "v3", "v4"]);
        assert!(columns[0].required);
        assert!(!columns[5].required);
        assert_eq!(columns[3].position, 3);
        assert_eq!(columns[2].description, "Revenue impact, first year");
    }
}
