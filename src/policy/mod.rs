//! Multi-year federal tax policy parameters
//!
//! Every parameter holds one value per year of the budget window. Values
//! past the last known year are extrapolated: indexed parameters grow by
//! the previous year's price inflation (or wage growth) rate and are
//! rounded to cents, all other parameters repeat their last value.

pub mod reform;
pub mod value;

pub use reform::{Reform, ReformValue, YearMods};
pub use value::{Indexing, ParamValue, ParameterSpec, Shape};

use crate::naming;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const CURRENT_LAW_JSON: &str = include_str!("../../data/current_law_policy.json");

/// Current-law parameter specs keyed by parameter name
pub type Parameters = BTreeMap<String, ParameterSpec>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    Inflation,
    WageGrowth,
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateKind::Inflation => write!(f, "inflation"),
            RateKind::WageGrowth => write!(f, "wage growth"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("invalid current-law parameters: {0}")]
    Defaults(String),
    #[error("num_years must be at least one, got {0}")]
    NumYears(i64),
    #[error("{num_years} years from {start_year} run past the last representable year")]
    WindowOverflow { start_year: i32, num_years: i64 },
    #[error("start_year={start_year} < JSON_START_YEAR={first}")]
    StartYearBeforeDefaults { start_year: i32, first: i32 },
    #[error("{kind} rates cover {actual} years, expected {expected}")]
    RateCount {
        kind: RateKind,
        expected: usize,
        actual: usize,
    },
    #[error("first {kind} rate year {first} != start_year {start_year}")]
    RateStartYear {
        kind: RateKind,
        first: i32,
        start_year: i32,
    },
    #[error("no {kind} rate for {year}")]
    MissingRate { kind: RateKind, year: i32 },
    #[error("unknown policy parameter: {0}")]
    UnknownParameter(String),
    #[error("policy parameter {0} has no values")]
    EmptyParameter(String),
    #[error("policy parameter {name} starts in {param_start}, after start_year {start_year}")]
    ParameterStartsLate {
        name: String,
        param_start: i32,
        start_year: i32,
    },
    #[error("year {year} outside {start_year}..={end_year}")]
    YearOutOfRange {
        year: i32,
        start_year: i32,
        end_year: i32,
    },
    #[error("reform provision in year={year} < start_year={start_year}")]
    ReformBeforeStartYear { year: i32, start_year: i32 },
    #[error("reform provision in year={year} < current_year={current_year}")]
    ReformBeforeCurrentYear { year: i32, current_year: i32 },
    #[error("reform provision in year={year} > end_year={end_year}")]
    ReformAfterEndYear { year: i32, end_year: i32 },
    #[error("{name} in {year}: expected {expected} value, found {found}")]
    ShapeMismatch {
        name: String,
        year: i32,
        expected: Shape,
        found: Shape,
    },
    #[error("{name} in {year}: no values given")]
    EmptyReformValues { name: String, year: i32 },
    #[error("{name} in {year}: {count} values run past end_year={end_year}")]
    ValuesBeyondEndYear {
        name: String,
        year: i32,
        count: usize,
        end_year: i32,
    },
    #[error("{0} is an indexing flag and takes true or false")]
    ExpectedFlag(String),
    #[error("{0} takes a list of values, not an indexing flag")]
    ExpectedValues(String),
}

#[derive(Debug, Clone)]
struct Parameter {
    spec: ParameterSpec,
    cpi_inflated: bool,
    /// One value per policy year, starting at `Policy::start_year`
    values: Vec<ParamValue>,
}

impl Parameter {
    fn indexing(&self) -> Indexing {
        self.spec.indexing(self.cpi_inflated)
    }
}

/// Federal tax policy parameters for a window of calendar years
#[derive(Debug, Clone)]
pub struct Policy {
    params: BTreeMap<String, Parameter>,
    start_year: i32,
    current_year: i32,
    inflation_rates: Vec<Decimal>,
    wage_growth_rates: Vec<Decimal>,
}

impl Policy {
    /// First year of the current-law parameter file
    pub const JSON_START_YEAR: i32 = 2013;
    /// Increases by one every calendar year
    pub const LAST_BUDGET_YEAR: i32 = 2026;

    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Current-law policy over the default budget window
    pub fn current_law() -> Result<Self, PolicyError> {
        Self::builder().build()
    }

    /// Current-law parameter specs embedded in the binary
    pub fn current_law_parameters() -> Result<Parameters, PolicyError> {
        serde_json::from_str(CURRENT_LAW_JSON).map_err(|e| PolicyError::Defaults(e.to_string()))
    }

    /// Default annual price inflation rates (decimal, not percentage)
    pub fn default_inflation_rates() -> BTreeMap<i32, Decimal> {
        (2013..)
            .zip([
                dec!(0.0148),
                dec!(0.0159),
                dec!(0.0013),
                dec!(0.0135),
                dec!(0.0233),
                dec!(0.0236),
                dec!(0.0238),
                dec!(0.0245),
                dec!(0.0242),
                dec!(0.0240),
                dec!(0.0239),
                dec!(0.0240),
                dec!(0.0245),
                dec!(0.0242),
            ])
            .collect()
    }

    /// Default annual wage growth rates (decimal, not percentage)
    pub fn default_wage_growth_rates() -> BTreeMap<i32, Decimal> {
        (2013..)
            .zip([
                dec!(0.0276),
                dec!(0.0496),
                dec!(0.0477),
                dec!(0.0479),
                dec!(0.0441),
                dec!(0.0420),
                dec!(0.0383),
                dec!(0.0381),
                dec!(0.0403),
                dec!(0.0413),
                dec!(0.0417),
                dec!(0.0417),
                dec!(0.0415),
                dec!(0.0416),
            ])
            .collect()
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + (self.num_years() as i32 - 1)
    }

    pub fn num_years(&self) -> usize {
        self.inflation_rates.len()
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Price inflation rates, one per year from `start_year`
    pub fn inflation_rates(&self) -> &[Decimal] {
        &self.inflation_rates
    }

    /// Wage growth rates, one per year from `start_year`
    pub fn wage_growth_rates(&self) -> &[Decimal] {
        &self.wage_growth_rates
    }

    pub fn set_year(&mut self, year: i32) -> Result<(), PolicyError> {
        self.year_index(year)?;
        self.current_year = year;
        Ok(())
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn spec(&self, name: &str) -> Result<&ParameterSpec, PolicyError> {
        self.param(name).map(|p| &p.spec)
    }

    /// Indexing currently in effect for a parameter, including reform changes
    pub fn indexing(&self, name: &str) -> Result<Indexing, PolicyError> {
        self.param(name).map(Parameter::indexing)
    }

    /// Value in effect for the current year
    pub fn value(&self, name: &str) -> Result<&ParamValue, PolicyError> {
        self.value_in(name, self.current_year)
    }

    pub fn value_in(&self, name: &str, year: i32) -> Result<&ParamValue, PolicyError> {
        let param = self.param(name)?;
        let idx = self.year_index(year)?;
        Ok(&param.values[idx])
    }

    /// All values of a parameter, one per year from `start_year`
    pub fn series(&self, name: &str) -> Result<&[ParamValue], PolicyError> {
        self.param(name).map(|p| p.values.as_slice())
    }

    /// Apply a (possibly multi-year) reform. The reform is applied in year
    /// order and either fully succeeds or leaves the policy unchanged;
    /// `current_year` is never changed.
    pub fn implement_reform(&mut self, reform: &Reform) -> Result<(), PolicyError> {
        let (first, last) = match (reform.keys().next(), reform.keys().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Ok(()),
        };
        if first < self.start_year {
            return Err(PolicyError::ReformBeforeStartYear {
                year: first,
                start_year: self.start_year,
            });
        }
        if first < self.current_year {
            return Err(PolicyError::ReformBeforeCurrentYear {
                year: first,
                current_year: self.current_year,
            });
        }
        if last > self.end_year() {
            return Err(PolicyError::ReformAfterEndYear {
                year: last,
                end_year: self.end_year(),
            });
        }

        let mut staged = self.params.clone();
        for (&year, mods) in reform {
            log::debug!("Applying {} reform provision(s) for {}", mods.len(), year);
            self.update(&mut staged, year, mods)?;
        }
        self.params = staged;
        Ok(())
    }

    fn param(&self, name: &str) -> Result<&Parameter, PolicyError> {
        self.params
            .get(name)
            .ok_or_else(|| PolicyError::UnknownParameter(name.to_string()))
    }

    fn year_index(&self, year: i32) -> Result<usize, PolicyError> {
        if year < self.start_year || year > self.end_year() {
            return Err(PolicyError::YearOutOfRange {
                year,
                start_year: self.start_year,
                end_year: self.end_year(),
            });
        }
        Ok((year - self.start_year) as usize)
    }

    fn rates(&self, indexing: Indexing) -> Option<&[Decimal]> {
        match indexing {
            Indexing::None => None,
            Indexing::Price => Some(&self.inflation_rates),
            Indexing::Wage => Some(&self.wage_growth_rates),
        }
    }

    /// Recompute `values[from..]` from `values[from - 1]`
    fn extrapolate(&self, values: &mut [ParamValue], from: usize, indexing: Indexing) {
        let rates = self.rates(indexing);
        for idx in from.max(1)..values.len() {
            values[idx] = match rates {
                Some(rates) => values[idx - 1].grow(rates[idx - 1]),
                None => values[idx - 1].clone(),
            };
        }
    }

    /// Apply one year's mods to `params`. All mods are checked before any
    /// are applied.
    fn update(
        &self,
        params: &mut BTreeMap<String, Parameter>,
        year: i32,
        mods: &YearMods,
    ) -> Result<(), PolicyError> {
        let idx = self.year_index(year)?;

        let mut flags: BTreeMap<&str, bool> = BTreeMap::new();
        let mut new_values: BTreeMap<&str, &[ParamValue]> = BTreeMap::new();
        for (name, value) in mods {
            match (naming::flag_base(name), value) {
                (Some(base), ReformValue::Flag(flag)) => {
                    if !params.contains_key(base) {
                        return Err(PolicyError::UnknownParameter(base.to_string()));
                    }
                    flags.insert(base, *flag);
                }
                (Some(_), ReformValue::Values(_)) => {
                    return Err(PolicyError::ExpectedFlag(name.clone()))
                }
                (None, ReformValue::Flag(_)) => {
                    return Err(PolicyError::ExpectedValues(name.clone()))
                }
                (None, ReformValue::Values(values)) => {
                    let param = params
                        .get(name.as_str())
                        .ok_or_else(|| PolicyError::UnknownParameter(name.clone()))?;
                    if values.is_empty() {
                        return Err(PolicyError::EmptyReformValues {
                            name: name.clone(),
                            year,
                        });
                    }
                    if idx + values.len() > self.num_years() {
                        return Err(PolicyError::ValuesBeyondEndYear {
                            name: name.clone(),
                            year,
                            count: values.len(),
                            end_year: self.end_year(),
                        });
                    }
                    let expected = param.values[idx].shape();
                    if let Some(found) = values.iter().map(ParamValue::shape).find(|s| *s != expected)
                    {
                        return Err(PolicyError::ShapeMismatch {
                            name: name.clone(),
                            year,
                            expected,
                            found,
                        });
                    }
                    new_values.insert(name.as_str(), values.as_slice());
                }
            }
        }

        let touched: BTreeSet<&str> = flags.keys().chain(new_values.keys()).copied().collect();
        for name in touched {
            let Some(param) = params.get_mut(name) else {
                continue;
            };
            if let Some(&flag) = flags.get(name) {
                param.cpi_inflated = flag;
            }
            let from = match new_values.get(name) {
                Some(values) => {
                    param.values[idx..idx + values.len()].clone_from_slice(values);
                    idx + values.len()
                }
                None => idx + 1,
            };
            let indexing = param.indexing();
            self.extrapolate(&mut param.values, from, indexing);
            log::debug!(
                "{} from {}: {} ({} indexing)",
                name,
                year,
                param.values[idx],
                indexing
            );
        }
        Ok(())
    }
}

/// Builds a [`Policy`], validating years and rates
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    parameters: Option<Parameters>,
    start_year: Option<i32>,
    num_years: Option<usize>,
    inflation_rates: Option<BTreeMap<i32, Decimal>>,
    wage_growth_rates: Option<BTreeMap<i32, Decimal>>,
}

impl PolicyBuilder {
    /// Use these parameters instead of current law
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn start_year(mut self, year: i32) -> Self {
        self.start_year = Some(year);
        self
    }

    /// Defaults to the years from `start_year` through `LAST_BUDGET_YEAR`
    pub fn num_years(mut self, num_years: usize) -> Self {
        self.num_years = Some(num_years);
        self
    }

    pub fn inflation_rates(mut self, rates: BTreeMap<i32, Decimal>) -> Self {
        self.inflation_rates = Some(rates);
        self
    }

    pub fn wage_growth_rates(mut self, rates: BTreeMap<i32, Decimal>) -> Self {
        self.wage_growth_rates = Some(rates);
        self
    }

    pub fn build(self) -> Result<Policy, PolicyError> {
        let start_year = self.start_year.unwrap_or(Policy::JSON_START_YEAR);
        let num_years = match self.num_years {
            Some(n) => i64::try_from(n).unwrap_or(i64::MAX),
            None => i64::from(Policy::LAST_BUDGET_YEAR) - i64::from(start_year) + 1,
        };
        if num_years < 1 {
            return Err(PolicyError::NumYears(num_years));
        }
        // end_year must be representable
        if i32::try_from(num_years)
            .ok()
            .and_then(|n| start_year.checked_add(n - 1))
            .is_none()
        {
            return Err(PolicyError::WindowOverflow {
                start_year,
                num_years,
            });
        }
        let num_years = num_years as usize;

        let specs = match self.parameters {
            Some(parameters) => parameters,
            None => {
                if start_year < Policy::JSON_START_YEAR {
                    return Err(PolicyError::StartYearBeforeDefaults {
                        start_year,
                        first: Policy::JSON_START_YEAR,
                    });
                }
                Policy::current_law_parameters()?
            }
        };

        let inflation_rates = rate_series(
            RateKind::Inflation,
            self.inflation_rates,
            Policy::default_inflation_rates(),
            start_year,
            num_years,
        )?;
        let wage_growth_rates = rate_series(
            RateKind::WageGrowth,
            self.wage_growth_rates,
            Policy::default_wage_growth_rates(),
            start_year,
            num_years,
        )?;

        let mut policy = Policy {
            params: BTreeMap::new(),
            start_year,
            current_year: start_year,
            inflation_rates,
            wage_growth_rates,
        };
        for (name, spec) in specs {
            let values = policy.expand(&name, &spec)?;
            log::debug!("Expanded {} over {} years", name, values.len());
            let param = Parameter {
                cpi_inflated: spec.cpi_inflated,
                spec,
                values,
            };
            policy.params.insert(name, param);
        }
        Ok(policy)
    }
}

impl Policy {
    /// Values of `spec` for every policy year. Known values earlier than
    /// `start_year` are skipped; gaps between the last known value and
    /// `start_year` are filled using the default rates.
    fn expand(&self, name: &str, spec: &ParameterSpec) -> Result<Vec<ParamValue>, PolicyError> {
        let first = spec
            .value
            .first()
            .ok_or_else(|| PolicyError::EmptyParameter(name.to_string()))?;
        if spec.start_year > self.start_year {
            return Err(PolicyError::ParameterStartsLate {
                name: name.to_string(),
                param_start: spec.start_year,
                start_year: self.start_year,
            });
        }

        let skip = (self.start_year - spec.start_year) as usize;
        let indexing = spec.indexing(spec.cpi_inflated);

        let mut values: Vec<ParamValue> = spec
            .value
            .iter()
            .skip(skip)
            .take(self.num_years())
            .cloned()
            .collect();
        if values.is_empty() {
            // last known value predates start_year: carry it forward
            let mut current = spec.value.last().unwrap_or(first).clone();
            if indexing != Indexing::None {
                let (kind, defaults) = match indexing {
                    Indexing::Wage => (RateKind::WageGrowth, Policy::default_wage_growth_rates()),
                    _ => (RateKind::Inflation, Policy::default_inflation_rates()),
                };
                let last_known = spec.start_year + spec.value.len() as i32 - 1;
                for year in last_known..self.start_year {
                    let rate = defaults
                        .get(&year)
                        .ok_or(PolicyError::MissingRate { kind, year })?;
                    current = current.grow(*rate);
                }
            }
            values.push(current);
        }

        let known = values.len();
        let filler = values[known - 1].clone();
        values.resize(self.num_years(), filler);
        self.extrapolate(&mut values, known, indexing);
        Ok(values)
    }
}

/// Rates for `start_year..start_year + num_years` from the given map, or
/// from the defaults if none was given
fn rate_series(
    kind: RateKind,
    given: Option<BTreeMap<i32, Decimal>>,
    defaults: BTreeMap<i32, Decimal>,
    start_year: i32,
    num_years: usize,
) -> Result<Vec<Decimal>, PolicyError> {
    let rates = match given {
        Some(rates) => {
            if rates.len() != num_years {
                return Err(PolicyError::RateCount {
                    kind,
                    expected: num_years,
                    actual: rates.len(),
                });
            }
            if let Some(&first) = rates.keys().next() {
                if first != start_year {
                    return Err(PolicyError::RateStartYear {
                        kind,
                        first,
                        start_year,
                    });
                }
            }
            rates
        }
        None => defaults,
    };
    (0..num_years)
        .map(|offset| start_year + offset as i32)
        .map(|year| {
            rates
                .get(&year)
                .copied()
                .ok_or(PolicyError::MissingRate { kind, year })
        })
        .collect()
}
