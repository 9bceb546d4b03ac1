use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter value for a single year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(#[schemars(with = "f64")] Decimal),
    /// One entry per filing status, bracket or number of children
    Vector(#[schemars(with = "Vec<f64>")] Vec<Decimal>),
}

/// Shape of a value, used to check reform values against current law
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Vector(usize),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "scalar"),
            Shape::Vector(len) => write!(f, "vector of {}", len),
        }
    }
}

impl ParamValue {
    pub fn shape(&self) -> Shape {
        match self {
            ParamValue::Scalar(_) => Shape::Scalar,
            ParamValue::Vector(v) => Shape::Vector(v.len()),
        }
    }

    /// Value for the following year when indexed at `rate`, rounded to cents
    pub fn grow(&self, rate: Decimal) -> ParamValue {
        let factor = Decimal::ONE + rate;
        match self {
            ParamValue::Scalar(v) => ParamValue::Scalar((v * factor).round_dp(2)),
            ParamValue::Vector(vs) => {
                ParamValue::Vector(vs.iter().map(|v| (v * factor).round_dp(2)).collect())
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Scalar(v) => write!(f, "{}", v.normalize()),
            ParamValue::Vector(vs) => {
                let items: Vec<String> = vs.iter().map(|v| v.normalize().to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// Indexing applied when extrapolating a parameter into later years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indexing {
    None,
    Price,
    Wage,
}

impl fmt::Display for Indexing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indexing::None => write!(f, "none"),
            Indexing::Price => write!(f, "price"),
            Indexing::Wage => write!(f, "wage"),
        }
    }
}

/// Entry of the current-law parameter file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub description: String,
    /// Calendar year of the first entry in `value`
    pub start_year: i32,
    #[serde(default)]
    pub col_label: Vec<String>,
    /// Grow by price inflation (or wage growth if `wage_indexed`) after the last known value
    #[serde(default)]
    pub cpi_inflated: bool,
    #[serde(default)]
    pub wage_indexed: bool,
    /// Known values, one per year from `start_year`
    pub value: Vec<ParamValue>,
}

impl ParameterSpec {
    pub fn indexing(&self, cpi_inflated: bool) -> Indexing {
        match (cpi_inflated, self.wage_indexed) {
            (false, _) => Indexing::None,
            (true, false) => Indexing::Price,
            (true, true) => Indexing::Wage,
        }
    }
}
