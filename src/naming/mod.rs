//! Policy parameter names
//!
//! Names follow `CATEGORY(_Sub)*_function[N](_Qualifier)?(_cpi)?`, e.g.
//! `_AMT_thd_MarriedS`, `_SS_Earnings_c`, `_II_rt1`, `_SS_Earnings_c_cpi`.

pub mod glossary;

pub use glossary::Glossary;

use std::fmt;
use std::str::FromStr;

/// Suffix token marking an indexing flag rather than a value
pub const INDEXING_SUFFIX: &str = "cpi";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("empty parameter name")]
    Empty,
    #[error("empty token in parameter name: {0}")]
    EmptyToken(String),
    #[error("tax category must start with an uppercase letter: {0}")]
    InvalidCategory(String),
    #[error("no value-function abbreviation in parameter name: {0}")]
    MissingFunction(String),
    #[error("bracket number out of range in parameter name: {0}")]
    InvalidBracket(String),
}

/// A parsed policy parameter name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamName {
    raw: String,
    pub category: String,
    pub subcategory: Vec<String>,
    pub function: String,
    pub bracket: Option<u32>,
    pub qualifier: Option<String>,
    /// True for `_cpi` names, which toggle indexing of the base parameter
    pub indexing_flag: bool,
}

impl ParamName {
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let trimmed = name.strip_prefix('_').unwrap_or(name);
        if trimmed.is_empty() {
            return Err(NameError::Empty);
        }

        let mut tokens: Vec<&str> = trimmed.split('_').collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(NameError::EmptyToken(name.to_string()));
        }

        let indexing_flag = tokens.len() > 2 && tokens.last() == Some(&INDEXING_SUFFIX);
        if indexing_flag {
            tokens.pop();
        }

        let category = tokens[0];
        if !category.starts_with(|c: char| c.is_ascii_uppercase()) {
            return Err(NameError::InvalidCategory(name.to_string()));
        }

        let function_pos = tokens
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, t)| t.starts_with(|c: char| c.is_ascii_lowercase()))
            .map(|(i, _)| i)
            .ok_or_else(|| NameError::MissingFunction(name.to_string()))?;

        let (function, bracket) = split_bracket(tokens[function_pos])
            .ok_or_else(|| NameError::InvalidBracket(name.to_string()))?;
        let qualifier = if function_pos + 1 < tokens.len() {
            Some(tokens[function_pos + 1..].join("_"))
        } else {
            None
        };

        Ok(ParamName {
            raw: name.to_string(),
            category: category.to_string(),
            subcategory: tokens[1..function_pos].iter().map(|s| s.to_string()).collect(),
            function: function.to_string(),
            bracket,
            qualifier,
            indexing_flag,
        })
    }

    /// The name exactly as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Name of the parameter an indexing flag applies to
    pub fn base_name(&self) -> &str {
        if self.indexing_flag {
            flag_base(&self.raw).unwrap_or(&self.raw)
        } else {
            &self.raw
        }
    }
}

/// `_SS_Earnings_c_cpi` -> `Some("_SS_Earnings_c")`; None if `name` is not
/// an indexing flag name
pub fn flag_base(name: &str) -> Option<&str> {
    name.strip_suffix(INDEXING_SUFFIX)
        .and_then(|s| s.strip_suffix('_'))
}

/// `rt1` -> (`rt`, Some(1)); `thd` -> (`thd`, None). None if the bracket
/// number does not fit.
fn split_bracket(token: &str) -> Option<(&str, Option<u32>)> {
    let head = token.trim_end_matches(|c: char| c.is_ascii_digit());
    if head.len() == token.len() || head.is_empty() {
        Some((token, None))
    } else {
        let bracket = token[head.len()..].parse().ok()?;
        Some((head, Some(bracket)))
    }
}

impl FromStr for ParamName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamName::parse(s)
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
