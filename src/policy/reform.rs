//! Reform files
//!
//! A reform file is JSON with parameter names as primary keys and calendar
//! years (as strings) as secondary keys. `//` comments are allowed:
//!
//! ```text
//! {
//!     // raise the exemption
//!     "_II_em": {"2016": [7000], "2019": [9000]},
//!     "_SS_Earnings_c_cpi": {"2017": false}
//! }
//! ```

use super::value::ParamValue;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Changes for one reform year: parameter name to new values or indexing flag
pub type YearMods = BTreeMap<String, ReformValue>;

/// Year-keyed reform, the form applied by `Policy::implement_reform`
pub type Reform = BTreeMap<i32, YearMods>;

/// Reform file layout: parameter name, then year string, then value
pub type ReformFile = BTreeMap<String, BTreeMap<String, ReformValue>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ReformValue {
    /// Indexing flag, used with `_cpi` names
    Flag(bool),
    /// Values for the reform year and each following year
    Values(Vec<ParamValue>),
}

#[derive(Debug, thiserror::Error)]
pub enum ReformError {
    #[error("reform file {0} could not be found")]
    NotFound(PathBuf),
    #[error("failed to read reform file: {0}")]
    Io(#[from] std::io::Error),
    #[error("reform contains invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("failed to serialize reform: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("reform is not a JSON object")]
    NotAnObject,
    #[error("reform entry for {0} is not an object keyed by year")]
    ParamNotObject(String),
    #[error("year key '{key}' for {param} is not an integer")]
    InvalidYear { param: String, key: String },
    #[error("invalid value for {param} in {year}: {reason}")]
    InvalidValue {
        param: String,
        year: i32,
        reason: String,
    },
}

/// Remove `//` comments outside of JSON strings. Newlines are kept so
/// parser error positions still match the file.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}

pub fn read_reform_file(path: &Path) -> Result<Reform, ReformError> {
    if !path.is_file() {
        return Err(ReformError::NotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    log::info!("Read reform file {}", path.display());
    read_reform_str(&text)
}

pub fn read_reform_str(text: &str) -> Result<Reform, ReformError> {
    let json = strip_comments(text);
    let raw: serde_json::Value = serde_json::from_str(&json).map_err(|e| {
        log::debug!("Reform text after removing comments:\n{}", json.trim());
        ReformError::InvalidJson(e)
    })?;
    let params = match raw {
        serde_json::Value::Object(map) => map,
        _ => return Err(ReformError::NotAnObject),
    };

    let mut by_param: BTreeMap<String, BTreeMap<i32, ReformValue>> = BTreeMap::new();
    for (param, years) in params {
        let years = match years {
            serde_json::Value::Object(map) => map,
            _ => return Err(ReformError::ParamNotObject(param)),
        };
        let mut values = BTreeMap::new();
        for (key, value) in years {
            let year: i32 = key.trim().parse().map_err(|_| ReformError::InvalidYear {
                param: param.clone(),
                key: key.clone(),
            })?;
            let value: ReformValue =
                serde_json::from_value(value).map_err(|e| ReformError::InvalidValue {
                    param: param.clone(),
                    year,
                    reason: e.to_string(),
                })?;
            values.insert(year, value);
        }
        by_param.insert(param, values);
    }

    Ok(transpose(by_param))
}

/// Turn `param -> year -> value` into `year -> param -> value`
fn transpose(by_param: BTreeMap<String, BTreeMap<i32, ReformValue>>) -> Reform {
    let mut reform = Reform::new();
    for (param, years) in by_param {
        for (year, value) in years {
            reform.entry(year).or_default().insert(param.clone(), value);
        }
    }
    reform
}

/// SHA-256 of the canonical JSON form of a reform, hex encoded
pub fn reform_digest(reform: &Reform) -> Result<String, ReformError> {
    // BTreeMap keys serialize in order, so equal reforms hash equally
    let json = serde_json::to_vec(reform).map_err(ReformError::Serialize)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const COMMENTED: &str = r#"
// multi-year reform
{
    "_AMT_thd_MarriedS": {"2015": [60000], // lowered
                          "2017": [80000]},
    "_EITC_c": {"2016": [[900, 5000, 8000, 9000]]},
    "_SS_Earnings_c_cpi": {"2017": false},
    "_note_url": {"2016": [1]} // "http://example.com" in a comment
}
"#;

    #[test]
    fn strip_comments_keeps_strings() {
        let text = r#"{"a": "http://example.com"} // trailing"#;
        assert_eq!(strip_comments(text), r#"{"a": "http://example.com"} "#);

        let text = "{\"a\": \"say \\\"//hi\\\"\"}";
        assert_eq!(strip_comments(text), text);
    }

    #[test]
    fn strip_comments_keeps_newlines() {
        let text = "// one\n{}\n// two\n";
        assert_eq!(strip_comments(text), "\n{}\n\n");
    }

    #[test]
    fn read_transposes_to_year_keys() {
        let reform = read_reform_str(COMMENTED).unwrap();
        assert_eq!(reform.keys().copied().collect::<Vec<_>>(), vec![2015, 2016, 2017]);

        assert_eq!(
            reform[&2015]["_AMT_thd_MarriedS"],
            ReformValue::Values(vec![ParamValue::Scalar(dec!(60000))])
        );
        assert_eq!(
            reform[&2016]["_EITC_c"],
            ReformValue::Values(vec![ParamValue::Vector(vec![
                dec!(900),
                dec!(5000),
                dec!(8000),
                dec!(9000)
            ])])
        );
        assert_eq!(reform[&2017]["_SS_Earnings_c_cpi"], ReformValue::Flag(false));
        assert_eq!(reform[&2017].len(), 2);
    }

    #[test]
    fn invalid_json() {
        let err = read_reform_str("{\"_II_em\": {\"2016\": [7000]}").unwrap_err();
        assert!(matches!(err, ReformError::InvalidJson(_)));
    }

    #[test]
    fn year_keys_must_be_integers() {
        let err = read_reform_str(r#"{"_II_em": {"next": [7000]}}"#).unwrap_err();
        assert!(matches!(
            err,
            ReformError::InvalidYear { ref param, ref key } if param == "_II_em" && key == "next"
        ));
    }

    #[test]
    fn param_entries_must_be_objects() {
        let err = read_reform_str(r#"{"_II_em": [7000]}"#).unwrap_err();
        assert!(matches!(err, ReformError::ParamNotObject(ref p) if p == "_II_em"));

        let err = read_reform_str("[1, 2]").unwrap_err();
        assert!(matches!(err, ReformError::NotAnObject));
    }

    #[test]
    fn invalid_values() {
        let err = read_reform_str(r#"{"_II_em": {"2016": "lots"}}"#).unwrap_err();
        assert!(matches!(err, ReformError::InvalidValue { year: 2016, .. }));
    }

    #[test]
    fn missing_file() {
        let err = read_reform_file(Path::new("no/such/reform.json")).unwrap_err();
        assert!(matches!(err, ReformError::NotFound(_)));
    }

    #[test]
    fn digest_is_stable() {
        let a = read_reform_str(r#"{"_II_em": {"2016": [7000]}, "_CTC_c": {"2017": [1500]}}"#)
            .unwrap();
        let b = read_reform_str(r#"{"_CTC_c": {"2017": [1500]}, "_II_em": {"2016": [7000]}}"#)
            .unwrap();
        let c = read_reform_str(r#"{"_II_em": {"2016": [7001]}}"#).unwrap();
        let digest = |r: &Reform| reform_digest(r).unwrap();
        assert_eq!(digest(&a), digest(&b));
        assert_ne!(digest(&a), digest(&c));
        assert_eq!(digest(&a).len(), 64);
        // sha256 of `{}`
        assert_eq!(
            digest(&Reform::new()),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }
}
