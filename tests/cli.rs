//! E2E tests for the params, describe, revenue and schema commands

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn taxpol(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Current-law parameters for a fixed year
#[test]
fn params_current_law() {
    let output = taxpol(&["params", "--year", "2016"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("POLICY PARAMETERS (2016) - current law"));
    assert!(stdout.contains("_II_em"));
    assert!(stdout.contains("4,050"));
    assert!(stdout.contains("Alternative Minimum Tax: threshold (married filing separately)"));
}

/// A commented reform file is applied and tagged with its digest
#[test]
fn params_with_reform_json() {
    let output = taxpol(&[
        "params",
        "--year",
        "2020",
        "--reform",
        "tests/data/reform.json",
        "--name",
        "_SS_Earnings_c",
        "--name",
        "_II_em",
        "--json",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("\"year\": 2020"));
    assert!(stdout.contains("\"reform_digest\""));
    assert!(stdout.contains("726,810"));
    assert!(stdout.contains("9,214.2"));
    assert!(!stdout.contains("_CTC_c"));
}

/// Year-by-year values under custom inflation rates
#[test]
fn params_series_with_custom_rates() {
    let output = taxpol(&[
        "params",
        "--start-year",
        "2016",
        "--num-years",
        "3",
        "--rates",
        "tests/data/rates.json",
        "--name",
        "_II_em",
        "--series",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("_II_em (price indexing)"));
    assert!(stdout.contains("4,050"));
    assert!(stdout.contains("4,455"));
    assert!(stdout.contains("4,900.5"));
}

/// Series JSON is one document with the rates and reform digest
#[test]
fn params_series_json() {
    let output = taxpol(&[
        "params",
        "--reform",
        "tests/data/reform.json",
        "--name",
        "_II_em",
        "--series",
        "--json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Series output is not a JSON document");
    let figure = |v: &serde_json::Value| v.as_str().unwrap().parse::<f64>().unwrap();

    assert_eq!(json["start_year"], 2013);
    assert_eq!(json["end_year"], 2026);
    assert_eq!(json["reform_digest"].as_str().unwrap().len(), 64);

    let params = json["parameters"].as_array().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0]["name"], "_II_em");
    assert_eq!(params[0]["indexing"], "price");

    let series = params[0]["series"].as_array().unwrap();
    assert_eq!(series.len(), 14);
    assert_eq!(series[4]["year"], 2017);
    assert_eq!(figure(&series[4]["value"]), 7094.5);
    assert_eq!(figure(&series[0]["inflation_rate"]), 0.0148);
    assert_eq!(figure(&series[0]["wage_growth_rate"]), 0.0276);
}

/// A parameter file replaces current law
#[test]
fn params_from_parameter_file() {
    let output = taxpol(&[
        "params",
        "--parameters",
        "tests/data/parameters.json",
        "--year",
        "2015",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("_CDCC_c"));
    assert!(stdout.contains("wage"));
    assert!(stdout.contains("3,235.71"));
    assert!(stdout.contains("2,000"));
    assert!(!stdout.contains("_II_em"));
}

#[test]
fn params_rejects_year_outside_window() {
    let output = taxpol(&["params", "--year", "2040"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("year 2040 outside 2013..=2026"));
}

/// A reform naming an unknown parameter fails
#[test]
fn params_rejects_bad_reform() {
    let output = taxpol(&["params", "--reform", "tests/data/bad_reform.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("unknown policy parameter: _II_nope"));
}

/// Parameter names are split into their parts and explained
#[test]
fn describe_names() {
    let output = taxpol(&["describe", "_AMT_thd_MarriedS", "_SS_Earnings_c_cpi"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("MarriedS"));
    assert!(stdout.contains("married filing separately"));
    assert!(stdout.contains("indexing flag for Social Security, Earnings: ceiling"));
}

#[test]
fn describe_list() {
    let output = taxpol(&["describe", "--list"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("TAX CATEGORIES"));
    assert!(stdout.contains("Earned Income Tax Credit"));
    assert!(stdout.contains("VALUE FUNCTIONS"));
    assert!(stdout.contains("haircut"));
}

/// Revenue tables and differences from Tax-Calculator
#[test]
fn revenue_tables() {
    let output = taxpol(&["revenue", "tests/data/revenue.csv"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("REVENUE ESTIMATES"));
    assert!(stdout.contains("DIFFERENCE FROM TAX-CALCULATOR"));
    assert!(stdout.contains("Budget Options"));
    assert!(stdout.contains("-3.2"));
    assert!(stdout.contains("-7.6"));
}

#[test]
fn revenue_csv_differences() {
    let output = taxpol(&["revenue", "tests/data/revenue.csv", "--csv"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.starts_with("label,estimator,baseline,d1,d2,d3,d4,total"));
    assert!(stdout.contains(
        "Eliminate the deduction for state and local taxes,Tax Expenditure,Tax-Calculator,-3.2,-4.4,,,-7.6"
    ));
    // no baseline row for the AMT scenario
    assert!(!stdout.contains("Repeal the AMT"));
}

#[test]
fn revenue_rows_round_trip_layout() {
    let output = taxpol(&["revenue", "tests/data/revenue.csv", "--rows"]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.starts_with(
        "Eliminate the deduction for state and local taxes,Tax-Calculator,71.2,76.5,81.3,86.0\n"
    ));
    assert!(stdout.contains("Repeal the AMT,Tax Expenditure,-30.1,-31.0,-32.2,-33.5"));
    assert_eq!(stdout.lines().count(), 5);
}

/// `-` reads the table from stdin
#[test]
fn revenue_from_stdin() {
    let mut child = Command::new("cargo")
        .args(["run", "--quiet", "--", "revenue", "-", "--csv"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Repeal the AMT,Tax-Calculator,-28.0,-29.5\nRepeal the AMT,Tax Expenditure,-30.1,-31.0\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("Repeal the AMT,Tax Expenditure,Tax-Calculator,-2.1,-1.5,,,-3.6"));
}

#[test]
fn revenue_json_with_other_baseline() {
    let output = taxpol(&[
        "revenue",
        "tests/data/revenue.csv",
        "--baseline",
        "Tax Expenditure",
        "--json",
    ]);
    let stdout = stdout(&output);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("\"baseline\": \"Tax Expenditure\""));
    assert!(stdout.contains("\"estimators\""));
    assert!(stdout.contains("\"comparisons\""));
}

#[test]
fn schema_formats() {
    let output = taxpol(&["schema", "reform-json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout(&output).contains("\"$schema\""));

    let output = taxpol(&["schema", "revenue-csv"]);
    let stdout = stdout(&output);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("estimator"));
    assert!(stdout.contains("Revenue impact, fourth year"));
}
