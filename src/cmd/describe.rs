//! Describe command - explain parameter names using the naming glossary

use crate::naming::{Glossary, ParamName};
use anyhow::Context;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct DescribeCommand {
    /// Parameter names (e.g. _AMT_thd_MarriedS)
    #[arg(required_unless_present = "list")]
    names: Vec<String>,

    /// List the known category and value-function abbreviations
    #[arg(long)]
    list: bool,
}

#[derive(Tabled)]
struct NameRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Subcategory")]
    subcategory: String,
    #[tabled(rename = "Function")]
    function: String,
    #[tabled(rename = "Qualifier")]
    qualifier: String,
    #[tabled(rename = "Meaning")]
    meaning: String,
}

#[derive(Tabled)]
struct AbbrevRow {
    #[tabled(rename = "Abbreviation")]
    abbrev: String,
    #[tabled(rename = "Meaning")]
    meaning: String,
}

impl DescribeCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let glossary = Glossary::default();

        if self.list {
            print_abbreviations("TAX CATEGORIES", glossary.categories());
            print_abbreviations("VALUE FUNCTIONS", glossary.functions());
        }
        if self.names.is_empty() {
            return Ok(());
        }

        let rows = self
            .names
            .iter()
            .map(|name| -> anyhow::Result<NameRow> {
                let parsed = ParamName::parse(name)
                    .with_context(|| format!("cannot describe '{}'", name))?;
                Ok(name_row(&glossary, &parsed))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }
}

fn name_row(glossary: &Glossary, name: &ParamName) -> NameRow {
    let mut function = match name.bracket {
        Some(n) => format!("{}{}", name.function, n),
        None => name.function.clone(),
    };
    if name.indexing_flag {
        function = format!("{} (flag for {})", function, name.base_name());
    }
    NameRow {
        name: name.as_str().to_string(),
        category: name.category.clone(),
        subcategory: name.subcategory.join("_"),
        function,
        qualifier: name.qualifier.clone().unwrap_or_default(),
        meaning: glossary.describe(name),
    }
}

fn print_abbreviations<'a>(title: &str, entries: impl Iterator<Item = (&'a str, &'a str)>) {
    let rows: Vec<AbbrevRow> = entries
        .map(|(abbrev, meaning)| AbbrevRow {
            abbrev: abbrev.to_string(),
            meaning: meaning.to_string(),
        })
        .collect();
    println!();
    println!("{}", title);
    println!("{}", Table::new(rows).with(Style::rounded()));
}
