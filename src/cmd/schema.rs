//! Schema command - print expected input formats

use crate::policy::reform::ReformFile;
use crate::revenue::RevenueRecord;
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Input format to describe
    #[arg(value_enum, default_value = "reform-json")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for reform files
    ReformJson,
    /// Column descriptions for revenue estimate CSV files
    RevenueCsv,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::ReformJson => self.print_reform_schema(),
            SchemaFormat::RevenueCsv => self.print_revenue_columns(),
        }
    }

    fn print_reform_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(ReformFile);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_revenue_columns(&self) -> anyhow::Result<()> {
        println!("Revenue Estimate CSV Format (no header row)");
        println!("===========================================");
        println!();
        for column in RevenueRecord::csv_columns() {
            let req = if column.required { "required" } else { "optional" };
            println!(
                "{}. {:10} ({:8})  {}",
                column.position + 1,
                column.name,
                req,
                column.description
            );
        }
        println!();
        println!("Empty or NA cells are missing figures");
        Ok(())
    }
}
