use clap::{Parser, Subcommand};

mod cmd;
mod naming;
mod policy;
mod revenue;

#[derive(Parser, Debug)]
#[command(
    name = "taxpol",
    version,
    author,
    about = "Federal tax policy parameters, reforms and revenue estimate comparison"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show policy parameter values for a year, optionally under a reform
    Params(cmd::params::ParamsCommand),
    /// Explain parameter names
    Describe(cmd::describe::DescribeCommand),
    /// Compare revenue estimates against a baseline estimator
    Revenue(cmd::revenue::RevenueCommand),
    /// Print expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Params(cmd) => cmd.exec(),
        Command::Describe(cmd) => cmd.exec(),
        Command::Revenue(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
