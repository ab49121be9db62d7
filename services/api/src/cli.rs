use crate::demo::{run_demo, DemoArgs};
use crate::inspect::{run_doc_types, run_validate, ValidateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use kyc_onboarding::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "KYC Onboarding",
    about = "Run the KYC intake service or exercise the onboarding wizard from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP intake service (default command)
    Serve(ServeArgs),
    /// Walk an applicant through every onboarding step against an in-process backend
    Demo(DemoArgs),
    /// Check an identity JSON document against the onboarding rules
    Validate(ValidateArgs),
    /// List the identity document catalogue, marking primary documents
    DocTypes,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Validate(args) => run_validate(args),
        Command::DocTypes => {
            run_doc_types();
            Ok(())
        }
    }
}
