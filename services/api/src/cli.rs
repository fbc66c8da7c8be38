use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use kyc_ai::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "kyc-ai-api",
    about = "Run the KYC verification and loan compliance service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a customer from KYC submission through EMI reminders
    Demo(DemoArgs),
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["kyc-ai-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_binding_overrides() {
        let cli = Cli::try_parse_from(["kyc-ai-api", "serve", "--host", "0.0.0.0", "--port", "8080"])
            .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
                assert_eq!(args.port, Some(8080));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn demo_rejects_malformed_dates() {
        assert!(Cli::try_parse_from(["kyc-ai-api", "demo", "--disbursed-on", "15/01/2026"]).is_err());
    }
}
