mod cli;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recipe_timer=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match cli::run() {
        cli::RunOutcome::Execute(invocation) => cli::execute(invocation).await,
        cli::RunOutcome::Exit(code) => code,
    };
    std::process::exit(code);
}
