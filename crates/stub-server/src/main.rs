use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use stub_server::server::DEFAULT_PORT;
use stub_server::{ServerOptions, StubServer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "stub-server", version, about)]
struct Args {
    /// Route table (YAML or JSON); the extension may be omitted
    config: PathBuf,
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "STUB_SERVER_PORT")]
    port: u16,
    /// Ignore every configured delay
    #[arg(long)]
    no_delay: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let options = ServerOptions {
        port: args.port,
        delay_enabled: !args.no_delay,
        ..Default::default()
    };

    let server = StubServer::bind(&args.config, options)
        .await
        .with_context(|| format!("failed to start stub server for '{}'", args.config.display()))?;
    let addr = server.local_addr()?;
    println!("stub-server is running at http://{addr}");

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {}
    }
    Ok(())
}
