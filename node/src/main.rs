use clap::Parser;
use node::cli::Cli;
use node::{NodeConfig, Node};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = NodeConfig::load_or_default(cli.config.as_deref())?;
    if let Some(chain_spec) = cli.chain_spec {
        config.chain_spec_path = Some(chain_spec);
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    let node = Node::from_config(config)?;
    node.run().await?;
    Ok(())
}
