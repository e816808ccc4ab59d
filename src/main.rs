use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use k8s_event::{K8sEvent, ListenerRegistry, PLUGIN_NAME, PluginLogger, setup};

/// k8s-event - Replicate DNS plugin log calls as Kubernetes Events
#[derive(Parser, Debug)]
#[command(name = "k8s-event")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Corefile containing the k8s_event stanza
    #[arg(value_name = "COREFILE")]
    corefile: PathBuf,

    /// Kubernetes context name (defaults to in-cluster config, then kubeconfig)
    #[arg(long, value_name = "CONTEXT")]
    context: Option<String>,

    /// Validate the Corefile, print the effective settings and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let corefile = std::fs::read_to_string(&args.corefile)
        .context(format!("Failed to read {}", args.corefile.display()))?;

    let Some(settings) = setup(&corefile)? else {
        anyhow::bail!(
            "No {} directive found in {}",
            PLUGIN_NAME,
            args.corefile.display()
        );
    };

    if args.check {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let registry = Arc::new(ListenerRegistry::new());
    let log = PluginLogger::new(PLUGIN_NAME, Arc::clone(&registry));

    let mut plugin = K8sEvent::new(settings);
    plugin.init();

    let client = k8s_event_kube::connect(args.context.as_deref()).await?;
    plugin.startup(client, &registry)?;

    log.infof(format_args!(
        "event bridge started for {}",
        args.corefile.display()
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    log.info("shutting down");
    plugin.shutdown(&registry)?;
    plugin.stopped().await;

    Ok(())
}
