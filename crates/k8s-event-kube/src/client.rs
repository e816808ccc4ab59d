//! Kubernetes client construction

use anyhow::{Context, Result};
use kube::config::KubeConfigOptions;
use tracing::debug;

/// Create a kube::Client
///
/// With a context name the client is built from that kubeconfig context,
/// otherwise the in-cluster configuration is tried first and the local
/// kubeconfig second.
pub async fn connect(context: Option<&str>) -> Result<kube::Client> {
    let config = match context {
        Some(context_name) => kube::Config::from_kubeconfig(&KubeConfigOptions {
            context: Some(context_name.to_string()),
            ..Default::default()
        })
        .await
        .context(format!(
            "Failed to create config for context: {}",
            context_name
        ))?,
        None => kube::Config::infer()
            .await
            .context("Failed to infer Kubernetes config. Is the pod's service account mounted?")?,
    };

    debug!(cluster_url = %config.cluster_url, "Connecting to Kubernetes API");

    kube::Client::try_from(config).context("Failed to create Kubernetes client")
}
