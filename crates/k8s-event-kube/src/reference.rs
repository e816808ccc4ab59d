//! Resolution of the object that events are attributed to

use k8s_openapi::api::core::v1::ObjectReference;
use tracing::warn;

/// Environment variable holding the namespace of the running pod
pub const NAMESPACE_ENV: &str = "COREDNS_NAMESPACE";

/// Environment variable holding the name of the running pod
pub const POD_NAME_ENV: &str = "COREDNS_POD_NAME";

/// Build the event reference from a namespace and a pod name
///
/// Both values must be non-empty to attribute events to the pod, otherwise
/// events are reported against the `default` namespace.
pub fn resolve(namespace: &str, pod: &str) -> ObjectReference {
    if !namespace.is_empty() && !pod.is_empty() {
        return ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some(pod.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        };
    }

    warn!(
        "{} or {} is not set in environment variables, reporting events to default namespace",
        NAMESPACE_ENV, POD_NAME_ENV
    );
    ObjectReference {
        kind: Some("Namespace".to_string()),
        name: Some("default".to_string()),
        ..Default::default()
    }
}

/// Resolve the reference using `lookup` to read environment values
pub fn resolve_with<F>(lookup: F) -> ObjectReference
where
    F: Fn(&str) -> Option<String>,
{
    let namespace = lookup(NAMESPACE_ENV).unwrap_or_default();
    let pod = lookup(POD_NAME_ENV).unwrap_or_default();
    resolve(&namespace, &pod)
}

/// Resolve the reference from the process environment
pub fn resolve_from_env() -> ObjectReference {
    resolve_with(|key| std::env::var(key).ok())
}
