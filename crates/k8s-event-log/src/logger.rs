use std::fmt;
use std::sync::Arc;

use k8s_event_types::Severity;

use crate::registry::ListenerRegistry;

/// Logger handed to a plugin
///
/// Every call is written through `tracing` and replicated to the listeners in
/// the registry, tagged with `plugin/<name>: `.
#[derive(Clone)]
pub struct PluginLogger {
    name: String,
    tag: String,
    registry: Arc<ListenerRegistry>,
}

impl PluginLogger {
    pub fn new(name: &str, registry: Arc<ListenerRegistry>) -> Self {
        Self {
            name: name.to_string(),
            tag: format!("plugin/{}: ", name),
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self, severity: Severity, args: fmt::Arguments<'_>) {
        let plugin = self.name.as_str();
        match severity {
            Severity::Debug => tracing::debug!(plugin, "{}", args),
            Severity::Info => tracing::info!(plugin, "{}", args),
            Severity::Warning => tracing::warn!(plugin, "{}", args),
            Severity::Error => tracing::error!(plugin, "{}", args),
            Severity::Fatal => tracing::error!(plugin, fatal = true, "{}", args),
        }
        self.registry.dispatch(severity, &self.tag, args);
    }

    pub fn debug(&self, message: &str) {
        self.log(Severity::Debug, format_args!("{message}"));
    }

    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Debug, args);
    }

    pub fn info(&self, message: &str) {
        self.log(Severity::Info, format_args!("{message}"));
    }

    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Info, args);
    }

    pub fn warning(&self, message: &str) {
        self.log(Severity::Warning, format_args!("{message}"));
    }

    pub fn warningf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Warning, args);
    }

    pub fn error(&self, message: &str) {
        self.log(Severity::Error, format_args!("{message}"));
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Error, args);
    }

    pub fn fatal(&self, message: &str) {
        self.log(Severity::Fatal, format_args!("{message}"));
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.log(Severity::Fatal, args);
    }
}

impl fmt::Debug for PluginLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLogger")
            .field("name", &self.name)
            .field("listeners", &self.registry.len())
            .finish()
    }
}
