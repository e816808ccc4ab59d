use std::fmt;

use k8s_event_types::Severity;

/// A subscriber to plugin log calls
///
/// Implementors provide [`log`](Listener::log); the per-severity methods are
/// the call surface used by log sites. `plugin` is a free-form source tag that
/// is prepended to the message as-is.
pub trait Listener: Send + Sync {
    /// Stable name used to register and deregister the listener
    fn name(&self) -> String;

    fn log(&self, severity: Severity, plugin: &str, args: fmt::Arguments<'_>);

    fn debug(&self, plugin: &str, message: &str) {
        self.log(Severity::Debug, plugin, format_args!("{message}"));
    }

    fn debugf(&self, plugin: &str, args: fmt::Arguments<'_>) {
        self.log(Severity::Debug, plugin, args);
    }

    fn info(&self, plugin: &str, message: &str) {
        self.log(Severity::Info, plugin, format_args!("{message}"));
    }

    fn infof(&self, plugin: &str, args: fmt::Arguments<'_>) {
        self.log(Severity::Info, plugin, args);
    }

    fn warning(&self, plugin: &str, message: &str) {
        self.log(Severity::Warning, plugin, format_args!("{message}"));
    }

    fn warningf(&self, plugin: &str, args: fmt::Arguments<'_>) {
        self.log(Severity::Warning, plugin, args);
    }

    fn error(&self, plugin: &str, message: &str) {
        self.log(Severity::Error, plugin, format_args!("{message}"));
    }

    fn errorf(&self, plugin: &str, args: fmt::Arguments<'_>) {
        self.log(Severity::Error, plugin, args);
    }

    /// Fatal is only the most severe bucket; it never stops the process
    fn fatal(&self, plugin: &str, message: &str) {
        self.log(Severity::Fatal, plugin, format_args!("{message}"));
    }

    fn fatalf(&self, plugin: &str, args: fmt::Arguments<'_>) {
        self.log(Severity::Fatal, plugin, args);
    }
}
