use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use k8s_event_types::Severity;

use crate::listener::Listener;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("log listener '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("log listener '{0}' is not registered")]
    NotRegistered(String),
}

/// Proof of registration, consumed on deregistration
#[derive(Debug, PartialEq, Eq)]
pub struct ListenerHandle {
    name: String,
}

impl ListenerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Listeners attached to the host's log calls
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener; names must be unique within the registry
    pub fn register(&self, listener: Arc<dyn Listener>) -> Result<ListenerHandle, RegistryError> {
        let name = listener.name();
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| l.name() == name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        listeners.push(listener);
        debug!(listener = %name, "Registered log listener");
        Ok(ListenerHandle { name })
    }

    /// Detach the listener registered under `handle`
    pub fn deregister(&self, handle: ListenerHandle) -> Result<(), RegistryError> {
        let mut listeners = self.listeners.write();
        let Some(idx) = listeners.iter().position(|l| l.name() == handle.name) else {
            return Err(RegistryError::NotRegistered(handle.name));
        };
        listeners.remove(idx);
        debug!(listener = %handle.name, "Deregistered log listener");
        Ok(())
    }

    /// Forward a log call to every registered listener
    ///
    /// Listeners are called without the registry lock held, so they may log,
    /// register or deregister from inside `log`.
    pub fn dispatch(&self, severity: Severity, plugin: &str, args: fmt::Arguments<'_>) {
        let listeners: Vec<Arc<dyn Listener>> = self.listeners.read().clone();
        for listener in &listeners {
            listener.log(severity, plugin, args);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Weak;

    struct Capture {
        name: &'static str,
        lines: Mutex<Vec<String>>,
    }

    impl Capture {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                lines: Mutex::new(Vec::new()),
            })
        }
    }

    impl Listener for Capture {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn log(&self, severity: Severity, plugin: &str, args: fmt::Arguments<'_>) {
            self.lines.lock().push(format!("{severity} {plugin}{args}"));
        }
    }

    /// Listener that registers another listener the first time it is called
    struct Registering {
        registry: Weak<ListenerRegistry>,
        added: Arc<Capture>,
    }

    impl Listener for Registering {
        fn name(&self) -> String {
            "registering".to_string()
        }

        fn log(&self, _severity: Severity, _plugin: &str, _args: fmt::Arguments<'_>) {
            if let Some(registry) = self.registry.upgrade() {
                let _ = registry.register(self.added.clone());
            }
        }
    }

    #[test]
    fn test_register_and_dispatch() {
        let registry = ListenerRegistry::new();
        let a = Capture::new("a");
        let b = Capture::new("b");
        registry.register(a.clone()).unwrap();
        registry.register(b.clone()).unwrap();
        assert_eq!(registry.len(), 2);

        registry.dispatch(Severity::Info, "p: ", format_args!("hello {}", 1));

        assert_eq!(*a.lines.lock(), vec!["info p: hello 1"]);
        assert_eq!(*b.lines.lock(), vec!["info p: hello 1"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = ListenerRegistry::new();
        registry.register(Capture::new("a")).unwrap();
        let err = registry.register(Capture::new("a")).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(name) if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deregister_stops_dispatch() {
        let registry = ListenerRegistry::new();
        let a = Capture::new("a");
        let handle = registry.register(a.clone()).unwrap();
        registry.deregister(handle).unwrap();
        assert!(registry.is_empty());

        registry.dispatch(Severity::Error, "p: ", format_args!("gone"));
        assert!(a.lines.lock().is_empty());

        let stale = ListenerHandle {
            name: "a".to_string(),
        };
        assert!(matches!(
            registry.deregister(stale),
            Err(RegistryError::NotRegistered(_))
        ));
    }

    #[test]
    fn test_listener_can_register_during_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let added = Capture::new("added");
        registry
            .register(Arc::new(Registering {
                registry: Arc::downgrade(&registry),
                added: added.clone(),
            }))
            .unwrap();

        registry.dispatch(Severity::Warning, "p: ", format_args!("first"));
        assert_eq!(registry.len(), 2);
        // Listeners added mid-dispatch only see later calls
        assert!(added.lines.lock().is_empty());

        registry.dispatch(Severity::Warning, "p: ", format_args!("second"));
        assert_eq!(*added.lines.lock(), vec!["warning p: second"]);
    }
}
