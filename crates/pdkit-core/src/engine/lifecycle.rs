use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    Database,
    Timing,
    Optimizer,
    Staging,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineKind::Database => "database",
            EngineKind::Timing => "timing engine",
            EngineKind::Optimizer => "optimization engine",
            EngineKind::Staging => "netlist staging",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created(EngineKind),
    Released(EngineKind),
    /// The timing view built from `revision` was marked stale.
    Invalidated { revision: u64 },
    /// The timing view was rebuilt from `revision`.
    Refreshed { revision: u64 },
}

pub type LifecycleCallback = Box<dyn Fn(LifecycleEvent) + Send + Sync>;

#[derive(Default)]
pub struct LifecycleReporter {
    callback: Option<LifecycleCallback>,
}

impl LifecycleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: LifecycleCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: LifecycleEvent) {
        trace!(?event, "lifecycle");
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

impl fmt::Debug for LifecycleReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleReporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// An engine owned by the facade. Creation and release are reported to the lifecycle reporter.
pub struct Binding<T> {
    kind: EngineKind,
    value: T,
    reporter: Arc<LifecycleReporter>,
}

impl<T> Binding<T> {
    pub fn new(kind: EngineKind, value: T, reporter: Arc<LifecycleReporter>) -> Self {
        debug!("Created {}", kind);
        reporter.report(LifecycleEvent::Created(kind));
        Self {
            kind,
            value,
            reporter,
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }
}

impl<T> Deref for Binding<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Binding<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        debug!("Released {}", self.kind);
        self.reporter.report(LifecycleEvent::Released(self.kind));
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind)
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (Arc<LifecycleReporter>, Arc<Mutex<Vec<LifecycleEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = LifecycleReporter::with_callback(Box::new(move |e| {
            sink.lock().unwrap().push(e);
        }));
        (Arc::new(reporter), events)
    }

    #[test]
    fn binding_reports_creation_and_release() {
        let (reporter, events) = recording();
        {
            let mut b = Binding::new(EngineKind::Staging, 5u32, Arc::clone(&reporter));
            *b += 1;
            assert_eq!(*b, 6);
            assert_eq!(b.kind(), EngineKind::Staging);
        }
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                LifecycleEvent::Created(EngineKind::Staging),
                LifecycleEvent::Released(EngineKind::Staging),
            ]
        );
    }

    #[test]
    fn reporter_without_callback_is_silent() {
        let reporter = LifecycleReporter::new();
        reporter.report(LifecycleEvent::Refreshed { revision: 1 });
        assert!(format!("{:?}", reporter).contains("false"));
    }
}
