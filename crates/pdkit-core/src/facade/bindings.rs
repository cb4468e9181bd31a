use crate::core::models::database::Database;
use crate::engine::lifecycle::{Binding, EngineKind, LifecycleReporter};
use crate::engine::optimizer::OptimizationEngine;
use crate::engine::staging::NetlistStaging;
use crate::engine::timing::TimingEngine;
use std::sync::Arc;

/// The four engines owned by a facade.
///
/// Fields drop in declaration order, which is the reverse of [`EngineBindings::new`]:
/// staging, optimizer, timing, then the database.
#[derive(Debug)]
pub(crate) struct EngineBindings {
    pub(crate) staging: Binding<NetlistStaging>,
    pub(crate) optimizer: Binding<OptimizationEngine>,
    pub(crate) timing: Binding<TimingEngine>,
    pub(crate) database: Binding<Database>,
}

impl EngineBindings {
    pub(crate) fn new(max_fanout: usize, reporter: &Arc<LifecycleReporter>) -> Self {
        let database = Binding::new(EngineKind::Database, Database::new(), Arc::clone(reporter));
        let mut timing_engine = TimingEngine::new();
        timing_engine.bind(&database);
        let timing = Binding::new(EngineKind::Timing, timing_engine, Arc::clone(reporter));
        let optimizer = Binding::new(
            EngineKind::Optimizer,
            OptimizationEngine::new(max_fanout),
            Arc::clone(reporter),
        );
        let staging = Binding::new(EngineKind::Staging, NetlistStaging::new(), Arc::clone(reporter));
        Self {
            staging,
            optimizer,
            timing,
            database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lifecycle::LifecycleEvent;
    use std::sync::Mutex;

    #[test]
    fn engines_are_released_in_reverse_creation_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = Arc::new(LifecycleReporter::with_callback(Box::new(move |e| {
            sink.lock().unwrap().push(e);
        })));

        let bindings = EngineBindings::new(20, &reporter);
        assert!(bindings.timing.state().is_fresh());
        drop(bindings);

        let expected: Vec<_> = [
            EngineKind::Database,
            EngineKind::Timing,
            EngineKind::Optimizer,
            EngineKind::Staging,
        ]
        .into_iter()
        .map(LifecycleEvent::Created)
        .chain(
            [
                EngineKind::Staging,
                EngineKind::Optimizer,
                EngineKind::Timing,
                EngineKind::Database,
            ]
            .into_iter()
            .map(LifecycleEvent::Released),
        )
        .collect();
        assert_eq!(*events.lock().unwrap(), expected);
    }
}
