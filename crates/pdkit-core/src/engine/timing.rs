//! Unit-delay timing over the net graph of the loaded block.
//!
//! Every combinational cell adds one unit of delay from its input nets to its output nets.
//! Primary inputs and the outputs of sequential cells start at arrival zero.

use super::error::TimingError;
use super::state::BindingState;
use crate::core::models::database::Database;
use crate::core::models::design::{Block, NetTerm};
use crate::core::models::ids::NetId;
use crate::core::models::library::PinDirection;
use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetTiming {
    /// `None` for nets on or behind a combinational loop.
    pub arrival: Option<u32>,
    pub fanout: usize,
}

/// A snapshot of timing results, valid for exactly one database revision.
#[derive(Debug, Clone, Default)]
pub struct TimingView {
    revision: u64,
    design: Option<String>,
    nets: IndexMap<String, NetTiming>,
    loop_nets: Vec<String>,
    instance_count: usize,
}

impl TimingView {
    pub fn build(db: &Database) -> Self {
        let mut view = TimingView {
            revision: db.revision(),
            ..Default::default()
        };
        if let Some(block) = db.block() {
            view.design = Some(block.name.clone());
            view.instance_count = block.instance_count();
            view.analyze(db, block);
        }
        view
    }

    fn analyze(&mut self, db: &Database, block: &Block) {
        let mut graph: DiGraph<NetId, ()> = DiGraph::new();
        let nodes: HashMap<NetId, NodeIndex> = block
            .nets()
            .map(|(id, _)| (id, graph.add_node(id)))
            .collect();

        for (_, inst) in block.instances() {
            let Some(master) = db.master(inst.master) else {
                warn!("Instance '{}' has no master; ignored by timing", inst.name);
                continue;
            };
            if master.is_sequential() {
                continue;
            }
            let mut inputs = Vec::new();
            let mut outputs = Vec::new();
            for (pin, net) in inst.connections() {
                match master.pin(pin).map(|p| p.direction) {
                    Some(PinDirection::Input) => inputs.push(net),
                    Some(PinDirection::Output) => outputs.push(net),
                    _ => {}
                }
            }
            for from in &inputs {
                for to in &outputs {
                    graph.add_edge(nodes[from], nodes[to], ());
                }
            }
        }

        let mut in_degree: HashMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
            .collect();
        let mut arrivals: HashMap<NodeIndex, u32> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = graph
            .node_indices()
            .filter(|n| in_degree[n] == 0)
            .collect();
        for n in &queue {
            arrivals.insert(*n, 0);
        }
        while let Some(node) = queue.pop_front() {
            let arrival = arrivals[&node];
            for next in graph.neighbors_directed(node, Direction::Outgoing) {
                let entry = arrivals.entry(next).or_insert(0);
                *entry = (*entry).max(arrival + 1);
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        let mut on_loop = vec![false; graph.node_count()];
        for scc in kosaraju_scc(&graph) {
            let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if cyclic {
                for n in scc {
                    on_loop[n.index()] = true;
                }
            }
        }

        for (id, net) in block.nets() {
            let node = nodes[&id];
            let settled = in_degree[&node] == 0;
            if on_loop[node.index()] {
                self.loop_nets.push(net.name.clone());
            }
            self.nets.insert(
                net.name.clone(),
                NetTiming {
                    arrival: if settled { arrivals.get(&node).copied() } else { None },
                    fanout: fanout(db, block, net.terms()),
                },
            );
        }
        if !self.loop_nets.is_empty() {
            warn!(
                "Design '{}' has {} net(s) on combinational loops",
                block.name,
                self.loop_nets.len()
            );
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Name of the block the view was built from, if any.
    pub fn design(&self) -> Option<&str> {
        self.design.as_deref()
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    pub fn net(&self, name: &str) -> Result<NetTiming, TimingError> {
        self.nets
            .get(name)
            .copied()
            .ok_or_else(|| TimingError::UnknownNet(name.to_string()))
    }

    pub fn nets(&self) -> impl Iterator<Item = (&str, NetTiming)> {
        self.nets.iter().map(|(name, t)| (name.as_str(), *t))
    }

    /// Net with the latest arrival. Ties go to the net created first.
    pub fn worst_arrival(&self) -> Option<(&str, u32)> {
        let mut worst: Option<(&str, u32)> = None;
        for (name, timing) in self.nets() {
            if let Some(arrival) = timing.arrival {
                if worst.is_none_or(|(_, w)| arrival > w) {
                    worst = Some((name, arrival));
                }
            }
        }
        worst
    }

    pub fn loop_nets(&self) -> &[String] {
        &self.loop_nets
    }
}

/// Instance input pins plus primary outputs on the net.
fn fanout(db: &Database, block: &Block, terms: &[NetTerm]) -> usize {
    terms
        .iter()
        .filter(|term| match term {
            NetTerm::Instance { instance, pin } => block
                .instance(*instance)
                .and_then(|inst| db.master(inst.master))
                .and_then(|m| m.pin(pin))
                .is_some_and(|p| p.direction.is_load()),
            NetTerm::Port(name) => block
                .port(name)
                .is_some_and(|p| p.direction == PinDirection::Output),
        })
        .count()
}

/// The timing engine. It never owns the database; it caches a [`TimingView`] built from it.
#[derive(Debug, Default)]
pub struct TimingEngine {
    state: BindingState,
    view: Option<TimingView>,
    refreshes: u64,
}

impl TimingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the engine to `db` by building the first view. This is not counted as a refresh.
    pub fn bind(&mut self, db: &Database) {
        let view = TimingView::build(db);
        self.state = BindingState::Fresh {
            revision: view.revision(),
        };
        self.view = Some(view);
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    /// Marks the current view stale. An unbound engine stays unbound.
    pub fn invalidate(&mut self) {
        self.state = self.state.invalidated();
    }

    /// Rebuilds the view from `db` and marks it fresh at `db`'s current revision.
    #[instrument(skip_all, fields(revision = db.revision()))]
    pub fn refresh(&mut self, db: &Database) {
        let view = TimingView::build(db);
        debug!(
            "Timing view rebuilt: {} nets, {} instances",
            view.net_count(),
            view.instance_count()
        );
        self.state = BindingState::Fresh {
            revision: view.revision(),
        };
        self.view = Some(view);
        self.refreshes += 1;
    }

    /// The current view, provided it is fresh and was built from `db`'s current revision.
    ///
    /// # Arguments
    ///
    /// * `db` - The database the caller is about to read alongside the view.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::NotBound`] before [`TimingEngine::bind`], and
    /// [`TimingError::Stale`] if the view was invalidated or the database has moved on.
    pub fn view(&self, db: &Database) -> Result<&TimingView, TimingError> {
        match (self.state, &self.view) {
            (BindingState::Fresh { revision }, Some(view)) if revision == db.revision() => Ok(view),
            (BindingState::Fresh { revision }, _) | (BindingState::Stale { revision }, _) => {
                Err(TimingError::Stale {
                    view: revision,
                    database: db.revision(),
                })
            }
            (BindingState::Unbound, _) => Err(TimingError::NotBound),
        }
    }
}
