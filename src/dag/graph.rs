// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;

use crate::job::{Job, JobId};

/// Internal node structure: outstanding dependencies and dependents.
#[derive(Debug)]
struct DagNode {
    job: Job,
    sequence: u64,
    /// Dependencies that have not reached a terminal state yet.
    waiting_on: HashSet<JobId>,
    /// Live jobs waiting on this one.
    dependents: HashSet<JobId>,
}

/// A node taken out of the graph.
#[derive(Debug)]
pub struct RemovedNode {
    pub job: Job,
    /// Jobs that were waiting on the removed node. Their edge to it is
    /// still recorded; the caller resolves it with [`DependencyGraph::resolve`].
    pub dependents: Vec<JobId>,
}

/// Dependency graph over the jobs currently live in the scheduler
/// (queued or running), keyed by job id.
///
/// Edges only ever point at live jobs; dependencies that are already
/// terminal when a job is registered are not recorded at all.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: HashMap<JobId, DagNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` waiting on `waiting_on`, all of which must already be
    /// in the graph.
    pub fn insert(&mut self, job: Job, sequence: u64, waiting_on: HashSet<JobId>) {
        let id = job.id();
        for dep in &waiting_on {
            if let Some(node) = self.nodes.get_mut(dep) {
                node.dependents.insert(id);
            }
        }

        self.nodes.insert(
            id,
            DagNode {
                job,
                sequence,
                waiting_on,
                dependents: HashSet::new(),
            },
        );
    }

    /// Remove a node, detaching it from the dependents lists of whatever it
    /// was still waiting on.
    pub fn remove(&mut self, id: JobId) -> Option<RemovedNode> {
        let node = self.nodes.remove(&id)?;
        for dep in &node.waiting_on {
            if let Some(dep_node) = self.nodes.get_mut(dep) {
                dep_node.dependents.remove(&id);
            }
        }

        let mut dependents: Vec<JobId> = node.dependents.into_iter().collect();
        dependents.sort();

        Some(RemovedNode {
            job: node.job,
            dependents,
        })
    }

    /// Mark the edge `dependent -> dependency` as resolved.
    ///
    /// Returns `true` if this left `dependent` with no outstanding dependency.
    pub fn resolve(&mut self, dependent: JobId, dependency: JobId) -> bool {
        match self.nodes.get_mut(&dependent) {
            Some(node) => node.waiting_on.remove(&dependency) && node.waiting_on.is_empty(),
            None => false,
        }
    }

    /// Swap the outstanding dependency set of `id`, keeping reverse edges in
    /// sync.
    pub fn replace_dependencies(&mut self, id: JobId, waiting_on: HashSet<JobId>) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let old = std::mem::replace(&mut node.waiting_on, waiting_on.clone());

        for dep in old.difference(&waiting_on) {
            if let Some(dep_node) = self.nodes.get_mut(dep) {
                dep_node.dependents.remove(&id);
            }
        }
        for dep in waiting_on.difference(&old) {
            if let Some(dep_node) = self.nodes.get_mut(dep) {
                dep_node.dependents.insert(id);
            }
        }
    }

    /// Whether making `job` wait on `dependency` would close a cycle, i.e.
    /// `dependency` already (transitively) waits on `job`.
    pub fn would_create_cycle(&self, job: JobId, dependency: JobId) -> bool {
        if job == dependency {
            return true;
        }
        if !self.nodes.contains_key(&job) || !self.nodes.contains_key(&dependency) {
            return false;
        }

        // Edge direction: waiting job -> dependency.
        let mut graph: DiGraphMap<JobId, ()> = DiGraphMap::new();
        for (id, node) in &self.nodes {
            graph.add_node(*id);
            for dep in &node.waiting_on {
                graph.add_edge(*id, *dep, ());
            }
        }

        has_path_connecting(&graph, dependency, job, None)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.nodes.get(&id).map(|n| &n.job)
    }

    pub fn sequence(&self, id: JobId) -> Option<u64> {
        self.nodes.get(&id).map(|n| n.sequence)
    }

    /// Number of outstanding dependencies, or `None` for unknown jobs.
    pub fn outstanding(&self, id: JobId) -> Option<usize> {
        self.nodes.get(&id).map(|n| n.waiting_on.len())
    }

    /// Outstanding dependencies of a job, sorted.
    pub fn dependencies_of(&self, id: JobId) -> Vec<JobId> {
        let mut deps: Vec<JobId> = self
            .nodes
            .get(&id)
            .map(|n| n.waiting_on.iter().copied().collect())
            .unwrap_or_default();
        deps.sort();
        deps
    }

    pub fn has_dependents(&self, id: JobId) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|n| !n.dependents.is_empty())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.nodes.keys().copied()
    }
}
