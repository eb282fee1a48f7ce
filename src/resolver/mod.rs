//! Navigation node resolver
//!
//! Maps each timeline entity of a trace to a canonical graph node and links consecutive
//! nodes of the trace with `NEXT` edges. Keyed entities are upserted on their natural key.
//! Effects have no key of their own and are matched through their neighbours.

use crate::config::ResolverOptions;
use crate::dom::EffectStructure;
use crate::error::{NavError, Result};
use crate::graph::{GraphStore, NavKey, NavKind, NavNode, NodeId, NodeIdentity};
use crate::timeline::{Interaction, TimelineEntity, Trace};
use indexmap::IndexSet;
use rand::Rng;
use serde::Serialize;
use std::thread::sleep;
use std::time::Duration;

/// Node an entry resolved to
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEntry {
    pub entry_id: String,
    pub node: NavNode,

    /// Structure of the added elements, for effects that reported any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<EffectStructure>,
}

/// Entry left out of the graph
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub entry_id: String,
    pub reason: String,
}

/// Outcome of resolving one trace
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedTrace {
    pub trace_id: String,
    pub entries: Vec<ResolvedEntry>,
    pub skipped: Vec<SkippedEntry>,
}

impl ResolvedTrace {
    /// Resolved node ids in trace order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.entries.iter().map(|e| e.node.id).collect()
    }
}

enum Pending<'t> {
    Keyed(&'t TimelineEntity, NavNode),
    Effect(&'t TimelineEntity),
}

/// What comes right after an effect in its trace
#[derive(Debug, Clone, Copy)]
enum Following {
    Node(NodeId),
    Effect,
    End,
}

impl Following {
    fn of(next: Option<&Pending<'_>>) -> Self {
        match next {
            Some(Pending::Keyed(_, node)) => Following::Node(node.id),
            Some(Pending::Effect(_)) => Following::Effect,
            None => Following::End,
        }
    }
}

/// Resolves traces into a [`GraphStore`]
pub struct NodeResolver<'s, S: GraphStore + ?Sized> {
    store: &'s S,
    options: ResolverOptions,
}

impl<'s, S: GraphStore + ?Sized> NodeResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            options: ResolverOptions::default(),
        }
    }

    pub fn options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve every entity of `trace` and stitch the trace's edges.
    ///
    /// Entries with malformed xpaths are skipped; edges connect the entries around them.
    /// Store failures are retried per [`ResolverOptions`] and surface once the budget is
    /// spent. Key collisions abort the trace.
    pub fn resolve_trace(&self, trace: &Trace) -> Result<ResolvedTrace> {
        let mut resolved = ResolvedTrace {
            trace_id: trace.id.clone(),
            ..ResolvedTrace::default()
        };

        // Keyed entities first so that effects can look at both neighbours
        let mut pending = Vec::with_capacity(trace.len());
        for entity in &trace.entries {
            let key = match entity.natural_key() {
                Ok(key) => key,
                Err(e @ NavError::MalformedXPath { .. }) => {
                    log::warn!("Skipping entry {} of trace {}: {}", entity.entry_id, trace.id, e);
                    resolved.skipped.push(SkippedEntry {
                        entry_id: entity.entry_id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            if key.is_natural() {
                let node = self.with_retry(|| self.store.upsert_node(&key, &entity.entry_id))?;
                pending.push(Pending::Keyed(entity, node));
            } else {
                pending.push(Pending::Effect(entity));
            }
        }

        let mut previous: Option<NodeId> = None;
        for (i, item) in pending.iter().enumerate() {
            let (entity, node, structure) = match item {
                Pending::Keyed(entity, node) => (*entity, node.clone(), None),
                Pending::Effect(entity) => {
                    let following = Following::of(pending.get(i + 1));
                    let node = self.resolve_effect(entity, previous, following)?;
                    (*entity, node, effect_structure(&entity.interaction))
                }
            };

            if let Some(prev) = previous {
                if prev != node.id {
                    self.with_retry(|| self.store.create_edge(prev, node.id))?;
                }
            }
            previous = Some(node.id);

            resolved.entries.push(ResolvedEntry {
                entry_id: entity.entry_id.clone(),
                node,
                structure,
            });
        }

        log::debug!(
            "Resolved trace {}: {} entries, {} skipped",
            trace.id,
            resolved.entries.len(),
            resolved.skipped.len()
        );
        Ok(resolved)
    }

    /// Resolve several traces in order
    pub fn resolve_traces(&self, traces: &[Trace]) -> Result<Vec<ResolvedTrace>> {
        traces.iter().map(|t| self.resolve_trace(t)).collect()
    }

    /// Reuse the Effect node already sitting between the same neighbours, or create one
    fn resolve_effect(
        &self,
        entity: &TimelineEntity,
        predecessor: Option<NodeId>,
        following: Following,
    ) -> Result<NavNode> {
        let existing = self.with_retry(|| self.find_effect(predecessor, following))?;
        let instances = IndexSet::from([entity.entry_id.clone()]);

        match existing {
            Some(id) => {
                log::debug!("Effect {} matched existing node {}", entity.entry_id, id);
                self.with_retry(|| self.store.add_instances(id, &instances))
            }
            None => self.with_retry(|| {
                self.store
                    .create_node(NodeIdentity::single(NavKey::Effect), instances.clone())
            }),
        }
    }

    fn find_effect(&self, predecessor: Option<NodeId>, following: Following) -> Result<Option<NodeId>> {
        let candidates = match (predecessor, following) {
            (Some(pred), _) => self.store.successors(pred)?,
            (None, Following::Node(succ)) => self.store.predecessors(succ)?,
            (None, _) => return Ok(None),
        };

        for candidate in candidates {
            if self.store.node(candidate)?.kind() != NavKind::Effect {
                continue;
            }
            let fits = match following {
                Following::Node(succ) => {
                    predecessor.is_none() || self.store.successors(candidate)?.contains(&succ)
                }
                Following::Effect => self.leads_to_effect(candidate)?,
                Following::End => true,
            };
            if fits {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    fn leads_to_effect(&self, id: NodeId) -> Result<bool> {
        for next in self.store.successors(id)? {
            if self.store.node(next)?.kind() == NavKind::Effect {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run a store round-trip, retrying transient failures with exponential backoff
    pub fn with_retry<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.options.max_attempts => {
                    let delay = self.options.backoff_for(attempt) + self.jitter();
                    log::warn!(
                        "Store round-trip failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt,
                        self.options.max_attempts,
                        e,
                        delay
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn jitter(&self) -> Duration {
        let max = self.options.jitter.as_millis() as u64;
        if max == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=max))
        }
    }
}

fn effect_structure(interaction: &Interaction) -> Option<EffectStructure> {
    match interaction {
        Interaction::Effect { added } if !added.is_empty() => Some(EffectStructure::analyze(added)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryGraphStore;

    fn click(xpath: &str) -> Interaction {
        Interaction::Click {
            xpath: xpath.to_string(),
            text: String::new(),
        }
    }

    fn effect() -> Interaction {
        Interaction::Effect { added: vec![] }
    }

    fn api(path: &str) -> Interaction {
        Interaction::ApiCall {
            path: path.to_string(),
            method: "GET".to_string(),
        }
    }

    #[test]
    fn test_consecutive_nodes_are_linked() {
        let store = InMemoryGraphStore::new();
        let trace = Trace::new("t1")
            .with(Interaction::LocationChange { url: "/home".into() })
            .with(click("/html/body/a"))
            .with(api("/api/items"));

        let resolved = NodeResolver::new(&store).resolve_trace(&trace).unwrap();
        let ids = resolved.node_ids();

        assert_eq!(ids.len(), 3);
        assert_eq!(store.successors(ids[0]).unwrap(), vec![ids[1]]);
        assert_eq!(store.successors(ids[1]).unwrap(), vec![ids[2]]);
        assert_eq!(store.edge_count().unwrap(), 2);
    }

    #[test]
    fn test_repeated_entities_share_nodes() {
        let store = InMemoryGraphStore::new();
        let resolver = NodeResolver::new(&store);
        let first = Trace::new("t1").with(click("/html/body/a")).with(api("/api/users/1"));
        let second = Trace::new("t2").with(click("/html/body/a")).with(api("/api/users/2"));

        let a = resolver.resolve_trace(&first).unwrap();
        let b = resolver.resolve_trace(&second).unwrap();

        assert_eq!(a.node_ids(), b.node_ids());
        let api_node = store.node(b.node_ids()[1]).unwrap();
        assert_eq!(api_node.instances.len(), 2);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_interior_effect_matched_by_both_neighbours() {
        let store = InMemoryGraphStore::new();
        let resolver = NodeResolver::new(&store);
        let first = Trace::new("t1").with(click("/html/body/a")).with(effect()).with(api("/api/x"));
        let second = Trace::new("t2").with(click("/html/body/a")).with(effect()).with(api("/api/x"));
        let third = Trace::new("t3").with(click("/html/body/a")).with(effect()).with(api("/api/y"));

        let a = resolver.resolve_trace(&first).unwrap().node_ids();
        let b = resolver.resolve_trace(&second).unwrap().node_ids();
        let c = resolver.resolve_trace(&third).unwrap().node_ids();

        assert_eq!(a[1], b[1]);
        assert_ne!(a[1], c[1]);
        assert_eq!(store.node(a[1]).unwrap().instances.len(), 2);
    }

    #[test]
    fn test_leading_and_trailing_effects() {
        let store = InMemoryGraphStore::new();
        let resolver = NodeResolver::new(&store);
        let first = Trace::new("t1").with(effect()).with(click("/html/body/a")).with(effect());
        let second = Trace::new("t2").with(effect()).with(click("/html/body/a")).with(effect());

        let a = resolver.resolve_trace(&first).unwrap().node_ids();
        let b = resolver.resolve_trace(&second).unwrap().node_ids();

        assert_eq!(a, b);
        assert_ne!(a[0], a[2]);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_effect_chain_does_not_absorb_single_effect() {
        let store = InMemoryGraphStore::new();
        let resolver = NodeResolver::new(&store);
        let single = Trace::new("t1")
            .with(click("/html/body/a"))
            .with(effect())
            .with(click("/html/body/y"));
        let chained = |id: &str| {
            Trace::new(id)
                .with(click("/html/body/a"))
                .with(effect())
                .with(effect())
                .with(click("/html/body/x"))
        };

        let first = resolver.resolve_trace(&single).unwrap().node_ids();
        let second = resolver.resolve_trace(&chained("t2")).unwrap().node_ids();

        assert_ne!(first[1], second[1]);
        assert_eq!(store.node(first[1]).unwrap().instances.len(), 1);
        assert_eq!(store.successors(first[0]).unwrap(), vec![first[1], second[1]]);

        let third = resolver.resolve_trace(&chained("t3")).unwrap().node_ids();
        assert_eq!(second, third);
        assert_eq!(store.len().unwrap(), 6);
    }

    #[test]
    fn test_malformed_entry_is_skipped_and_bridged() {
        let store = InMemoryGraphStore::new();
        let trace = Trace::new("t1")
            .with(click("/html/body/a"))
            .with(click("button"))
            .with(click("/html/body/b"));

        let resolved = NodeResolver::new(&store).resolve_trace(&trace).unwrap();

        assert_eq!(resolved.skipped.len(), 1);
        assert_eq!(resolved.skipped[0].entry_id, "t1-1");
        let ids = resolved.node_ids();
        assert_eq!(store.successors(ids[0]).unwrap(), vec![ids[1]]);
    }

    #[test]
    fn test_collision_aborts_trace() {
        let store = InMemoryGraphStore::new();
        let trace = Trace::new("t1")
            .with(Interaction::SelectOption {
                xpath: "/html/body/select".into(),
                option: "a".into(),
            })
            .with(Interaction::DataEntry {
                xpath: "/html/body/select".into(),
                value: "b".into(),
            });

        let result = NodeResolver::new(&store).resolve_trace(&trace);
        assert!(matches!(result, Err(NavError::NodeKeyCollision { .. })));
    }

    #[test]
    fn test_repeated_click_has_no_self_loop() {
        let store = InMemoryGraphStore::new();
        let trace = Trace::new("t1").with(click("/html/body/a")).with(click("/html/body/a"));

        let resolved = NodeResolver::new(&store).resolve_trace(&trace).unwrap();
        assert_eq!(resolved.entries.len(), 2);
        assert_eq!(store.edge_count().unwrap(), 0);
    }

    #[test]
    fn test_effect_structure_is_attached() {
        let store = InMemoryGraphStore::new();
        let trace = Trace::new("t1").with(click("/html/body/a")).with(Interaction::Effect {
            added: vec!["/html/body/ul/li[1]".into(), "/html/body/ul/li[2]".into()],
        });

        let resolved = NodeResolver::new(&store).resolve_trace(&trace).unwrap();
        let structure = resolved.entries[1].structure.as_ref().unwrap();
        assert!(structure.is_reconciled());
        assert_eq!(structure.families[0].dynamic_tag, "li");
    }
}
