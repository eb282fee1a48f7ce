use crate::collapse::engine::{Collapse, PatternCollapser};
use crate::config::CollapseOptions;
use crate::error::{NavError, Result};
use crate::graph::{GraphStore, NavKey, NavKind, NavNode, NodeId, NodeIdentity};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Merge nodes of one kind into a single collapsed node.
///
/// The collapsed node carries the union of keys and instances, and inherits every edge of
/// the members except those between members. The members are deleted afterwards.
pub fn merge_nodes<S: GraphStore + ?Sized>(store: &S, ids: &[NodeId]) -> Result<NavNode> {
    let members: IndexSet<NodeId> = ids.iter().copied().collect();
    if members.len() < 2 {
        return Err(NavError::InvalidCollapse(format!(
            "need at least two distinct nodes to merge, got {}",
            members.len()
        )));
    }

    let mut kind: Option<NavKind> = None;
    let mut keys: IndexSet<NavKey> = IndexSet::new();
    let mut instances: IndexSet<String> = IndexSet::new();
    let mut incoming: IndexSet<NodeId> = IndexSet::new();
    let mut outgoing: IndexSet<NodeId> = IndexSet::new();

    for &id in &members {
        let node = store.node(id)?;
        match kind {
            None => kind = Some(node.kind()),
            Some(k) if k != node.kind() => {
                return Err(NavError::InvalidCollapse(format!(
                    "cannot merge {} node {} into {} nodes",
                    node.kind(),
                    id,
                    k
                )));
            }
            Some(_) => {}
        }

        keys.extend(node.identity.keys().into_iter().filter(|k| k.is_natural()).cloned());
        instances.extend(node.instances.iter().cloned());
        incoming.extend(store.predecessors(id)?.into_iter().filter(|n| !members.contains(n)));
        outgoing.extend(store.successors(id)?.into_iter().filter(|n| !members.contains(n)));
    }

    let kind = kind.ok_or_else(|| NavError::InvalidCollapse("nothing to merge".to_string()))?;
    let merged = store.create_node(NodeIdentity::Collapsed { kind, keys }, instances)?;

    for &from in &incoming {
        store.create_edge(from, merged.id)?;
    }
    for &to in &outgoing {
        store.create_edge(merged.id, to)?;
    }
    for &id in &members {
        store.delete_node(id)?;
    }

    log::info!("Merged {} {} nodes into {}", members.len(), kind, merged.id);
    Ok(merged)
}

fn current_id(replaced: &HashMap<NodeId, NodeId>, mut id: NodeId) -> NodeId {
    while let Some(&next) = replaced.get(&id) {
        id = next;
    }
    id
}

/// Merge the interior positions of a collapse, position by position.
///
/// Anchors stay untouched. Positions where every instance already goes through the same
/// node are left alone. Returns the collapsed nodes in position order.
pub fn apply_collapse<S: GraphStore + ?Sized>(store: &S, collapse: &Collapse) -> Result<Vec<NavNode>> {
    if collapse.instances.len() < 2 {
        return Err(NavError::InvalidCollapse(format!(
            "collapse {} -> {} has {} instance(s)",
            collapse.start,
            collapse.end,
            collapse.instances.len()
        )));
    }

    let width = collapse.labels.len();
    for instance in &collapse.instances {
        if instance.nodes.len() != width
            || instance.start() != Some(collapse.start)
            || instance.end() != Some(collapse.end)
        {
            return Err(NavError::InvalidCollapse(format!(
                "instance {:?} does not run from {} to {} over {} nodes",
                instance.ids(),
                collapse.start,
                collapse.end,
                width
            )));
        }
    }

    let mut replaced: HashMap<NodeId, NodeId> = HashMap::new();
    let mut merged_nodes = Vec::new();

    for position in 1..width.saturating_sub(1) {
        let ids: IndexSet<NodeId> = collapse
            .instances
            .iter()
            .map(|instance| current_id(&replaced, instance.nodes[position].id))
            .collect();
        if ids.len() < 2 {
            continue;
        }

        let ids: Vec<NodeId> = ids.into_iter().collect();
        let merged = merge_nodes(store, &ids)?;
        for id in ids {
            replaced.insert(id, merged.id);
        }
        merged_nodes.push(merged);
    }

    Ok(merged_nodes)
}

/// Merge every Effect node directly following `location` into one.
///
/// Returns `None` when fewer than two effects follow it.
pub fn merge_effects_after_location<S: GraphStore + ?Sized>(
    store: &S,
    location: NodeId,
) -> Result<Option<NavNode>> {
    let node = store.node(location)?;
    if node.kind() != NavKind::Location {
        return Err(NavError::InvalidCollapse(format!(
            "{} is a {} node, not a Location",
            location,
            node.kind()
        )));
    }

    let mut effects = Vec::new();
    for id in store.successors(location)? {
        if store.node(id)?.kind() == NavKind::Effect {
            effects.push(id);
        }
    }

    if effects.len() < 2 {
        return Ok(None);
    }
    merge_nodes(store, &effects).map(Some)
}

/// Run collapse passes from `start`, applying each one, until none is found or the pass
/// budget runs out. Returns the applied collapses in order.
pub fn collapse_until_stable<S: GraphStore + ?Sized>(
    store: &S,
    start: NodeId,
    options: &CollapseOptions,
) -> Result<Vec<Collapse>> {
    let collapser = PatternCollapser::new(store).options(options.clone());
    let mut applied = Vec::new();

    for _ in 0..options.max_passes {
        match collapser.run(start)? {
            Some(collapse) => {
                apply_collapse(store, &collapse)?;
                applied.push(collapse);
            }
            None => return Ok(applied),
        }
    }

    log::warn!(
        "Collapse below {} not stable after {} passes",
        start,
        options.max_passes
    );
    Ok(applied)
}
