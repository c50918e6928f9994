//! Derives the precedence graph from registered plugins' `before`/`after` declarations.

use crate::traits::Constraint;
use plugchain_common::{ChainError, Result};
use std::collections::HashSet;
use tracing::debug;

/// Plugin ids plus "must run before" edges between them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

/// Anything that carries an id and ordering constraints
pub trait Declared {
    fn id(&self) -> &str;
    fn before(&self) -> &Constraint;
    fn after(&self) -> &Constraint;
}

/// Builds the graph for `plugins`, in registration order.
///
/// Each plugin contributes its `before` edges `(id, b)` followed by its
/// `after` edges `(a, id)`. Self references are dropped. References to ids
/// that are not registered are dropped too, unless `strict` is set, in which
/// case they fail with [`ChainError::UnknownConstraint`].
pub fn build_graph<P: Declared>(plugins: &[P], strict: bool) -> Result<Graph> {
    let mut ids = HashSet::with_capacity(plugins.len());
    let mut nodes = Vec::with_capacity(plugins.len());

    for plugin in plugins {
        if !ids.insert(plugin.id()) {
            return Err(ChainError::DuplicateId(plugin.id().to_string()));
        }
        nodes.push(plugin.id().to_string());
    }

    let mut edges = Vec::new();
    for plugin in plugins {
        let id = plugin.id();
        let before = plugin.before().ids().map(|b| (id, b, b));
        let after = plugin.after().ids().map(|a| (a, id, a));

        for (from, to, target) in before.chain(after) {
            if from == to {
                continue;
            }
            if !ids.contains(target) {
                if strict {
                    return Err(ChainError::UnknownConstraint {
                        plugin: id.to_string(),
                        target: target.to_string(),
                    });
                }
                debug!(plugin = id, target, "Ignoring constraint on unregistered plugin");
                continue;
            }
            edges.push((from.to_string(), to.to_string()));
        }
    }

    Ok(Graph { nodes, edges })
}
