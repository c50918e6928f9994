//! Depth-first topological sort over an explicit node list and edge list.
//!
//! The order is a pure function of the input ordering: roots are visited from
//! the last node to the first, and each node's out-edges in the order they were
//! first supplied. Nodes are placed into the output back to front as they
//! finish (reverse postorder), so every edge `(from, to)` ends up with `from`
//! ahead of `to`.
//!
//! The walk uses an explicit stack, so deep graphs do not grow the call stack.

use plugchain_common::{ChainError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Sorts `nodes` so that for every edge `(from, to)`, `from` precedes `to`.
///
/// Fails with [`ChainError::UnknownNode`] if an edge references a value not in
/// `nodes`, and with [`ChainError::CyclicDependency`] if the edges form a cycle.
pub fn sort<T>(nodes: &[T], edges: &[(T, T)]) -> Result<Vec<T>>
where
    T: Eq + Hash + Clone + Debug,
{
    let index_of = node_indices(nodes);

    for (from, to) in edges {
        for node in [from, to] {
            if !index_of.contains_key(node) {
                return Err(ChainError::UnknownNode(format!("{:?}", node)));
            }
        }
    }

    let outgoing = outgoing_edges(nodes.len(), edges, &index_of);
    let mut sorter = Sorter {
        nodes,
        index_of: &index_of,
        outgoing: &outgoing,
        sorted: vec![None; nodes.len()],
        cursor: nodes.len(),
        visited: vec![false; nodes.len()],
    };

    for i in (0..nodes.len()).rev() {
        if !sorter.visited[i] {
            sorter.visit(i)?;
        }
    }

    Ok(sorter.sorted.into_iter().flatten().collect())
}

/// Maps each node to its position. A repeated value maps to its last position.
fn node_indices<T: Eq + Hash>(nodes: &[T]) -> HashMap<&T, usize> {
    nodes.iter().enumerate().map(|(i, node)| (node, i)).collect()
}

/// Out-sets per node, deduplicated, in first-insertion order.
fn outgoing_edges<T: Eq + Hash>(
    len: usize,
    edges: &[(T, T)],
    index_of: &HashMap<&T, usize>,
) -> Vec<Vec<usize>> {
    let mut outgoing = vec![Vec::new(); len];
    let mut seen = HashSet::with_capacity(edges.len());

    for (from, to) in edges {
        let (from, to) = (index_of[from], index_of[to]);
        if seen.insert((from, to)) {
            outgoing[from].push(to);
        }
    }

    outgoing
}

struct Sorter<'a, T> {
    nodes: &'a [T],
    index_of: &'a HashMap<&'a T, usize>,
    outgoing: &'a [Vec<usize>],
    sorted: Vec<Option<T>>,
    cursor: usize,
    visited: Vec<bool>,
}

impl<'a, T> Sorter<'a, T>
where
    T: Eq + Hash + Clone + Debug,
{
    fn children(&self, index: usize) -> &'a [usize] {
        let outgoing: &'a [Vec<usize>] = self.outgoing;
        &outgoing[self.index_of[&self.nodes[index]]]
    }

    fn place(&mut self, index: usize) {
        self.cursor -= 1;
        self.sorted[self.cursor] = Some(self.nodes[index].clone());
    }

    /// Visits an unvisited root with no ancestors in progress.
    fn visit(&mut self, root: usize) -> Result<()> {
        let nodes: &'a [T] = self.nodes;
        // (node index, position of the next child to visit)
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut ancestors: HashSet<&'a T> = HashSet::new();

        self.visited[root] = true;
        if self.children(root).is_empty() {
            self.place(root);
            return Ok(());
        }
        ancestors.insert(&nodes[root]);
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (index, position) = *frame;

            let Some(&child) = self.children(index).get(position) else {
                stack.pop();
                ancestors.remove(&nodes[index]);
                self.place(index);
                continue;
            };
            frame.1 += 1;

            let node = &nodes[child];
            if ancestors.contains(node) {
                return Err(ChainError::CyclicDependency(format!("{:?}", node)));
            }
            if self.visited[child] {
                continue;
            }
            self.visited[child] = true;

            if self.children(child).is_empty() {
                self.place(child);
            } else {
                ancestors.insert(node);
                stack.push((child, 0));
            }
        }

        Ok(())
    }
}
