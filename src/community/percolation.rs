// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
// Palla, G.; Derenyi, I.; Farkas, I.; Vicsek, T. (2005). "Uncovering the overlapping community structure of complex networks in nature and society". Nature 435, 814-818. doi:10.1038/nature03607.

//! Overlapping communities via k-clique percolation.
//!
//! The pipeline filters the supplied cliques down to those with at least k
//! distinct nodes, indexes which cliques each node belongs to, connects
//! cliques sharing at least k-1 nodes in a derived percolation graph, and
//! emits the union of each connected component as one community.
//!
//! Clique adjacency is discovered through the membership index rather than
//! by comparing all clique pairs: the candidates for a clique are the other
//! cliques containing any of its nodes. A node contained in many large
//! cliques inflates the candidate sets; this is the dominant cost on dense
//! or heavily overlapping inputs and is not bounded here.

use std::hash::Hash;
use std::iter::FusedIterator;
use std::mem;

use fixedbitset::FixedBitSet;
use foldhash::{HashMap, HashMapExt, HashSet, HashSetExt};
use log::debug;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoNeighbors, IntoNodeIdentifiers, NodeCount};
use thiserror::Error;

use crate::community::cliques::find_maximal_cliques;

/// Invalid parameters for a percolation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PercolationError {
    /// Percolation over cliques of fewer than two nodes is undefined.
    #[error("k must be at least 2, got {0}")]
    InvalidK(usize),
}

/// Find k-clique communities of a graph.
///
/// A k-clique community is the union of all maximal cliques of size at
/// least `k` that can be reached from one another through cliques sharing
/// at least `k - 1` nodes. A clique with no percolation partner forms a
/// community on its own. Communities may overlap in nodes.
///
/// Cliques are obtained from [`find_maximal_cliques`]; use
/// [`k_clique_communities_from_cliques`] to supply precomputed ones.
///
/// Returns an error if `k < 2`. An empty iterator (no maximal clique of
/// size at least `k`) is not an error.
pub fn k_clique_communities<G>(
    graph: G,
    k: usize,
) -> Result<Communities<G::NodeId>, PercolationError>
where
    G: IntoNodeIdentifiers + IntoNeighbors + NodeCount,
    G::NodeId: Eq + Hash,
{
    if k < 2 {
        return Err(PercolationError::InvalidK(k));
    }
    Ok(percolate(k, filter_cliques(k, find_maximal_cliques(graph))))
}

/// Find k-clique communities from a precomputed clique collection.
///
/// `cliques` may be any single-pass sequence of node collections; it is
/// consumed exactly once, before this function returns. Each item is taken
/// to be a maximal clique of the underlying graph; neither pairwise
/// adjacency nor maximality is verified. Cliques with fewer than `k`
/// distinct nodes are discarded.
///
/// Returns an error if `k < 2`, without consuming `cliques`.
pub fn k_clique_communities_from_cliques<N, C, I>(
    k: usize,
    cliques: I,
) -> Result<Communities<N>, PercolationError>
where
    N: Eq + Hash + Clone,
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = N>,
{
    if k < 2 {
        return Err(PercolationError::InvalidK(k));
    }
    Ok(percolate(k, filter_cliques(k, cliques)))
}

fn percolate<N>(k: usize, cliques: Vec<HashSet<N>>) -> Communities<N>
where
    N: Eq + Hash + Clone,
{
    let index = MembershipIndex::build(&cliques);
    let graph = build_percolation_graph(k, &cliques, &index);
    let components = connected_components(&graph);
    debug!("{} percolation components", components.len());
    Communities {
        members: cliques,
        components: components.into_iter(),
    }
}

/// Materialize cliques of at least `k` distinct nodes.
///
/// The position in the returned vector is the clique's identity for the
/// rest of the pipeline; the node sets are only touched again for the
/// shared-node count and the final union.
fn filter_cliques<N, C, I>(k: usize, cliques: I) -> Vec<HashSet<N>>
where
    N: Eq + Hash,
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = N>,
{
    let mut retained: Vec<HashSet<N>> = Vec::new();
    for clique in cliques {
        let members: HashSet<N> = clique.into_iter().collect();
        if members.len() >= k {
            retained.push(members);
        }
    }
    debug!("retained {} cliques of size >= {}", retained.len(), k);
    retained
}

/// Maps every node appearing in a clique to the indices of the cliques
/// containing it. Built in a single pass, read-only afterwards.
struct MembershipIndex<N> {
    lists: HashMap<N, Vec<u32>>,
}

impl<N> MembershipIndex<N>
where
    N: Eq + Hash + Clone,
{
    fn build(cliques: &[HashSet<N>]) -> Self {
        let mut lists: HashMap<N, Vec<u32>> = HashMap::new();
        for (index, clique) in cliques.iter().enumerate() {
            for node in clique {
                lists.entry(node.clone()).or_default().push(index as u32);
            }
        }
        debug!("membership index spans {} nodes", lists.len());
        Self { lists }
    }

    fn cliques_containing(&self, node: &N) -> &[u32] {
        self.lists.get(node).map_or(&[], Vec::as_slice)
    }
}

/// Connect every pair of cliques sharing at least `k - 1` nodes.
///
/// Every filtered clique is a vertex. A clique that gains no edge stays an
/// isolated vertex and becomes a singleton community downstream.
fn build_percolation_graph<N>(
    k: usize,
    cliques: &[HashSet<N>],
    index: &MembershipIndex<N>,
) -> UnGraph<u32, ()>
where
    N: Eq + Hash + Clone,
{
    let clique_count = cliques.len();
    let mut graph: UnGraph<u32, ()> = UnGraph::with_capacity(clique_count, clique_count);
    for i in 0..clique_count {
        graph.add_node(i as u32);
    }

    let mut candidates = FixedBitSet::with_capacity(clique_count);
    for (i, clique) in cliques.iter().enumerate() {
        // Candidate neighbors are every other clique containing one of this
        // clique's nodes. The bit set deduplicates candidates reached
        // through several shared nodes; the exact threshold is applied
        // below. Candidates sharing fewer than k - 1 nodes are expected.
        candidates.clear();
        for node in clique {
            for &other in index.cliques_containing(node) {
                if other as usize != i {
                    candidates.insert(other as usize);
                }
            }
        }
        for other in candidates.ones() {
            if shares_at_least(clique, &cliques[other], k - 1) {
                // Each undirected pair is seen from both endpoints;
                // update_edge keeps the insertion idempotent.
                graph.update_edge(NodeIndex::new(i), NodeIndex::new(other), ());
            }
        }
    }
    debug!(
        "percolation graph has {} cliques and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}

/// True if the sets share at least `threshold` elements, scanning the
/// smaller set and stopping as soon as the threshold is reached.
fn shares_at_least<N>(a: &HashSet<N>, b: &HashSet<N>, threshold: usize) -> bool
where
    N: Eq + Hash,
{
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if small.len() < threshold {
        return false;
    }
    let mut shared = 0;
    for node in small {
        if large.contains(node) {
            shared += 1;
            if shared >= threshold {
                return true;
            }
        }
    }
    false
}

/// Group clique indices into connected components of the percolation graph,
/// ordered by each component's smallest clique index.
fn connected_components(graph: &UnGraph<u32, ()>) -> Vec<Vec<u32>> {
    let clique_count = graph.node_count();
    let mut union_find: UnionFind<u32> = UnionFind::new(clique_count);
    for edge in graph.edge_references() {
        union_find.union(edge.source().index() as u32, edge.target().index() as u32);
    }

    let labels = union_find.into_labeling();
    let mut slots: HashMap<u32, usize> = HashMap::with_capacity(clique_count);
    let mut components: Vec<Vec<u32>> = Vec::new();
    for (clique, &label) in labels.iter().enumerate() {
        let slot = *slots.entry(label).or_insert(components.len());
        if slot == components.len() {
            components.push(Vec::new());
        }
        components[slot].push(clique as u32);
    }
    components
}

/// Iterator over the communities of one percolation run.
///
/// Component membership is fixed when the pipeline runs, but the union of a
/// component's clique node sets is only materialized when the community is
/// yielded, so a caller that stops early never pays for the remaining
/// unions. Once exhausted the iterator stays empty; producing the
/// communities again means rerunning the pipeline from the start.
///
/// No ordering is guaranteed between communities.
pub struct Communities<N> {
    members: Vec<HashSet<N>>,
    components: std::vec::IntoIter<Vec<u32>>,
}

impl<N> Iterator for Communities<N>
where
    N: Eq + Hash,
{
    type Item = HashSet<N>;

    fn next(&mut self) -> Option<Self::Item> {
        let component = self.components.next()?;
        let mut community = HashSet::new();
        for clique in component {
            // Components partition the cliques, so every node set is
            // consumed at most once and can be moved out of the side table.
            community.extend(mem::take(&mut self.members[clique as usize]));
        }
        Some(community)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.components.size_hint()
    }
}

impl<N> ExactSizeIterator for Communities<N> where N: Eq + Hash {}

impl<N> FusedIterator for Communities<N> where N: Eq + Hash {}
