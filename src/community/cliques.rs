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
// Bron, C.; Kerbosch, J. (1973). "Algorithm 457: finding all cliques of an undirected graph". Communications of the ACM. 16 (9): 575-577. doi:10.1145/362342.362367.

use std::hash::Hash;

use fixedbitset::FixedBitSet;
use foldhash::{HashMap, HashMapExt, HashSet};
use log::debug;
use petgraph::visit::{IntoNeighbors, IntoNodeIdentifiers, NodeCount};

// Threshold for using the u64 adjacency-mask implementation.
const MAX_NODES_FOR_BITSET: usize = 64;

/// Find all maximal cliques in an undirected graph.
///
/// These are the maximal complete subgraphs: every pair of members is
/// adjacent and no further node can be added without breaking that property.
/// An isolated node forms a singleton clique.
///
/// Uses the Bron-Kerbosch algorithm with pivoting over a degeneracy
/// ordering, on `u64` adjacency masks for graphs of at most 64 nodes and on
/// hash sets otherwise. Self-loops and parallel edges are ignored.
///
/// The output is deterministic for a fixed node order: each clique is sorted
/// by the graph's node order and the cliques are sorted lexicographically.
pub fn find_maximal_cliques<G>(graph: G) -> Vec<Vec<G::NodeId>>
where
    G: IntoNodeIdentifiers + IntoNeighbors + NodeCount,
    G::NodeId: Eq + Hash,
{
    let node_count = graph.node_count();
    if node_count == 0 {
        return Vec::new();
    }

    // Work in a dense u32 id space and map back at the end.
    let ids: Vec<G::NodeId> = graph.node_identifiers().collect();
    let mut positions: HashMap<G::NodeId, u32> = HashMap::with_capacity(node_count);
    for (i, &id) in ids.iter().enumerate() {
        positions.insert(id, i as u32);
    }

    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); node_count];
    for (u, &id) in ids.iter().enumerate() {
        for neighbor in graph.neighbors(id) {
            let v = positions[&neighbor];
            if v as usize != u {
                adjacency[u].push(v);
            }
        }
    }
    for neighbors in &mut adjacency {
        neighbors.sort_unstable();
        neighbors.dedup();
    }

    let order = degeneracy_ordering(&adjacency);
    let mut cliques = if node_count <= MAX_NODES_FOR_BITSET {
        bron_kerbosch_bitset(&adjacency, &order)
    } else {
        bron_kerbosch_hashset(&adjacency, &order)
    };
    debug!(
        "enumerated {} maximal cliques over {} nodes",
        cliques.len(),
        node_count
    );

    for clique in &mut cliques {
        clique.sort_unstable();
    }
    cliques.sort();
    cliques
        .into_iter()
        .map(|clique| clique.into_iter().map(|v| ids[v as usize]).collect())
        .collect()
}

/// Order nodes by repeatedly removing a node of minimum remaining degree.
///
/// With this ordering every node has at most `degeneracy(graph)` neighbors
/// later in the order, which bounds the candidate sets handed to the
/// Bron-Kerbosch expansion.
fn degeneracy_ordering(adjacency: &[Vec<u32>]) -> Vec<u32> {
    let node_count = adjacency.len();
    let mut degrees: Vec<usize> = adjacency.iter().map(Vec::len).collect();
    let max_degree = degrees.iter().copied().max().unwrap_or(0);

    // Bucket queue with lazy deletion: a node is pushed again on every
    // decrement and stale entries are skipped when popped.
    let mut bins: Vec<Vec<u32>> = vec![Vec::new(); max_degree + 1];
    for (node, &degree) in degrees.iter().enumerate() {
        bins[degree].push(node as u32);
    }

    let mut order: Vec<u32> = Vec::with_capacity(node_count);
    let mut removed = FixedBitSet::with_capacity(node_count);
    let mut current = 0usize;
    while order.len() < node_count {
        while current < bins.len() && bins[current].is_empty() {
            current += 1;
        }
        if current >= bins.len() {
            break;
        }
        let Some(node) = bins[current].pop() else {
            continue;
        };
        if removed.contains(node as usize) || degrees[node as usize] != current {
            continue;
        }
        removed.insert(node as usize);
        order.push(node);
        for &neighbor in &adjacency[node as usize] {
            let n = neighbor as usize;
            if !removed.contains(n) {
                degrees[n] -= 1;
                bins[degrees[n]].push(neighbor);
                if degrees[n] < current {
                    current = degrees[n];
                }
            }
        }
    }
    order
}

/// Bron-Kerbosch over u64 adjacency masks, for graphs of at most 64 nodes.
fn bron_kerbosch_bitset(adjacency: &[Vec<u32>], order: &[u32]) -> Vec<Vec<u32>> {
    let mut masks: Vec<u64> = vec![0; adjacency.len()];
    for (node, neighbors) in adjacency.iter().enumerate() {
        for &neighbor in neighbors {
            masks[node] |= 1u64 << neighbor;
        }
    }
    let mut rank = vec![0usize; adjacency.len()];
    for (position, &node) in order.iter().enumerate() {
        rank[node as usize] = position;
    }

    let mut cliques: Vec<Vec<u32>> = Vec::new();
    let mut current: Vec<u32> = Vec::new();
    for &v in order {
        // Candidates are the neighbors later in the degeneracy order;
        // earlier neighbors are already-explored exclusions.
        let mut candidates = 0u64;
        let mut excluded = 0u64;
        let mut neighbors = masks[v as usize];
        while neighbors != 0 {
            let n = neighbors.trailing_zeros();
            neighbors &= neighbors - 1;
            if rank[n as usize] > rank[v as usize] {
                candidates |= 1u64 << n;
            } else {
                excluded |= 1u64 << n;
            }
        }
        current.push(v);
        expand_bitset(&masks, &mut cliques, &mut current, candidates, excluded);
        current.pop();
    }
    cliques
}

fn expand_bitset(
    masks: &[u64],
    cliques: &mut Vec<Vec<u32>>,
    current: &mut Vec<u32>,
    mut candidates: u64,
    mut excluded: u64,
) {
    if candidates == 0 && excluded == 0 {
        cliques.push(current.clone());
        return;
    }

    // Pivot on the vertex covering the most candidates; only non-neighbors
    // of the pivot need to spawn recursive calls.
    let mut pivot_neighbors = 0u64;
    let mut best_cover: Option<u32> = None;
    let mut pool = candidates | excluded;
    while pool != 0 {
        let u = pool.trailing_zeros();
        pool &= pool - 1;
        let cover = (masks[u as usize] & candidates).count_ones();
        if best_cover.map_or(true, |best| cover > best) {
            best_cover = Some(cover);
            pivot_neighbors = masks[u as usize];
            if cover == candidates.count_ones() {
                break;
            }
        }
    }

    let mut frontier = candidates & !pivot_neighbors;
    while frontier != 0 {
        let v = frontier.trailing_zeros();
        let bit = 1u64 << v;
        frontier &= !bit;
        let neighbors = masks[v as usize];

        current.push(v);
        expand_bitset(
            masks,
            cliques,
            current,
            candidates & neighbors,
            excluded & neighbors,
        );
        current.pop();

        candidates &= !bit;
        excluded |= bit;
    }
}

/// Bron-Kerbosch over hash-set adjacency, for graphs of more than 64 nodes.
fn bron_kerbosch_hashset(adjacency: &[Vec<u32>], order: &[u32]) -> Vec<Vec<u32>> {
    let sets: Vec<HashSet<u32>> = adjacency
        .iter()
        .map(|neighbors| neighbors.iter().copied().collect())
        .collect();
    let mut rank = vec![0usize; adjacency.len()];
    for (position, &node) in order.iter().enumerate() {
        rank[node as usize] = position;
    }

    let mut cliques: Vec<Vec<u32>> = Vec::new();
    let mut current: Vec<u32> = Vec::new();
    for &v in order {
        let mut candidates: HashSet<u32> = HashSet::default();
        let mut excluded: HashSet<u32> = HashSet::default();
        for &n in &adjacency[v as usize] {
            if rank[n as usize] > rank[v as usize] {
                candidates.insert(n);
            } else {
                excluded.insert(n);
            }
        }
        current.push(v);
        expand_hashset(&sets, &mut cliques, &mut current, candidates, excluded);
        current.pop();
    }
    cliques
}

fn expand_hashset(
    sets: &[HashSet<u32>],
    cliques: &mut Vec<Vec<u32>>,
    current: &mut Vec<u32>,
    mut candidates: HashSet<u32>,
    mut excluded: HashSet<u32>,
) {
    if candidates.is_empty() && excluded.is_empty() {
        cliques.push(current.clone());
        return;
    }

    let pivot = candidates
        .iter()
        .chain(excluded.iter())
        .copied()
        .max_by_key(|&u| sets[u as usize].intersection(&candidates).count());
    let frontier: Vec<u32> = match pivot {
        Some(pivot) => candidates
            .iter()
            .copied()
            .filter(|v| !sets[pivot as usize].contains(v))
            .collect(),
        None => Vec::new(),
    };

    for v in frontier {
        let neighbors = &sets[v as usize];
        current.push(v);
        expand_hashset(
            sets,
            cliques,
            current,
            candidates.intersection(neighbors).copied().collect(),
            excluded.intersection(neighbors).copied().collect(),
        );
        current.pop();

        candidates.remove(&v);
        excluded.insert(v);
    }
}

#[cfg(test)]
mod tests {
    use super::find_maximal_cliques;
    use petgraph::graph::UnGraph;

    fn sorted_cliques(graph: &UnGraph<(), ()>) -> Vec<Vec<usize>> {
        let mut cliques: Vec<Vec<usize>> = find_maximal_cliques(graph)
            .into_iter()
            .map(|clique| {
                let mut nodes: Vec<usize> = clique.into_iter().map(|n| n.index()).collect();
                nodes.sort_unstable();
                nodes
            })
            .collect();
        cliques.sort();
        cliques
    }

    fn complete_edges(nodes: &[u32]) -> Vec<(u32, u32)> {
        let mut edges = Vec::new();
        for (i, &u) in nodes.iter().enumerate() {
            for &v in &nodes[i + 1..] {
                edges.push((u, v));
            }
        }
        edges
    }

    #[test]
    fn empty_graph_has_no_cliques() {
        let graph = UnGraph::<(), ()>::default();
        assert!(find_maximal_cliques(&graph).is_empty());
    }

    #[test]
    fn isolated_nodes_are_singleton_cliques() {
        let mut graph = UnGraph::<(), ()>::default();
        graph.add_node(());
        graph.add_node(());
        assert_eq!(sorted_cliques(&graph), vec![vec![0], vec![1]]);
    }

    #[test]
    fn complete_graph_is_one_clique() {
        let graph = UnGraph::<(), ()>::from_edges(complete_edges(&[0, 1, 2, 3, 4]));
        assert_eq!(sorted_cliques(&graph), vec![vec![0, 1, 2, 3, 4]]);
    }

    #[test]
    fn triangle_with_tail() {
        let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (0, 2), (2, 3)]);
        assert_eq!(sorted_cliques(&graph), vec![vec![0, 1, 2], vec![2, 3]]);
    }

    #[test]
    fn overlapping_complete_graphs() {
        let mut edges = complete_edges(&[0, 1, 2, 3, 4]);
        edges.extend(complete_edges(&[2, 3, 4, 5, 6]));
        let graph = UnGraph::<(), ()>::from_edges(edges);
        assert_eq!(
            sorted_cliques(&graph),
            vec![vec![0, 1, 2, 3, 4], vec![2, 3, 4, 5, 6]]
        );
    }

    #[test]
    fn self_loops_and_parallel_edges_are_ignored() {
        let graph = UnGraph::<(), ()>::from_edges([(0, 1), (0, 1), (1, 1), (1, 2)]);
        assert_eq!(sorted_cliques(&graph), vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn cycle_at_bitset_boundary() {
        let graph = UnGraph::<(), ()>::from_edges((0..64u32).map(|i| (i, (i + 1) % 64)));
        let cliques = sorted_cliques(&graph);
        assert_eq!(cliques.len(), 64);
        assert!(cliques.iter().all(|clique| clique.len() == 2));
    }

    #[test]
    fn large_cycle_takes_hashset_path() {
        let graph = UnGraph::<(), ()>::from_edges((0..100u32).map(|i| (i, (i + 1) % 100)));
        let cliques = sorted_cliques(&graph);
        assert_eq!(cliques.len(), 100);
        assert!(cliques.iter().all(|clique| clique.len() == 2));
    }

    #[test]
    fn large_overlapping_complete_graphs() {
        // Two K10s sharing one node, plus a 60-edge path, so the hash-set
        // implementation runs on a non-trivial structure.
        let first: Vec<u32> = (0..10).collect();
        let second: Vec<u32> = (9..19).collect();
        let mut edges = complete_edges(&first);
        edges.extend(complete_edges(&second));
        edges.extend((19..79u32).map(|i| (i, i + 1)));
        let graph = UnGraph::<(), ()>::from_edges(edges);
        let cliques = sorted_cliques(&graph);
        assert!(cliques.contains(&(0..10usize).collect::<Vec<_>>()));
        assert!(cliques.contains(&(9..19usize).collect::<Vec<_>>()));
        assert_eq!(cliques.len(), 2 + 60);
    }
}
