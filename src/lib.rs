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

//! Overlapping community detection via k-clique percolation.
//!
//! Two cliques of size at least `k` percolate when they share at least
//! `k - 1` nodes. A k-clique community is the union of all cliques in one
//! connected component of the derived percolation graph (Palla et al.,
//! "Uncovering the overlapping community structure of complex networks in
//! nature and society", Nature 435, 814-818, 2005).
//!
//! Communities may overlap in nodes; this is the point of the method.
//!
//! ```
//! use clique_percolation::k_clique_communities;
//! use petgraph::graph::UnGraph;
//!
//! // Two complete graphs on five nodes sharing the nodes {2, 3, 4}.
//! let mut edges = Vec::new();
//! for group in [[0u32, 1, 2, 3, 4], [2, 3, 4, 5, 6]] {
//!     for (i, &u) in group.iter().enumerate() {
//!         for &v in &group[i + 1..] {
//!             edges.push((u, v));
//!         }
//!     }
//! }
//! let graph = UnGraph::<(), ()>::from_edges(edges);
//!
//! let communities: Vec<_> = k_clique_communities(&graph, 4)?.collect();
//! assert_eq!(communities.len(), 1);
//! assert_eq!(communities[0].len(), 7);
//! # Ok::<(), clique_percolation::PercolationError>(())
//! ```

pub mod community;

pub use community::cliques::find_maximal_cliques;
pub use community::percolation::{
    k_clique_communities, k_clique_communities_from_cliques, Communities, PercolationError,
};
