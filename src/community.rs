// Licensed under the Apache License, Version 2.0 (the "License"); you may
// not use this file except in compliance with the License. You may obtain
// a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations
// under the License.

//! Community detection by clique percolation.
//!
//! [`cliques`] enumerates maximal cliques; [`percolation`] turns any
//! collection of cliques (enumerated or precomputed) into overlapping
//! k-clique communities.

pub mod cliques;
pub mod percolation;
