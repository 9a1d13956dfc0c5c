//! Gabriel-graph hyperplane classifiers.
//!
//! This module trains a linear-ensemble classifier directly from the geometry of
//! the training set. No optimization is involved: every separator comes from a
//! pair of neighboring points with different labels.
//!
//! ## Pipeline
//!
//! ### 1. Gabriel graph
//!
//! Two points are connected iff no third point lies inside the sphere having the
//! pair as diameter. Edges whose endpoints carry different labels are *boundary*
//! (support) edges: they straddle the decision boundary.
//!
//! ### 2. Quality filter
//!
//! A vertex's quality is the fraction of its neighbors sharing its label. Vertices
//! scoring below `mean - tolerance * std` of their own cluster are treated as noise
//! and removed, along with the boundary edges they induced.
//!
//! ### 3. Experts
//!
//! Each surviving boundary edge becomes a hyperplane through (or near) its
//! midpoint. See [`ExpertStrategy`] for the available normal/bias rules.
//!
//! ### 4. Gating
//!
//! A query is scored by every expert, weighted by proximity to the expert's
//! midpoint ([`Gating::Soft`]), or by the nearest expert alone ([`Gating::Hard`]).
//! The sign of the score is mapped to a cluster id through a [`ClusterIdBimap`]
//! calibrated at training time.
//!
//! **Assumptions**:
//! - Two classes for the gated ensemble (use [`NearestSupport`] for more)
//! - Uniform dimensionality
//! - Data small enough for an O(n³) graph build
//!
//! ## Usage
//!
//! ```rust
//! use hyperchip::chip::{Chip, Classifier, ClusterId};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![5.0, 0.0],
//!     vec![5.0, 1.0],
//! ];
//! let labels: Vec<ClusterId> = ["A", "A", "B", "B"].into_iter().map(Into::into).collect();
//!
//! let model = Chip::new().with_seed(42).fit(&data, &labels).unwrap();
//! assert_eq!(model.predict(&[0.0, 0.5]).unwrap(), ClusterId::from("A"));
//! assert_eq!(model.predict(&[5.0, 0.5]).unwrap(), ClusterId::from("B"));
//! ```

mod bimap;
mod dataset;
mod expert;
mod filter;
mod gating;
mod geometry;
mod graph;
mod metrics;
mod nearest;
mod traits;
mod train;

pub use bimap::{ClusterIdBimap, Polarity, VoteTally};
pub use dataset::{Adjacent, Cluster, ClusterId, Dataset, Edge, Vertex, VertexId};
pub use expert::{Expert, ExpertFactory, ExpertId, ExpertStrategy};
pub use filter::{FilterReport, QualityFilter, QualityStats};
pub use gating::{Gating, GatingClassifier, MIN_MAX_DISTANCE};
pub use geometry::squared_distance;
pub use graph::{build_gabriel_graph, gabriel_edges, GabrielGraph};
pub use metrics::{accuracy, vertexwise_correctness};
pub use nearest::NearestSupport;
pub use traits::Classifier;
pub use train::{Chip, ChipModel, ChipParams};
