#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::dataset::ClusterId;
use crate::error::Result;

/// Common interface for trained classifiers (one cluster id per query point).
pub trait Classifier {
    /// Classify a single point.
    fn predict(&self, x: &[f32]) -> Result<ClusterId>;

    /// Classify every point in `data`, failing on the first error.
    #[cfg(not(feature = "parallel"))]
    fn predict_batch(&self, data: &[Vec<f32>]) -> Result<Vec<ClusterId>> {
        data.iter().map(|x| self.predict(x)).collect()
    }

    /// Classify every point in `data` on the rayon pool, failing on any error.
    #[cfg(feature = "parallel")]
    fn predict_batch(&self, data: &[Vec<f32>]) -> Result<Vec<ClusterId>>
    where
        Self: Sync,
    {
        data.par_iter().map(|x| self.predict(x)).collect()
    }
}
