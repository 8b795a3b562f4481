use std::collections::BTreeMap;

use ndarray::Array2;

use crate::error::LookupError;

// ---------------------------------------------------------------------------
// Group centroids in component space, and the sample ⋈ centroid join
// ---------------------------------------------------------------------------

/// Per-group mean score vectors, keyed by group label. Derived once from a
/// score matrix; sorted iteration order comes from the `BTreeMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidTable {
    /// Score dimensions averaged per group.
    pub n_components: usize,
    centroids: BTreeMap<String, Vec<f64>>,
}

impl CentroidTable {
    /// Centroid coordinates for a group, if present.
    pub fn get(&self, group: &str) -> Option<&[f64]> {
        self.centroids.get(group).map(|c| c.as_slice())
    }

    /// Number of distinct groups.
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    /// Whether the table holds no groups.
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Iterate `(group, centroid)` in sorted group order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.centroids.iter().map(|(g, c)| (g.as_str(), c.as_slice()))
    }
}

/// Average the first `n_components` score dimensions over each group.
///
/// `groups[i]` labels score row `i`; rows with the same label are averaged
/// per dimension.
pub fn compute_centroids(
    scores: &Array2<f64>,
    groups: &[String],
    n_components: usize,
) -> CentroidTable {
    let n_components = n_components.min(scores.ncols());

    let mut sums: BTreeMap<String, (Vec<f64>, usize)> = BTreeMap::new();
    for (row, group) in scores.rows().into_iter().zip(groups) {
        let entry = sums
            .entry(group.clone())
            .or_insert_with(|| (vec![0.0; n_components], 0));
        for (acc, &v) in entry.0.iter_mut().zip(row.iter()) {
            *acc += v;
        }
        entry.1 += 1;
    }

    let centroids = sums
        .into_iter()
        .map(|(group, (sum, count))| {
            let mean = sum.into_iter().map(|s| s / count as f64).collect();
            (group, mean)
        })
        .collect();

    CentroidTable {
        n_components,
        centroids,
    }
}

/// One row of the merged table: a sample's scores with its group centroid
/// attached.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub group: String,
    pub score: Vec<f64>,
    pub centroid: Vec<f64>,
}

pub type MergedTable = Vec<MergedRow>;

/// Attach each sample's group centroid to its score row (stable join: output
/// order equals input row order).
///
/// A missing group means the centroid table was not derived from this
/// grouping.
pub fn merge_with_centroids(
    scores: &Array2<f64>,
    groups: &[String],
    centroids: &CentroidTable,
) -> Result<MergedTable, LookupError> {
    let mut merged = Vec::with_capacity(groups.len());
    for (row, group) in scores.rows().into_iter().zip(groups) {
        let centroid = centroids
            .get(group)
            .ok_or_else(|| LookupError::UnknownGroup(group.clone()))?;
        merged.push(MergedRow {
            group: group.clone(),
            score: row.iter().copied().collect(),
            centroid: centroid.to_vec(),
        });
    }
    Ok(merged)
}
