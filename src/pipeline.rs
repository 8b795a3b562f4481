use anyhow::{Context, Result};
use log::{debug, info};

use crate::centroid::{compute_centroids, merge_with_centroids, CentroidTable, MergedTable};
use crate::color::GroupColorMap;
use crate::config::Config;
use crate::data::loader;
use crate::data::model::SampleTable;
use crate::pca::{compute_pca, PcaResult};
use crate::plot;

// ---------------------------------------------------------------------------
// Batch pipeline: load → decompose → aggregate → merge → render
// ---------------------------------------------------------------------------

/// Everything derived from one input table. Each field is produced by one
/// stage and read-only afterwards.
#[derive(Debug)]
pub struct Analysis {
    pub table: SampleTable,
    pub pca: PcaResult,
    pub centroids: CentroidTable,
    pub merged: MergedTable,
}

/// The computational core: PCA, pair validation, centroids, merge. No I/O,
/// so the whole analysis is testable without touching the filesystem.
pub fn analyze(table: SampleTable, config: &Config) -> Result<Analysis> {
    let pca = compute_pca(&table, config.pca, config.n_components).context("computing PCA")?;
    let retained = pca.n_components();
    debug!(
        "retained {} components, explained variance ratio {:?}",
        retained, pca.explained_variance_ratio
    );

    for pair in &config.pairs {
        pair.validate(retained)?;
    }

    let centroids = compute_centroids(&pca.scores, &table.groups, retained);
    let merged = merge_with_centroids(&pca.scores, &table.groups, &centroids)
        .context("joining samples with centroids")?;

    Ok(Analysis {
        table,
        pca,
        centroids,
        merged,
    })
}

/// Run the full pipeline for one configuration. Halts at the first failing
/// stage; no plots are written for a failed run.
pub fn run(config: &Config) -> Result<()> {
    info!("loading {}", config.input.display());
    let table = loader::load_file(&config.input, &config.group_column)
        .with_context(|| format!("loading {}", config.input.display()))?;
    info!(
        "loaded {} samples × {} features, grouped by '{}' into {} groups",
        table.len(),
        table.n_features(),
        table.group_column,
        table.unique_groups.len()
    );

    let analysis = analyze(table, config)?;
    info!(
        "computed {} centroids over {} components",
        analysis.centroids.len(),
        analysis.centroids.n_components
    );

    let colors = GroupColorMap::new(&analysis.table.unique_groups, &config.style.palette);
    let written = plot::render_all(
        &config.out_dir,
        &analysis.merged,
        &analysis.centroids,
        &colors,
        &config.pairs,
        &analysis.pca.explained_variance_ratio,
        &config.style,
    )?;
    for path in &written {
        info!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_pairs, ComponentPair, PlotStyle};
    use crate::data::loader::from_csv_reader;
    use crate::error::DimensionalityError;
    use crate::pca::PcaOptions;
    use std::path::PathBuf;

    const SCENARIO_CSV: &str = "\
group,citrate,lactate,alanine,glucose
control,1.0,10.0,5.0,0.2
control,1.2,11.0,5.5,0.1
treated,3.0,14.0,4.0,0.9
treated,3.3,13.5,4.2,1.1
qc,2.0,12.0,4.8,0.5
qc,2.1,12.2,4.9,0.6
";

    fn config(n_components: usize, pairs: Vec<ComponentPair>) -> Config {
        Config {
            input: PathBuf::from("unused.csv"),
            out_dir: PathBuf::from("unused"),
            group_column: "group".to_string(),
            pca: PcaOptions::default(),
            n_components,
            pairs,
            style: PlotStyle::default(),
        }
    }

    #[test]
    fn scenario_three_groups_of_two() {
        let table = from_csv_reader(SCENARIO_CSV.as_bytes(), "group").unwrap();
        let analysis = analyze(table, &config(3, default_pairs())).unwrap();

        assert!(analysis.pca.n_components() >= 2);
        assert_eq!(analysis.pca.scores.nrows(), 6);
        assert_eq!(analysis.centroids.len(), 3);
        assert_eq!(analysis.merged.len(), 6);
        for row in &analysis.merged {
            assert_eq!(row.centroid.len(), analysis.centroids.n_components);
            assert!(row.centroid.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn out_of_range_pair_fails_before_aggregation() {
        let table = from_csv_reader(SCENARIO_CSV.as_bytes(), "group").unwrap();
        let err = analyze(table, &config(2, default_pairs())).unwrap_err();
        let dim = err.downcast_ref::<DimensionalityError>().unwrap();
        assert!(matches!(
            dim,
            DimensionalityError::ComponentPairOutOfRange { retained: 2, .. }
        ));
    }

    #[test]
    fn repeated_analysis_is_deterministic() {
        let cfg = config(3, default_pairs());
        let a = analyze(
            from_csv_reader(SCENARIO_CSV.as_bytes(), "group").unwrap(),
            &cfg,
        )
        .unwrap();
        let b = analyze(
            from_csv_reader(SCENARIO_CSV.as_bytes(), "group").unwrap(),
            &cfg,
        )
        .unwrap();

        assert_eq!(a.pca.scores, b.pca.scores);
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.merged, b.merged);
    }
}
