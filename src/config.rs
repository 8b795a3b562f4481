use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::error::DimensionalityError;
use crate::pca::PcaOptions;

// ---------------------------------------------------------------------------
// Component pairs
// ---------------------------------------------------------------------------

/// A pair of principal components selecting one 2-D projection, 1-based as on
/// the CLI ("1,2" is PC1 × PC2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentPair {
    pub a: usize,
    pub b: usize,
}

impl ComponentPair {
    /// Zero-based column index of the x component.
    pub fn x_index(&self) -> usize {
        self.a - 1
    }

    /// Zero-based column index of the y component.
    pub fn y_index(&self) -> usize {
        self.b - 1
    }

    /// Check the pair against the number of retained components.
    pub fn validate(&self, retained: usize) -> Result<(), DimensionalityError> {
        if self.a > retained || self.b > retained {
            return Err(DimensionalityError::ComponentPairOutOfRange {
                a: self.a,
                b: self.b,
                retained,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ComponentPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PC{}×PC{}", self.a, self.b)
    }
}

#[derive(Debug, Error)]
#[error("invalid component pair '{0}': expected two distinct 1-based indices like '1,2'")]
pub struct PairParseError(String);

impl FromStr for ComponentPair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PairParseError(s.to_string());
        let (a, b) = s.split_once(',').ok_or_else(invalid)?;
        let a: usize = a.trim().parse().map_err(|_| invalid())?;
        let b: usize = b.trim().parse().map_err(|_| invalid())?;
        if a == 0 || b == 0 || a == b {
            return Err(invalid());
        }
        Ok(ComponentPair { a, b })
    }
}

/// The three projections a standard score-plot panel shows.
pub fn default_pairs() -> Vec<ComponentPair> {
    vec![
        ComponentPair { a: 1, b: 2 },
        ComponentPair { a: 1, b: 3 },
        ComponentPair { a: 2, b: 3 },
    ]
}

// ---------------------------------------------------------------------------
// Plot style
// ---------------------------------------------------------------------------

/// Where the legend box sits on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPosition {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

/// Presentation configuration; every field has a default so a style file only
/// names what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotStyle {
    /// Output image size in pixels.
    pub width: u32,
    pub height: u32,
    /// Sample marker radius in pixels.
    pub point_size: u32,
    /// Centroid marker radius in pixels.
    pub centroid_size: u32,
    /// Opacity of sample markers (0–1).
    pub point_alpha: f64,
    /// Opacity of centroid markers (0–1).
    pub centroid_alpha: f64,
    /// Explicit group → `#RRGGBB` colours; unnamed groups get generated hues.
    pub palette: BTreeMap<String, String>,
    pub legend_position: LegendPosition,
}

impl Default for PlotStyle {
    fn default() -> Self {
        PlotStyle {
            width: 900,
            height: 700,
            point_size: 4,
            centroid_size: 9,
            point_alpha: 0.55,
            centroid_alpha: 0.45,
            palette: BTreeMap::new(),
            legend_position: LegendPosition::UpperRight,
        }
    }
}

impl PlotStyle {
    /// Load style overrides from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading style file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing style file {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// PCA score plots with per-group centroids for metabolomics tables.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input table (.csv, .json or .parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory the PNG score plots are written to
    #[arg(short, long, default_value = "plots")]
    pub out_dir: PathBuf,

    /// Name of the group label column
    #[arg(short, long, default_value = "group")]
    pub group_column: String,

    /// Skip mean-centering the features
    #[arg(long)]
    pub no_center: bool,

    /// Skip scaling the features to unit variance
    #[arg(long)]
    pub no_scale: bool,

    /// Number of principal components to retain
    #[arg(short = 'c', long, default_value_t = 3)]
    pub components: usize,

    /// Component pairs to plot (1-based), e.g. --pairs 1,2 1,3 2,3
    #[arg(long, value_name = "A,B", num_args = 1..)]
    pub pairs: Option<Vec<ComponentPair>>,

    /// JSON file with plot style overrides
    #[arg(long)]
    pub style: Option<PathBuf>,
}

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub group_column: String,
    pub pca: PcaOptions,
    pub n_components: usize,
    pub pairs: Vec<ComponentPair>,
    pub style: PlotStyle,
}

impl Cli {
    /// Resolve CLI flags and the optional style file into a [`Config`].
    pub fn into_config(self) -> Result<Config> {
        let style = match &self.style {
            Some(path) => PlotStyle::from_file(path)?,
            None => PlotStyle::default(),
        };
        Ok(Config {
            input: self.input,
            out_dir: self.out_dir,
            group_column: self.group_column,
            pca: PcaOptions {
                center: !self.no_center,
                scale: !self.no_scale,
            },
            n_components: self.components,
            pairs: self.pairs.unwrap_or_else(default_pairs),
            style,
        })
    }
}
