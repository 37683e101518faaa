// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# brainconn-connectivity

Functional connectivity from a 4D brain scan:

1. **Extraction**: resample the atlas onto the scan grid, average each
   region's voxels, z-score every region time course.
2. **Graph**: Pearson correlation between regions, edges where |r| > 0.3.
3. **Model**: two-layer GCN followed by a linear head, symmetrised.
4. **Artifacts**: heatmap, connectome and connection table per request.

## Example

```no_run
use brainconn_config::load_config_or_default;
use brainconn_connectivity::ConnectivityPipeline;
use std::path::Path;

let config = load_config_or_default(None, None)?;
let pipeline = ConnectivityPipeline::from_config(&config)?;
let output = pipeline.process(Path::new("sub-01_bold.nii.gz"))?;
println!("{} regions", output.metrics.num_regions);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod atlas;
pub mod extraction;
pub mod graph;
pub mod metrics;
pub mod model;
pub mod pipeline;

pub use atlas::{
    parse_label_names, Atlas, AtlasProvider, LocalAtlasProvider, Region,
    HARVARD_OXFORD_SUBCORTICAL, HARVARD_OXFORD_SUBCORTICAL_LABELS,
};
pub use extraction::{extract_time_series, resample_labels_nearest, zscore_rows, MIN_STD};
pub use graph::{build_graph, pearson_correlation, threshold_edges, EdgeIndex, CORRELATION_THRESHOLD};
pub use metrics::ConnectivityMetrics;
pub use model::{load_model, normalized_adjacency, ConnectivityModel, GcnLayer, Linear};
pub use pipeline::{check_scan_extension, ConnectivityPipeline, PipelineOutput, SCAN_EXTENSIONS};
