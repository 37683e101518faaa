// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Two-layer graph convolutional network producing a connectivity matrix
//!
//! ```text
//! H1 = relu(Â X W1 + b1)        Â = D^-1/2 (A + I) D^-1/2
//! H2 = relu(Â H1 W2 + b2)
//! M  = tanh(H2 Wfcᵀ + bfc)
//! out = (M + Mᵀ) / 2
//! ```
//!
//! Weights are loaded once at startup and shared read-only by every request.

use crate::atlas::Atlas;
use crate::graph::EdgeIndex;
use brainconn_config::ModelConfig;
use brainconn_serialization::{
    load_checkpoint, CheckpointMetadata, CheckpointResult, GcnCheckpoint, GcnShape,
    SerializableTensor, FORMAT_VERSION,
};
use brainconn_structures::{ConnectivityError, ConnectivityMatrix, ConnectivityResult};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::{debug, info, warn};

/// One graph convolution: `Â H W + b`
#[derive(Debug, Clone)]
pub struct GcnLayer {
    /// `in x out`
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl GcnLayer {
    pub fn new(weight: Array2<f64>, bias: Array1<f64>) -> ConnectivityResult<Self> {
        if bias.len() != weight.ncols() {
            return Err(ConnectivityError::Model(format!(
                "GCN bias has {} entries for {} output channels",
                bias.len(),
                weight.ncols()
            )));
        }
        Ok(Self { weight, bias })
    }

    pub fn in_dim(&self) -> usize {
        self.weight.nrows()
    }

    pub fn out_dim(&self) -> usize {
        self.weight.ncols()
    }

    fn forward(&self, adjacency: &Array2<f64>, h: &Array2<f64>) -> Array2<f64> {
        adjacency.dot(&h.dot(&self.weight)) + &self.bias
    }
}

/// Dense layer, weight stored `out x in`
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl Linear {
    pub fn new(weight: Array2<f64>, bias: Array1<f64>) -> ConnectivityResult<Self> {
        if bias.len() != weight.nrows() {
            return Err(ConnectivityError::Model(format!(
                "linear bias has {} entries for {} outputs",
                bias.len(),
                weight.nrows()
            )));
        }
        Ok(Self { weight, bias })
    }

    fn forward(&self, h: &Array2<f64>) -> Array2<f64> {
        h.dot(&self.weight.t()) + &self.bias
    }
}

/// GCN connectivity predictor with a fixed shape
#[derive(Debug, Clone)]
pub struct ConnectivityModel {
    shape: GcnShape,
    conv1: GcnLayer,
    conv2: GcnLayer,
    fc: Linear,
    region_names: Vec<String>,
    source: String,
}

impl ConnectivityModel {
    /// Build a model from a validated checkpoint
    pub fn from_checkpoint(checkpoint: GcnCheckpoint) -> ConnectivityResult<Self> {
        checkpoint
            .validate()
            .map_err(|e| ConnectivityError::Model(format!("invalid checkpoint: {}", e)))?;

        let conv1 = GcnLayer::new(
            to_matrix("conv1_weight", checkpoint.conv1_weight)?,
            to_vector("conv1_bias", checkpoint.conv1_bias)?,
        )?;
        let conv2 = GcnLayer::new(
            to_matrix("conv2_weight", checkpoint.conv2_weight)?,
            to_vector("conv2_bias", checkpoint.conv2_bias)?,
        )?;
        let fc = Linear::new(
            to_matrix("fc_weight", checkpoint.fc_weight)?,
            to_vector("fc_bias", checkpoint.fc_bias)?,
        )?;

        Ok(Self {
            shape: checkpoint.shape,
            conv1,
            conv2,
            fc,
            region_names: checkpoint.region_names,
            source: checkpoint.metadata.source,
        })
    }

    /// Deterministically initialised model that has never been trained.
    ///
    /// Convolution weights are Glorot-uniform with zero biases; the linear
    /// layer draws weight and bias from `U(-1/sqrt(in), 1/sqrt(in))`.
    pub fn untrained(shape: GcnShape, seed: u64) -> ConnectivityResult<Self> {
        let GcnShape {
            num_regions,
            num_features,
            hidden_dim,
        } = shape;
        if num_regions == 0 || num_features == 0 || hidden_dim == 0 {
            return Err(ConnectivityError::Model(format!(
                "model dimensions must be positive, got {:?}",
                shape
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let conv1 = GcnLayer::new(
            glorot_uniform(&mut rng, num_features, hidden_dim),
            Array1::zeros(hidden_dim),
        )?;
        let conv2 = GcnLayer::new(
            glorot_uniform(&mut rng, hidden_dim, hidden_dim),
            Array1::zeros(hidden_dim),
        )?;
        let bound = 1.0 / (hidden_dim as f64).sqrt();
        let fc_weight = Array2::from_shape_simple_fn((num_regions, hidden_dim), || {
            rng.gen_range(-bound..=bound)
        });
        let fc_bias = Array1::from_shape_simple_fn(num_regions, || rng.gen_range(-bound..=bound));
        let fc = Linear::new(fc_weight, fc_bias)?;

        debug!(
            target: "brainconn-connectivity",
            "Initialised untrained model {:?} with seed {}",
            shape, seed
        );
        Ok(Self {
            shape,
            conv1,
            conv2,
            fc,
            region_names: Vec::new(),
            source: format!("untrained: seed {}", seed),
        })
    }

    pub fn with_region_names(mut self, names: Vec<String>) -> Self {
        self.region_names = names;
        self
    }

    pub fn shape(&self) -> GcnShape {
        self.shape
    }

    /// Region names recorded with the weights, empty when unknown
    pub fn region_names(&self) -> &[String] {
        &self.region_names
    }

    /// Where the weights came from (checkpoint metadata or seed)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Snapshot the weights as a checkpoint
    pub fn to_checkpoint(&self, metadata: CheckpointMetadata) -> CheckpointResult<GcnCheckpoint> {
        Ok(GcnCheckpoint {
            version: FORMAT_VERSION,
            shape: self.shape,
            conv1_weight: from_matrix(&self.conv1.weight)?,
            conv1_bias: SerializableTensor::vector(self.conv1.bias.to_vec())?,
            conv2_weight: from_matrix(&self.conv2.weight)?,
            conv2_bias: SerializableTensor::vector(self.conv2.bias.to_vec())?,
            fc_weight: from_matrix(&self.fc.weight)?,
            fc_bias: SerializableTensor::vector(self.fc.bias.to_vec())?,
            region_names: self.region_names.clone(),
            metadata,
        })
    }

    /// Predict the connectivity matrix for `regions x timepoints` features.
    ///
    /// Pure function of the inputs and the loaded weights.
    pub fn compute(
        &self,
        features: &Array2<f64>,
        edges: &EdgeIndex,
    ) -> ConnectivityResult<ConnectivityMatrix> {
        let expected = (self.shape.num_regions, self.shape.num_features);
        if features.dim() != expected {
            return Err(ConnectivityError::Model(format!(
                "model expects {} regions x {} timepoints, got {} x {}",
                expected.0,
                expected.1,
                features.nrows(),
                features.ncols()
            )));
        }
        let adjacency = normalized_adjacency(self.shape.num_regions, edges)?;

        let h1 = self.conv1.forward(&adjacency, features).mapv(relu);
        let h2 = self.conv2.forward(&adjacency, &h1).mapv(relu);
        let raw = self.fc.forward(&h2).mapv(f64::tanh);

        let n = raw.nrows();
        let mut symmetric = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let value = (raw[[i, j]] + raw[[j, i]]) / 2.0;
                symmetric[[i, j]] = value;
                symmetric[[j, i]] = value;
            }
        }
        ConnectivityMatrix::try_new(symmetric)
    }
}

/// `D^-1/2 (A + I) D^-1/2` for a directed edge list.
///
/// Edge `(s, t)` sets `A[t, s] = 1` so node `t` aggregates from `s`; degrees
/// count incoming edges plus the self loop.
pub fn normalized_adjacency(num_nodes: usize, edges: &EdgeIndex) -> ConnectivityResult<Array2<f64>> {
    let mut adjacency = Array2::<f64>::eye(num_nodes);
    for &(source, target) in edges.pairs() {
        if source >= num_nodes || target >= num_nodes {
            return Err(ConnectivityError::Model(format!(
                "edge ({}, {}) references a node outside 0..{}",
                source, target, num_nodes
            )));
        }
        adjacency[[target, source]] = 1.0;
    }

    let inv_sqrt_degree: Vec<f64> = adjacency
        .rows()
        .into_iter()
        .map(|row| 1.0 / row.sum().sqrt())
        .collect();
    for ((i, j), value) in adjacency.indexed_iter_mut() {
        *value *= inv_sqrt_degree[i] * inv_sqrt_degree[j];
    }
    Ok(adjacency)
}

/// Load the model for `atlas`, honouring the untrained fallback flag.
///
/// A checkpoint whose region count differs from the atlas is always an
/// error; the fallback only covers checkpoints that cannot be loaded.
pub fn load_model(
    config: &ModelConfig,
    weights_path: &Path,
    atlas: &Atlas,
) -> ConnectivityResult<ConnectivityModel> {
    let model = match load_checkpoint(weights_path) {
        Ok(checkpoint) => {
            let model = ConnectivityModel::from_checkpoint(checkpoint)?;
            info!(
                target: "brainconn-connectivity",
                "Loaded model weights from {} ({:?}, source: {})",
                weights_path.display(),
                model.shape(),
                model.source()
            );
            model
        }
        Err(load_error) => {
            if !config.allow_untrained_fallback {
                return Err(ConnectivityError::Model(format!(
                    "cannot load model weights from {}: {}",
                    weights_path.display(),
                    load_error
                )));
            }
            let num_features = config.num_features.ok_or_else(|| {
                ConnectivityError::Model(format!(
                    "cannot load model weights from {} ({}) and model.num_features is not set for the untrained fallback",
                    weights_path.display(),
                    load_error
                ))
            })?;
            warn!(
                target: "brainconn-connectivity",
                "Cannot load model weights from {} ({}); using UNTRAINED weights with seed {}. Results are not meaningful.",
                weights_path.display(),
                load_error,
                config.untrained_seed
            );
            let shape = GcnShape {
                num_regions: atlas.num_regions(),
                num_features,
                hidden_dim: config.hidden_dim,
            };
            ConnectivityModel::untrained(shape, config.untrained_seed)?
                .with_region_names(atlas.region_names())
        }
    };

    if model.shape().num_regions != atlas.num_regions() {
        return Err(ConnectivityError::Model(format!(
            "model weights cover {} regions but atlas {} has {}",
            model.shape().num_regions,
            atlas.name(),
            atlas.num_regions()
        )));
    }
    if !model.region_names().is_empty() && model.region_names() != atlas.region_names().as_slice() {
        warn!(
            target: "brainconn-connectivity",
            "Model region names differ from atlas {} region names; continuing by position",
            atlas.name()
        );
    }
    Ok(model)
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn glorot_uniform(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> Array2<f64> {
    let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
    Array2::from_shape_simple_fn((fan_in, fan_out), || rng.gen_range(-bound..=bound))
}

fn to_matrix(name: &str, tensor: SerializableTensor) -> ConnectivityResult<Array2<f64>> {
    let (rows, cols) = match tensor.shape.as_slice() {
        &[rows, cols] => (rows, cols),
        other => {
            return Err(ConnectivityError::Model(format!(
                "{} must be 2-D, got shape {:?}",
                name, other
            )))
        }
    };
    Array2::from_shape_vec((rows, cols), tensor.data)
        .map_err(|e| ConnectivityError::Model(format!("{}: {}", name, e)))
}

fn to_vector(name: &str, tensor: SerializableTensor) -> ConnectivityResult<Array1<f64>> {
    if tensor.shape.len() != 1 || tensor.shape[0] != tensor.data.len() {
        return Err(ConnectivityError::Model(format!(
            "{} must be 1-D, got shape {:?}",
            name, tensor.shape
        )));
    }
    Ok(Array1::from(tensor.data))
}

fn from_matrix(array: &Array2<f64>) -> CheckpointResult<SerializableTensor> {
    SerializableTensor::matrix(array.nrows(), array.ncols(), array.iter().copied().collect())
}
