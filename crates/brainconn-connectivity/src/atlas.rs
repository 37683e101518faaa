// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Anatomical parcellations
//!
//! An [`Atlas`] is a label volume plus the ordered list of regions that
//! actually occur in it. Atlases are read once from a local cache directory
//! laid out as:
//!
//! ```text
//! <cache_dir>/<atlas_name>/atlas.nii.gz   (or atlas.nii)
//! <cache_dir>/<atlas_name>/labels.txt     (line N names label N, line 0 is background)
//! ```

use brainconn_io::load_label_volume;
use brainconn_structures::{ConnectivityError, ConnectivityResult, LabelVolume};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Harvard-Oxford subcortical, max-probability, 25% threshold, 2mm
pub const HARVARD_OXFORD_SUBCORTICAL: &str = "harvard-oxford-sub-maxprob-thr25-2mm";

/// Label names of the Harvard-Oxford subcortical atlas, indexed by label value
pub const HARVARD_OXFORD_SUBCORTICAL_LABELS: [&str; 22] = [
    "Background",
    "Left Cerebral White Matter",
    "Left Cerebral Cortex",
    "Left Lateral Ventrical",
    "Left Thalamus",
    "Left Caudate",
    "Left Putamen",
    "Left Pallidum",
    "Brain-Stem",
    "Left Hippocampus",
    "Left Amygdala",
    "Left Accumbens",
    "Right Cerebral White Matter",
    "Right Cerebral Cortex",
    "Right Lateral Ventricle",
    "Right Thalamus",
    "Right Caudate",
    "Right Putamen",
    "Right Pallidum",
    "Right Hippocampus",
    "Right Amygdala",
    "Right Accumbens",
];

const VOLUME_FILES: [&str; 2] = ["atlas.nii.gz", "atlas.nii"];
const LABELS_FILE: &str = "labels.txt";

/// One parcel of an atlas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub label: i32,
    pub name: String,
}

/// Label volume plus the regions present in it, in ascending label order
#[derive(Debug, Clone)]
pub struct Atlas {
    name: String,
    volume: LabelVolume,
    regions: Vec<Region>,
}

impl Atlas {
    /// Build an atlas from a label volume and names indexed by label value.
    ///
    /// Only labels that occur in the volume become regions. Negative labels
    /// and labels without a name are rejected.
    pub fn new(name: &str, volume: LabelVolume, label_names: &[String]) -> ConnectivityResult<Self> {
        let mut present: BTreeMap<i32, usize> = BTreeMap::new();
        for &label in volume.labels().iter() {
            if label < 0 {
                return Err(ConnectivityError::Data(format!(
                    "atlas {} contains negative label {}",
                    name, label
                )));
            }
            if label != 0 {
                *present.entry(label).or_insert(0) += 1;
            }
        }

        let mut regions = Vec::with_capacity(present.len());
        for (&label, &voxels) in &present {
            let region_name = label_names.get(label as usize).ok_or_else(|| {
                ConnectivityError::Data(format!(
                    "atlas {} uses label {} but only {} names are defined",
                    name,
                    label,
                    label_names.len()
                ))
            })?;
            debug!(
                target: "brainconn-connectivity",
                "Atlas region {} '{}' has {} voxels",
                label, region_name, voxels
            );
            regions.push(Region {
                label,
                name: region_name.clone(),
            });
        }

        if regions.is_empty() {
            return Err(ConnectivityError::Data(format!(
                "atlas {} has no labelled regions",
                name
            )));
        }
        for (label, unused) in label_names.iter().enumerate().skip(1) {
            if !present.contains_key(&(label as i32)) {
                debug!(
                    target: "brainconn-connectivity",
                    "Atlas {} declares label {} '{}' with no voxels, skipping",
                    name, label, unused
                );
            }
        }

        Ok(Self {
            name: name.to_string(),
            volume,
            regions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volume(&self) -> &LabelVolume {
        &self.volume
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|r| r.name.clone()).collect()
    }

    pub fn labels(&self) -> Vec<i32> {
        self.regions.iter().map(|r| r.label).collect()
    }

    /// Centre of mass of each region in world (mm) coordinates, in region order
    pub fn region_centroids(&self) -> Vec<[f64; 3]> {
        let index: BTreeMap<i32, usize> = self
            .regions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.label, i))
            .collect();
        let mut sums = vec![([0.0f64; 3], 0usize); self.regions.len()];

        for ((x, y, z), label) in self.volume.labels().indexed_iter() {
            if let Some(&i) = index.get(label) {
                let (sum, count) = &mut sums[i];
                sum[0] += x as f64;
                sum[1] += y as f64;
                sum[2] += z as f64;
                *count += 1;
            }
        }

        sums.into_iter()
            .map(|(sum, count)| {
                let n = count.max(1) as f64;
                self.volume.affine().apply([sum[0] / n, sum[1] / n, sum[2] / n])
            })
            .collect()
    }
}

/// Source of the parcellation used by the pipeline
pub trait AtlasProvider: Send + Sync {
    fn get_atlas(&self) -> ConnectivityResult<Atlas>;
}

/// Reads atlases from a local cache directory
#[derive(Debug, Clone)]
pub struct LocalAtlasProvider {
    cache_dir: PathBuf,
    name: String,
}

impl LocalAtlasProvider {
    pub fn new<P: Into<PathBuf>>(cache_dir: P, name: &str) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            name: name.to_string(),
        }
    }

    pub fn atlas_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.name)
    }

    fn volume_path(&self) -> ConnectivityResult<PathBuf> {
        let dir = self.atlas_dir();
        VOLUME_FILES
            .iter()
            .map(|file| dir.join(file))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                ConnectivityError::Data(format!(
                    "atlas {} not found: expected {} or {} in {}",
                    self.name,
                    VOLUME_FILES[0],
                    VOLUME_FILES[1],
                    dir.display()
                ))
            })
    }

    fn label_names(&self) -> ConnectivityResult<Vec<String>> {
        let path = self.atlas_dir().join(LABELS_FILE);
        if path.is_file() {
            let text = fs::read_to_string(&path).map_err(|e| {
                ConnectivityError::Data(format!("cannot read {}: {}", path.display(), e))
            })?;
            return Ok(parse_label_names(&text));
        }
        if self.name == HARVARD_OXFORD_SUBCORTICAL {
            return Ok(HARVARD_OXFORD_SUBCORTICAL_LABELS
                .iter()
                .map(|s| s.to_string())
                .collect());
        }
        Err(ConnectivityError::Data(format!(
            "atlas {} has no {}",
            self.name,
            path.display()
        )))
    }
}

impl AtlasProvider for LocalAtlasProvider {
    fn get_atlas(&self) -> ConnectivityResult<Atlas> {
        let volume_path = self.volume_path()?;
        let volume = load_label_volume(&volume_path)?;
        let names = self.label_names()?;
        let atlas = Atlas::new(&self.name, volume, &names)?;
        info!(
            target: "brainconn-connectivity",
            "Loaded atlas {} from {} with {} regions",
            atlas.name(),
            volume_path.display(),
            atlas.num_regions()
        );
        Ok(atlas)
    }
}

/// Parse `labels.txt`: one name per line, line index = label value.
///
/// Trailing blank and `#` lines are dropped; names are trimmed.
pub fn parse_label_names(text: &str) -> Vec<String> {
    let mut lines: Vec<&str> = text.lines().collect();
    while let Some(last) = lines.last() {
        let trimmed = last.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            lines.pop();
        } else {
            break;
        }
    }
    lines.into_iter().map(|line| line.trim().to_string()).collect()
}
