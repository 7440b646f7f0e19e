//! Style vector store — per-voice style matrices and row selection.
//!
//! Every voice owns a `rows × cols` matrix; a style vector is one row.
//! Rows are indexed modulo the row count, so any integer (negative
//! included) selects a valid row.

use std::{collections::HashMap, path::Path};

use anyhow::{ensure, Context};
use tracing::debug;

use crate::{
    error::{Result, TtsError},
    npz::{load_npz, NpyArray},
};

/// `(i % n + n) % n`.
pub fn normalize_row(row: i64, rows: usize) -> usize {
    let n = rows.max(1) as i64;
    row.rem_euclid(n) as usize
}

/// One voice's style matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl StyleMatrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> anyhow::Result<Self> {
        ensure!(rows > 0 && cols > 0, "Style matrix must be non-empty, got {}×{}", rows, cols);
        ensure!(
            data.len() == rows * cols,
            "Style matrix {}×{} needs {} values, got {}",
            rows,
            cols,
            rows * cols,
            data.len()
        );
        Ok(Self { rows, cols, data })
    }

    /// Accepts `[rows, cols]` or `[rows, 1, cols]` arrays.
    pub fn from_npy(array: NpyArray) -> anyhow::Result<Self> {
        let (rows, cols) = match array.shape.as_slice() {
            [rows, cols] => (*rows, *cols),
            [rows, 1, cols] => (*rows, *cols),
            other => anyhow::bail!("Unsupported style matrix shape {:?}", other),
        };
        Self::new(rows, cols, array.data)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, row: i64) -> &[f32] {
        let i = normalize_row(row, self.rows);
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

/// All voices of one archive.
#[derive(Debug, Clone, Default)]
pub struct StyleStore {
    voices: HashMap<String, StyleMatrix>,
    row_offset: i64,
}

impl StyleStore {
    /// Load every voice in an `.npz` archive.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let arrays = load_npz(path)?;
        let mut voices = HashMap::with_capacity(arrays.len());
        for (name, array) in arrays {
            let matrix = StyleMatrix::from_npy(array)
                .with_context(|| format!("Voice '{}' in {}", name, path.display()))?;
            voices.insert(name, matrix);
        }
        debug!(voices = voices.len(), path = %path.display(), "loaded style store");
        Ok(Self {
            voices,
            row_offset: 0,
        })
    }

    pub fn from_matrices<I, S>(matrices: I) -> Self
    where
        I: IntoIterator<Item = (S, StyleMatrix)>,
        S: Into<String>,
    {
        Self {
            voices: matrices.into_iter().map(|(k, m)| (k.into(), m)).collect(),
            row_offset: 0,
        }
    }

    /// Shift applied to token-count row selection.
    pub fn with_row_offset(mut self, offset: i64) -> Self {
        self.row_offset = offset;
        self
    }

    /// Voice names, sorted.
    pub fn voices(&self) -> Vec<String> {
        let mut names: Vec<String> = self.voices.keys().cloned().collect();
        names.sort();
        names
    }

    fn matrix(&self, voice: &str) -> Result<&StyleMatrix> {
        self.voices.get(voice).ok_or_else(|| TtsError::UnknownVoice {
            voice: voice.to_string(),
            available: self.voices(),
        })
    }

    pub fn load_row(&self, voice: &str, row: i64) -> Result<Vec<f32>> {
        Ok(self.matrix(voice)?.row(row).to_vec())
    }

    /// Row `max(1, token_count - 1) + offset`: longer inputs index further in.
    pub fn row_for_token_count(&self, token_count: usize) -> i64 {
        (token_count.saturating_sub(1).max(1) as i64).saturating_add(self.row_offset)
    }

    pub fn load_for_token_count(&self, voice: &str, token_count: usize) -> Result<Vec<f32>> {
        self.load_row(voice, self.row_for_token_count(token_count))
    }

    /// `base × (1 − t) + target × t`, `t` clamped to `[0, 1]`.
    pub fn load_blended(
        &self,
        voice: &str,
        target_row: i64,
        blend: f32,
        base_row: i64,
    ) -> Result<Vec<f32>> {
        let matrix = self.matrix(voice)?;
        let t = if blend.is_nan() { 0.0 } else { blend.clamp(0.0, 1.0) };
        Ok(matrix
            .row(base_row)
            .iter()
            .zip(matrix.row(target_row))
            .map(|(base, target)| base * (1.0 - t) + target * t)
            .collect())
    }
}
