//! ONNX Runtime inference backend.
//!
//! Uses [`ort`] for inference.  The three model inputs, in graph order:
//!
//! | Name        | Shape          | dtype   |
//! |-------------|----------------|---------|
//! | `input_ids` | `[1, seq_len]` | int64   |
//! | `style`     | `[1, style_d]` | float32 |
//! | `speed`     | `[1]`          | float32 |
//!
//! Output 0 is the waveform at [`crate::SAMPLE_RATE`].

use std::{path::Path, sync::Mutex};

use anyhow::{anyhow, Context, Result};
use ort::{session::Session, value::Tensor};
use tracing::info;

use crate::synth::InferenceBackend;

/// One loaded model.  Runs are serialised through the session mutex.
pub struct OnnxBackend {
    session: Mutex<Session>,
}

impl OnnxBackend {
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .context("Failed to create ORT session builder")?
            .commit_from_file(model_path)
            .with_context(|| format!("Cannot load ONNX model: {}", model_path.display()))?;
        info!(path = %model_path.display(), "loaded ONNX model");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl InferenceBackend for OnnxBackend {
    fn infer(&self, token_ids: &[i64], style: &[f32], speed: f32) -> Result<Vec<f32>> {
        let t_input_ids = Tensor::<i64>::from_array(([1usize, token_ids.len()], token_ids.to_vec()))
            .context("Failed to build input_ids tensor")?;
        let t_style = Tensor::<f32>::from_array(([1usize, style.len()], style.to_vec()))
            .context("Failed to build style tensor")?;
        let t_speed = Tensor::<f32>::from_array(([1usize], vec![speed]))
            .context("Failed to build speed tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ORT session mutex poisoned"))?;
        let outputs = session
            .run(ort::inputs![t_input_ids, t_style, t_speed])
            .context("ONNX inference failed")?;

        let (_shape, audio) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract audio tensor")?;
        Ok(audio.to_vec())
    }
}
