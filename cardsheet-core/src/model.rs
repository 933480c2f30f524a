use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use tract_onnx::prelude::{
    Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, Tensor, TypedFact, TypedOp, tvec,
};

use crate::postprocess::{BoundingBox, Candidate};
use crate::preprocess::InputSize;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

const STRIDES: [usize; 3] = [8, 16, 32];
/// cls, obj, bbox and landmark heads per stride.
const HEADS: usize = 4;

/// YuNet ONNX graph, loaded once and run for every photo.
#[derive(Debug)]
pub struct YuNetModel {
    runnable: RunnableModel,
    input_size: InputSize,
}

impl YuNetModel {
    /// Load and optimize the YuNet graph.
    ///
    /// Falls back to the decluttered (unoptimized) plan when optimization fails,
    /// which is slower but accepts more exotic exports.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: InputSize) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable(path, true) {
            Ok(model) => model,
            Err(opt_err) => {
                warn!(
                    "YuNet model {} failed optimized load ({opt_err:#}); using decluttered graph",
                    path.display()
                );
                load_runnable(path, false).with_context(|| {
                    format!("decluttered YuNet graph failed after optimize error: {opt_err}")
                })?
            }
        };
        debug!(
            "YuNet model {} ready ({}x{})",
            path.display(),
            input_size.width,
            input_size.height
        );

        Ok(Self {
            runnable,
            input_size,
        })
    }

    /// Run the graph on a `[1, 3, H, W]` tensor and decode every anchor.
    ///
    /// Candidates are in model input coordinates and carry the fused
    /// `sqrt(cls * obj)` score. No filtering happens here.
    pub fn run(&self, input: Tensor) -> Result<Vec<Candidate>> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow!("YuNet execution failed: {e}"))?;
        let tensors: Vec<Tensor> = outputs.into_iter().map(|v| v.into_tensor()).collect();
        decode_anchors(&tensors, self.input_size)
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }
}

fn load_runnable(path: &Path, optimized: bool) -> Result<RunnableModel> {
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow!("unable to optimize YuNet graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow!("unable to make YuNet graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow!("unable to type-check YuNet graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow!("unable to declutter YuNet graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow!("unable to make YuNet graph runnable: {e}"))
    }
}

/// Turn the twelve stride heads into one candidate per anchor cell.
pub(crate) fn decode_anchors(outputs: &[Tensor], input_size: InputSize) -> Result<Vec<Candidate>> {
    anyhow::ensure!(
        outputs.len() == STRIDES.len() * HEADS,
        "unexpected number of YuNet outputs: expected {}, got {}",
        STRIDES.len() * HEADS,
        outputs.len()
    );

    let pad_w = (input_size.width as usize).div_ceil(32) * 32;
    let pad_h = (input_size.height as usize).div_ceil(32) * 32;
    let mut candidates = Vec::new();

    for (index, &stride) in STRIDES.iter().enumerate() {
        let cols = pad_w / stride;
        let rows = pad_h / stride;
        let cells = rows * cols;
        let cls = head(outputs, index, "cls", cells)?;
        let obj = head(outputs, index + STRIDES.len(), "obj", cells)?;
        let bbox = head(outputs, index + STRIDES.len() * 2, "bbox", cells * 4)?;

        let stride_f = stride as f32;
        candidates.reserve(cells);
        for row in 0..rows {
            for col in 0..cols {
                let idx = row * cols + col;
                let score = (cls[idx].clamp(0.0, 1.0) * obj[idx].clamp(0.0, 1.0)).sqrt();
                let [dx, dy, dw, dh] = [
                    bbox[idx * 4],
                    bbox[idx * 4 + 1],
                    bbox[idx * 4 + 2],
                    bbox[idx * 4 + 3],
                ];
                let cx = (col as f32 + dx) * stride_f;
                let cy = (row as f32 + dy) * stride_f;
                let width = dw.exp() * stride_f;
                let height = dh.exp() * stride_f;
                candidates.push(Candidate {
                    bbox: BoundingBox {
                        x: cx - width / 2.0,
                        y: cy - height / 2.0,
                        width,
                        height,
                    },
                    score: if score.is_finite() { score } else { 0.0 },
                });
            }
        }
    }

    Ok(candidates)
}

fn head<'a>(outputs: &'a [Tensor], slot: usize, name: &str, expected: usize) -> Result<&'a [f32]> {
    let slice = outputs[slot]
        .as_slice::<f32>()
        .map_err(|e| anyhow!("{name} output not f32: {e}"))?;
    anyhow::ensure!(
        slice.len() == expected,
        "{name} length mismatch: expected {expected}, got {}",
        slice.len()
    );
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn zero_heads(input: InputSize) -> Vec<Tensor> {
        let mut heads: Vec<Vec<Tensor>> = vec![Vec::new(); HEADS];
        for &stride in STRIDES.iter() {
            let cells = (input.width as usize / stride) * (input.height as usize / stride);
            for (head, per_cell) in heads.iter_mut().zip([1usize, 1, 4, 10]) {
                let data = vec![0f32; cells * per_cell];
                head.push(Tensor::from_shape(&[cells, per_cell], &data).unwrap());
            }
        }
        heads.into_iter().flatten().collect()
    }

    #[test]
    fn loading_missing_model_fails() {
        let err = YuNetModel::load("missing.onnx", InputSize::default()).unwrap_err();
        assert!(err.to_string().contains("model file not found"));
    }

    #[test]
    fn invalid_model_produces_useful_error() {
        let mut temp = NamedTempFile::new().expect("temp file");
        temp.write_all(b"not a real onnx file")
            .expect("write mock model");

        let err = YuNetModel::load(temp.path(), InputSize::default())
            .expect_err("invalid ONNX should fail");
        let message = format!("{err:#}");
        assert!(
            message.contains("failed to parse ONNX"),
            "Unexpected error message: {message}"
        );
    }

    #[test]
    fn decodes_one_candidate_per_anchor() {
        let input = InputSize::new(64, 64);
        let candidates = decode_anchors(&zero_heads(input), input).unwrap();
        // 8x8 + 4x4 + 2x2 cells
        assert_eq!(candidates.len(), 64 + 16 + 4);

        let first = candidates[0];
        assert_eq!(first.score, 0.0);
        // exp(0) * stride centred on the first cell
        assert_eq!(first.bbox.width, 8.0);
        assert_eq!(first.bbox.x, -4.0);
    }

    #[test]
    fn heads_are_read_by_position() {
        // Outputs come as cls(8, 16, 32), obj(8, 16, 32), bbox(8, 16, 32), kps(...).
        let input = InputSize::new(64, 64);
        let mut heads = zero_heads(input);
        let mut cls = vec![0f32; 16];
        cls[0] = 1.0;
        let mut obj = vec![0f32; 16];
        obj[0] = 0.25;
        let mut bbox = vec![0f32; 16 * 4];
        bbox[0] = 0.5;
        heads[1] = Tensor::from_shape(&[16, 1], &cls).unwrap();
        heads[4] = Tensor::from_shape(&[16, 1], &obj).unwrap();
        heads[7] = Tensor::from_shape(&[16, 4], &bbox).unwrap();

        let candidates = decode_anchors(&heads, input).unwrap();
        let first_stride16 = candidates[64];
        assert_eq!(first_stride16.score, 0.5);
        assert_eq!(first_stride16.bbox.x, 0.0);
        assert_eq!(first_stride16.bbox.width, 16.0);
        assert_eq!(candidates.iter().filter(|c| c.score > 0.0).count(), 1);
    }

    #[test]
    fn rejects_wrong_head_count() {
        let input = InputSize::new(64, 64);
        let mut heads = zero_heads(input);
        heads.pop();
        assert!(decode_anchors(&heads, input).is_err());
    }
}
