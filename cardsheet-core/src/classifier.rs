//! Face classifier backends.
//!
//! The pipeline only needs "give me face boxes for this equalized frame"; the
//! [`FaceClassifier`] trait is that seam. [`YuNetClassifier`] is the production
//! backend; tests plug in fixed-answer stubs.

use std::{fmt::Debug, path::Path};

use anyhow::Result;
use cardsheet_utils::{config::AppSettings, timing_guard};
use image::GrayImage;

use crate::{
    model::YuNetModel,
    postprocess::{PostprocessConfig, apply_postprocess},
    preprocess::{PreprocessConfig, preprocess_gray},
    region::RawBox,
};

/// Something that finds faces in an already equalized grayscale frame.
pub trait FaceClassifier: Send + Sync + Debug {
    /// Candidate boxes in classifier order. An empty vector means no face.
    fn classify(&self, frame: &GrayImage) -> Result<Vec<RawBox>>;
}

/// YuNet ONNX model with its pre- and postprocessing settings.
#[derive(Debug)]
pub struct YuNetClassifier {
    model: YuNetModel,
    preprocess: PreprocessConfig,
    postprocess: PostprocessConfig,
}

impl YuNetClassifier {
    /// Load the model at `model_path`.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        preprocess: PreprocessConfig,
        postprocess: PostprocessConfig,
    ) -> Result<Self> {
        let model = YuNetModel::load(model_path, preprocess.input_size)?;
        Ok(Self {
            model,
            preprocess,
            postprocess,
        })
    }

    /// Load the model and tuning described by `settings`.
    pub fn from_settings(model_path: &Path, settings: &AppSettings) -> Result<Self> {
        Self::new(
            model_path,
            PreprocessConfig::from(&settings.input),
            PostprocessConfig::from(&settings.detection),
        )
    }
}

impl FaceClassifier for YuNetClassifier {
    fn classify(&self, frame: &GrayImage) -> Result<Vec<RawBox>> {
        let prep = preprocess_gray(frame, &self.preprocess)?;
        let candidates = {
            let _guard = timing_guard("cardsheet_core::inference", log::Level::Debug);
            self.model.run(prep.tensor)?
        };
        let faces = apply_postprocess(&candidates, prep.scale_x, prep.scale_y, &self.postprocess);
        log::debug!(
            "{} anchors -> {} faces ({}x{})",
            candidates.len(),
            faces.len(),
            prep.original_size.0,
            prep.original_size.1
        );

        Ok(faces
            .into_iter()
            .map(|face| {
                RawBox::new(
                    face.bbox.x.round() as i32,
                    face.bbox.y.round() as i32,
                    face.bbox.width.round() as i32,
                    face.bbox.height.round() as i32,
                )
            })
            .collect())
    }
}
