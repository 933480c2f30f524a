//! Face-region pipeline and card sheet layout.
//!
//! This crate finds a face in each photo with the YuNet ONNX model (run
//! through `tract-onnx`), turns the detector box into a crop of the printed
//! photo's aspect ratio, enhances it, and lays the result out on A4 sheets.

/// Face classifier backends.
pub mod classifier;
/// Equalize-then-classify detection adapter.
pub mod detector;
/// Pipeline error taxonomy.
pub mod error;
/// Card grid geometry.
pub mod layout;
/// ONNX model loading and execution.
pub mod model;
/// Photo pipeline orchestration.
pub mod pipeline;
/// Detection post-processing (score filter, NMS, neighbour votes).
pub mod postprocess;
/// Grayscale frame to model tensor.
pub mod preprocess;
/// Raw detector box to crop rectangle.
pub mod region;
/// Choosing one face out of several.
pub mod selector;
/// Raster page rendering.
pub mod sheet;

pub use classifier::{FaceClassifier, YuNetClassifier};
pub use detector::{DetectionResult, FaceDetector};
pub use error::PipelineError;
pub use layout::{
    Advance, ContentSpacing, DelimiterStyle, GridCursor, Position, PrintDirection, PrintMode,
    text_origin,
};
pub use model::YuNetModel;
pub use pipeline::{
    PhotoPipeline, PhotoResult, PipelineConfig, Presenter, SKIP_CHOICE, TARGET_ASPECT, Variant,
};
pub use postprocess::{BoundingBox, Candidate, Detection, PostprocessConfig, apply_postprocess};
pub use preprocess::{InputSize, PreprocessConfig, PreprocessOutput, preprocess_gray};
pub use region::{RawBox, Rectangle, normalize_region};
pub use selector::select_first;
pub use sheet::{Sheet, load_font};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
