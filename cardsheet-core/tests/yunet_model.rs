use std::path::PathBuf;

use cardsheet_core::{FaceClassifier, FaceDetector, YuNetClassifier};
use cardsheet_utils::config::AppSettings;
use image::{GrayImage, Luma};
use std::sync::Arc;

fn model_path() -> Option<PathBuf> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(cardsheet_utils::config::DEFAULT_MODEL_PATH);
    if path.exists() {
        Some(path)
    } else {
        eprintln!("skipping: model not found at {}", path.display());
        None
    }
}

#[test]
fn blank_frame_has_no_faces() {
    let Some(path) = model_path() else { return };
    let classifier = YuNetClassifier::from_settings(&path, &AppSettings::default()).unwrap();
    let frame = GrayImage::from_pixel(320, 240, Luma([127]));
    assert!(classifier.classify(&frame).unwrap().is_empty());

    let detector = FaceDetector::new(Arc::new(classifier));
    assert!(detector.detect(&frame).unwrap().is_empty());
}
