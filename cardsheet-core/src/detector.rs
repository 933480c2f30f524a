use std::sync::Arc;

use anyhow::Result;
use cardsheet_utils::{equalize_gray, timing_guard};
use image::GrayImage;

use crate::classifier::FaceClassifier;
use crate::region::RawBox;

/// Candidate boxes for one photo, in the order the classifier reported them.
pub type DetectionResult = Vec<RawBox>;

/// Adapter between the pipeline and a classifier backend.
///
/// Every frame is globally histogram-equalized before it reaches the backend,
/// whatever enhancement the photo later receives.
#[derive(Debug, Clone)]
pub struct FaceDetector {
    classifier: Arc<dyn FaceClassifier>,
}

impl FaceDetector {
    pub fn new(classifier: Arc<dyn FaceClassifier>) -> Self {
        Self { classifier }
    }

    /// Find faces in a grayscale frame. No face is `Ok(vec![])`.
    pub fn detect(&self, gray: &GrayImage) -> Result<DetectionResult> {
        let _guard = timing_guard("cardsheet_core::detect", log::Level::Debug);
        let equalized = equalize_gray(gray);
        self.classifier.classify(&equalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recording {
        seen: Mutex<Vec<GrayImage>>,
        answer: Vec<RawBox>,
    }

    impl FaceClassifier for Recording {
        fn classify(&self, frame: &GrayImage) -> Result<Vec<RawBox>> {
            self.seen.lock().unwrap().push(frame.clone());
            Ok(self.answer.clone())
        }
    }

    #[test]
    fn frames_are_equalized_before_classification() {
        let backend = Arc::new(Recording::default());
        let detector = FaceDetector::new(backend.clone());
        let frame = GrayImage::from_fn(8, 1, |x, _| Luma([100 + x as u8]));

        let faces = detector.detect(&frame).unwrap();
        assert!(faces.is_empty());

        let seen = backend.seen.lock().unwrap();
        let levels: Vec<u8> = seen[0].pixels().map(|p| p.0[0]).collect();
        assert_eq!(levels.first(), Some(&0));
        assert_eq!(levels.last(), Some(&255));
    }

    #[test]
    fn boxes_come_back_in_classifier_order() {
        let answer = vec![RawBox::new(5, 5, 10, 10), RawBox::new(50, 50, 80, 80)];
        let detector = FaceDetector::new(Arc::new(Recording {
            answer: answer.clone(),
            ..Default::default()
        }));
        let frame = GrayImage::from_pixel(4, 4, Luma([9]));
        assert_eq!(detector.detect(&frame).unwrap(), answer);
    }
}
