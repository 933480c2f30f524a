use std::cmp::Ordering;

use cardsheet_utils::config::DetectionSettings;

/// Filtering applied to raw anchor candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessConfig {
    /// Minimum fused score for a candidate to be considered.
    pub score_threshold: f32,
    /// IoU above which two candidates describe the same face.
    pub nms_threshold: f32,
    /// Maximum number of candidates kept after sorting by score.
    pub top_k: usize,
    /// Candidates (the face itself included) that must overlap a face before
    /// it is reported.
    pub min_neighbors: usize,
    /// Smallest accepted face side in source pixels.
    pub min_size: f32,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        DetectionSettings::default().into()
    }
}

/// Axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        (self.width.max(0.0)) * (self.height.max(0.0))
    }

    /// Intersection over union with `other`.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }

    fn scaled(&self, scale_x: f32, scale_y: f32) -> Self {
        Self {
            x: self.x * scale_x,
            y: self.y * scale_y,
            width: self.width * scale_x,
            height: self.height * scale_y,
        }
    }
}

/// One decoded anchor before filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bbox: BoundingBox,
    pub score: f32,
}

/// A face that survived filtering, with the number of candidates supporting it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f32,
    pub neighbors: usize,
}

/// Reduce raw candidates to reported faces.
///
/// Steps: drop low scores and degenerate boxes, rescale to the source image,
/// sort by score, keep `top_k`, suppress overlaps, count the candidates that
/// overlap each survivor, then drop faces with too few neighbours or a side
/// shorter than `min_size`. Output order is descending score.
pub fn apply_postprocess(
    candidates: &[Candidate],
    scale_x: f32,
    scale_y: f32,
    config: &PostprocessConfig,
) -> Vec<Detection> {
    let mut scored: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.score.is_finite() && c.score >= config.score_threshold)
        .map(|c| Candidate {
            bbox: c.bbox.scaled(scale_x, scale_y),
            score: c.score,
        })
        .filter(|c| c.bbox.width > 0.0 && c.bbox.height > 0.0)
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    if config.top_k > 0 && scored.len() > config.top_k {
        scored.truncate(config.top_k);
    }

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in &scored {
        if kept
            .iter()
            .all(|k| candidate.bbox.iou(&k.bbox) <= config.nms_threshold)
        {
            kept.push(*candidate);
        }
    }

    kept.into_iter()
        .map(|face| Detection {
            bbox: face.bbox,
            score: face.score,
            neighbors: scored
                .iter()
                .filter(|c| c.bbox.iou(&face.bbox) > config.nms_threshold)
                .count(),
        })
        .filter(|d| d.neighbors >= config.min_neighbors)
        .filter(|d| d.bbox.width >= config.min_size && d.bbox.height >= config.min_size)
        .collect()
}

impl From<DetectionSettings> for PostprocessConfig {
    fn from(settings: DetectionSettings) -> Self {
        PostprocessConfig {
            score_threshold: settings.score_threshold,
            nms_threshold: settings.nms_threshold,
            top_k: settings.top_k,
            min_neighbors: settings.anchor_votes(),
            min_size: settings.min_size as f32,
        }
    }
}

impl From<&DetectionSettings> for PostprocessConfig {
    fn from(settings: &DetectionSettings) -> Self {
        settings.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: f32, y: f32, side: f32, score: f32) -> Candidate {
        Candidate {
            bbox: BoundingBox {
                x,
                y,
                width: side,
                height: side,
            },
            score,
        }
    }

    fn lenient() -> PostprocessConfig {
        PostprocessConfig {
            score_threshold: 0.3,
            nms_threshold: 0.3,
            top_k: 100,
            min_neighbors: 1,
            min_size: 0.0,
        }
    }

    #[test]
    fn filters_by_score_and_scales_coordinates() {
        let candidates = [candidate(10.0, 20.0, 30.0, 0.95), candidate(5.0, 5.0, 10.0, 0.2)];
        let faces = apply_postprocess(&candidates, 2.0, 0.5, &lenient());

        assert_eq!(faces.len(), 1);
        let face = faces[0];
        assert_eq!(face.score, 0.95);
        assert_eq!(face.bbox.x, 20.0);
        assert_eq!(face.bbox.y, 10.0);
        assert_eq!(face.bbox.width, 60.0);
        assert_eq!(face.bbox.height, 15.0);
    }

    #[test]
    fn suppresses_overlaps_and_counts_neighbours() {
        let candidates = [
            candidate(0.0, 0.0, 10.0, 0.99),
            candidate(1.0, 1.0, 10.0, 0.95),
            candidate(0.5, 0.0, 10.0, 0.90),
            candidate(50.0, 50.0, 10.0, 0.80),
        ];
        let faces = apply_postprocess(&candidates, 1.0, 1.0, &lenient());

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].score, 0.99);
        assert_eq!(faces[0].neighbors, 3);
        assert_eq!(faces[1].neighbors, 1);
    }

    #[test]
    fn min_neighbors_drops_isolated_faces() {
        let candidates = [
            candidate(0.0, 0.0, 10.0, 0.99),
            candidate(1.0, 1.0, 10.0, 0.95),
            candidate(50.0, 50.0, 10.0, 0.80),
        ];
        let config = PostprocessConfig {
            min_neighbors: 2,
            ..lenient()
        };
        let faces = apply_postprocess(&candidates, 1.0, 1.0, &config);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox.x, 0.0);
    }

    #[test]
    fn default_tuning_keeps_a_single_confident_face() {
        let candidates = [candidate(20.0, 30.0, 150.0, 0.92)];
        let faces = apply_postprocess(&candidates, 1.0, 1.0, &PostprocessConfig::default());
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].neighbors, 1);
    }

    #[test]
    fn min_size_applies_in_source_pixels() {
        let candidates = [candidate(0.0, 0.0, 40.0, 0.9)];
        let config = PostprocessConfig {
            min_size: 100.0,
            ..lenient()
        };
        assert!(apply_postprocess(&candidates, 2.0, 2.0, &config).is_empty());
        assert_eq!(apply_postprocess(&candidates, 3.0, 3.0, &config).len(), 1);
    }

    #[test]
    fn converts_detection_settings_into_config() {
        let settings = DetectionSettings {
            score_threshold: 0.75,
            nms_threshold: 0.25,
            top_k: 123,
            min_neighbors: 7,
            scale_step: 2.0,
            min_size: 64,
        };

        let config: PostprocessConfig = (&settings).into();
        assert_eq!(config.score_threshold, 0.75);
        assert_eq!(config.top_k, 123);
        assert_eq!(config.min_neighbors, 7);
        assert_eq!(config.min_size, 64.0);
    }
}
