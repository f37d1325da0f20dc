//! Detection filter
//!
//! Drops detections that are too small or too elongated to be a frontal face.

use tracing::debug;

use super::FaceLocation;
use crate::config::DetectionConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    TooSmall { width: f32, height: f32, min_size: f32 },
    AspectRatio(f32),
    /// The box does not overlap the image at all
    OutsideImage,
}

/// Check a single detection against the size and aspect heuristics
pub fn check_face(location: &FaceLocation, min_size: f32, config: &DetectionConfig) -> Result<(), Rejection> {
    let width = location.width();
    let height = location.height();

    if height < min_size || width < min_size {
        return Err(Rejection::TooSmall { width, height, min_size });
    }

    let aspect = width / height;
    if aspect < config.min_aspect || aspect > config.max_aspect {
        return Err(Rejection::AspectRatio(aspect));
    }

    Ok(())
}

/// Keep the plausible faces of a `width` x `height` image, order preserved
pub fn filter_faces(
    width: u32,
    height: u32,
    locations: &[FaceLocation],
    config: &DetectionConfig,
) -> Vec<FaceLocation> {
    let min_size = width.min(height) as f32 * config.min_face_ratio;
    debug!("Image {}x{}, min face size {:.1}", width, height, min_size);

    let kept: Vec<FaceLocation> = locations
        .iter()
        .filter(|loc| {
            let verdict = if loc.left >= width || loc.top >= height {
                Err(Rejection::OutsideImage)
            } else {
                check_face(loc, min_size, config)
            };
            match verdict {
                Ok(()) => true,
                Err(reason) => {
                    debug!("Skipping face {:?}: {:?}", <[u32; 4]>::from(**loc), reason);
                    false
                }
            }
        })
        .copied()
        .collect();

    debug!("Detected {} faces, kept {}", locations.len(), kept.len());
    kept
}
