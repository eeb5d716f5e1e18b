//! # Preprocessing Tests Module
//!
//! Properties of the sharpness estimator and the adaptive enhancer on
//! synthetic images.


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use blight_scan::pipeline_config::{DecodeLimits, EnhancementConfig, DEFAULT_BLUR_THRESHOLD};
    use blight_scan::prediction_errors::PredictionError;
    use blight_scan::preprocessing::{
        decode_image, enhance_if_blurry, estimate_sharpness, DecodedImage,
    };

    fn decode(bytes: &[u8]) -> Result<DecodedImage, PredictionError> {
        decode_image(bytes, &DecodeLimits::default())
    }

    #[test]
    fn test_checkerboard_is_sharp_and_left_unchanged() {
        let decoded = decode(&checkerboard_png(64, 64, 8)).expect("PNG should decode");
        let score = estimate_sharpness(&decoded.grayscale).blur_score;
        assert!(score >= DEFAULT_BLUR_THRESHOLD);

        let result = enhance_if_blurry(
            decoded.color.clone(),
            score,
            DEFAULT_BLUR_THRESHOLD,
            &EnhancementConfig::default(),
        );

        assert!(!result.applied);
        assert_eq!(result.image, decoded.color);
    }

    #[test]
    fn test_solid_image_is_blurry_and_altered() {
        let decoded = decode(&solid_png(50, 50, 128)).expect("PNG should decode");
        let score = estimate_sharpness(&decoded.grayscale).blur_score;
        assert!(score < DEFAULT_BLUR_THRESHOLD);
        assert!(score.abs() < 1e-9);

        let result = enhance_if_blurry(
            decoded.color.clone(),
            score,
            DEFAULT_BLUR_THRESHOLD,
            &EnhancementConfig::default(),
        );

        assert!(result.applied);
        assert!(result
            .image
            .pixels()
            .zip(decoded.color.pixels())
            .any(|(after, before)| after != before));
    }

    #[test]
    fn test_white_image_saturates() {
        let white = solid_image(16, 16, 255);

        let result = enhance_if_blurry(white, 0.0, DEFAULT_BLUR_THRESHOLD, &EnhancementConfig::default());

        assert!(result.image.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_enhancement_is_not_idempotent() {
        let config = EnhancementConfig::default();
        let once = enhance_if_blurry(solid_image(8, 8, 100), 0.0, DEFAULT_BLUR_THRESHOLD, &config);
        let twice = enhance_if_blurry(once.image.clone(), 0.0, DEFAULT_BLUR_THRESHOLD, &config);

        assert_ne!(once.image, twice.image);
    }

    #[test]
    fn test_estimator_is_deterministic() {
        let bytes = checkerboard_png(40, 30, 3);
        let first = estimate_sharpness(&decode(&bytes).expect("decode").grayscale);
        let second = estimate_sharpness(&decode(&bytes).expect("decode").grayscale);

        assert_eq!(first.blur_score, second.blur_score);
        assert_eq!(first.dimensions, (40, 30));
    }

    #[test]
    fn test_finer_detail_scores_higher() {
        let coarse = estimate_sharpness(
            &decode(&checkerboard_png(64, 64, 16))
                .expect("decode")
                .grayscale,
        );
        let fine = estimate_sharpness(
            &decode(&checkerboard_png(64, 64, 2))
                .expect("decode")
                .grayscale,
        );

        assert!(fine.blur_score > coarse.blur_score);
    }

    #[test]
    fn test_oversized_dimensions_are_rejected_by_default() {
        // 9000 px wide exceeds the default bound but compresses to a few KB
        let bytes = solid_png(9000, 1, 128);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));
    }
}
