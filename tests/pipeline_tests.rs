//! # Pipeline Tests Module
//!
//! End-to-end behavior of the prediction pipeline with a stub classifier:
//! blur decision, enhancement gating, report assembly and failure reporting.


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use blight_scan::pipeline::PredictionPipeline;
    use blight_scan::pipeline_config::{InputScaling, PipelineConfig};
    use blight_scan::prediction_errors::PredictionError;
    use blight_scan::report::{BLURRY_MESSAGE, SHARP_MESSAGE};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Solid gray upload is blurry, enhanced, and classified by the stub
    #[tokio::test]
    async fn test_solid_gray_upload_is_enhanced_before_prediction() {
        let pipeline = default_pipeline(StubClassifier::new(vec![0.05, 0.15, 0.80]));

        let outcome = pipeline.predict(&solid_png(50, 50, 128)).await;
        let report = outcome.report().expect("solid image should be classified");

        assert!(report.is_blurry);
        assert_eq!(report.message, BLURRY_MESSAGE);
        assert!(report.sharpness.abs() < 1e-9);
        assert_eq!(report.class_name, "Healthy");
        assert!((report.confidence - 0.80).abs() < 1e-6);

        let stub = pipeline.classifier();
        assert_eq!(stub.seen_shapes(), vec![[1, 256, 256, 3]]);

        // 128 * 1.2 + 15 = 168.6, rounded
        let input = stub.last_input().expect("stub should have seen an input");
        assert_eq!(input.pixel(100, 100), &[169.0, 169.0, 169.0]);
    }

    /// Sharp upload is classified without enhancement
    #[tokio::test]
    async fn test_checkerboard_upload_is_predicted_directly() {
        let pipeline = default_pipeline(StubClassifier::new(vec![0.6, 0.3, 0.1]));

        let outcome = pipeline.predict(&checkerboard_png(256, 256, 8)).await;
        let report = outcome.report().expect("checkerboard should be classified");

        assert!(!report.is_blurry);
        assert_eq!(report.message, SHARP_MESSAGE);
        assert!(report.sharpness >= 100.0);
        assert_eq!(report.class_name, "Early Blight");

        // Same size as the model input, so the pixels reach the model untouched
        let input = pipeline
            .classifier()
            .last_input()
            .expect("stub should have seen an input");
        assert_eq!(input.pixel(0, 0), &[0.0, 0.0, 0.0]);
        assert_eq!(input.pixel(8, 0), &[255.0, 255.0, 255.0]);
    }

    #[tokio::test]
    async fn test_random_bytes_report_error_only() {
        let pipeline = default_pipeline(StubClassifier::new(vec![0.2, 0.3, 0.5]));
        let garbage: Vec<u8> = (0..512u32).map(|i| (i * 7919 % 251) as u8).collect();

        let outcome = pipeline.predict(&garbage).await;

        assert!(outcome.error().is_some());
        assert!(outcome.report().is_none());
        assert!(pipeline.classifier().seen_shapes().is_empty());

        let json = serde_json::to_value(&outcome).expect("outcome should serialize");
        assert!(json.get("class").is_none());
        assert!(json.get("confidence").is_none());
    }

    #[tokio::test]
    async fn test_empty_payload_is_a_decode_error() {
        let pipeline = default_pipeline(StubClassifier::new(vec![0.2, 0.3, 0.5]));

        let err = pipeline.run(&[]).await.unwrap_err();

        assert!(matches!(err, PredictionError::Decode(_)));
    }

    #[tokio::test]
    async fn test_classifier_failure_becomes_error_outcome() {
        let pipeline = default_pipeline(StubClassifier::failing(PredictionError::Processing(
            "model returned HTTP 500".to_string(),
        )));

        let outcome = pipeline.predict(&solid_png(20, 20, 90)).await;

        let error = outcome.error().expect("classifier failure should be reported");
        assert!(error.contains("HTTP 500"));
        assert!(outcome.report().is_none());
        // Not retried
        assert_eq!(pipeline.classifier().seen_shapes().len(), 1);
    }

    #[tokio::test]
    async fn test_probability_count_mismatch_is_processing_error() {
        let pipeline = default_pipeline(StubClassifier::new(vec![0.5, 0.5]));

        let err = pipeline.run(&solid_png(10, 10, 10)).await.unwrap_err();

        assert!(matches!(err, PredictionError::Processing(_)));
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let config = PipelineConfig {
            blur_threshold: 0.0,
            ..Default::default()
        };
        let pipeline = PredictionPipeline::new(config, StubClassifier::new(vec![0.1, 0.1, 0.8]))
            .expect("valid config");

        // Score 0 is not strictly below a threshold of 0
        let report = pipeline
            .run(&solid_png(30, 30, 128))
            .await
            .expect("solid image should be classified");

        assert!(!report.is_blurry);
        assert_eq!(report.message, SHARP_MESSAGE);
    }

    #[tokio::test]
    async fn test_unit_range_scaling_and_custom_size() {
        let config = PipelineConfig {
            image_size: 64,
            input_scaling: InputScaling::UnitRange,
            ..Default::default()
        };
        let pipeline = PredictionPipeline::new(config, StubClassifier::new(vec![0.1, 0.8, 0.1]))
            .expect("valid config");

        let report = pipeline
            .run(&checkerboard_png(128, 128, 16))
            .await
            .expect("checkerboard should be classified");
        assert_eq!(report.class_name, "Late Blight");

        let input = pipeline
            .classifier()
            .last_input()
            .expect("stub should have seen an input");
        assert_eq!(input.shape, [1, 64, 64, 3]);
        assert!(input.data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn test_ensure_ready_propagates_readiness_failure() {
        let pipeline = default_pipeline(StubClassifier::not_ready(vec![0.2, 0.3, 0.5]));

        let err = pipeline.ensure_ready().await.unwrap_err();

        assert!(matches!(err, PredictionError::ClassificationUnavailable(_)));
        assert!(pipeline.classifier().seen_shapes().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_ready_succeeds_with_matching_model() {
        let pipeline = default_pipeline(StubClassifier::new(vec![0.2, 0.3, 0.5]));

        pipeline
            .ensure_ready()
            .await
            .expect("stub model should be ready");

        assert_eq!(pipeline.classifier().seen_shapes(), vec![[1, 256, 256, 3]]);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_pipeline() {
        let pipeline = std::sync::Arc::new(default_pipeline(StubClassifier::new(vec![
            0.1, 0.2, 0.7,
        ])));

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move {
                pipeline.predict(&solid_png(16, 16, i * 20)).await
            }));
        }

        for handle in handles {
            let outcome = handle.await.expect("task should not panic");
            assert!(outcome.is_success());
        }
        assert_eq!(pipeline.classifier().seen_shapes().len(), 8);
    }

    /// Preprocessing a large upload leaves the runtime free for other tasks
    #[tokio::test]
    async fn test_large_upload_does_not_stall_the_runtime() {
        let pipeline = default_pipeline(StubClassifier::new(vec![0.1, 0.2, 0.7]));
        let bytes = solid_png(2000, 2000, 128);

        let done = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let done = done.clone();
            let ticks = ticks.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_millis(2));
                while !done.load(Ordering::SeqCst) {
                    interval.tick().await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let outcome = pipeline.predict(&bytes).await;
        let ticks_during_predict = ticks.load(Ordering::SeqCst);
        done.store(true, Ordering::SeqCst);
        ticker.await.expect("ticker should not panic");

        assert!(outcome.is_success());
        assert!(
            ticks_during_predict >= 2,
            "ticker ran {} times while predicting",
            ticks_during_predict
        );
    }

    #[tokio::test]
    async fn test_oversized_upload_is_a_decode_error() {
        let mut config = PipelineConfig::default();
        config.decode_limits.max_dimension = 1024;
        let pipeline = PredictionPipeline::new(config, StubClassifier::new(vec![0.1, 0.2, 0.7]))
            .expect("valid config");

        let outcome = pipeline.predict(&solid_png(1500, 20, 128)).await;

        let error = outcome.error().expect("oversized image should fail");
        assert!(error.starts_with("Unable to read image"));
        assert!(pipeline.classifier().seen_shapes().is_empty());
    }
}
