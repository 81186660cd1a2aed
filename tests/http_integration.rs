//! Router-level tests through the public API
//!
//! Exercises concurrent uploads against one shared `AppContext` and checks
//! that every scratch file is gone once the responses are out.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use birdcall_classifier::analysis::PreprocessedFeature;
use birdcall_classifier::config::{ServiceConfig, NUM_CLASSES};
use birdcall_classifier::error::PipelineError;
use birdcall_classifier::http::build_router;
use birdcall_classifier::inference::{Classifier, ProbabilityVector};
use birdcall_classifier::AppContext;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "XyZbirdcallXyZ";

/// Prefers the last class.
struct BabblerClassifier;

impl Classifier for BabblerClassifier {
    fn predict(
        &self,
        batch: &[PreprocessedFeature],
    ) -> Result<Vec<ProbabilityVector>, PipelineError> {
        Ok(vec![vec![0.1, 0.1, 0.1, 0.7]; batch.len()])
    }

    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }
}

fn wav_bytes(seconds: f32, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        let frames = (seconds * sample_rate as f32) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = (2.0 * std::f32::consts::PI * 900.0 * t).sin() * 0.3;
            writer
                .write_sample((value * i16::MAX as f32) as i16)
                .expect("wav sample");
        }
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}

fn upload_request(filename: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .expect("upload request")
}

async fn json_body(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    (status, serde_json::from_slice(&bytes).expect("JSON body"))
}

#[tokio::test]
async fn concurrent_uploads_share_one_context() {
    let uploads = tempfile::tempdir().expect("upload dir");
    let config = ServiceConfig {
        upload_dir: uploads.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    let context = AppContext::new(config, Arc::new(BabblerClassifier)).expect("context");
    let router = build_router(context);

    let first = router
        .clone()
        .oneshot(upload_request("same.wav", &wav_bytes(3.0, 22_050)));
    let second = router
        .clone()
        .oneshot(upload_request("same.wav", &wav_bytes(8.0, 16_000)));
    let (first, second) = tokio::join!(first, second);

    for response in [first.expect("first call"), second.expect("second call")] {
        let (status, json) = json_body(response).await;
        assert_eq!(status, StatusCode::OK, "body: {json}");
        assert_eq!(json["prediction"], "MoustachedBabbler");
        assert_eq!(json["probabilities"]["MoustachedBabbler"], 0.7);
    }

    let leftovers = std::fs::read_dir(uploads.path()).expect("read dir").count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let uploads = tempfile::tempdir().expect("upload dir");
    let config = ServiceConfig {
        upload_dir: uploads.path().to_path_buf(),
        max_upload_bytes: 1024,
        ..ServiceConfig::default()
    };
    let context = AppContext::new(config, Arc::new(BabblerClassifier)).expect("context");

    let response = build_router(context)
        .oneshot(upload_request("big.wav", &wav_bytes(2.0, 22_050)))
        .await
        .expect("upload call");

    assert!(response.status().is_client_error());
    let leftovers = std::fs::read_dir(uploads.path()).expect("read dir").count();
    assert_eq!(leftovers, 0);
}
