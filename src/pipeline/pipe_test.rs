// ============================================================================
// Pipeline Tests
// ============================================================================

use std::{collections::HashSet, sync::Arc};

use encoding_api::{
    EncodingApi,
    models::{Status, TextFilter, WatermarkFilter},
    testing::{Call, RecordingTransport},
};
use reqwest::Method;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use super::{Pipeline, RunReport};
use crate::{
    config::{self, Settings},
    error::{PipelineError, Result},
    pipeline::{
        ledger::Ledger,
        types::{FilterSpec, PipelineSpec},
    },
    presets,
};

fn settings(extra: &[(&'static str, &str)]) -> Settings {
    Settings::from_lookup(|key| {
        let value = match key {
            config::API_KEY => "api-key",
            config::S3_BUCKET_NAME => "bucket",
            config::S3_ACCESS_KEY => "access",
            config::S3_SECRET_KEY => "secret",
            _ => extra.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)?,
        };
        Some(value.to_string())
    })
    .unwrap()
}

async fn run(
    spec: &PipelineSpec,
    settings: &Settings,
    fake: RecordingTransport,
) -> (Arc<RecordingTransport>, Result<RunReport>) {
    let fake = Arc::new(fake);
    let api = EncodingApi::new(Arc::clone(&fake));
    let result = Pipeline::new(&api, settings, spec)
        .run(&CancellationToken::new())
        .await;
    (fake, result)
}

/// Id created by the n-th call to `path`.
fn created(calls: &[Call], path: &str, n: usize) -> String {
    calls
        .iter()
        .filter(|c| c.path == path && c.created_id.is_some())
        .nth(n)
        .and_then(|c| c.created_id.clone())
        .unwrap_or_else(|| panic!("nothing created at {} #{}", path, n))
}

fn body_of<'a>(calls: &'a [Call], method: Method, path: &str) -> &'a Value {
    calls
        .iter()
        .find(|c| c.method == method && c.path == path)
        .and_then(|c| c.body.as_ref())
        .unwrap_or_else(|| panic!("no body sent to {} {}", method, path))
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Every id a request mentions, in its path or body, was handed out by an
/// earlier call.
fn assert_references_point_backwards(calls: &[Call]) {
    let all_ids: Vec<&String> = calls.iter().filter_map(|c| c.created_id.as_ref()).collect();
    let mut known = HashSet::new();
    for call in calls {
        let mut mentioned: Vec<String> = call.path.split('/').map(str::to_string).collect();
        if let Some(body) = &call.body {
            collect_strings(body, &mut mentioned);
        }
        for id in &all_ids {
            if mentioned.contains(id) {
                assert!(
                    known.contains(*id),
                    "{} {} references {} before it was created",
                    call.method,
                    call.path,
                    id
                );
            }
        }
        if let Some(id) = &call.created_id {
            known.insert(id.clone());
        }
    }
}

// ------------------------------------------------------------------------
// End-to-end scenarios
// ------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_progressive_mp4_end_to_end() {
    let settings = settings(&[]);
    let spec = presets::progressive_mp4(&settings).unwrap();
    let (fake, result) = run(
        &spec,
        &settings,
        RecordingTransport::with_statuses([Status::Running, Status::Finished]),
    )
    .await;
    let report = result.unwrap();
    let calls = fake.calls();

    let enc = created(&calls, "/encoding/encodings", 0);
    let streams_path = format!("/encoding/encodings/{}/streams", enc);
    assert_eq!(
        fake.requests(),
        vec![
            "POST /encoding/inputs/http".to_string(),
            "POST /encoding/outputs/s3".to_string(),
            "POST /encoding/encodings".to_string(),
            "POST /encoding/configurations/video/h264".to_string(),
            "POST /encoding/configurations/audio/aac".to_string(),
            format!("POST {}", streams_path),
            format!("POST {}", streams_path),
            format!("POST /encoding/encodings/{}/muxings/mp4", enc),
            format!("POST /encoding/encodings/{}/start", enc),
            format!("GET /encoding/encodings/{}/status", enc),
            format!("GET /encoding/encodings/{}/status", enc),
        ]
    );

    let output = created(&calls, "/encoding/outputs/s3", 0);
    let video = created(&calls, &streams_path, 0);
    let audio = created(&calls, &streams_path, 1);
    let muxing = body_of(
        &calls,
        Method::POST,
        &format!("/encoding/encodings/{}/muxings/mp4", enc),
    );
    assert_eq!(
        muxing,
        &json!({
            "outputs": [{"outputId": output, "outputPath": "/output/encodings/progressive"}],
            "filename": "progressive_output.mp4",
            "streams": [{"streamId": video}, {"streamId": audio}],
        })
    );

    assert_eq!(
        report,
        RunReport {
            encoding_id: enc,
            status: Status::Finished,
            manifest_id: None,
            manifest_started: false,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_request_payloads() {
    let settings = settings(&[]);
    let spec = presets::progressive_mp4(&settings).unwrap();
    let (fake, result) = run(&spec, &settings, RecordingTransport::new()).await;
    result.unwrap();
    let calls = fake.calls();

    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/inputs/http"),
        &json!({"host": presets::SOURCE_HOST})
    );
    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/outputs/s3"),
        &json!({"bucketName": "bucket", "accessKey": "access", "secretKey": "secret"})
    );
    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/encodings"),
        &json!({
            "name": "MacKenzie Exercise - Progressive MP4",
            "cloudRegion": "AUTO",
            "encoderVersion": "LATEST",
        })
    );
    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/configurations/video/h264"),
        &json!({
            "name": "H.264 720p",
            "presetConfiguration": "VOD_STANDARD",
            "height": 720,
            "bitrate": 4_000_000,
        })
    );
    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/configurations/audio/aac"),
        &json!({"name": "AAC 128000 kbit/s", "bitrate": 128_000})
    );

    let input = created(&calls, "/encoding/inputs/http", 0);
    let h264 = created(&calls, "/encoding/configurations/video/h264", 0);
    let enc = created(&calls, "/encoding/encodings", 0);
    assert_eq!(
        body_of(&calls, Method::POST, &format!("/encoding/encodings/{}/streams", enc)),
        &json!({
            "inputStreams": [{
                "inputId": input,
                "inputPath": presets::SOURCE_PATH,
                "selectionMode": "AUTO",
            }],
            "codecConfigId": h264,
            "mode": "STANDARD",
        })
    );
    assert_eq!(
        body_of(&calls, Method::POST, &format!("/encoding/encodings/{}/start", enc)),
        &json!({})
    );
}

#[tokio::test(start_paused = true)]
async fn test_segmented_default_manifest_end_to_end() {
    let settings = settings(&[]);
    let spec = presets::segmented_default_manifest(&settings).unwrap();
    let (fake, result) = run(
        &spec,
        &settings,
        RecordingTransport::with_statuses([Status::Queued, Status::Running, Status::Finished]),
    )
    .await;
    let report = result.unwrap();
    let calls = fake.calls();

    let enc = created(&calls, "/encoding/encodings", 0);
    let fmp4 = format!("/encoding/encodings/{}/muxings/fmp4", enc);
    let manifest = created(&calls, "/encoding/manifests/dash/default", 0);
    let requests = fake.requests();
    assert_eq!(
        requests[7..],
        [
            format!("POST {}", fmp4),
            format!("POST {}", fmp4),
            format!("POST /encoding/encodings/{}/start", enc),
            "POST /encoding/manifests/dash/default".to_string(),
            format!("GET /encoding/encodings/{}/status", enc),
            format!("GET /encoding/encodings/{}/status", enc),
            format!("GET /encoding/encodings/{}/status", enc),
            format!("POST /encoding/manifests/dash/{}/start", manifest),
        ]
    );

    let output = created(&calls, "/encoding/outputs/s3", 0);
    let streams_path = format!("/encoding/encodings/{}/streams", enc);
    let muxings: Vec<&Value> = calls
        .iter()
        .filter(|c| c.path == fmp4)
        .filter_map(|c| c.body.as_ref())
        .collect();
    for (i, (muxing, sub)) in muxings.iter().zip(["video", "audio"]).enumerate() {
        assert_eq!(
            *muxing,
            &json!({
                "outputs": [{
                    "outputId": output,
                    "outputPath": format!("/output/encodings/segmented_default_manifest/{}", sub),
                }],
                "segmentLength": 4.0,
                "streams": [{"streamId": created(&calls, &streams_path, i)}],
            })
        );
    }

    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/manifests/dash/default"),
        &json!({
            "encodingId": enc,
            "manifestName": "segmented_output.mpd",
            "version": "V1",
            "outputs": [{
                "outputId": output,
                "outputPath": "/output/encodings/segmented_default_manifest",
            }],
        })
    );
    assert_eq!(report.manifest_id.as_deref(), Some(manifest.as_str()));
    assert!(report.manifest_started);
}

#[tokio::test(start_paused = true)]
async fn test_sprites_and_watermark_end_to_end() {
    let settings = settings(&[]);
    let spec = presets::sprites_and_watermark(&settings).unwrap();
    let (fake, result) = run(&spec, &settings, RecordingTransport::new()).await;
    let report = result.unwrap();
    let calls = fake.calls();

    let enc = created(&calls, "/encoding/encodings", 0);
    let video = created(&calls, &format!("/encoding/encodings/{}/streams", enc), 0);
    let watermark = created(&calls, "/encoding/filters/watermark", 0);
    let text = created(&calls, "/encoding/filters/text", 0);
    let attach = format!("/encoding/encodings/{}/streams/{}/filters", enc, video);

    let requests = fake.requests();
    assert_eq!(
        requests[9..14],
        [
            "POST /encoding/filters/watermark".to_string(),
            "POST /encoding/filters/text".to_string(),
            format!("POST {}", attach),
            format!("POST /encoding/encodings/{}/start", enc),
            "POST /encoding/manifests/dash/default".to_string(),
        ]
    );
    assert!(!requests.iter().any(|r| r.contains("/sprites")));
    assert_eq!(
        requests.iter().filter(|r| r.ends_with("/filters")).count(),
        1
    );

    assert_eq!(
        body_of(&calls, Method::POST, &attach),
        &json!([
            {"id": watermark, "position": 0},
            {"id": text, "position": 1},
        ])
    );
    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/filters/watermark"),
        &json!({"image": presets::WATERMARK_IMAGE, "top": 10, "left": 10})
    );
    assert_eq!(
        body_of(&calls, Method::POST, "/encoding/filters/text"),
        &json!({
            "text": "TEST TEXT",
            "x": "main_w / 16",
            "y": "main_h / 9",
            "fontSize": 64,
            "fontColor": "white",
            "shadowColor": "black",
            "shadowX": 4,
            "shadowY": 4,
        })
    );
    assert!(report.manifest_started);
}

#[tokio::test(start_paused = true)]
async fn test_sprite_stage_is_opt_in() {
    let settings = settings(&[(config::ENABLE_SPRITES, "true")]);
    let spec = presets::sprites_and_watermark(&settings).unwrap();
    let (fake, result) = run(&spec, &settings, RecordingTransport::new()).await;
    result.unwrap();
    let calls = fake.calls();

    let enc = created(&calls, "/encoding/encodings", 0);
    let video = created(&calls, &format!("/encoding/encodings/{}/streams", enc), 0);
    let sprites = format!("/encoding/encodings/{}/streams/{}/sprites", enc, video);
    let output = created(&calls, "/encoding/outputs/s3", 0);

    let requests = fake.requests();
    let sprite_at = requests
        .iter()
        .position(|r| *r == format!("POST {}", sprites))
        .unwrap();
    assert!(requests[sprite_at - 1].ends_with("/filters"));
    assert!(requests[sprite_at + 1].ends_with(&format!("{}/start", enc)));

    assert_eq!(
        body_of(&calls, Method::POST, &sprites),
        &json!({
            "outputs": [{
                "outputId": output,
                "outputPath": "/output/encodings/sprites_and_watermark/sprites",
            }],
            "name": "sprites.png",
            "spriteName": "spritesName",
            "width": 320,
            "height": 240,
            "distance": 10.0,
            "vttName": "sprites.vtt",
        })
    );
}

// ------------------------------------------------------------------------
// Ordering
// ------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_every_variant_creates_in_dependency_order() {
    let plain = settings(&[]);
    let with_sprites = settings(&[(config::ENABLE_SPRITES, "1")]);
    let cases: [(presets::Preset, &Settings); 4] = [
        (presets::progressive_mp4, &plain),
        (presets::segmented_default_manifest, &plain),
        (presets::sprites_and_watermark, &plain),
        (presets::sprites_and_watermark, &with_sprites),
    ];
    for (preset, settings) in cases {
        let spec = preset(settings).unwrap();
        let (fake, result) = run(&spec, settings, RecordingTransport::new()).await;
        result.unwrap();

        let calls = fake.calls();
        assert_references_point_backwards(&calls);

        let start = calls.iter().position(|c| c.path.ends_with("/start")).unwrap();
        let first_poll = calls.iter().position(|c| c.path.ends_with("/status")).unwrap();
        assert!(start < first_poll);
        assert!(
            calls[..start]
                .iter()
                .all(|c| c.method == Method::POST && !c.path.ends_with("/status"))
        );
    }
}

#[tokio::test]
async fn test_filter_positions_follow_list_order() {
    let settings = settings(&[]);
    let spec = PipelineSpec::builder("filters")
        .source("media.example.com", "/in.mov")
        .output_path("/out")
        .video(480, 1_000_000)
        .audio(96_000)
        .segmented(2.0)
        .add_filter(FilterSpec::Text(TextFilter {
            text: "first".to_string(),
            ..Default::default()
        }))
        .add_filter(FilterSpec::Watermark(WatermarkFilter::default()))
        .add_filter(FilterSpec::Text(TextFilter {
            text: "third".to_string(),
            ..Default::default()
        }))
        .build()
        .unwrap();

    let fake = Arc::new(RecordingTransport::new());
    let api = EncodingApi::new(Arc::clone(&fake));
    let mut ledger = Ledger::new();
    let submitted = Pipeline::new(&api, &settings, &spec)
        .submit(&mut ledger)
        .await
        .unwrap();
    let calls = fake.calls();

    let first = created(&calls, "/encoding/filters/text", 0);
    let second = created(&calls, "/encoding/filters/watermark", 0);
    let third = created(&calls, "/encoding/filters/text", 1);
    let attach = format!(
        "/encoding/encodings/{}/streams/{}/filters",
        submitted.encoding_id, submitted.video_stream_id
    );
    assert_eq!(
        body_of(&calls, Method::POST, &attach),
        &json!([
            {"id": first, "position": 0},
            {"id": second, "position": 1},
            {"id": third, "position": 2},
        ])
    );
    let audio_filters = format!("{}/filters", submitted.audio_stream_id);
    assert!(!calls.iter().any(|c| c.path.ends_with(&audio_filters)));
    assert_eq!(submitted.manifest_id, None);
}

// ------------------------------------------------------------------------
// Terminal states
// ------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_job_error_fails_the_run() {
    let settings = settings(&[]);
    let spec = presets::segmented_default_manifest(&settings).unwrap();
    let (fake, result) = run(
        &spec,
        &settings,
        RecordingTransport::with_statuses([Status::Running, Status::Error]),
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(err, PipelineError::JobFailed { .. }));
    assert!(!err.is_config_error());
    let requests = fake.requests();
    assert!(requests.last().unwrap().ends_with("/status"));
    assert!(
        !requests
            .iter()
            .any(|r| r.starts_with("POST /encoding/manifests/dash/") && r.ends_with("/start"))
    );
    assert!(!requests.iter().any(|r| r.starts_with("DELETE")));
}

#[tokio::test(start_paused = true)]
async fn test_canceled_job_still_starts_the_manifest() {
    let settings = settings(&[]);
    let spec = presets::segmented_default_manifest(&settings).unwrap();
    let (fake, result) = run(
        &spec,
        &settings,
        RecordingTransport::with_statuses([Status::Queued, Status::Canceled]),
    )
    .await;

    let report = result.unwrap();
    assert_eq!(report.status, Status::Canceled);
    let manifest = created(&fake.calls(), "/encoding/manifests/dash/default", 0);
    assert_eq!(report.manifest_id.as_deref(), Some(manifest.as_str()));
    assert!(report.manifest_started);

    let requests = fake.requests();
    let n = requests.len();
    assert!(requests[n - 2].ends_with("/status"));
    assert_eq!(
        requests[n - 1],
        format!("POST /encoding/manifests/dash/{}/start", manifest)
    );
}

#[tokio::test(start_paused = true)]
async fn test_manifest_start_failure_is_reported() {
    let settings = settings(&[]);
    let spec = presets::segmented_default_manifest(&settings).unwrap();
    let fake = RecordingTransport::new().fail_when(|method, path| {
        *method == Method::POST
            && path.starts_with("/encoding/manifests/dash/")
            && path.ends_with("/start")
    });
    let (_, result) = run(&spec, &settings, fake).await;

    assert!(matches!(
        result.unwrap_err(),
        PipelineError::Remote {
            step: "start manifest",
            ..
        }
    ));
}

// ------------------------------------------------------------------------
// Remote failures
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_remote_failure_aborts_the_pipeline() {
    let settings = settings(&[]);
    let spec = presets::progressive_mp4(&settings).unwrap();
    let fake = RecordingTransport::new().fail_when(|_, path| path.ends_with("/streams"));
    let (fake, result) = run(&spec, &settings, fake).await;

    match result.unwrap_err() {
        PipelineError::Remote { step, source } => {
            assert_eq!(step, "create video stream");
            assert!(source.path().ends_with("/streams"));
        }
        other => panic!("Expected Remote error, got {:?}", other),
    }
    // nothing after the failing call, and nothing deleted by default
    let requests = fake.requests();
    assert_eq!(requests.len(), 6);
    assert!(requests.last().unwrap().ends_with("/streams"));
}

#[tokio::test]
async fn test_cleanup_on_failure_deletes_in_reverse_order() {
    let settings = settings(&[(config::CLEANUP_ON_FAILURE, "true")]);
    let spec = presets::segmented_default_manifest(&settings).unwrap();
    let fake = RecordingTransport::new().fail_when(|method, path| {
        *method == Method::POST && path.ends_with("/muxings/fmp4")
    });
    let (fake, result) = run(&spec, &settings, fake).await;
    assert!(matches!(
        result.unwrap_err(),
        PipelineError::Remote {
            step: "create video fmp4 muxing",
            ..
        }
    ));

    let calls = fake.calls();
    let input = created(&calls, "/encoding/inputs/http", 0);
    let output = created(&calls, "/encoding/outputs/s3", 0);
    let enc = created(&calls, "/encoding/encodings", 0);
    let h264 = created(&calls, "/encoding/configurations/video/h264", 0);
    let aac = created(&calls, "/encoding/configurations/audio/aac", 0);
    let streams_path = format!("/encoding/encodings/{}/streams", enc);
    let video = created(&calls, &streams_path, 0);
    let audio = created(&calls, &streams_path, 1);

    let deletes: Vec<String> = fake
        .requests()
        .into_iter()
        .filter(|r| r.starts_with("DELETE "))
        .collect();
    assert_eq!(
        deletes,
        vec![
            format!("DELETE {}/{}", streams_path, audio),
            format!("DELETE {}/{}", streams_path, video),
            format!("DELETE /encoding/configurations/audio/aac/{}", aac),
            format!("DELETE /encoding/configurations/video/h264/{}", h264),
            format!("DELETE /encoding/encodings/{}", enc),
            format!("DELETE /encoding/outputs/s3/{}", output),
            format!("DELETE /encoding/inputs/http/{}", input),
        ]
    );
}

#[tokio::test]
async fn test_no_cleanup_once_the_encoding_runs() {
    let settings = settings(&[(config::CLEANUP_ON_FAILURE, "true")]);
    let spec = presets::segmented_default_manifest(&settings).unwrap();
    let fake = RecordingTransport::new().fail_when(|method, path| {
        *method == Method::POST && path == "/encoding/manifests/dash/default"
    });
    let (fake, result) = run(&spec, &settings, fake).await;

    assert!(matches!(
        result.unwrap_err(),
        PipelineError::Remote {
            step: "create manifest",
            ..
        }
    ));
    let requests = fake.requests();
    assert!(!requests.iter().any(|r| r.starts_with("DELETE ")));
    assert!(!requests.iter().any(|r| r.ends_with("/status")));
    assert_eq!(
        requests.last().map(String::as_str),
        Some("POST /encoding/manifests/dash/default")
    );
}

#[tokio::test]
async fn test_failed_delete_does_not_hide_the_original_error() {
    let settings = settings(&[(config::CLEANUP_ON_FAILURE, "true")]);
    let spec = presets::progressive_mp4(&settings).unwrap();
    let fake = RecordingTransport::new().fail_when(|method, path| {
        (*method == Method::POST && path == "/encoding/configurations/audio/aac")
            || (*method == Method::DELETE && path.starts_with("/encoding/encodings/"))
    });
    let (fake, result) = run(&spec, &settings, fake).await;

    assert!(matches!(
        result.unwrap_err(),
        PipelineError::Remote {
            step: "create audio configuration",
            ..
        }
    ));
    let deletes = fake
        .requests()
        .into_iter()
        .filter(|r| r.starts_with("DELETE "))
        .count();
    assert_eq!(deletes, 4);
}
