//! Resource paths, relative to the service base url.

pub const HTTP_INPUTS: &str = "/encoding/inputs/http";
pub const S3_OUTPUTS: &str = "/encoding/outputs/s3";
pub const ENCODINGS: &str = "/encoding/encodings";
pub const H264_CONFIGURATIONS: &str = "/encoding/configurations/video/h264";
pub const AAC_CONFIGURATIONS: &str = "/encoding/configurations/audio/aac";
pub const WATERMARK_FILTERS: &str = "/encoding/filters/watermark";
pub const TEXT_FILTERS: &str = "/encoding/filters/text";
pub const DASH_MANIFESTS: &str = "/encoding/manifests/dash";
pub const DEFAULT_DASH_MANIFESTS: &str = "/encoding/manifests/dash/default";

pub fn http_input(id: &str) -> String {
    format!("{}/{}", HTTP_INPUTS, id)
}

pub fn s3_output(id: &str) -> String {
    format!("{}/{}", S3_OUTPUTS, id)
}

pub fn encoding(id: &str) -> String {
    format!("{}/{}", ENCODINGS, id)
}

pub fn encoding_start(id: &str) -> String {
    format!("{}/start", encoding(id))
}

pub fn encoding_status(id: &str) -> String {
    format!("{}/status", encoding(id))
}

pub fn h264_configuration(id: &str) -> String {
    format!("{}/{}", H264_CONFIGURATIONS, id)
}

pub fn aac_configuration(id: &str) -> String {
    format!("{}/{}", AAC_CONFIGURATIONS, id)
}

pub fn streams(encoding_id: &str) -> String {
    format!("{}/streams", encoding(encoding_id))
}

pub fn stream(encoding_id: &str, stream_id: &str) -> String {
    format!("{}/{}", streams(encoding_id), stream_id)
}

pub fn stream_filters(encoding_id: &str, stream_id: &str) -> String {
    format!("{}/filters", stream(encoding_id, stream_id))
}

pub fn sprites(encoding_id: &str, stream_id: &str) -> String {
    format!("{}/sprites", stream(encoding_id, stream_id))
}

pub fn sprite(encoding_id: &str, stream_id: &str, sprite_id: &str) -> String {
    format!("{}/{}", sprites(encoding_id, stream_id), sprite_id)
}

pub fn mp4_muxings(encoding_id: &str) -> String {
    format!("{}/muxings/mp4", encoding(encoding_id))
}

pub fn mp4_muxing(encoding_id: &str, muxing_id: &str) -> String {
    format!("{}/{}", mp4_muxings(encoding_id), muxing_id)
}

pub fn fmp4_muxings(encoding_id: &str) -> String {
    format!("{}/muxings/fmp4", encoding(encoding_id))
}

pub fn fmp4_muxing(encoding_id: &str, muxing_id: &str) -> String {
    format!("{}/{}", fmp4_muxings(encoding_id), muxing_id)
}

pub fn watermark_filter(id: &str) -> String {
    format!("{}/{}", WATERMARK_FILTERS, id)
}

pub fn text_filter(id: &str) -> String {
    format!("{}/{}", TEXT_FILTERS, id)
}

pub fn dash_manifest(id: &str) -> String {
    format!("{}/{}", DASH_MANIFESTS, id)
}

pub fn dash_manifest_start(id: &str) -> String {
    format!("{}/start", dash_manifest(id))
}
