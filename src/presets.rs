//! The three fixed example programs.

use encoding_api::models::{TextFilter, WatermarkFilter};

use crate::{
    config::Settings,
    error::Result,
    pipeline::types::{FilterSpec, PipelineSpec, SpriteSpec},
};

pub const SOURCE_HOST: &str = "mackenzie-emea.s3.eu-west-1.amazonaws.com";
pub const SOURCE_PATH: &str = "/input/flower_show_1080p.mov";
pub const WATERMARK_IMAGE: &str =
    "https://mackenzie-emea.s3.eu-west-1.amazonaws.com/input/watermark.png";

pub const VIDEO_HEIGHT: u32 = 720;
pub const VIDEO_BITRATE: u64 = 4_000_000;
pub const AUDIO_BITRATE: u64 = 128_000;
// seconds
pub const SEGMENT_LENGTH: f64 = 4.0;

/// Builds the pipeline of one program from the run's settings.
pub type Preset = fn(&Settings) -> Result<PipelineSpec>;

fn base(name: &str, output_path: &str) -> crate::pipeline::types::PipelineSpecBuilder {
    PipelineSpec::builder(name)
        .source(SOURCE_HOST, SOURCE_PATH)
        .output_path(output_path)
        .video(VIDEO_HEIGHT, VIDEO_BITRATE)
        .audio(AUDIO_BITRATE)
}

pub fn progressive_mp4(_settings: &Settings) -> Result<PipelineSpec> {
    base(
        "MacKenzie Exercise - Progressive MP4",
        "/output/encodings/progressive",
    )
    .progressive("progressive_output.mp4")
    .build()
}

pub fn segmented_default_manifest(_settings: &Settings) -> Result<PipelineSpec> {
    base(
        "MacKenzie Exercise - Segmented with Default Manifest",
        "/output/encodings/segmented_default_manifest",
    )
    .segmented(SEGMENT_LENGTH)
    .dash_manifest("segmented_output.mpd")
    .build()
}

/// Segmented output with a watermark and a text overlay on the video stream.
/// The sprite sheet is only generated when enabled in the settings.
pub fn sprites_and_watermark(settings: &Settings) -> Result<PipelineSpec> {
    let sprite = settings.enable_sprites().then(|| SpriteSpec {
        name: "sprites.png".to_string(),
        sprite_name: "spritesName".to_string(),
        width: 320,
        height: 240,
        distance: 10.0,
        vtt_name: "sprites.vtt".to_string(),
    });

    base(
        "MacKenzie Exercise - Sprites and Watermark",
        "/output/encodings/sprites_and_watermark",
    )
    .segmented(SEGMENT_LENGTH)
    .add_filter(FilterSpec::Watermark(WatermarkFilter {
        id: None,
        image: WATERMARK_IMAGE.to_string(),
        top: 10,
        left: 10,
    }))
    .add_filter(FilterSpec::Text(TextFilter {
        id: None,
        text: "TEST TEXT".to_string(),
        x: "main_w / 16".to_string(),
        y: "main_h / 9".to_string(),
        font_size: 64,
        font_color: "white".to_string(),
        shadow_color: "black".to_string(),
        shadow_x: 4,
        shadow_y: 4,
    }))
    .sprite(sprite)
    .dash_manifest("output.mpd")
    .build()
}
