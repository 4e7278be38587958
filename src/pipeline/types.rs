use encoding_api::models::{DashManifestDefaultVersion, TextFilter, WatermarkFilter};

use crate::error::{PipelineError, Result};

pub const DEFAULT_ENCODER_VERSION: &str = "LATEST";

/// Where the source file lives.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceConfig {
    pub host: String,
    pub input_path: String,
}

/// H.264 rendition
#[derive(Clone, Debug, PartialEq)]
pub struct VideoConfig {
    pub height: u32,
    // bps
    pub bitrate: u64,
}

/// AAC rendition
#[derive(Clone, Debug, PartialEq)]
pub struct AudioConfig {
    // bps
    pub bitrate: u64,
}

/// How the encoded streams are packaged.
#[derive(Clone, Debug, PartialEq)]
pub enum MuxingKind {
    /// One MP4 file carrying both streams, written to the output path.
    Progressive { filename: String },
    /// One fMP4 muxing per stream, under `<output>/video` and `<output>/audio`.
    Segmented { segment_length: f64 },
}

impl MuxingKind {
    pub fn is_segmented(&self) -> bool {
        matches!(self, MuxingKind::Segmented { .. })
    }
}

/// A filter for the video stream. The position in the stream's filter chain
/// is the index in [`PipelineSpec::filters`].
#[derive(Clone, Debug, PartialEq)]
pub enum FilterSpec {
    Watermark(WatermarkFilter),
    Text(TextFilter),
}

impl FilterSpec {
    pub fn name(&self) -> &'static str {
        match self {
            FilterSpec::Watermark(_) => "watermark",
            FilterSpec::Text(_) => "text",
        }
    }
}

/// Thumbnail sprite sheet generated from the video stream, written to
/// `<output>/sprites`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteSpec {
    pub name: String,
    pub sprite_name: String,
    pub width: u32,
    pub height: u32,
    // seconds
    pub distance: f64,
    pub vtt_name: String,
}

/// Default DASH manifest written to the output path.
#[derive(Clone, Debug, PartialEq)]
pub struct ManifestSpec {
    pub name: String,
    pub version: DashManifestDefaultVersion,
}

/// Everything that differs between two pipeline runs.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSpec {
    pub name: String,
    pub encoder_version: String,
    pub source: SourceConfig,
    pub output_path: String,
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub muxing: MuxingKind,
    pub filters: Vec<FilterSpec>,
    pub sprite: Option<SpriteSpec>,
    pub manifest: Option<ManifestSpec>,
}

impl PipelineSpec {
    pub fn builder(name: impl Into<String>) -> PipelineSpecBuilder {
        PipelineSpecBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// `<output_path>/<sub>`
    pub fn output_subpath(&self, sub: &str) -> String {
        format!("{}/{}", self.output_path.trim_end_matches('/'), sub)
    }
}

#[derive(Default)]
pub struct PipelineSpecBuilder {
    name: String,
    encoder_version: Option<String>,
    source: Option<SourceConfig>,
    output_path: Option<String>,
    video: Option<VideoConfig>,
    audio: Option<AudioConfig>,
    muxing: Option<MuxingKind>,
    filters: Vec<FilterSpec>,
    sprite: Option<SpriteSpec>,
    manifest: Option<ManifestSpec>,
}

impl PipelineSpecBuilder {
    /// Defaults to "LATEST"
    pub fn encoder_version(mut self, version: impl Into<String>) -> Self {
        self.encoder_version = Some(version.into());
        self
    }

    pub fn source(mut self, host: impl Into<String>, input_path: impl Into<String>) -> Self {
        self.source = Some(SourceConfig {
            host: host.into(),
            input_path: input_path.into(),
        });
        self
    }

    pub fn output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn video(mut self, height: u32, bitrate: u64) -> Self {
        self.video = Some(VideoConfig { height, bitrate });
        self
    }

    pub fn audio(mut self, bitrate: u64) -> Self {
        self.audio = Some(AudioConfig { bitrate });
        self
    }

    /// Single MP4 file with both streams
    pub fn progressive(mut self, filename: impl Into<String>) -> Self {
        self.muxing = Some(MuxingKind::Progressive {
            filename: filename.into(),
        });
        self
    }

    /// fMP4 segments, one muxing per stream
    pub fn segmented(mut self, segment_length: f64) -> Self {
        self.muxing = Some(MuxingKind::Segmented { segment_length });
        self
    }

    /// Appends a video filter; filters keep the order they are added in.
    pub fn add_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    /// None leaves the sprite stage out.
    pub fn sprite(mut self, sprite: Option<SpriteSpec>) -> Self {
        self.sprite = sprite;
        self
    }

    pub fn dash_manifest(mut self, name: impl Into<String>) -> Self {
        self.manifest = Some(ManifestSpec {
            name: name.into(),
            version: DashManifestDefaultVersion::V1,
        });
        self
    }

    pub fn build(self) -> Result<PipelineSpec> {
        let invalid = |msg: &str| PipelineError::InvalidPipeline(format!("{}: {}", self.name, msg));

        if self.name.trim().is_empty() {
            return Err(PipelineError::InvalidPipeline("name is required".to_string()));
        }
        let source = self.source.clone().ok_or_else(|| invalid("source is required"))?;
        let output_path = self
            .output_path
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid("output path is required"))?;
        let video = self.video.clone().ok_or_else(|| invalid("video config is required"))?;
        let audio = self.audio.clone().ok_or_else(|| invalid("audio config is required"))?;
        let muxing = self.muxing.clone().ok_or_else(|| invalid("muxing is required"))?;

        match &muxing {
            MuxingKind::Segmented { segment_length }
                if segment_length.is_nan() || *segment_length <= 0.0 =>
            {
                return Err(invalid("segment length must be positive"));
            }
            MuxingKind::Progressive { filename } if filename.is_empty() => {
                return Err(invalid("progressive output needs a file name"));
            }
            _ => {}
        }
        if self.manifest.is_some() && !muxing.is_segmented() {
            return Err(invalid("a DASH manifest needs segmented muxings"));
        }
        if video.height == 0 || video.bitrate == 0 || audio.bitrate == 0 {
            return Err(invalid("bitrates and height must be non-zero"));
        }

        Ok(PipelineSpec {
            name: self.name,
            encoder_version: self
                .encoder_version
                .unwrap_or_else(|| DEFAULT_ENCODER_VERSION.to_string()),
            source,
            output_path,
            video,
            audio,
            muxing,
            filters: self.filters,
            sprite: self.sprite,
            manifest: self.manifest,
        })
    }
}
