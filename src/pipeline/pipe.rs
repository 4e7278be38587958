use encoding_api::{
    EncodingApi, Transport,
    models::{
        AacAudioConfiguration, CloudRegion, DashManifestDefault, Encoding, EncodingOutput,
        Fmp4Muxing, H264VideoConfiguration, HttpInput, Mp4Muxing, MuxingStream,
        PresetConfiguration, S3Output, Sprite, StartEncodingRequest, Status, Stream, StreamFilter,
        StreamInput, StreamMode, StreamSelectionMode,
    },
    paths,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Settings,
    error::{RemoteStep, Result},
    pipeline::{
        ledger::{Ledger, ResourceKind},
        types::{FilterSpec, MuxingKind, PipelineSpec},
        waiter::CompletionWaiter,
    },
};

/// Ids of a submitted, started encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submitted {
    pub encoding_id: String,
    pub video_stream_id: String,
    pub audio_stream_id: String,
    pub manifest_id: Option<String>,
}

/// Outcome of a run that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub encoding_id: String,
    pub status: Status,
    pub manifest_id: Option<String>,
    pub manifest_started: bool,
}

/// Submits a [`PipelineSpec`] to the service and follows it to completion.
pub struct Pipeline<'a, T> {
    api: &'a EncodingApi<T>,
    settings: &'a Settings,
    spec: &'a PipelineSpec,
}

impl<'a, T: Transport> Pipeline<'a, T> {
    pub fn new(api: &'a EncodingApi<T>, settings: &'a Settings, spec: &'a PipelineSpec) -> Self {
        Self {
            api,
            settings,
            spec,
        }
    }

    /// Submit, start, wait, then start the manifest unless the encoding failed.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport> {
        log::info!("Pipeline: {}", self.spec.name);

        let mut ledger = Ledger::new();
        let submitted = match self.submit(&mut ledger).await {
            Ok(submitted) => submitted,
            Err(e) => {
                log::error!("Pipeline: submission failed: {}", e);
                self.abandon(&ledger).await;
                return Err(e);
            }
        };

        let waiter = CompletionWaiter::new(self.api, self.settings.poll_policy().clone());
        let status = match waiter.wait(&submitted.encoding_id, cancel).await {
            Ok(status) => status,
            Err(e) => {
                ledger.log_leftovers();
                return Err(e);
            }
        };

        let mut manifest_started = false;
        if let Some(manifest_id) = &submitted.manifest_id {
            // ERROR never gets here, the waiter turns it into JobFailed
            if status != Status::Error {
                self.api
                    .start_dash_manifest(manifest_id)
                    .await
                    .during("start manifest")?;
                log::info!("Pipeline: started manifest {}", manifest_id);
                manifest_started = true;
            } else {
                log::warn!(
                    "Pipeline: encoding ended {}, manifest {} not started",
                    status,
                    manifest_id
                );
            }
        }

        Ok(RunReport {
            encoding_id: submitted.encoding_id,
            status,
            manifest_id: submitted.manifest_id,
            manifest_started,
        })
    }

    /// Creates every resource in dependency order and starts the encoding.
    /// Each created resource is recorded in `ledger` as soon as its id is
    /// known.
    pub async fn submit(&self, ledger: &mut Ledger) -> Result<Submitted> {
        let spec = self.spec;

        let input_id = self
            .api
            .create_http_input(&HttpInput {
                id: None,
                host: spec.source.host.clone(),
            })
            .await
            .during("create input")?;
        ledger.record(ResourceKind::Input, &input_id, paths::http_input(&input_id));

        let output_id = self
            .api
            .create_s3_output(&S3Output {
                id: None,
                bucket_name: self.settings.s3_bucket_name().to_string(),
                access_key: self.settings.s3_access_key().to_string(),
                secret_key: self.settings.s3_secret_key().to_string(),
            })
            .await
            .during("create output")?;
        ledger.record(ResourceKind::Output, &output_id, paths::s3_output(&output_id));

        let encoding_id = self
            .api
            .create_encoding(&Encoding {
                id: None,
                name: spec.name.clone(),
                cloud_region: CloudRegion::Auto,
                encoder_version: spec.encoder_version.clone(),
            })
            .await
            .during("create encoding")?;
        ledger.record(ResourceKind::Encoding, &encoding_id, paths::encoding(&encoding_id));

        let video_config_id = self
            .api
            .create_h264_configuration(&H264VideoConfiguration {
                id: None,
                name: format!("H.264 {}p", spec.video.height),
                preset_configuration: PresetConfiguration::VodStandard,
                height: spec.video.height,
                bitrate: spec.video.bitrate,
            })
            .await
            .during("create video configuration")?;
        ledger.record(
            ResourceKind::VideoConfiguration,
            &video_config_id,
            paths::h264_configuration(&video_config_id),
        );

        let audio_config_id = self
            .api
            .create_aac_configuration(&AacAudioConfiguration {
                id: None,
                name: format!("AAC {} kbit/s", spec.audio.bitrate),
                bitrate: spec.audio.bitrate,
            })
            .await
            .during("create audio configuration")?;
        ledger.record(
            ResourceKind::AudioConfiguration,
            &audio_config_id,
            paths::aac_configuration(&audio_config_id),
        );

        let stream_input = StreamInput {
            input_id,
            input_path: spec.source.input_path.clone(),
            selection_mode: StreamSelectionMode::Auto,
        };
        let video_stream_id = self
            .create_stream(
                &encoding_id,
                &stream_input,
                video_config_id,
                "create video stream",
                ledger,
            )
            .await?;
        let audio_stream_id = self
            .create_stream(
                &encoding_id,
                &stream_input,
                audio_config_id,
                "create audio stream",
                ledger,
            )
            .await?;

        self.create_muxings(&encoding_id, &output_id, &video_stream_id, &audio_stream_id, ledger)
            .await?;
        self.attach_filters(&encoding_id, &video_stream_id, ledger).await?;
        self.create_sprite(&encoding_id, &video_stream_id, &output_id, ledger)
            .await?;

        self.api
            .start_encoding(&encoding_id, &StartEncodingRequest::default())
            .await
            .during("start encoding")?;
        log::info!("Pipeline: started encoding {}", encoding_id);
        ledger.mark_started(&encoding_id);

        let manifest_id = self.create_manifest(&encoding_id, &output_id, ledger).await?;

        Ok(Submitted {
            encoding_id,
            video_stream_id,
            audio_stream_id,
            manifest_id,
        })
    }

    async fn create_stream(
        &self,
        encoding_id: &str,
        input: &StreamInput,
        codec_config_id: String,
        step: &'static str,
        ledger: &mut Ledger,
    ) -> Result<String> {
        let stream_id = self
            .api
            .create_stream(
                encoding_id,
                &Stream {
                    id: None,
                    input_streams: vec![input.clone()],
                    codec_config_id,
                    mode: StreamMode::Standard,
                },
            )
            .await
            .during(step)?;
        ledger.record(
            ResourceKind::Stream,
            &stream_id,
            paths::stream(encoding_id, &stream_id),
        );
        Ok(stream_id)
    }

    async fn create_muxings(
        &self,
        encoding_id: &str,
        output_id: &str,
        video_stream_id: &str,
        audio_stream_id: &str,
        ledger: &mut Ledger,
    ) -> Result<()> {
        match &self.spec.muxing {
            MuxingKind::Progressive { filename } => {
                let muxing = Mp4Muxing {
                    id: None,
                    outputs: vec![encoding_output(output_id, self.spec.output_path.clone())],
                    filename: filename.clone(),
                    streams: [video_stream_id, audio_stream_id]
                        .into_iter()
                        .map(|stream_id| MuxingStream {
                            stream_id: stream_id.to_string(),
                        })
                        .collect(),
                };
                let muxing_id = self
                    .api
                    .create_mp4_muxing(encoding_id, &muxing)
                    .await
                    .during("create mp4 muxing")?;
                ledger.record(
                    ResourceKind::Muxing,
                    &muxing_id,
                    paths::mp4_muxing(encoding_id, &muxing_id),
                );
            }
            MuxingKind::Segmented { segment_length } => {
                let tracks = [
                    ("video", video_stream_id, "create video fmp4 muxing"),
                    ("audio", audio_stream_id, "create audio fmp4 muxing"),
                ];
                for (sub, stream_id, step) in tracks {
                    let muxing = Fmp4Muxing {
                        id: None,
                        outputs: vec![encoding_output(output_id, self.spec.output_subpath(sub))],
                        segment_length: *segment_length,
                        streams: vec![MuxingStream {
                            stream_id: stream_id.to_string(),
                        }],
                    };
                    let muxing_id = self
                        .api
                        .create_fmp4_muxing(encoding_id, &muxing)
                        .await
                        .during(step)?;
                    ledger.record(
                        ResourceKind::Muxing,
                        &muxing_id,
                        paths::fmp4_muxing(encoding_id, &muxing_id),
                    );
                }
            }
        }
        Ok(())
    }

    /// Creates the filters in order, then attaches them to the video stream
    /// at positions 0, 1, ...
    async fn attach_filters(
        &self,
        encoding_id: &str,
        video_stream_id: &str,
        ledger: &mut Ledger,
    ) -> Result<()> {
        if self.spec.filters.is_empty() {
            return Ok(());
        }

        let mut stream_filters = Vec::with_capacity(self.spec.filters.len());
        for (position, filter) in self.spec.filters.iter().enumerate() {
            let (filter_id, path) = match filter {
                FilterSpec::Watermark(watermark) => {
                    let id = self
                        .api
                        .create_watermark_filter(watermark)
                        .await
                        .during("create watermark filter")?;
                    let path = paths::watermark_filter(&id);
                    (id, path)
                }
                FilterSpec::Text(text) => {
                    let id = self
                        .api
                        .create_text_filter(text)
                        .await
                        .during("create text filter")?;
                    let path = paths::text_filter(&id);
                    (id, path)
                }
            };
            ledger.record(ResourceKind::Filter, &filter_id, path);
            stream_filters.push(StreamFilter {
                id: filter_id,
                position: position as u32,
            });
        }

        self.api
            .attach_stream_filters(encoding_id, video_stream_id, &stream_filters)
            .await
            .during("attach filters")?;
        log::info!(
            "Pipeline: attached {} filters to stream {}",
            stream_filters.len(),
            video_stream_id
        );
        Ok(())
    }

    async fn create_sprite(
        &self,
        encoding_id: &str,
        video_stream_id: &str,
        output_id: &str,
        ledger: &mut Ledger,
    ) -> Result<()> {
        let Some(spec) = &self.spec.sprite else {
            return Ok(());
        };
        let sprite = Sprite {
            id: None,
            outputs: vec![encoding_output(output_id, self.spec.output_subpath("sprites"))],
            name: spec.name.clone(),
            sprite_name: spec.sprite_name.clone(),
            width: spec.width,
            height: spec.height,
            distance: spec.distance,
            vtt_name: spec.vtt_name.clone(),
        };
        let sprite_id = self
            .api
            .create_sprite(encoding_id, video_stream_id, &sprite)
            .await
            .during("create sprite")?;
        ledger.record(
            ResourceKind::Sprite,
            &sprite_id,
            paths::sprite(encoding_id, video_stream_id, &sprite_id),
        );
        Ok(())
    }

    async fn create_manifest(
        &self,
        encoding_id: &str,
        output_id: &str,
        ledger: &mut Ledger,
    ) -> Result<Option<String>> {
        let Some(spec) = &self.spec.manifest else {
            return Ok(None);
        };
        let manifest = DashManifestDefault {
            id: None,
            encoding_id: encoding_id.to_string(),
            manifest_name: spec.name.clone(),
            version: spec.version,
            outputs: vec![encoding_output(output_id, self.spec.output_path.clone())],
        };
        let manifest_id = self
            .api
            .create_dash_manifest_default(&manifest)
            .await
            .during("create manifest")?;
        ledger.record(
            ResourceKind::Manifest,
            &manifest_id,
            paths::dash_manifest(&manifest_id),
        );
        Ok(Some(manifest_id))
    }

    /// Leftovers of a submission that did not make it to the end. Once the
    /// encoding runs its resources are only listed, never deleted.
    async fn abandon(&self, ledger: &Ledger) {
        if ledger.is_empty() {
            return;
        }
        if let Some(encoding_id) = ledger.started() {
            log::warn!(
                "Pipeline: encoding {} is already running, leaving its resources in place",
                encoding_id
            );
            ledger.log_leftovers();
        } else if self.settings.cleanup_on_failure() {
            let deleted = ledger.cleanup(self.api).await;
            log::warn!(
                "Pipeline: cleaned up {} of {} created resources",
                deleted,
                ledger.resources().len()
            );
        } else {
            ledger.log_leftovers();
        }
    }
}

fn encoding_output(output_id: &str, output_path: String) -> EncodingOutput {
    EncodingOutput {
        output_id: output_id.to_string(),
        output_path,
    }
}

#[cfg(test)]
#[path = "pipe_test.rs"]
mod pipe_test;
