use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{ApiError, Result},
    models::{
        AacAudioConfiguration, DashManifestDefault, Encoding, Fmp4Muxing, H264VideoConfiguration,
        HttpInput, Mp4Muxing, S3Output, Sprite, StartEncodingRequest, Stream, StreamFilter, Task,
        TextFilter, WatermarkFilter,
    },
    paths,
    transport::Transport,
};

/// Typed facade over a [`Transport`].
///
/// Create calls return the id the service assigned to the new resource;
/// nothing else of the created resource is needed by callers.
pub struct EncodingApi<T> {
    transport: T,
}

impl<T: Transport> EncodingApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn create_http_input(&self, input: &HttpInput) -> Result<String> {
        self.create(paths::HTTP_INPUTS, input).await
    }

    pub async fn create_s3_output(&self, output: &S3Output) -> Result<String> {
        self.create(paths::S3_OUTPUTS, output).await
    }

    pub async fn create_encoding(&self, encoding: &Encoding) -> Result<String> {
        self.create(paths::ENCODINGS, encoding).await
    }

    pub async fn create_h264_configuration(
        &self,
        config: &H264VideoConfiguration,
    ) -> Result<String> {
        self.create(paths::H264_CONFIGURATIONS, config).await
    }

    pub async fn create_aac_configuration(&self, config: &AacAudioConfiguration) -> Result<String> {
        self.create(paths::AAC_CONFIGURATIONS, config).await
    }

    pub async fn create_stream(&self, encoding_id: &str, stream: &Stream) -> Result<String> {
        self.create(&paths::streams(encoding_id), stream).await
    }

    pub async fn create_mp4_muxing(&self, encoding_id: &str, muxing: &Mp4Muxing) -> Result<String> {
        self.create(&paths::mp4_muxings(encoding_id), muxing).await
    }

    pub async fn create_fmp4_muxing(
        &self,
        encoding_id: &str,
        muxing: &Fmp4Muxing,
    ) -> Result<String> {
        self.create(&paths::fmp4_muxings(encoding_id), muxing).await
    }

    pub async fn create_watermark_filter(&self, filter: &WatermarkFilter) -> Result<String> {
        self.create(paths::WATERMARK_FILTERS, filter).await
    }

    pub async fn create_text_filter(&self, filter: &TextFilter) -> Result<String> {
        self.create(paths::TEXT_FILTERS, filter).await
    }

    /// Attaches already created filters to a stream. The service answers with
    /// the stored list, which carries no id of its own.
    pub async fn attach_stream_filters(
        &self,
        encoding_id: &str,
        stream_id: &str,
        filters: &[StreamFilter],
    ) -> Result<()> {
        let path = paths::stream_filters(encoding_id, stream_id);
        let body = to_body(&path, filters)?;
        self.transport.send(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    pub async fn create_sprite(
        &self,
        encoding_id: &str,
        stream_id: &str,
        sprite: &Sprite,
    ) -> Result<String> {
        self.create(&paths::sprites(encoding_id, stream_id), sprite).await
    }

    pub async fn start_encoding(
        &self,
        encoding_id: &str,
        request: &StartEncodingRequest,
    ) -> Result<()> {
        let path = paths::encoding_start(encoding_id);
        let body = to_body(&path, request)?;
        self.transport.send(Method::POST, &path, Some(body)).await?;
        Ok(())
    }

    pub async fn encoding_status(&self, encoding_id: &str) -> Result<Task> {
        let path = paths::encoding_status(encoding_id);
        let value = self.transport.send(Method::GET, &path, None).await?;
        serde_json::from_value(value).map_err(|source| ApiError::Decode { path, source })
    }

    pub async fn create_dash_manifest_default(
        &self,
        manifest: &DashManifestDefault,
    ) -> Result<String> {
        self.create(paths::DEFAULT_DASH_MANIFESTS, manifest).await
    }

    pub async fn start_dash_manifest(&self, manifest_id: &str) -> Result<()> {
        let path = paths::dash_manifest_start(manifest_id);
        self.transport.send(Method::POST, &path, None).await?;
        Ok(())
    }

    /// Deletes the resource living at `path`, as returned by the helpers in
    /// [`paths`].
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.transport.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn create<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let body = to_body(path, body)?;
        let created = self.transport.send(Method::POST, path, Some(body)).await?;
        created
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::MissingId {
                path: path.to_string(),
            })
    }
}

fn to_body<B: Serialize + ?Sized>(path: &str, body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}
