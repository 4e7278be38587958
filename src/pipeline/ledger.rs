use std::fmt::{Display, Formatter};

use encoding_api::{EncodingApi, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Input,
    Output,
    Encoding,
    VideoConfiguration,
    AudioConfiguration,
    Stream,
    Muxing,
    Filter,
    Sprite,
    Manifest,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::Input => "input",
            ResourceKind::Output => "output",
            ResourceKind::Encoding => "encoding",
            ResourceKind::VideoConfiguration => "video configuration",
            ResourceKind::AudioConfiguration => "audio configuration",
            ResourceKind::Stream => "stream",
            ResourceKind::Muxing => "muxing",
            ResourceKind::Filter => "filter",
            ResourceKind::Sprite => "sprite",
            ResourceKind::Manifest => "manifest",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedResource {
    pub kind: ResourceKind,
    pub id: String,
    /// Path the resource can be deleted at.
    pub path: String,
}

/// Remote resources created by one run, in creation order.
#[derive(Debug, Default)]
pub struct Ledger {
    created: Vec<CreatedResource>,
    started: Option<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ResourceKind, id: &str, path: String) {
        log::info!("created {} {}", kind, id);
        self.created.push(CreatedResource {
            kind,
            id: id.to_string(),
            path,
        });
    }

    /// Marks the encoding as running. From here on nothing recorded may be
    /// deleted, since the job still reads from it.
    pub fn mark_started(&mut self, encoding_id: &str) {
        self.started = Some(encoding_id.to_string());
    }

    pub fn started(&self) -> Option<&str> {
        self.started.as_deref()
    }

    pub fn resources(&self) -> &[CreatedResource] {
        &self.created
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Lists what was left behind on the service so it can be removed by hand.
    pub fn log_leftovers(&self) {
        if self.created.is_empty() {
            return;
        }
        log::warn!(
            "{} remote resources were created by this run:",
            self.created.len()
        );
        for resource in &self.created {
            log::warn!("  {} {} ({})", resource.kind, resource.id, resource.path);
        }
    }

    /// Deletes everything recorded, newest first. Failures are logged and
    /// skipped. Returns the number of resources actually deleted.
    pub async fn cleanup<T: Transport>(&self, api: &EncodingApi<T>) -> usize {
        let mut deleted = 0;
        for resource in self.created.iter().rev() {
            match api.delete(&resource.path).await {
                Ok(()) => {
                    log::info!("deleted {} {}", resource.kind, resource.id);
                    deleted += 1;
                }
                Err(e) => {
                    log::warn!(
                        "could not delete {} {}, remove it manually: {}",
                        resource.kind,
                        resource.id,
                        e
                    );
                }
            }
        }
        deleted
    }
}
