//! Upload orchestrator: negotiate, transfer, then verify when offered.
//!
//! The steps run as a small state machine. Each state either advances or
//! returns the first [`ClassifiedError`]; no later step runs after a failure
//! and nothing is retried here.

use std::future::Future;
use std::path::Path;

use lfs_protocol::{ObjectResource, Relation};
use lfs_transfer::{ByteSource, FileSource, LocalObjectStore, ProgressCallback, validate_oid};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::TransferClient;
use crate::error::{ClassifiedError, Stage};

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub oid: String,
    pub size: i64,
    /// True when the server offered a verify link and accepted it.
    pub verified: bool,
}

enum UploadState {
    Negotiating,
    Transferring(ObjectResource),
    Verifying(ObjectResource),
    Done { verified: bool },
}

/// Public entry point for uploading one object at a time.
///
/// An `Uploader` holds no per-upload state, so one instance can drive many
/// concurrent uploads from independent tasks. Clones share one cancellation
/// token: see [`cancel_token`](Self::cancel_token).
#[derive(Debug, Clone)]
pub struct Uploader {
    client: TransferClient,
    cancel: CancellationToken,
}

impl Uploader {
    pub fn new(client: TransferClient) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    /// Token shared by this uploader and all of its clones.
    ///
    /// Cancelling it abandons every in-flight upload at its current step and
    /// fails every later upload on this uploader and its clones before any
    /// request is sent. A cancelled uploader cannot be reset; build a new
    /// one from [`client`](Self::client) to upload again.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn client(&self) -> &TransferClient {
        &self.client
    }

    /// Uploads `size` bytes from `source` as `oid`.
    pub async fn upload(
        &self,
        source: &dyn ByteSource,
        oid: &str,
        size: i64,
        progress: Option<ProgressCallback>,
    ) -> Result<UploadReport, ClassifiedError> {
        let result = self.run(source, oid, size, progress).await;
        match &result {
            Ok(report) => info!(
                oid = %report.oid,
                size = report.size,
                verified = report.verified,
                "upload complete"
            ),
            Err(e) => warn!(
                oid = %oid,
                stage = %e.stage(),
                status = e.status(),
                fatal = e.is_fatal(),
                error = %e,
                "upload failed"
            ),
        }
        result
    }

    /// Uploads the file at `path`, using its file name as the oid.
    pub async fn upload_path(
        &self,
        path: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<UploadReport, ClassifiedError> {
        let location = path.display().to_string();
        let classifier = self.client.classifier();

        let source = FileSource::new(path)
            .map_err(|e| classifier.source_error(Stage::Prepare, &e, &location))?;
        let oid = source.file_name().map(str::to_string).unwrap_or_default();
        validate_oid(&oid).map_err(|e| classifier.source_error(Stage::Prepare, &e, &location))?;

        let size = source.len();
        self.upload(&source, &oid, size, progress).await
    }

    /// Uploads `oid` from a local object directory.
    pub async fn upload_object(
        &self,
        store: &LocalObjectStore,
        oid: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<UploadReport, ClassifiedError> {
        let location = store.root().display().to_string();
        let classifier = self.client.classifier();

        let source = store
            .source(oid)
            .map_err(|e| classifier.source_error(Stage::Prepare, &e, &location))?;

        let size = source.len();
        self.upload(&source, oid, size, progress).await
    }

    async fn run(
        &self,
        source: &dyn ByteSource,
        oid: &str,
        size: i64,
        mut progress: Option<ProgressCallback>,
    ) -> Result<UploadReport, ClassifiedError> {
        let mut state = UploadState::Negotiating;
        loop {
            state = match state {
                UploadState::Negotiating => {
                    let url = self.client.objects_url().to_string();
                    let obj = self
                        .guard(Stage::Negotiate, &url, self.client.negotiate(oid, size))
                        .await?;
                    UploadState::Transferring(obj)
                }
                UploadState::Transferring(obj) => {
                    let url = link_href(&obj, Relation::Upload);
                    self.guard(
                        Stage::Transfer,
                        &url,
                        self.client.transfer(&obj, source, progress.take()),
                    )
                    .await?;
                    UploadState::Verifying(obj)
                }
                UploadState::Verifying(obj) => {
                    let url = link_href(&obj, Relation::Verify);
                    let verified = self
                        .guard(Stage::Verify, &url, self.client.verify(&obj))
                        .await?;
                    UploadState::Done { verified }
                }
                UploadState::Done { verified } => {
                    return Ok(UploadReport {
                        oid: oid.to_string(),
                        size,
                        verified,
                    });
                }
            };
        }
    }

    /// Runs one step unless the upload is cancelled first.
    async fn guard<T>(
        &self,
        stage: Stage,
        url: &str,
        step: impl Future<Output = Result<T, ClassifiedError>>,
    ) -> Result<T, ClassifiedError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(stage = %stage, url = %url, "upload cancelled");
                Err(self.client.classifier().cancelled(stage, url))
            }
            result = step => result,
        }
    }
}

fn link_href(obj: &ObjectResource, relation: Relation) -> String {
    obj.link(relation)
        .map(|l| l.href.clone())
        .unwrap_or_default()
}
