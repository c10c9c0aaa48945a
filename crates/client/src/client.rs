//! HTTP exchanges with the object API.
//!
//! Each method performs one step and classifies its own failures; it never
//! retries and never runs the next step.

use std::sync::Arc;
use std::time::Duration;

use lfs_config::LfsConfig;
use lfs_protocol::{Link, MEDIA_TYPE, OCTET_STREAM, ObjectResource, ProtocolError, Relation};
use lfs_transfer::{
    ByteSource, LastActivity, ProgressCallback, ProgressReporter, SizedBodyStream, TransferError,
};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use tracing::{debug, warn};

use crate::classifier::ErrorClassifier;
use crate::error::{ClassifiedError, ClientError, Stage};

/// Issues the negotiate, transfer and verify requests for one object.
///
/// Cheap to clone: the HTTP client and classifier are shared.
#[derive(Debug, Clone)]
pub struct TransferClient {
    http: reqwest::Client,
    objects_url: String,
    api_headers: HeaderMap,
    timeout: Duration,
    classifier: Arc<ErrorClassifier>,
}

impl TransferClient {
    /// Creates a client from configuration with the default status table.
    pub fn new(config: &LfsConfig) -> Result<Self, ClientError> {
        let http = Self::http_builder(config).build()?;
        Self::with_http(config, http, Arc::new(ErrorClassifier::default()))
    }

    /// Transport builder used by [`new`](Self::new).
    ///
    /// Only connecting is bounded here. A whole-request deadline would also
    /// cover streaming the upload body, so request deadlines are applied per
    /// step instead.
    pub fn http_builder(config: &LfsConfig) -> reqwest::ClientBuilder {
        reqwest::Client::builder().connect_timeout(config.timeout)
    }

    /// Creates a client around an existing transport and classifier.
    ///
    /// Proxy and TLS settings are whatever `http` was built with.
    /// `config.timeout` bounds each negotiate and verify request, and the
    /// time a transfer may go without progress.
    pub fn with_http(
        config: &LfsConfig,
        http: reqwest::Client,
        classifier: Arc<ErrorClassifier>,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let mut api_headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let (name, value) = lfs_config::parse_header(name, value)?;
            api_headers.insert(name, value);
        }

        Ok(Self {
            http,
            objects_url: config.objects_url(),
            api_headers,
            timeout: config.timeout,
            classifier,
        })
    }

    /// URL of the negotiation endpoint.
    pub fn objects_url(&self) -> &str {
        &self.objects_url
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Asks the object API where to upload `oid`.
    ///
    /// Only a 200 with a decodable body that carries an `upload` link
    /// succeeds. The returned resource always carries the requested oid and
    /// size, whatever the server echoed back.
    pub async fn negotiate(&self, oid: &str, size: i64) -> Result<ObjectResource, ClassifiedError> {
        let url = self.objects_url.as_str();
        let body = encode_json(&ObjectResource::request(oid, size), Stage::Negotiate, url)?;

        debug!(oid = %oid, size, url = %url, "negotiating upload");
        let resp = self
            .http
            .post(url)
            .timeout(self.timeout)
            .headers(self.api_headers.clone())
            .header(ACCEPT, MEDIA_TYPE)
            .header(CONTENT_TYPE, MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| self.classifier.transport_error(Stage::Negotiate, &e, url))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let code = status.as_u16();
            return Err(self.classifier.status_error(Stage::Negotiate, code, url));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| self.classifier.transport_error(Stage::Negotiate, &e, url))?;

        // A 200 promised a resource; anything else means we cannot trust
        // our own reading of the exchange.
        let mut obj: ObjectResource = serde_json::from_slice(&bytes).map_err(|e| {
            ClassifiedError::fatal(
                Stage::Negotiate,
                url,
                format!("Unable to parse object resource from {url}: {e}"),
            )
        })?;

        obj.validate_for_upload()
            .map_err(|e| self.classifier.protocol_error(Stage::Negotiate, &e, url))?;

        if (!obj.oid.is_empty() && obj.oid != oid) || (obj.size != 0 && obj.size != size) {
            warn!(
                oid = %oid,
                size,
                server_oid = %obj.oid,
                server_size = obj.size,
                "server echoed different object metadata"
            );
        }
        obj.oid = oid.to_string();
        obj.size = size;

        Ok(obj)
    }

    /// Sends the object bytes to the `upload` link.
    ///
    /// The source is opened once and streamed with a `Content-Length` equal
    /// to the negotiated size. A source whose length differs from that size
    /// is rejected before any request is made. The transfer fails once it
    /// goes the configured timeout without sending a chunk or, after the
    /// last chunk, without a response.
    pub async fn transfer(
        &self,
        obj: &ObjectResource,
        source: &dyn ByteSource,
        progress: Option<ProgressCallback>,
    ) -> Result<(), ClassifiedError> {
        let link = self.require_link(obj, Relation::Upload, Stage::Transfer)?;
        let url = link.href.as_str();

        if obj.size < 0 || source.len() != obj.size {
            let err = TransferError::SizeMismatch {
                oid: obj.oid.clone(),
                declared: obj.size,
                actual: source.len(),
            };
            let message = format!("{err} ({})", source.describe());
            return Err(ClassifiedError::fatal(Stage::Transfer, url, message));
        }
        let headers = self.link_headers(link, Stage::Transfer)?;

        let reader = source.open().await.map_err(|e| {
            let location = source.describe();
            self.classifier.source_error(Stage::Transfer, &e, &location)
        })?;
        let reporter = ProgressReporter::new(obj.oid.clone(), obj.size, progress);
        let activity = LastActivity::new();
        let body = SizedBodyStream::new(reader, obj.size as u64, reporter)
            .with_activity(activity.clone());

        debug!(oid = %obj.oid, size = obj.size, url = %url, "uploading object");
        let request = self
            .http
            .put(url)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .header(CONTENT_LENGTH, obj.size)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body))
            .send();

        let resp = tokio::select! {
            result = request => {
                result.map_err(|e| self.classifier.transport_error(Stage::Transfer, &e, url))?
            }
            _ = activity.stalled(self.timeout) => {
                warn!(oid = %obj.oid, url = %url, timeout = ?self.timeout, "transfer stalled");
                return Err(self.classifier.timed_out(Stage::Transfer, url));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            return Err(self.classifier.status_error(Stage::Transfer, code, url));
        }
        Ok(())
    }

    /// Confirms the stored object through the `verify` link.
    ///
    /// Returns `Ok(false)` without any request when the server did not
    /// advertise a verify link.
    pub async fn verify(&self, obj: &ObjectResource) -> Result<bool, ClassifiedError> {
        let Some(link) = obj.link(Relation::Verify) else {
            debug!(oid = %obj.oid, "no verify link, skipping verification");
            return Ok(false);
        };
        let url = link.href.as_str();
        let headers = self.link_headers(link, Stage::Verify)?;
        let body = encode_json(&obj.without_links(), Stage::Verify, url)?;

        debug!(oid = %obj.oid, url = %url, "verifying object");
        let resp = self
            .http
            .post(url)
            .timeout(self.timeout)
            .header(ACCEPT, MEDIA_TYPE)
            .header(CONTENT_TYPE, MEDIA_TYPE)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| self.classifier.transport_error(Stage::Verify, &e, url))?;

        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            return Err(self.classifier.status_error(Stage::Verify, code, url));
        }
        Ok(true)
    }

    fn require_link<'a>(
        &self,
        obj: &'a ObjectResource,
        relation: Relation,
        stage: Stage,
    ) -> Result<&'a Link, ClassifiedError> {
        obj.link(relation).ok_or_else(|| {
            let err = ProtocolError::MissingLink(relation.as_str());
            self.classifier.protocol_error(stage, &err, &self.objects_url)
        })
    }

    /// Converts a link's header map, rejecting entries HTTP cannot carry.
    fn link_headers(&self, link: &Link, stage: Stage) -> Result<HeaderMap, ClassifiedError> {
        let mut headers = HeaderMap::with_capacity(link.header.len());
        for (name, value) in &link.header {
            let (name, value) = lfs_config::parse_header(name, value)
                .map_err(|_| self.classifier.invalid_header(stage, name, &link.href))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

fn encode_json(obj: &ObjectResource, stage: Stage, url: &str) -> Result<Vec<u8>, ClassifiedError> {
    serde_json::to_vec(obj).map_err(|e| {
        let message = format!("Unable to encode request for {url}: {e}");
        ClassifiedError::fatal(stage, url, message)
    })
}
