//! Uploading bundles to a Maven repository.
//!
//! A run publishes to exactly one endpoint, chosen by the release flag. Each
//! bundle uploads its jar and POM, each followed by `.sha1` and `.sha256`
//! files, to the bundle's Maven path. Uploads to the endpoint are serialised
//! behind a mutex so parallel variants never interleave partial artefacts,
//! and a failed bundle does not stop the others.

pub mod client;
pub mod target;

pub use client::{HttpRepositoryClient, RepositoryClient};
pub use target::{Channel, Credentials, PublishTarget};

use crate::bundle::ArtifactBundle;
use crate::checksum::{Sha256Digest, sha1_hex};
use camino::Utf8Path;
use log::{debug, info};
use serde::Serialize;
use std::sync::Mutex;
use thiserror::Error;

/// Why a bundle could not be published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// A credential variable is unset or empty.
    #[error("environment variable {variable} must hold the repository credentials")]
    MissingCredentials {
        /// Name of the variable.
        variable: String,
    },

    /// The repository rejected the credentials.
    #[error("repository rejected the credentials for {url} (HTTP {status})")]
    Unauthorized {
        /// Upload URL.
        url: String,
        /// Response status.
        status: u16,
    },

    /// An upload failed for any other reason.
    #[error("upload to {url} failed: {reason}")]
    Upload {
        /// Upload URL.
        url: String,
        /// Transport or status description.
        reason: String,
    },

    /// A bundle file could not be read.
    #[error("failed to read {path}: {reason}")]
    Read {
        /// File path.
        path: String,
        /// I/O failure.
        reason: String,
    },
}

/// One planned `PUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Destination URL.
    pub url: String,
    /// Request body.
    pub body: Vec<u8>,
}

/// The outcome of publishing one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedBundle {
    /// `group:artifact:version` of the bundle.
    pub coordinate: String,
    /// Endpoint channel.
    pub channel: Channel,
    /// Uploaded (or, for dry runs, planned) URLs in upload order.
    pub urls: Vec<String>,
}

/// Every upload of `bundle`, in order: jar, its checksums, POM, its
/// checksums.
///
/// # Errors
///
/// Returns [`PublishError::Read`] when the jar or POM cannot be read.
pub fn plan_uploads(
    target: &PublishTarget,
    bundle: &ArtifactBundle,
) -> Result<Vec<Upload>, PublishError> {
    let coordinate = &bundle.identity.coordinate;
    let mut uploads = Vec::with_capacity(6);
    for (path, extension) in [(&bundle.jar, "jar"), (&bundle.pom, "pom")] {
        let body = read(path)?;
        // The jar digest was recorded when the bundle was written.
        let sha256 = if extension == "jar" {
            bundle.sha256.clone()
        } else {
            Sha256Digest::of(&body)
        };
        let sha1 = sha1_hex(&body);
        uploads.push(Upload {
            url: target.artifact_url(coordinate, extension),
            body,
        });
        uploads.push(Upload {
            url: target.artifact_url(coordinate, &format!("{extension}.sha1")),
            body: sha1.into_bytes(),
        });
        uploads.push(Upload {
            url: target.artifact_url(coordinate, &format!("{extension}.sha256")),
            body: sha256.as_str().as_bytes().to_vec(),
        });
    }
    Ok(uploads)
}

fn read(path: &Utf8Path) -> Result<Vec<u8>, PublishError> {
    std::fs::read(path).map_err(|err| PublishError::Read {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

/// Publishes bundles to one endpoint.
#[derive(Debug)]
pub struct Publisher<C> {
    client: C,
    target: PublishTarget,
    credentials: Credentials,
    endpoint: Mutex<()>,
}

impl<C: RepositoryClient> Publisher<C> {
    /// A publisher uploading through `client` to `target`.
    pub fn new(client: C, target: PublishTarget, credentials: Credentials) -> Self {
        Self {
            client,
            target,
            credentials,
            endpoint: Mutex::new(()),
        }
    }

    /// The endpoint this publisher uploads to.
    pub fn target(&self) -> &PublishTarget {
        &self.target
    }

    /// Upload every file of `bundle`.
    ///
    /// # Errors
    ///
    /// Returns the first [`PublishError`]; files already uploaded stay in
    /// the repository.
    pub fn publish(&self, bundle: &ArtifactBundle) -> Result<PublishedBundle, PublishError> {
        let uploads = plan_uploads(&self.target, bundle)?;
        let coordinate = bundle.identity.coordinate.to_string();
        let mut urls = Vec::with_capacity(uploads.len());
        // A poisoned lock leaves the endpoint usable.
        let _guard = self
            .endpoint
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        info!(
            "publishing {coordinate} to the {} repository",
            self.target.channel
        );
        for upload in uploads {
            debug!("PUT {} ({} bytes)", upload.url, upload.body.len());
            self.client
                .put(&upload.url, &upload.body, &self.credentials)?;
            urls.push(upload.url);
        }
        Ok(PublishedBundle {
            coordinate,
            channel: self.target.channel,
            urls,
        })
    }
}
