//! HTTP transport for repository uploads.
//!
//! The trait keeps the publisher testable without a network; the `ureq`
//! implementation is the only one used in production.

use super::PublishError;
use super::target::Credentials;
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for a single upload.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Uploads one file to a Maven repository.
#[cfg_attr(test, mockall::automock)]
pub trait RepositoryClient: Send + Sync {
    /// `PUT` `body` at `url` authenticated as `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Unauthorized`] for 401 and 403 responses and
    /// [`PublishError::Upload`] for every other failure.
    fn put(&self, url: &str, body: &[u8], credentials: &Credentials) -> Result<(), PublishError>;
}

/// [`RepositoryClient`] backed by `ureq`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpRepositoryClient;

impl RepositoryClient for HttpRepositoryClient {
    fn put(&self, url: &str, body: &[u8], credentials: &Credentials) -> Result<(), PublishError> {
        http_agent()
            .put(url)
            .header("Authorization", &credentials.authorization())
            .send(body)
            .map_err(|err| map_ureq_error(url, &err))?;
        Ok(())
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(UPLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> PublishError {
    match err {
        ureq::Error::StatusCode(status @ (401 | 403)) => PublishError::Unauthorized {
            url: url.to_owned(),
            status: *status,
        },
        other => PublishError::Upload {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(401)]
    #[case(403)]
    fn rejected_credentials_are_unauthorized(#[case] status: u16) {
        let mapped = map_ureq_error("https://repo.example.com/x.jar", &ureq::Error::StatusCode(status));
        assert_eq!(
            mapped,
            PublishError::Unauthorized {
                url: "https://repo.example.com/x.jar".to_owned(),
                status,
            }
        );
    }

    #[test]
    fn other_statuses_are_upload_failures() {
        let mapped = map_ureq_error("https://repo.example.com/x.jar", &ureq::Error::StatusCode(502));
        assert!(matches!(mapped, PublishError::Upload { .. }));
    }
}
