//! Remote progression store client.
//!
//! Talks to the vigild HTTP API. Only authenticated identities have remote
//! records; guest progression never leaves the machine.

use crate::backend::ProgressBackend;
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;
use vigil_shared::{Identity, ProgressionError, Result, UserId, UserProgress};

pub struct HttpStore {
    endpoint: Url,
    client: Client,
}

impl HttpStore {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ProgressionError::Persistence(format!("invalid remote endpoint '{}': {}", endpoint, e))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProgressionError::Persistence(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    fn record_url(&self, identity: &Identity) -> Result<Url> {
        match identity {
            Identity::Guest => Err(ProgressionError::InvalidIdentity(
                "guest progression is never stored remotely".to_string(),
            )),
            Identity::User(id) => self.url(&["v1", "progress", id.as_str()]),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ProgressionError::Persistence(format!("endpoint '{}' cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Check that the service answers
    pub fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url(&["v1", "health"])?)
            .send()
            .map_err(transport_error)?;
        expect_success(response).map(|_| ())
    }

    /// User ids the service currently holds records for
    pub fn list_users(&self) -> Result<Vec<UserId>> {
        let response = self
            .client
            .get(self.url(&["v1", "progress"])?)
            .send()
            .map_err(transport_error)?;
        expect_success(response)?
            .json()
            .map_err(|e| ProgressionError::Persistence(format!("malformed user list: {}", e)))
    }
}

impl ProgressBackend for HttpStore {
    fn load(&self, identity: &Identity) -> Result<UserProgress> {
        let url = self.record_url(identity)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProgressionError::NotFound(identity.clone()));
        }
        let progress: UserProgress = expect_success(response)?
            .json()
            .map_err(|e| ProgressionError::Persistence(format!("malformed remote record: {}", e)))?;
        Ok(progress.normalized())
    }

    fn save(&self, identity: &Identity, progress: &UserProgress) -> Result<()> {
        let url = self.record_url(identity)?;
        debug!("PUT {}", url);
        let response = self
            .client
            .put(url)
            .json(progress)
            .send()
            .map_err(transport_error)?;
        expect_success(response).map(|_| ())
    }

    fn remove(&self, identity: &Identity) -> Result<()> {
        let url = self.record_url(identity)?;
        let response = self.client.delete(url).send().map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success(response).map(|_| ())
    }

    fn describe(&self) -> String {
        format!("remote store at {}", self.endpoint)
    }
}

fn transport_error(e: reqwest::Error) -> ProgressionError {
    if e.is_timeout() {
        ProgressionError::Persistence(format!("remote store timed out: {}", e))
    } else {
        ProgressionError::Persistence(format!("remote store unreachable: {}", e))
    }
}

fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(status_error(status, body.trim()))
}

/// Client errors are permanent; everything else may clear up on retry
fn status_error(status: StatusCode, body: &str) -> ProgressionError {
    let message = format!("remote store returned {}: {}", status, body);
    if status.is_client_error() && status != StatusCode::NOT_FOUND {
        ProgressionError::Rejected(message)
    } else {
        ProgressionError::Persistence(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpStore {
        HttpStore::new("http://127.0.0.1:7866/", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_record_url_encodes_user_id() {
        let ada = Identity::User(UserId::new("ada lovelace/1").unwrap());
        let url = store().record_url(&ada).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7866/v1/progress/ada%20lovelace%2F1"
        );
    }

    #[test]
    fn test_guest_is_rejected() {
        let err = store().record_url(&Identity::Guest).unwrap_err();
        assert!(matches!(err, ProgressionError::InvalidIdentity(_)));
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(HttpStore::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::PAYLOAD_TOO_LARGE,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            let err = status_error(status, "bad record");
            assert!(matches!(err, ProgressionError::Rejected(_)), "{}", status);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_server_errors_stay_retryable() {
        for status in [StatusCode::INTERNAL_SERVER_ERROR, StatusCode::SERVICE_UNAVAILABLE] {
            let err = status_error(status, "");
            assert!(matches!(err, ProgressionError::Persistence(_)));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_unreachable_service_is_persistence_error() {
        // Port 9 (discard) is not served by vigild
        let store = HttpStore::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let ada = Identity::User(UserId::new("ada").unwrap());
        let err = store.load(&ada).unwrap_err();
        assert!(matches!(err, ProgressionError::Persistence(_)));
        assert!(err.is_retryable());
    }
}
