//! Status of queued requests.

use tracing::debug;

use crate::compute::Poller;
use crate::error::{ProfitBricksError, ProvisionError, Result};
use crate::profitbricks::client::ProfitBricksClient;
use crate::profitbricks::types::{RequestState, RequestStatus};

/// Request status lookups.
#[derive(Debug, Clone, Copy)]
pub struct RequestApi<'a> {
    client: &'a ProfitBricksClient,
}

impl<'a> RequestApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient) -> Self {
        Self { client }
    }

    /// Fetches the status behind a `Location` URI or a `/requests/{id}/status` path.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be fetched.
    pub async fn status(&self, uri: &str) -> Result<RequestStatus> {
        self.client.get(uri, 0).await?.ok_or_else(|| {
            ProfitBricksError::InvalidResponse {
                message: format!("request status {uri} not found"),
            }
            .into()
        })
    }

    /// Waits until the request is `DONE`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfitBricksError::RequestFailed`] if the request ends
    /// `FAILED`, or a timeout if it is still queued or running when the
    /// poller gives up.
    pub async fn wait(&self, uri: &str, poller: &Poller) -> Result<()> {
        let done = poller
            .until(&format!("request {uri}"), || async move {
                let status = self.status(uri).await?;
                debug!("Request {uri} is {:?}", status.metadata.status);
                match status.metadata.status {
                    RequestState::Done => Ok(true),
                    RequestState::Queued | RequestState::Running => Ok(false),
                    RequestState::Failed => Err(ProfitBricksError::RequestFailed {
                        request_id: request_id(uri, &status),
                        message: status.metadata.message.unwrap_or_default(),
                    }
                    .into()),
                }
            })
            .await?;

        if done {
            Ok(())
        } else {
            Err(ProvisionError::timeout(format!("request {uri}"), "DONE").into())
        }
    }
}

fn request_id(uri: &str, status: &RequestStatus) -> String {
    if !status.id.is_empty() {
        return status.id.clone();
    }
    uri.trim_end_matches("/status")
        .rsplit('/')
        .next()
        .unwrap_or(uri)
        .to_string()
}
