//! Readiness checks for Azure resources, evaluated through [`Poller`].

use std::sync::Mutex;
use tracing::{debug, warn};

use crate::compute::Poller;
use crate::error::{ArmError, ProvisionError, Result};

use super::client::{ArmClient, DeleteOutcome, JobStatus};
use super::types::{ProvisioningState, PublicIpAddress, StorageService};

/// Waits until a public IP reports `Succeeded` and returns it.
///
/// # Errors
///
/// Returns [`ProvisionError::PublicIpNotProvisioned`] if the address is not
/// provisioned in time, or a step failure if ARM reports the address as failed.
pub async fn public_ip_available(
    client: &ArmClient,
    group: &str,
    name: &str,
    poller: &Poller,
) -> Result<PublicIpAddress> {
    let api = client.public_ips(group);
    let latest = Mutex::new(None);
    let slot = &latest;

    let ready = poller
        .until(&format!("public IP {name} provisioned"), || async move {
            let Some(address) = api.get(name).await? else {
                return Ok(false);
            };
            let state = address.provisioning_state();
            remember(slot, address);
            match state {
                ProvisioningState::Succeeded => Ok(true),
                ProvisioningState::Failed | ProvisioningState::Canceled => {
                    Err(ProvisionError::StepFailed {
                        node: name.to_string(),
                        step: String::from("public IP"),
                        reason: format!("provisioning state {state:?}"),
                    }
                    .into())
                }
                _ => Ok(false),
            }
        })
        .await?;

    match take(latest) {
        Some(address) if ready => Ok(address),
        _ => Err(ProvisionError::PublicIpNotProvisioned {
            name: name.to_string(),
        }
        .into()),
    }
}

/// Waits for an asynchronous ARM operation. Returns false on timeout.
///
/// # Errors
///
/// Returns [`ArmError::OperationFailed`] if the operation failed.
pub async fn operation_completed(client: &ArmClient, uri: &str, poller: &Poller) -> Result<bool> {
    poller
        .until(&format!("operation {uri}"), || async move {
            match client.job_status(uri).await? {
                JobStatus::Done => Ok(true),
                JobStatus::InProgress => Ok(false),
                JobStatus::Failed => Err(ArmError::OperationFailed {
                    uri: uri.to_string(),
                }
                .into()),
            }
        })
        .await
}

/// Waits for a delete to finish. Returns false if it did not finish in time.
///
/// # Errors
///
/// Returns an error if the delete operation failed.
pub async fn delete_completed(
    client: &ArmClient,
    resource: &str,
    outcome: DeleteOutcome,
    poller: &Poller,
) -> Result<bool> {
    match outcome {
        DeleteOutcome::Completed => Ok(true),
        DeleteOutcome::NotFound => {
            debug!("{resource} was already gone");
            Ok(true)
        }
        DeleteOutcome::Accepted(uri) => {
            let done = operation_completed(client, &uri, poller).await?;
            if !done {
                warn!("Delete of {resource} did not complete within {:?}", poller.timeout);
            }
            Ok(done)
        }
    }
}

/// Waits until a storage account is provisioned and returns it.
///
/// # Errors
///
/// Returns [`ProvisionError::Timeout`] if the account does not become ready.
pub async fn storage_account_ready(
    client: &ArmClient,
    group: &str,
    name: &str,
    poller: &Poller,
) -> Result<StorageService> {
    let api = client.storage_accounts(group);
    let latest = Mutex::new(None);
    let slot = &latest;

    let ready = poller
        .until(&format!("storage account {name} ready"), || async move {
            let Some(account) = api.get(name).await? else {
                return Ok(false);
            };
            let ready = account.is_ready();
            remember(slot, account);
            Ok(ready)
        })
        .await?;

    match take(latest) {
        Some(account) if ready => Ok(account),
        _ => Err(ProvisionError::timeout(format!("storage account {name}"), "Succeeded").into()),
    }
}

fn remember<T>(slot: &Mutex<Option<T>>, value: T) {
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(value);
    }
}

fn take<T>(slot: Mutex<Option<T>>) -> Option<T> {
    slot.into_inner().ok().flatten()
}
