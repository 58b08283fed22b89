//! Deterministic and generated resource names.
//!
//! Storage account names must be globally unique, 3 to 24 characters of
//! lowercase letters and digits. They are derived from a SHA-256 digest of the
//! subscription, resource group and location so the same group always maps to
//! the same account.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Prefix of every generated storage account name.
const STORAGE_ACCOUNT_PREFIX: &str = "stor";

/// Maximum length of an Azure storage account name.
const STORAGE_ACCOUNT_MAX_LEN: usize = 24;

/// Number of random hex characters appended to generated node names.
const NODE_SUFFIX_LEN: usize = 6;

/// Computes the storage account name for a resource group in a location.
#[must_use]
pub fn storage_account_name(subscription_id: &str, resource_group: &str, location: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subscription_id.as_bytes());
    hasher.update(b"/");
    hasher.update(resource_group.to_lowercase().as_bytes());
    hasher.update(b"/");
    hasher.update(location.to_lowercase().as_bytes());

    let digest = hex::encode(hasher.finalize());
    let take = STORAGE_ACCOUNT_MAX_LEN - STORAGE_ACCOUNT_PREFIX.len();
    format!("{STORAGE_ACCOUNT_PREFIX}{}", &digest[..take])
}

/// Generates a node name that encodes its group: `<group>-<hex>`.
#[must_use]
pub fn node_name(group: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{group}-{}", &suffix[..NODE_SUFFIX_LEN])
}

/// Recovers the group from a name produced by [`node_name`].
#[must_use]
pub fn group_from_name(name: &str) -> Option<&str> {
    let (group, suffix) = name.rsplit_once('-')?;
    let is_suffix = suffix.len() == NODE_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_hexdigit());
    (is_suffix && !group.is_empty()).then_some(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_account_name_is_stable() {
        let a = storage_account_name("sub", "Group", "westeurope");
        let b = storage_account_name("sub", "group", "WestEurope");
        assert_eq!(a, b);
        assert_eq!(a.len(), 24);
        assert!(a.starts_with("stor"));
        assert!(a.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_storage_account_name_varies_by_location() {
        assert_ne!(
            storage_account_name("sub", "group", "westeurope"),
            storage_account_name("sub", "group", "northeurope")
        );
    }

    #[test]
    fn test_node_name_encodes_group() {
        let name = node_name("web-tier");
        assert!(name.starts_with("web-tier-"));
        assert_eq!(group_from_name(&name), Some("web-tier"));
    }

    #[test]
    fn test_group_from_foreign_name() {
        assert_eq!(group_from_name("standalone"), None);
        assert_eq!(group_from_name("web-tier"), None);
        assert_eq!(group_from_name("-abc123"), None);
    }
}
