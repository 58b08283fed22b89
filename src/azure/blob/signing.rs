//! Shared Key authorization for the blob service.
//!
//! The signature is an HMAC-SHA256, keyed with the decoded account key, over
//! a canonical string made of the verb, the standard headers, the `x-ms-*`
//! headers and the canonicalized resource.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

use crate::error::{ArmError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Blob service version requests are signed for.
pub const STORAGE_VERSION: &str = "2015-04-05";

/// The parts of a request covered by the signature.
#[derive(Debug, Clone, Copy)]
pub struct SignableRequest<'a> {
    /// HTTP verb.
    pub method: &'a str,
    /// URL path, starting with `/`.
    pub path: &'a str,
    /// Query parameters.
    pub query: &'a [(&'a str, &'a str)],
    /// `x-ms-*` headers.
    pub ms_headers: &'a [(&'a str, &'a str)],
    /// Body length; zero is signed as empty.
    pub content_length: u64,
    /// Content type, if any.
    pub content_type: Option<&'a str>,
}

/// Signs blob requests with an account key.
#[derive(Clone)]
pub struct SharedKeySigner {
    account: String,
    key: Vec<u8>,
}

impl std::fmt::Debug for SharedKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeySigner")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl SharedKeySigner {
    /// Creates a signer from the base64 account key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not valid base64.
    pub fn new(account: impl Into<String>, key: &str) -> Result<Self> {
        let account = account.into();
        let key = STANDARD.decode(key).map_err(|e| ArmError::BlobStorage {
            account: account.clone(),
            message: format!("account key is not valid base64: {e}"),
        })?;
        Ok(Self { account, key })
    }

    /// Account the signer belongs to.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Builds the canonical string the signature covers.
    #[must_use]
    pub fn string_to_sign(&self, request: &SignableRequest<'_>) -> String {
        let content_length = if request.content_length == 0 {
            String::new()
        } else {
            request.content_length.to_string()
        };

        let mut out = String::new();
        out.push_str(request.method);
        out.push('\n');
        // Content-Encoding, Content-Language
        out.push_str("\n\n");
        out.push_str(&content_length);
        out.push('\n');
        // Content-MD5
        out.push('\n');
        out.push_str(request.content_type.unwrap_or_default());
        out.push('\n');
        // Date, If-Modified-Since, If-Match, If-None-Match, If-Unmodified-Since, Range
        out.push_str("\n\n\n\n\n\n");

        let headers: BTreeMap<String, &str> = request
            .ms_headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
            .collect();
        for (name, value) in &headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }

        out.push('/');
        out.push_str(&self.account);
        out.push_str(request.path);

        let mut params: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for (name, value) in request.query {
            params.entry(name.to_ascii_lowercase()).or_default().push(*value);
        }
        for (name, mut values) in params {
            values.sort_unstable();
            out.push('\n');
            out.push_str(&name);
            out.push(':');
            out.push_str(&values.join(","));
        }

        out
    }

    /// Value of the `Authorization` header for a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot initialise the MAC.
    pub fn authorization(&self, request: &SignableRequest<'_>) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| ArmError::BlobStorage {
            account: self.account.clone(),
            message: format!("invalid account key: {e}"),
        })?;
        mac.update(self.string_to_sign(request).as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());
        Ok(format!("SharedKey {}:{signature}", self.account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> SharedKeySigner {
        SharedKeySigner::new("myaccount", &STANDARD.encode(b"secret-key")).expect("valid key")
    }

    #[test]
    fn test_string_to_sign_for_listing() {
        let request = SignableRequest {
            method: "GET",
            path: "/system",
            query: &[("restype", "container"), ("comp", "list"), ("prefix", "Microsoft.Compute/Images/")],
            ms_headers: &[
                ("x-ms-version", STORAGE_VERSION),
                ("x-ms-date", "Fri, 26 Jun 2015 23:39:12 GMT"),
            ],
            content_length: 0,
            content_type: None,
        };

        let expected = "GET\n\n\n\n\n\n\n\n\n\n\n\n\
            x-ms-date:Fri, 26 Jun 2015 23:39:12 GMT\n\
            x-ms-version:2015-04-05\n\
            /myaccount/system\n\
            comp:list\n\
            prefix:Microsoft.Compute/Images/\n\
            restype:container";
        assert_eq!(signer().string_to_sign(&request), expected);
    }

    #[test]
    fn test_authorization_header() {
        let request = SignableRequest {
            method: "DELETE",
            path: "/vhds/web.vhd",
            query: &[],
            ms_headers: &[("x-ms-version", STORAGE_VERSION)],
            content_length: 0,
            content_type: None,
        };
        let signer = signer();

        let mut mac = HmacSha256::new_from_slice(b"secret-key").expect("key");
        mac.update(signer.string_to_sign(&request).as_bytes());
        let expected = STANDARD.encode(mac.finalize().into_bytes());

        assert_eq!(
            signer.authorization(&request).expect("signed"),
            format!("SharedKey myaccount:{expected}")
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(SharedKeySigner::new("myaccount", "not base64!").is_err());
    }
}
