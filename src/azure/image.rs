//! Azure image ids.
//!
//! Images are addressed by an opaque slash separated id:
//!
//! * marketplace images: `location/publisher/offer/sku`
//! * custom images captured into a storage account:
//!   `location/group/storage/offer/name`

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::compute::{ImageMetadata, OsFamily};
use crate::error::{CloudportError, ImageError, Result};

/// Offer recorded for custom images.
pub const CUSTOM_IMAGE_OFFER: &str = "custom";

/// A decoded image id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// A marketplace image.
    Marketplace {
        /// Region id.
        location: String,
        /// Publisher.
        publisher: String,
        /// Offer.
        offer: String,
        /// SKU.
        sku: String,
    },
    /// A custom image stored as a VHD in a storage account.
    Custom {
        /// Region id.
        location: String,
        /// Resource group of the storage account.
        group: String,
        /// Storage account name.
        storage: String,
        /// Offer, [`CUSTOM_IMAGE_OFFER`] for captured images.
        offer: String,
        /// Image name.
        name: String,
    },
}

impl ImageRef {
    /// Decodes an image id.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::MalformedId`] unless the id has four or five
    /// non-empty fields.
    pub fn decode(id: &str) -> Result<Self> {
        let fields: Vec<&str> = id.split('/').collect();
        if fields.iter().any(|f| f.is_empty()) {
            return Err(malformed(id));
        }

        match fields.as_slice() {
            [location, publisher, offer, sku] => Ok(Self::Marketplace {
                location: (*location).to_string(),
                publisher: (*publisher).to_string(),
                offer: (*offer).to_string(),
                sku: (*sku).to_string(),
            }),
            [location, group, storage, offer, name] => Ok(Self::Custom {
                location: (*location).to_string(),
                group: (*group).to_string(),
                storage: (*storage).to_string(),
                offer: (*offer).to_string(),
                name: (*name).to_string(),
            }),
            _ => Err(malformed(id)),
        }
    }

    /// Encodes the id back into its string form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Marketplace {
                location,
                publisher,
                offer,
                sku,
            } => format!("{location}/{publisher}/{offer}/{sku}"),
            Self::Custom {
                location,
                group,
                storage,
                offer,
                name,
            } => format!("{location}/{group}/{storage}/{offer}/{name}"),
        }
    }

    /// Region of the image.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Marketplace { location, .. } | Self::Custom { location, .. } => location,
        }
    }

    /// Returns true for custom images.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }

    /// Image metadata for a marketplace image resolved to `version`.
    ///
    /// The publisher becomes the provider id, the offer the name and the SKU
    /// the version, which is what the storage profile is built from.
    #[must_use]
    pub fn marketplace_metadata(
        location: &str,
        publisher: &str,
        offer: &str,
        sku: &str,
        version: &str,
    ) -> ImageMetadata {
        let id = Self::Marketplace {
            location: location.to_string(),
            publisher: publisher.to_string(),
            offer: offer.to_string(),
            sku: sku.to_string(),
        };
        ImageMetadata {
            id: id.encode(),
            provider_id: publisher.to_string(),
            name: offer.to_string(),
            version: sku.to_string(),
            location: Some(location.to_string()),
            os_family: OsFamily::infer(&format!("{publisher} {offer}")),
            description: Some(format!("{publisher} {offer} {sku} {version}")),
            default_credentials: None,
        }
    }

    /// Image metadata for a custom image whose OS disk lives at `vhd_uri`.
    #[must_use]
    pub fn custom_metadata(
        location: &str,
        group: &str,
        storage: &str,
        name: &str,
        vhd_uri: &str,
    ) -> ImageMetadata {
        let id = Self::Custom {
            location: location.to_string(),
            group: group.to_string(),
            storage: storage.to_string(),
            offer: CUSTOM_IMAGE_OFFER.to_string(),
            name: name.to_string(),
        };
        ImageMetadata {
            id: id.encode(),
            provider_id: vhd_uri.to_string(),
            name: name.to_string(),
            version: CUSTOM_IMAGE_OFFER.to_string(),
            location: Some(location.to_string()),
            os_family: OsFamily::infer(name),
            description: Some(format!("custom image {name} in {storage}")),
            default_credentials: None,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ImageRef {
    type Err = CloudportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

fn malformed(id: &str) -> CloudportError {
    ImageError::MalformedId {
        id: id.to_string(),
        expected: "location/publisher/offer/sku or location/group/storage/offer/name",
    }
    .into()
}

/// Picks the newest of a set of dotted versions such as `16.04.201701130`.
///
/// Fields are compared numerically where both sides are numbers and as text
/// otherwise; a version with extra trailing fields is newer.
pub fn newest_version<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_marketplace() {
        let image = ImageRef::decode("westeurope/Canonical/UbuntuServer/16.04-LTS").expect("valid");
        assert_eq!(
            image,
            ImageRef::Marketplace {
                location: String::from("westeurope"),
                publisher: String::from("Canonical"),
                offer: String::from("UbuntuServer"),
                sku: String::from("16.04-LTS"),
            }
        );
        assert!(!image.is_custom());
        assert_eq!(image.location(), "westeurope");
    }

    #[test]
    fn test_decode_custom_and_encode_back() {
        let id = "westeurope/cloudport/stor0123/custom/web-image";
        let image: ImageRef = id.parse().expect("valid");
        assert!(image.is_custom());
        assert_eq!(image.to_string(), id);
    }

    #[test]
    fn test_decode_rejects_other_shapes() {
        for id in ["", "westeurope", "a/b/c", "a/b/c/d/e/f", "a//c/d"] {
            let err = ImageRef::decode(id).expect_err(id);
            assert!(matches!(err, CloudportError::Image(ImageError::MalformedId { .. })), "{id}");
        }
    }

    #[test]
    fn test_marketplace_metadata_mapping() {
        let image = ImageRef::marketplace_metadata(
            "westeurope",
            "Canonical",
            "UbuntuServer",
            "16.04-LTS",
            "16.04.201701130",
        );
        assert_eq!(image.id, "westeurope/Canonical/UbuntuServer/16.04-LTS");
        assert_eq!(image.provider_id, "Canonical");
        assert_eq!(image.name, "UbuntuServer");
        assert_eq!(image.version, "16.04-LTS");
        assert_eq!(image.os_family, OsFamily::Ubuntu);
    }

    #[test]
    fn test_custom_metadata_points_at_vhd() {
        let image = ImageRef::custom_metadata(
            "westeurope",
            "cloudport",
            "stor0123",
            "web-image",
            "https://stor0123.blob.core.windows.net/system/Microsoft.Compute/Images/cloudport/web-image-osDisk.1234.vhd",
        );
        assert_eq!(image.id, "westeurope/cloudport/stor0123/custom/web-image");
        assert!(image.provider_id.ends_with("-osDisk.1234.vhd"));
    }

    #[test]
    fn test_newest_version() {
        let versions = ["16.04.201612140", "16.04.201701130", "16.04.20161214", "9.1"];
        assert_eq!(newest_version(versions), Some("16.04.201701130"));
        assert_eq!(newest_version(["1.2", "1.10"]), Some("1.10"));
        assert_eq!(newest_version(["1.2", "1.2.1"]), Some("1.2.1"));
        assert_eq!(newest_version(Vec::<&str>::new()), None);
    }
}
