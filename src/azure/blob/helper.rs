//! Custom images captured into a storage account.
//!
//! A captured image is stored by Azure in the `system` container as
//! `Microsoft.Compute/Images/{container}/{name}-osDisk.{id}.vhd`.

use tracing::debug;

use crate::azure::image::ImageRef;
use crate::compute::ImageMetadata;
use crate::error::Result;

use super::BlobStore;

/// Container Azure writes captured images to.
pub const SYSTEM_CONTAINER: &str = "system";

/// Container name captures are requested with.
pub const CUSTOM_IMAGE_CONTAINER: &str = "cloudport";

const OS_DISK_MARKER: &str = "-osDisk";

/// Blob prefix of the images captured into `container`.
#[must_use]
pub fn custom_image_prefix(container: &str) -> String {
    format!("Microsoft.Compute/Images/{container}/")
}

/// Image name of an OS disk blob, `None` for any other blob.
#[must_use]
pub fn custom_image_name(blob: &str) -> Option<&str> {
    if !blob.ends_with(".vhd") {
        return None;
    }
    let file = blob.rsplit('/').next().unwrap_or(blob);
    file.find(OS_DISK_MARKER)
        .map(|end| &file[..end])
        .filter(|name| !name.is_empty())
}

/// Returns true if the account holds captured images at all.
///
/// # Errors
///
/// Returns an error if the blob service cannot be queried.
pub async fn custom_image_exists(store: &dyn BlobStore) -> Result<bool> {
    store.container_exists(SYSTEM_CONTAINER).await
}

/// Lists the images captured into `container` of a storage account.
///
/// # Errors
///
/// Returns an error if the blob service cannot be queried.
pub async fn custom_images(
    store: &dyn BlobStore,
    container: &str,
    group: &str,
    storage: &str,
    location: &str,
) -> Result<Vec<ImageMetadata>> {
    let blobs = store
        .list_blobs(SYSTEM_CONTAINER, &custom_image_prefix(container))
        .await?;

    let images: Vec<ImageMetadata> = blobs
        .iter()
        .filter_map(|blob| {
            let name = custom_image_name(&blob.name)?;
            let uri = store.blob_uri(SYSTEM_CONTAINER, &blob.name);
            Some(ImageRef::custom_metadata(location, group, storage, name, &uri))
        })
        .collect();

    debug!("Found {} custom images in {storage}", images.len());
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::blob::{BlobItem, MockBlobStore};
    use mockall::predicate::eq;

    #[test]
    fn test_custom_image_name() {
        assert_eq!(
            custom_image_name("Microsoft.Compute/Images/cloudport/web-image-osDisk.0c1d.vhd"),
            Some("web-image")
        );
        assert_eq!(custom_image_name("Microsoft.Compute/Images/cloudport/web-image.json"), None);
        assert_eq!(custom_image_name("Microsoft.Compute/Images/cloudport/data-disk.vhd"), None);
        assert_eq!(custom_image_name("-osDisk.vhd"), None);
    }

    #[tokio::test]
    async fn test_custom_images_from_listing() {
        let mut store = MockBlobStore::new();
        store
            .expect_list_blobs()
            .with(eq("system"), eq("Microsoft.Compute/Images/cloudport/"))
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    BlobItem {
                        name: String::from("Microsoft.Compute/Images/cloudport/web-osDisk.1.vhd"),
                        content_length: Some(1024),
                    },
                    BlobItem {
                        name: String::from("Microsoft.Compute/Images/cloudport/web-vmTemplate.1.json"),
                        content_length: Some(12),
                    },
                ])
            });
        store
            .expect_blob_uri()
            .returning(|container, blob| format!("https://stor1.blob.core.windows.net/{container}/{blob}"));

        let images = custom_images(&store, "cloudport", "group", "stor1", "westeurope")
            .await
            .expect("listed");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, "westeurope/group/stor1/custom/web");
        assert_eq!(
            images[0].provider_id,
            "https://stor1.blob.core.windows.net/system/Microsoft.Compute/Images/cloudport/web-osDisk.1.vhd"
        );
    }

    #[tokio::test]
    async fn test_custom_image_exists_checks_system_container() {
        let mut store = MockBlobStore::new();
        store
            .expect_container_exists()
            .with(eq("system"))
            .returning(|_| Ok(false));
        assert!(!custom_image_exists(&store).await.expect("checked"));
    }
}
