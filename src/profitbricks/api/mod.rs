//! Per-resource Cloud API operations.
//!
//! Each API borrows the [`ProfitBricksClient`] and is scoped the way the API
//! nests the resource: account, data center, or server.

mod datacenter;
mod image;
mod location;
mod nic;
mod request;
mod server;
mod snapshot;
mod volume;

pub use datacenter::DatacenterApi;
pub use image::ImageApi;
pub use location::LocationApi;
pub use nic::NicApi;
pub use request::RequestApi;
pub use server::ServerApi;
pub use snapshot::SnapshotApi;
pub use volume::VolumeApi;

use super::client::ProfitBricksClient;

impl ProfitBricksClient {
    /// Data centers of the account.
    #[must_use]
    pub const fn datacenters(&self) -> DatacenterApi<'_> {
        DatacenterApi::new(self)
    }

    /// Servers of a data center.
    #[must_use]
    pub const fn servers<'a>(&'a self, datacenter_id: &'a str) -> ServerApi<'a> {
        ServerApi::new(self, datacenter_id)
    }

    /// NICs of a server.
    #[must_use]
    pub const fn nics<'a>(&'a self, datacenter_id: &'a str, server_id: &'a str) -> NicApi<'a> {
        NicApi::new(self, datacenter_id, server_id)
    }

    /// Volumes of a data center.
    #[must_use]
    pub const fn volumes<'a>(&'a self, datacenter_id: &'a str) -> VolumeApi<'a> {
        VolumeApi::new(self, datacenter_id)
    }

    /// Snapshots of the account.
    #[must_use]
    pub const fn snapshots(&self) -> SnapshotApi<'_> {
        SnapshotApi::new(self)
    }

    /// Images visible to the account.
    #[must_use]
    pub const fn images(&self) -> ImageApi<'_> {
        ImageApi::new(self)
    }

    /// Locations.
    #[must_use]
    pub const fn locations(&self) -> LocationApi<'_> {
        LocationApi::new(self)
    }

    /// Status of queued requests.
    #[must_use]
    pub const fn requests(&self) -> RequestApi<'_> {
        RequestApi::new(self)
    }
}
