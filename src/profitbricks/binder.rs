//! Request binders: typed payloads turned into HTTP requests.
//!
//! Create payloads are wrapped as `{"properties": {...}}`, with child
//! resources under `entities`; update payloads are sent flat. Only the fields that are set end up in the body. Resource ids a
//! payload carries go into the path and never into the body.

use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{ProfitBricksError, Result};

/// A bound request, relative to the Cloud API endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundRequest {
    /// HTTP method.
    pub method: Method,
    /// Path below the endpoint, e.g. `/datacenters/{id}/servers`.
    pub path: String,
    /// JSON body.
    pub body: Value,
}

/// A payload that knows how to bind itself to a request.
pub trait RequestBinder {
    /// Binder name used in error messages.
    const NAME: &'static str;

    /// Validates the payload and builds the request.
    ///
    /// # Errors
    ///
    /// Returns [`ProfitBricksError::InvalidPayload`] if a required id or
    /// field is missing.
    fn bind(&self) -> Result<BoundRequest>;
}

/// Creates a data center.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatacenter {
    /// Name.
    pub name: String,
    /// Location id.
    pub location: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Creates a server in a data center.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServer {
    /// Data center id.
    #[serde(skip)]
    pub datacenter_id: String,
    /// Name.
    pub name: String,
    /// Cores.
    pub cores: u32,
    /// Memory in MB.
    pub ram: u64,
    /// Availability zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    /// CPU family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_family: Option<String>,
}

/// Changes a server.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServer {
    /// Data center id.
    #[serde(skip)]
    pub datacenter_id: String,
    /// Server id.
    #[serde(skip)]
    pub id: String,
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New core count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    /// New memory in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram: Option<u64>,
    /// New availability zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    /// Volume to boot from, by id.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "as_id_reference")]
    pub boot_volume: Option<String>,
}

/// Creates a volume in a data center.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVolume {
    /// Data center id.
    #[serde(skip)]
    pub datacenter_id: String,
    /// Name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Size in GB.
    pub size: u32,
    /// `HDD` or `SSD`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    /// Image to create the volume from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Root password set in the image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_password: Option<String>,
    /// SSH public keys installed in the image.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<String>,
    /// `VIRTIO` or `IDE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus: Option<String>,
    /// Licence type, required when no image is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licence_type: Option<String>,
}

/// Attaches an existing volume to a server.
#[derive(Debug, Clone, Default)]
pub struct AttachVolume {
    /// Data center id.
    pub datacenter_id: String,
    /// Server id.
    pub server_id: String,
    /// Volume id.
    pub volume_id: String,
}

/// Creates a NIC on a server.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNic {
    /// Data center id.
    #[serde(skip)]
    pub datacenter_id: String,
    /// Server id.
    #[serde(skip)]
    pub server_id: String,
    /// Name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fixed IPs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,
    /// Whether to assign addresses by DHCP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp: Option<bool>,
    /// LAN to connect to.
    pub lan: u32,
    /// Whether to activate the firewall.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_active: Option<bool>,
    /// Rules created together with the NIC.
    #[serde(skip)]
    pub firewall_rules: Vec<FirewallRule>,
}

/// An ingress rule of a NIC firewall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    /// Name.
    pub name: String,
    /// `TCP`, `UDP`, `ICMP` or `ANY`.
    pub protocol: String,
    /// Allowed source address, any when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    /// First port of the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_start: Option<u16>,
    /// Last port of the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range_end: Option<u16>,
}

impl FirewallRule {
    /// A rule admitting TCP traffic to a single port.
    #[must_use]
    pub fn tcp(port: u16) -> Self {
        Self {
            name: format!("tcp-{port}"),
            protocol: String::from("TCP"),
            source_ip: None,
            port_range_start: Some(port),
            port_range_end: Some(port),
        }
    }
}

/// Changes a NIC.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNic {
    /// Data center id.
    #[serde(skip)]
    pub datacenter_id: String,
    /// Server id.
    #[serde(skip)]
    pub server_id: String,
    /// NIC id.
    #[serde(skip)]
    pub id: String,
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New fixed IPs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ips: Option<Vec<String>>,
    /// DHCP on or off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp: Option<bool>,
    /// New LAN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lan: Option<u32>,
}

/// Changes a snapshot.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSnapshot {
    /// Snapshot id.
    #[serde(skip)]
    pub id: String,
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New licence type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub licence_type: Option<String>,
    /// CPU hot plug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_hot_plug: Option<bool>,
    /// CPU hot unplug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_hot_unplug: Option<bool>,
    /// RAM hot plug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_hot_plug: Option<bool>,
    /// RAM hot unplug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_hot_unplug: Option<bool>,
    /// NIC hot plug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_hot_plug: Option<bool>,
    /// NIC hot unplug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nic_hot_unplug: Option<bool>,
    /// Virtio disk hot plug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disc_virtio_hot_plug: Option<bool>,
    /// Virtio disk hot unplug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disc_virtio_hot_unplug: Option<bool>,
    /// SCSI disk hot plug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disc_scsi_hot_plug: Option<bool>,
    /// SCSI disk hot unplug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disc_scsi_hot_unplug: Option<bool>,
}

impl RequestBinder for CreateDatacenter {
    const NAME: &'static str = "datacenter";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("name", &self.name)?;
        require::<Self>("location", &self.location)?;
        Ok(BoundRequest {
            method: Method::POST,
            path: String::from("/datacenters"),
            body: wrapped::<Self>(self)?,
        })
    }
}

impl RequestBinder for CreateServer {
    const NAME: &'static str = "server";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("datacenterId", &self.datacenter_id)?;
        require::<Self>("name", &self.name)?;
        if self.cores == 0 || self.ram == 0 {
            return Err(invalid::<Self>("cores and ram must be positive"));
        }
        Ok(BoundRequest {
            method: Method::POST,
            path: format!("/datacenters/{}/servers", self.datacenter_id),
            body: wrapped::<Self>(self)?,
        })
    }
}

impl RequestBinder for UpdateServer {
    const NAME: &'static str = "server";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("datacenterId", &self.datacenter_id)?;
        require::<Self>("id", &self.id)?;
        Ok(BoundRequest {
            method: Method::PATCH,
            path: format!("/datacenters/{}/servers/{}", self.datacenter_id, self.id),
            body: flat::<Self>(self)?,
        })
    }
}

impl RequestBinder for CreateVolume {
    const NAME: &'static str = "volume";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("datacenterId", &self.datacenter_id)?;
        if self.size == 0 {
            return Err(invalid::<Self>("size must be positive"));
        }
        if self.image.is_none() && self.licence_type.is_none() {
            return Err(invalid::<Self>("either image or licenceType is required"));
        }
        Ok(BoundRequest {
            method: Method::POST,
            path: format!("/datacenters/{}/volumes", self.datacenter_id),
            body: wrapped::<Self>(self)?,
        })
    }
}

impl RequestBinder for AttachVolume {
    const NAME: &'static str = "volume";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("datacenterId", &self.datacenter_id)?;
        require::<Self>("serverId", &self.server_id)?;
        require::<Self>("volumeId", &self.volume_id)?;
        Ok(BoundRequest {
            method: Method::POST,
            path: format!(
                "/datacenters/{}/servers/{}/volumes",
                self.datacenter_id, self.server_id
            ),
            body: json!({ "id": self.volume_id }),
        })
    }
}

impl RequestBinder for CreateNic {
    const NAME: &'static str = "nic";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("datacenterId", &self.datacenter_id)?;
        require::<Self>("serverId", &self.server_id)?;
        let mut body = wrapped::<Self>(self)?;
        if !self.firewall_rules.is_empty() {
            let mut items = Vec::with_capacity(self.firewall_rules.len());
            for rule in &self.firewall_rules {
                let properties = serde_json::to_value(rule).map_err(|e| invalid::<Self>(e.to_string()))?;
                items.push(json!({ "properties": properties }));
            }
            if let Some(fields) = body.as_object_mut() {
                fields.insert(
                    String::from("entities"),
                    json!({ "firewallrules": { "items": items } }),
                );
            }
        }
        Ok(BoundRequest {
            method: Method::POST,
            path: format!(
                "/datacenters/{}/servers/{}/nics",
                self.datacenter_id, self.server_id
            ),
            body,
        })
    }
}

impl RequestBinder for UpdateNic {
    const NAME: &'static str = "nic";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("datacenterId", &self.datacenter_id)?;
        require::<Self>("serverId", &self.server_id)?;
        require::<Self>("id", &self.id)?;
        Ok(BoundRequest {
            method: Method::PATCH,
            path: format!(
                "/datacenters/{}/servers/{}/nics/{}",
                self.datacenter_id, self.server_id, self.id
            ),
            body: flat::<Self>(self)?,
        })
    }
}

impl RequestBinder for UpdateSnapshot {
    const NAME: &'static str = "snapshot";

    fn bind(&self) -> Result<BoundRequest> {
        require::<Self>("snapshotId", &self.id)?;
        Ok(BoundRequest {
            method: Method::PATCH,
            path: format!("/snapshots/{}", self.id),
            body: flat::<Self>(self)?,
        })
    }
}

fn as_id_reference<S: serde::Serializer>(id: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match id {
        Some(id) => json!({ "id": id }).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

fn require<B: RequestBinder>(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid::<B>(format!("{field} is required")));
    }
    Ok(())
}

fn invalid<B: RequestBinder>(message: impl Into<String>) -> crate::error::CloudportError {
    ProfitBricksError::InvalidPayload {
        binder: B::NAME,
        message: message.into(),
    }
    .into()
}

fn flat<B: RequestBinder + Serialize>(payload: &B) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| invalid::<B>(e.to_string()))
}

fn wrapped<B: RequestBinder + Serialize>(payload: &B) -> Result<Value> {
    Ok(json!({ "properties": flat(payload)? }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudportError;

    #[test]
    fn test_create_nic_payload() {
        let request = CreateNic {
            datacenter_id: String::from("datacenter-id"),
            server_id: String::from("server-id"),
            name: Some(String::from("cloudport-nic")),
            lan: 1,
            ..CreateNic::default()
        }
        .bind()
        .expect("bound");

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/datacenters/datacenter-id/servers/server-id/nics");
        assert_eq!(
            request.body,
            json!({"properties": {"lan": 1, "name": "cloudport-nic"}})
        );
    }

    #[test]
    fn test_create_nic_with_firewall_rules() {
        let request = CreateNic {
            datacenter_id: String::from("datacenter-id"),
            server_id: String::from("server-id"),
            lan: 1,
            firewall_active: Some(true),
            firewall_rules: vec![FirewallRule::tcp(22)],
            ..CreateNic::default()
        }
        .bind()
        .expect("bound");

        assert_eq!(
            request.body,
            json!({
                "properties": {"lan": 1, "firewallActive": true},
                "entities": {"firewallrules": {"items": [{"properties": {
                    "name": "tcp-22",
                    "protocol": "TCP",
                    "portRangeStart": 22,
                    "portRangeEnd": 22
                }}]}}
            })
        );
    }

    #[test]
    fn test_update_snapshot_sends_only_set_fields() {
        let request = UpdateSnapshot {
            id: String::from("snapshot-id"),
            name: Some(String::from("golden")),
            ram_hot_plug: Some(true),
            disc_scsi_hot_unplug: Some(false),
            ..UpdateSnapshot::default()
        }
        .bind()
        .expect("bound");

        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.path, "/snapshots/snapshot-id");
        assert_eq!(
            request.body,
            json!({"name": "golden", "ramHotPlug": true, "discScsiHotUnplug": false})
        );
    }

    #[test]
    fn test_update_snapshot_requires_id() {
        let err = UpdateSnapshot::default().bind().expect_err("no id");
        assert!(matches!(
            err,
            CloudportError::ProfitBricks(ProfitBricksError::InvalidPayload { binder: "snapshot", .. })
        ));
    }

    #[test]
    fn test_update_server_boot_volume_is_a_reference() {
        let request = UpdateServer {
            datacenter_id: String::from("dc"),
            id: String::from("srv"),
            boot_volume: Some(String::from("vol")),
            ..UpdateServer::default()
        }
        .bind()
        .expect("bound");

        assert_eq!(request.path, "/datacenters/dc/servers/srv");
        assert_eq!(request.body, json!({"bootVolume": {"id": "vol"}}));
    }

    #[test]
    fn test_create_server_and_datacenter() {
        let server = CreateServer {
            datacenter_id: String::from("dc"),
            name: String::from("web-1a2b3c"),
            cores: 2,
            ram: 4096,
            ..CreateServer::default()
        }
        .bind()
        .expect("bound");
        assert_eq!(
            server.body,
            json!({"properties": {"name": "web-1a2b3c", "cores": 2, "ram": 4096}})
        );

        let datacenter = CreateDatacenter {
            name: String::from("web"),
            location: String::from("de/fkb"),
            description: None,
        }
        .bind()
        .expect("bound");
        assert_eq!(datacenter.path, "/datacenters");
        assert_eq!(
            datacenter.body,
            json!({"properties": {"name": "web", "location": "de/fkb"}})
        );

        let missing = CreateServer::default().bind();
        assert!(missing.is_err());
    }

    #[test]
    fn test_create_volume_needs_image_or_licence() {
        let mut volume = CreateVolume {
            datacenter_id: String::from("dc"),
            name: Some(String::from("web-1a2b3c")),
            size: 20,
            volume_type: Some(String::from("HDD")),
            ssh_keys: vec![String::from("ssh-rsa AAAA")],
            ..CreateVolume::default()
        };
        assert!(volume.bind().is_err());

        volume.image = Some(String::from("img-1"));
        let request = volume.bind().expect("bound");
        assert_eq!(request.path, "/datacenters/dc/volumes");
        assert_eq!(
            request.body,
            json!({"properties": {
                "name": "web-1a2b3c",
                "size": 20,
                "type": "HDD",
                "image": "img-1",
                "sshKeys": ["ssh-rsa AAAA"]
            }})
        );
    }

    #[test]
    fn test_attach_volume_and_update_nic() {
        let attach = AttachVolume {
            datacenter_id: String::from("dc"),
            server_id: String::from("srv"),
            volume_id: String::from("vol"),
        }
        .bind()
        .expect("bound");
        assert_eq!(attach.path, "/datacenters/dc/servers/srv/volumes");
        assert_eq!(attach.body, json!({"id": "vol"}));

        let update = UpdateNic {
            datacenter_id: String::from("dc"),
            server_id: String::from("srv"),
            id: String::from("nic"),
            dhcp: Some(false),
            ips: Some(vec![String::from("10.0.0.5")]),
            ..UpdateNic::default()
        }
        .bind()
        .expect("bound");
        assert_eq!(update.method, Method::PATCH);
        assert_eq!(update.path, "/datacenters/dc/servers/srv/nics/nic");
        assert_eq!(update.body, json!({"ips": ["10.0.0.5"], "dhcp": false}));
    }
}
