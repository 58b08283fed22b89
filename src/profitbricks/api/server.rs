//! Server operations.

use tracing::info;

use crate::error::Result;
use crate::profitbricks::binder::{AttachVolume, CreateServer, UpdateServer};
use crate::profitbricks::client::{ProfitBricksClient, Queued};
use crate::profitbricks::types::{Server, Volume};

/// Depth that includes attached volumes and NICs with their properties.
const SERVER_DEPTH: u8 = 3;

/// Servers of one data center.
#[derive(Debug, Clone, Copy)]
pub struct ServerApi<'a> {
    client: &'a ProfitBricksClient,
    datacenter_id: &'a str,
}

impl<'a> ServerApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient, datacenter_id: &'a str) -> Self {
        Self {
            client,
            datacenter_id,
        }
    }

    fn path(&self, id: &str) -> String {
        format!("/datacenters/{}/servers/{id}", self.datacenter_id)
    }

    /// Lists servers with their volumes and NICs.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Server>> {
        let path = format!("/datacenters/{}/servers", self.datacenter_id);
        self.client.list(&path, SERVER_DEPTH).await
    }

    /// Gets a server with its volumes and NICs.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> Result<Option<Server>> {
        self.client.get(&self.path(id), SERVER_DEPTH).await
    }

    /// Creates a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid or the request fails.
    pub async fn create(&self, payload: &CreateServer) -> Result<Queued<Server>> {
        self.client.send(payload).await
    }

    /// Changes a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid or the request fails.
    pub async fn update(&self, payload: &UpdateServer) -> Result<Queued<Server>> {
        self.client.send(payload).await
    }

    /// Deletes a server. Its volumes are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &str) -> Result<Option<String>> {
        self.client.delete(&self.path(id)).await
    }

    /// Attaches a volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn attach_volume(&self, server_id: &str, volume_id: &str) -> Result<Queued<Volume>> {
        let payload = AttachVolume {
            datacenter_id: self.datacenter_id.to_string(),
            server_id: server_id.to_string(),
            volume_id: volume_id.to_string(),
        };
        self.client.send(&payload).await
    }

    /// Detaches a volume without deleting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn detach_volume(&self, server_id: &str, volume_id: &str) -> Result<Option<String>> {
        let path = format!("{}/volumes/{volume_id}", self.path(server_id));
        self.client.delete(&path).await
    }

    /// Starts a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn start(&self, id: &str) -> Result<Option<String>> {
        info!("Starting server {id}");
        self.client.post_action(&format!("{}/start", self.path(id))).await
    }

    /// Stops a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn stop(&self, id: &str) -> Result<Option<String>> {
        info!("Stopping server {id}");
        self.client.post_action(&format!("{}/stop", self.path(id))).await
    }

    /// Reboots a server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn reboot(&self, id: &str) -> Result<Option<String>> {
        info!("Rebooting server {id}");
        self.client.post_action(&format!("{}/reboot", self.path(id))).await
    }
}

#[cfg(test)]
mod tests {
    use crate::profitbricks::binder::CreateServer;
    use crate::profitbricks::client::tests::client_for;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SERVERS: &str = "/cloudapi/v4/datacenters/dc-1/servers";

    #[tokio::test]
    async fn test_get_uses_depth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{SERVERS}/srv-1")))
            .and(query_param("depth", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "srv-1",
                "properties": {"name": "web-1a2b3c", "cores": 1, "ram": 1024, "vmState": "RUNNING"},
                "entities": {"volumes": {"items": [{"id": "vol-1", "properties": {"size": 10}}]}}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let found = client
            .servers("dc-1")
            .get("srv-1")
            .await
            .expect("request")
            .expect("present");
        assert_eq!(found.volumes()[0].id, "vol-1");
    }

    #[tokio::test]
    async fn test_create_and_power_actions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SERVERS))
            .and(body_json(serde_json::json!({
                "properties": {"name": "web-1a2b3c", "cores": 2, "ram": 2048}
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "id": "srv-1", "properties": {"name": "web-1a2b3c"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        for action in ["start", "stop", "reboot"] {
            Mock::given(method("POST"))
                .and(path(format!("{SERVERS}/srv-1/{action}")))
                .respond_with(ResponseTemplate::new(202).insert_header(
                    "Location",
                    format!("{}/cloudapi/v4/requests/{action}/status", server.uri()).as_str(),
                ))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server);
        let api = client.servers("dc-1");
        let created = api
            .create(&CreateServer {
                datacenter_id: String::from("dc-1"),
                name: String::from("web-1a2b3c"),
                cores: 2,
                ram: 2048,
                ..CreateServer::default()
            })
            .await
            .expect("created");
        assert_eq!(created.resource.id, "srv-1");
        assert!(created.status_uri.is_none());

        let started = api.start("srv-1").await.expect("started");
        assert!(started.is_some_and(|uri| uri.ends_with("/requests/start/status")));
        assert!(api.stop("srv-1").await.expect("stopped").is_some());
        assert!(api.reboot("srv-1").await.expect("rebooted").is_some());
    }
}
