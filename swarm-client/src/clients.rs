//! Client registration endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use swarm_core::domain::client::Client;
use swarm_core::dto::client::RegisterClient;

impl OrchestratorClient {
    /// Register this worker client for a platform
    ///
    /// Re-registering the same id updates its name and platform.
    pub async fn register_client(
        &self,
        client_id: &str,
        name: &str,
        platform_id: &str,
    ) -> Result<Client> {
        let response = self
            .client
            .post(self.url("/api/clients/register"))
            .json(&RegisterClient {
                client_id: client_id.to_string(),
                name: name.to_string(),
                platform_id: platform_id.to_string(),
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Send a heartbeat so the orchestrator keeps this client marked alive
    pub async fn send_heartbeat(&self, client_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/api/clients/{}/heartbeat", client_id)))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
