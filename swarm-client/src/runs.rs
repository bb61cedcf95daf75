//! Run dispatch endpoint

use crate::OrchestratorClient;
use crate::error::Result;
use swarm_core::dto::run::{GetRunRequest, GetRunResponse, RunInfo};

impl OrchestratorClient {
    /// Ask the orchestrator for the next run on this client's platform
    ///
    /// `Ok(None)` means no work is currently available; poll again later.
    /// The returned `results_store_token` is the only copy of the result
    /// credential and must be kept to submit results.
    pub async fn get_run(&self, client_id: &str, run_token: Option<&str>) -> Result<Option<RunInfo>> {
        let response = self
            .client
            .post(self.url("/api/getrun"))
            .json(&GetRunRequest {
                client_id: Some(client_id.to_string()),
                run_token: run_token.map(str::to_string),
            })
            .send()
            .await?;

        let body: GetRunResponse = self.handle_response(response).await?;

        match &body.run_info {
            Some(run) => tracing::debug!("Received run {} ({})", run.id, run.desc),
            None => tracing::debug!("No run available for client {}", client_id),
        }

        Ok(body.run_info)
    }
}
