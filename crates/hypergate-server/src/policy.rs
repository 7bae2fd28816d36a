//! Default acceptance policy for inbound agent transfers.

use hypergate_federation::{AgentTransferPolicy, SessionTable};
use hypergate_types::{AgentCircuitRecord, GridRegion};
use std::sync::Arc;

/// Accepts any well-formed transfer and registers it in the session table,
/// recording the gatekeeper the agent arrived through as the grid it is
/// currently on.
pub struct SessionRegistrationPolicy {
    sessions: Arc<SessionTable>,
}

impl SessionRegistrationPolicy {
    pub fn new(sessions: Arc<SessionTable>) -> Self {
        Self { sessions }
    }
}

impl AgentTransferPolicy for SessionRegistrationPolicy {
    fn login_agent_to_grid(
        &self,
        circuit: &AgentCircuitRecord,
        gatekeeper: &GridRegion,
        destination: &GridRegion,
    ) -> (bool, String) {
        if circuit.agent_id.is_nil() || circuit.session_id.is_nil() {
            return (false, "complete circuit data not supplied".to_string());
        }

        let grid_external_name =
            format!("http://{}:{}", gatekeeper.external_host, gatekeeper.http_port);
        tracing::info!(
            agent = %circuit.agent_id,
            grid = %grid_external_name,
            destination = %destination.name,
            "registering inbound agent session"
        );
        self.sessions.insert(circuit.clone(), grid_external_name);
        (true, String::new())
    }
}
