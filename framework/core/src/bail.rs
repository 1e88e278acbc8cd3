/// Return this error from an agent's behaviour to stop that agent without stopping the run.
///
/// Use it when a virtual user can no longer make progress, for example because the target service
/// rejected its credentials permanently. Other agents keep running until the run's stop signal.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct AgentBailError {
    msg: String,
}

impl AgentBailError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for AgentBailError {
    fn default() -> Self {
        Self::new("Agent is bailing")
    }
}
