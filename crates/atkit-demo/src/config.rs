//! Demo configuration

use atkit_core::{AgentOptions, LoginParams};

/// Resolved demo settings: where to connect and who to log in as
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub agent: AgentOptions,
    pub identifier: Option<String>,
    pub password: Option<String>,
    /// Print raw JSON responses instead of the text summary
    pub json: bool,
}

impl DemoConfig {
    /// Login parameters, when both identifier and password are configured
    pub fn login_params(&self) -> Option<LoginParams> {
        match (&self.identifier, &self.password) {
            (Some(identifier), Some(password))
                if !identifier.is_empty() && !password.is_empty() =>
            {
                Some(LoginParams::new(identifier.clone(), password.clone()))
            }
            _ => None,
        }
    }
}
