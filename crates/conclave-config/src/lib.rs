mod agentspec;
mod loader;
mod migrate;
mod schema;

pub use agentspec::{
    default_api_key_env, validate, ApiConfig, AgentSpec, ConfigValidationError, McpTransport,
    RemoteMcp, ToolsetSpec,
};
pub use loader::load;
pub use schema::*;
