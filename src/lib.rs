pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod ingest;
pub mod monitors;
pub mod registry;
pub mod reporters;
pub mod snapshot;
pub mod util;

pub use actors::messages::Reading;
pub use actors::monitor::MonitorHandle;
