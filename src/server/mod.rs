pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod logging;
pub mod routes;
pub mod stream;

pub use bootstrap::{run_server, ServerConfig};
pub use error::ApiError;
pub use routes::{PartyRoomsServer, ServerContext};
