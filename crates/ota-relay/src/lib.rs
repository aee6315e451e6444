mod auth;
pub use auth::auth_header;

mod config;
pub use config::{ADMIN_PATH, DEFAULT_RELAY_URL, RelayConfig, Target};

mod connection;
pub use connection::{Connection, Connector};

mod errors;
pub use errors::{RelayError, WsError};

mod ws;
pub use ws::WsConnector;
