//! Fixed names, sizes, and timeouts shared across the control plane. These
//! are the built-in defaults at the bottom of the config layering in
//! `pritunld`'s `ControlPlaneConfig::from_cli_and_env` — CLI flags and env
//! vars override them.

use std::time::Duration;

pub const APP_NAME: &str = "pritunl";
pub const NODE_SERVER_VER: u32 = 1;

pub const AUTH_LOG_NAME: &str = "auth.log";
pub const DATABASE_NAME: &str = "pritunl.db";
pub const SERVER_CERT_NAME: &str = "server.crt";
pub const SERVER_KEY_NAME: &str = "server.key";
pub const VERSION_NAME: &str = "version";
pub const NODE_SERVER_MARKER: &str = "node_server";

pub const TEMP_DIR: &str = "temp";
pub const EMPTY_TEMP_DIR: &str = "empty";

pub const MONGO_QUEUE_TTL_SECONDS: u64 = 30;
pub const MONGO_QUEUE_MAX_ATTEMPTS: u32 = 3;

pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const HTTP_COM_REQUEST_TIMEOUT: Duration = Duration::from_secs(70);
