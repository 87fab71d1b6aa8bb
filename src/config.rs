use std::net;

use serde::Deserialize;

use crate::db::ticket::KeyKind;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    #[serde(default)]
    pub tickets: Tickets,
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize)]
pub struct Tickets {
    /// Which ticket identity the `{key}` path segment carries.
    #[serde(default)]
    pub lookup_key: KeyKind,

    /// How many freshly generated codes to try before giving up on a
    /// ticket creation that keeps colliding.
    #[serde(default = "Tickets::default_create_attempts")]
    pub create_attempts: usize,
}

impl Tickets {
    fn default_create_attempts() -> usize {
        5
    }
}

impl Default for Tickets {
    fn default() -> Self {
        Self {
            lookup_key: KeyKind::default(),
            create_attempts: Self::default_create_attempts(),
        }
    }
}
