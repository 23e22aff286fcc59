use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tinypaste_crypto::PasteSecret;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub paste_secret: Option<PasteSecret>,
    pub public_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("TINYPASTE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TINYPASTE_JWT_SECRET is unset or still a placeholder");
        }

        let host = lookup("TINYPASTE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("TINYPASTE_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("TINYPASTE_PORT is not a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("bad bind address {}:{}", host, port))?;

        let db_path: PathBuf = lookup("TINYPASTE_DB_PATH")
            .unwrap_or_else(|| "tinypaste.db".into())
            .into();

        // A malformed key is fatal; a missing one only disables private pastes
        let paste_secret = match lookup("TINYPASTE_ENCRYPTION_KEY").filter(|v| !v.trim().is_empty()) {
            Some(encoded) => Some(
                PasteSecret::from_base64(&encoded).context("TINYPASTE_ENCRYPTION_KEY is invalid")?,
            ),
            None => None,
        };

        let public_url = lookup("TINYPASTE_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            paste_secret,
            public_url,
        })
    }
}
