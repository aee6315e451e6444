use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::errors::RelayError;

pub const DEFAULT_RELAY_URL: &str = "wss://dev.cloud.simple-home.liis.su";

/// Admin-scoped relay path used by every stage.
pub const ADMIN_PATH: &str = "ws/admin";

/// Relay endpoint and the credentials baked into every handshake.
#[derive(Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_url")]
    pub url: String,
    pub login: String,
    pub password: String,
}

fn default_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

impl RelayConfig {
    pub fn new(url: impl Into<String>, login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login: login.into(),
            password: password.into(),
        }
    }

    /// Parsed base URL; only `ws` and `wss` schemes are accepted.
    pub fn endpoint(&self) -> Result<Url, RelayError> {
        let url = Url::parse(self.url.trim())
            .map_err(|e| RelayError::InvalidEndpoint(format!("{}: {e}", self.url)))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(RelayError::InvalidEndpoint(format!(
                "{}: unsupported scheme {other:?}",
                self.url
            ))),
        }
    }

    /// `<url>/<path>?uid=<uid>&k=v...` with every query pair form-encoded.
    pub fn build_url(&self, target: &Target) -> Result<Url, RelayError> {
        let mut url = self.endpoint()?;
        url.path_segments_mut()
            .map_err(|_| RelayError::InvalidEndpoint(format!("{}: cannot carry a path", self.url)))?
            .pop_if_empty()
            .extend(target.path.split('/').filter(|s| !s.is_empty()));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("uid", &target.uid);
            for (k, v) in &target.params {
                query.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("url", &self.url)
            .field("login", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where a connection is bound: a controller uid plus optional query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub uid: String,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl Target {
    pub fn admin(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            path: ADMIN_PATH.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Client identifier the relay uses to tell worker connections apart.
    pub fn with_client_id(self, client_id: impl Into<String>) -> Self {
        self.with_param("client_id", client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_admin_url() {
        let relay = RelayConfig::new("wss://relay.example", "l", "p");
        assert_eq!(
            relay.build_url(&Target::admin("null")).unwrap().as_str(),
            "wss://relay.example/ws/admin?uid=null"
        );
    }

    #[test]
    fn joins_single_slash_and_appends_params() {
        let relay = RelayConfig::new("wss://relay.example/", "l", "p");
        let target = Target::admin("ctl-7").with_client_id("ctl-7_worker");
        assert_eq!(
            relay.build_url(&target).unwrap().as_str(),
            "wss://relay.example/ws/admin?uid=ctl-7&client_id=ctl-7_worker"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let relay = RelayConfig::new("ws://relay.example/cloud/", "l", "p");
        assert_eq!(
            relay.build_url(&Target::admin("a")).unwrap().as_str(),
            "ws://relay.example/cloud/ws/admin?uid=a"
        );
    }

    #[test]
    fn reserved_characters_stay_inside_their_pair() {
        let relay = RelayConfig::new("wss://relay.example", "l", "p");
        let target = Target::admin("a&client_id=evil").with_client_id("x y#z");
        let url = relay.build_url(&target).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://relay.example/ws/admin?uid=a%26client_id%3Devil&client_id=x+y%23z"
        );

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("uid".to_string(), "a&client_id=evil".to_string()),
                ("client_id".to_string(), "x y#z".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_non_websocket_endpoints() {
        for bad in ["https://relay.example", "not a url", ""] {
            let relay = RelayConfig::new(bad, "l", "p");
            assert!(
                matches!(relay.endpoint(), Err(RelayError::InvalidEndpoint(_))),
                "{bad:?}"
            );
            assert!(relay.build_url(&Target::admin("a")).is_err());
        }
    }

    #[test]
    fn debug_hides_credentials() {
        let relay = RelayConfig::new("wss://relay.example", "admin", "hunter2");
        let dbg = format!("{relay:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
