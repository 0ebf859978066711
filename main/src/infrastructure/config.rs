use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Client-side session configuration.
///
/// Nothing here is persisted; the base URL in particular is meant to be
/// editable at runtime via [`crate::session::ControllerSession::set_base_url`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Where the controller's HTTP surface lives, e.g. `http://host:8000`.
    pub base_url: Url,
    /// Fixed period of the state mirror's polling timer.
    #[serde(with = "duration_millis", default = "default_poll_interval")]
    pub poll_interval: Duration,
    /// Abort timeout of the initial connectivity probe. Steady-state requests
    /// rely on the transport's default timeout behavior.
    #[serde(with = "duration_millis", default = "default_probe_timeout")]
    pub probe_timeout: Duration,
    /// Fixed backoff before the live media session reconnects after a loss.
    #[serde(with = "duration_millis", default = "default_reconnect_delay")]
    pub reconnect_delay: Duration,
}

impl Config {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            poll_interval: default_poll_interval(),
            probe_timeout: default_probe_timeout(),
            reconnect_delay: default_reconnect_delay(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(2000)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_millis(3000)
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
