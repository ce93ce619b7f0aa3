//! Application configuration: defaults overridable from the process
//! environment.

use std::{net::IpAddr, time::Duration};

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Prefix of the environment variables overriding configuration fields
/// (e.g. `THEATRE_PORT`).
const ENV_PREFIX: &str = "THEATRE";

/// Server settings.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Conf {
    /// IP address to bind the HTTP server to. Defaults to `0.0.0.0`.
    #[default(IpAddr::from([0, 0, 0, 0]))]
    pub host: IpAddr,

    /// Port to bind the HTTP server to. Defaults to `54321`.
    #[default(54_321)]
    pub port: u16,

    /// Period after which a room that still has no members is removed
    /// from the registry. Defaults to `60s`.
    #[default(Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub room_idle_timeout: Duration,

    /// Path of the newline-delimited avatar emoji catalog loaded at
    /// startup. Defaults to `entries.txt`.
    #[default(String::from("entries.txt"))]
    pub entries_file: String,
}

impl Conf {
    /// Creates a new [`Conf`], layering `THEATRE_*` environment variables
    /// on top of the defaults.
    ///
    /// # Errors
    ///
    /// Errors if some environment variable holds a value its field cannot
    /// be deserialized from.
    pub fn parse() -> Result<Self, ConfigError> {
        let mut cfg = Config::new();
        cfg.merge(Environment::with_prefix(ENV_PREFIX))?;
        cfg.try_into()
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn defaults_without_env() {
        env::remove_var("THEATRE_PORT");
        env::remove_var("THEATRE_HOST");

        let conf = Conf::parse().unwrap();

        assert_eq!(conf.host, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(conf.port, 54_321);
        assert_eq!(conf.room_idle_timeout, Duration::from_secs(60));
        assert_eq!(conf.entries_file, "entries.txt");
    }

    #[test]
    #[serial]
    fn port_overrides_from_env() {
        env::set_var("THEATRE_PORT", "8090");

        let conf = Conf::parse().unwrap();

        env::remove_var("THEATRE_PORT");
        assert_eq!(conf.port, 8090);
    }

    #[test]
    #[serial]
    fn idle_timeout_overrides_from_env() {
        env::set_var("THEATRE_ROOM_IDLE_TIMEOUT", "250ms");

        let conf = Conf::parse().unwrap();

        env::remove_var("THEATRE_ROOM_IDLE_TIMEOUT");
        assert_eq!(conf.room_idle_timeout, Duration::from_millis(250));
    }
}
