use crate::error::{Error, Result};
use crate::types::Jid;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::ops::RangeInclusive;

pub const DEFAULT_MODEL: &str = "Beosound Balance";
pub const DEFAULT_VOLUME_STEP: u8 = 5;
pub const DEFAULT_DEFAULT_VOLUME: u8 = 40;
pub const DEFAULT_MAX_VOLUME: u8 = 100;

pub const VOLUME_STEP_RANGE: RangeInclusive<u8> = 1..=20;
pub const DEFAULT_VOLUME_RANGE: RangeInclusive<u8> = 1..=70;
pub const MAX_VOLUME_RANGE: RangeInclusive<u8> = 20..=100;

/// Port of the device's notification WebSocket
pub const NOTIFICATION_PORT: u16 = 9339;

/// Stored configuration of one device
///
/// Mirrors the key-value entry the platform keeps per configured device.
///
/// # Example
///
/// ```
/// use mozart_beolink::DeviceConfig;
///
/// let config = DeviceConfig::from_json_str(r#"{
///     "host": "192.168.1.40",
///     "model": "Beosound Balance",
///     "jid": "1111.2222222.33333333@products.bang-olufsen.com",
///     "max_volume": 80
/// }"#).unwrap();
///
/// assert_eq!(config.unique_id(), "33333333");
/// assert_eq!(config.name(), "Beosound Balance-33333333");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(rename = "jid")]
    pub beolink_jid: Jid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
    #[serde(default = "default_default_volume")]
    pub default_volume: u8,
    #[serde(default = "default_max_volume")]
    pub max_volume: u8,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_volume_step() -> u8 {
    DEFAULT_VOLUME_STEP
}

fn default_default_volume() -> u8 {
    DEFAULT_DEFAULT_VOLUME
}

fn default_max_volume() -> u8 {
    DEFAULT_MAX_VOLUME
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>, model: impl Into<String>, beolink_jid: Jid) -> Self {
        Self {
            host: host.into(),
            model: model.into(),
            beolink_jid,
            name: None,
            volume_step: DEFAULT_VOLUME_STEP,
            default_volume: DEFAULT_DEFAULT_VOLUME,
            max_volume: DEFAULT_MAX_VOLUME,
        }
    }

    /// Parse and validate a configuration entry
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DeviceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the host and the volume options
    pub fn validate(&self) -> Result<()> {
        self.host
            .parse::<IpAddr>()
            .map_err(|_| Error::InvalidConfig(format!("{} is not an IP address", self.host)))?;

        check_range("volume_step", self.volume_step, &VOLUME_STEP_RANGE)?;
        check_range("default_volume", self.default_volume, &DEFAULT_VOLUME_RANGE)?;
        check_range("max_volume", self.max_volume, &MAX_VOLUME_RANGE)?;
        Ok(())
    }

    /// Unique id of the device's entities (the serial number)
    pub fn unique_id(&self) -> &str {
        self.beolink_jid.serial()
    }

    /// Entity name, `"{model}-{serial}"` unless configured
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.model, self.unique_id()))
    }

    /// URL of the device's notification WebSocket
    pub fn notification_url(&self) -> String {
        format!("ws://{}:{}/", self.host, NOTIFICATION_PORT)
    }
}

fn check_range(field: &str, value: u8, range: &RangeInclusive<u8>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{} must be within {}..={}, got {}",
            field,
            range.start(),
            range.end(),
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JID: &str = "1111.2222222.33333333@products.bang-olufsen.com";

    #[test]
    fn test_defaults_applied() {
        let config =
            DeviceConfig::from_json_str(&format!(r#"{{"host": "10.0.0.2", "jid": "{}"}}"#, JID))
                .unwrap();

        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.volume_step, DEFAULT_VOLUME_STEP);
        assert_eq!(config.max_volume, DEFAULT_MAX_VOLUME);
        assert_eq!(config.notification_url(), "ws://10.0.0.2:9339/");
    }

    #[test]
    fn test_rejects_out_of_range_volume() {
        let json = format!(r#"{{"host": "10.0.0.2", "jid": "{}", "max_volume": 10}}"#, JID);
        assert!(matches!(
            DeviceConfig::from_json_str(&json),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_hostname_and_bad_jid() {
        let json = format!(r#"{{"host": "speaker.local", "jid": "{}"}}"#, JID);
        assert!(DeviceConfig::from_json_str(&json).is_err());

        let json = r#"{"host": "10.0.0.2", "jid": "1111.2222222.33333333"}"#;
        assert!(matches!(DeviceConfig::from_json_str(json), Err(Error::Json(_))));
    }

    #[test]
    fn test_configured_name_wins() {
        let mut config = DeviceConfig::new("10.0.0.2", "Beosound A9", Jid::parse(JID).unwrap());
        assert_eq!(config.name(), "Beosound A9-33333333");
        config.name = Some("Living Room".to_string());
        assert_eq!(config.name(), "Living Room");
    }
}
