//! Entity services of the media player
//!
//! A [`ServiceCall`] is deserialized from the platform's service data, keyed
//! by the service name:
//!
//! ```json
//! {"service": "beolink_expand", "beolink_jids": ["1111.2222222.33333333@products.bang-olufsen.com"]}
//! ```
//!
//! and validated with [`ServiceCall::validate`] before it reaches the player.

use crate::command::PlayerCommand;
use crate::error::{Error, Result};
use crate::media_player::MediaPlayer;
use crate::types::JID_LENGTH;
use crate::volume::MAX_LEVEL;
use serde::{Deserialize, Deserializer};

/// Data of the `overlay_audio` service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayAudio {
    pub uri: Option<String>,
    pub absolute_volume: Option<u8>,
    pub volume_offset: Option<u8>,
    pub tts: Option<String>,
    pub tts_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum ServiceCall {
    BeolinkJoin {
        #[serde(default)]
        beolink_jid: Option<String>,
    },
    BeolinkExpand {
        #[serde(deserialize_with = "one_or_many")]
        beolink_jids: Vec<String>,
    },
    BeolinkUnexpand {
        #[serde(deserialize_with = "one_or_many")]
        beolink_jids: Vec<String>,
    },
    BeolinkLeave,
    BeolinkAllstandby,
    BeolinkSetVolume {
        #[serde(deserialize_with = "text_or_number")]
        volume_level: String,
    },
    BeolinkSetRelativeVolume {
        #[serde(deserialize_with = "text_or_number")]
        volume_level: String,
    },
    BeolinkLeaderCommand {
        command: String,
        #[serde(default)]
        parameter: Option<String>,
    },
    OverlayAudio(OverlayAudio),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(f64),
}

fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(value) => value,
        TextOrNumber::Number(value) => value.to_string(),
    })
}

fn check_jid_length(jid: &str) -> Result<()> {
    if jid.len() == JID_LENGTH {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "beolink jid must be {} characters: {}",
            JID_LENGTH, jid
        )))
    }
}

fn parse_volume(volume_level: &str) -> Result<f64> {
    volume_level
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidParameter(format!("{} is not a volume level", volume_level)))
}

fn check_overlay_volume(field: &str, value: Option<u8>) -> Result<()> {
    match value {
        Some(level) if level > MAX_LEVEL => Err(Error::InvalidParameter(format!(
            "{} must be within 0..={}, got {}",
            field, MAX_LEVEL, level
        ))),
        _ => Ok(()),
    }
}

impl ServiceCall {
    /// Parse and validate service data
    pub fn from_json_str(json: &str) -> Result<Self> {
        let call: ServiceCall = serde_json::from_str(json)?;
        call.validate()?;
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceCall::BeolinkJoin { .. } => "beolink_join",
            ServiceCall::BeolinkExpand { .. } => "beolink_expand",
            ServiceCall::BeolinkUnexpand { .. } => "beolink_unexpand",
            ServiceCall::BeolinkLeave => "beolink_leave",
            ServiceCall::BeolinkAllstandby => "beolink_allstandby",
            ServiceCall::BeolinkSetVolume { .. } => "beolink_set_volume",
            ServiceCall::BeolinkSetRelativeVolume { .. } => "beolink_set_relative_volume",
            ServiceCall::BeolinkLeaderCommand { .. } => "beolink_leader_command",
            ServiceCall::OverlayAudio(_) => "overlay_audio",
        }
    }

    /// Schema checks done before the call reaches the player
    pub fn validate(&self) -> Result<()> {
        match self {
            ServiceCall::BeolinkJoin { beolink_jid } => {
                beolink_jid.as_deref().map_or(Ok(()), check_jid_length)
            }
            ServiceCall::BeolinkExpand { beolink_jids }
            | ServiceCall::BeolinkUnexpand { beolink_jids } => beolink_jids
                .iter()
                .try_for_each(|jid| check_jid_length(jid)),
            ServiceCall::BeolinkSetVolume { volume_level }
            | ServiceCall::BeolinkSetRelativeVolume { volume_level } => {
                parse_volume(volume_level).map(|_| ())
            }
            ServiceCall::BeolinkLeaderCommand { command, .. } => {
                if PlayerCommand::is_accepted(command) {
                    Ok(())
                } else {
                    Err(Error::InvalidCommand(command.clone()))
                }
            }
            ServiceCall::OverlayAudio(overlay) => {
                check_overlay_volume("absolute_volume", overlay.absolute_volume)?;
                check_overlay_volume("volume_offset", overlay.volume_offset)
            }
            ServiceCall::BeolinkLeave | ServiceCall::BeolinkAllstandby => Ok(()),
        }
    }
}

impl MediaPlayer {
    /// Validate a service call and run it
    pub async fn handle_service(&self, call: ServiceCall) -> Result<()> {
        call.validate()?;
        tracing::debug!("Service {} on {}", call.name(), self.unique_id());

        match call {
            ServiceCall::BeolinkJoin { beolink_jid } => {
                self.beolink_join(beolink_jid.as_deref()).await
            }
            ServiceCall::BeolinkExpand { beolink_jids } => {
                self.beolink_expand(beolink_jids);
                Ok(())
            }
            ServiceCall::BeolinkUnexpand { beolink_jids } => {
                self.beolink_unexpand(beolink_jids);
                Ok(())
            }
            ServiceCall::BeolinkLeave => self.beolink_leave().await,
            ServiceCall::BeolinkAllstandby => self.beolink_allstandby().await,
            ServiceCall::BeolinkSetVolume { volume_level } => {
                self.beolink_set_volume(parse_volume(&volume_level)?).await
            }
            ServiceCall::BeolinkSetRelativeVolume { volume_level } => {
                self.beolink_set_relative_volume(parse_volume(&volume_level)?)
                    .await
            }
            ServiceCall::BeolinkLeaderCommand { command, parameter } => {
                self.beolink_leader_command(&command, parameter.as_deref())
                    .await
            }
            ServiceCall::OverlayAudio(overlay) => self.overlay_audio(overlay).await,
        }
    }
}
