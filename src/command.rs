use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command a Beolink member can ask its leader (or a leader its listeners) to run
///
/// Replaces name-based dispatch with a closed set of commands, each carrying a
/// parameter of the right type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "parameter", rename_all = "snake_case")]
pub enum PlayerCommand {
    SetVolumeLevel(f64),
    MediaSeek(f64),
    SetRelativeVolumeLevel(f64),
    MuteVolume(bool),
    SelectSource(String),
    VolumeUp,
    VolumeDown,
    MediaPlayPause,
    MediaPause,
    MediaPlay,
    MediaStop,
    MediaNextTrack,
    MediaPreviousTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterType {
    Float,
    Bool,
    Text,
    None,
}

/// Accepted command names and the parameter each one takes
const ACCEPTED_COMMANDS: &[(&str, ParameterType)] = &[
    ("set_volume_level", ParameterType::Float),
    ("media_seek", ParameterType::Float),
    ("set_relative_volume_level", ParameterType::Float),
    ("mute_volume", ParameterType::Bool),
    ("select_source", ParameterType::Text),
    ("volume_up", ParameterType::None),
    ("volume_down", ParameterType::None),
    ("media_play_pause", ParameterType::None),
    ("media_pause", ParameterType::None),
    ("media_play", ParameterType::None),
    ("media_stop", ParameterType::None),
    ("media_next_track", ParameterType::None),
    ("media_previous_track", ParameterType::None),
];

impl PlayerCommand {
    /// Check that a command name is one of the accepted commands
    pub fn is_accepted(command: &str) -> bool {
        ACCEPTED_COMMANDS.iter().any(|(name, _)| *name == command)
    }

    /// All accepted command names
    pub fn accepted_names() -> impl Iterator<Item = &'static str> {
        ACCEPTED_COMMANDS.iter().map(|(name, _)| *name)
    }

    /// Build a command from its name and optional textual parameter
    ///
    /// Commands without a parameter reject one; commands with a parameter
    /// require one that converts to the expected type.
    pub fn parse(command: &str, parameter: Option<&str>) -> Result<Self> {
        let parameter_type = ACCEPTED_COMMANDS
            .iter()
            .find(|(name, _)| *name == command)
            .map(|(_, parameter_type)| *parameter_type)
            .ok_or_else(|| Error::InvalidCommand(command.to_string()))?;

        match (parameter_type, parameter) {
            (ParameterType::None, Some(p)) => Err(Error::InvalidParameter(format!(
                "{} takes no parameter, got {:?}",
                command, p
            ))),
            (ParameterType::None, None) => Ok(Self::without_parameter(command)),
            (_, None) => Err(Error::InvalidParameter(format!(
                "{} requires a parameter",
                command
            ))),
            (ParameterType::Float, Some(p)) => {
                let value: f64 = p
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidParameter(format!("{:?} is not a number", p)))?;
                Ok(match command {
                    "set_volume_level" => PlayerCommand::SetVolumeLevel(value),
                    "media_seek" => PlayerCommand::MediaSeek(value),
                    _ => PlayerCommand::SetRelativeVolumeLevel(value),
                })
            }
            (ParameterType::Bool, Some(p)) => parse_bool(p)
                .map(PlayerCommand::MuteVolume)
                .ok_or_else(|| Error::InvalidParameter(format!("{:?} is not a boolean", p))),
            (ParameterType::Text, Some(p)) => Ok(PlayerCommand::SelectSource(p.to_string())),
        }
    }

    fn without_parameter(command: &str) -> Self {
        match command {
            "volume_up" => PlayerCommand::VolumeUp,
            "volume_down" => PlayerCommand::VolumeDown,
            "media_play_pause" => PlayerCommand::MediaPlayPause,
            "media_pause" => PlayerCommand::MediaPause,
            "media_play" => PlayerCommand::MediaPlay,
            "media_stop" => PlayerCommand::MediaStop,
            "media_next_track" => PlayerCommand::MediaNextTrack,
            _ => PlayerCommand::MediaPreviousTrack,
        }
    }

    /// Command name as accepted by [`PlayerCommand::parse`]
    pub fn name(&self) -> &'static str {
        match self {
            PlayerCommand::SetVolumeLevel(_) => "set_volume_level",
            PlayerCommand::MediaSeek(_) => "media_seek",
            PlayerCommand::SetRelativeVolumeLevel(_) => "set_relative_volume_level",
            PlayerCommand::MuteVolume(_) => "mute_volume",
            PlayerCommand::SelectSource(_) => "select_source",
            PlayerCommand::VolumeUp => "volume_up",
            PlayerCommand::VolumeDown => "volume_down",
            PlayerCommand::MediaPlayPause => "media_play_pause",
            PlayerCommand::MediaPause => "media_pause",
            PlayerCommand::MediaPlay => "media_play",
            PlayerCommand::MediaStop => "media_stop",
            PlayerCommand::MediaNextTrack => "media_next_track",
            PlayerCommand::MediaPreviousTrack => "media_previous_track",
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerCommand::SetVolumeLevel(v)
            | PlayerCommand::MediaSeek(v)
            | PlayerCommand::SetRelativeVolumeLevel(v) => write!(f, "{}({})", self.name(), v),
            PlayerCommand::MuteVolume(muted) => write!(f, "{}({})", self.name(), muted),
            PlayerCommand::SelectSource(source) => write!(f, "{}({})", self.name(), source),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typed_parameters() {
        assert_eq!(
            PlayerCommand::parse("set_volume_level", Some("0.4")).unwrap(),
            PlayerCommand::SetVolumeLevel(0.4)
        );
        assert_eq!(
            PlayerCommand::parse("mute_volume", Some("true")).unwrap(),
            PlayerCommand::MuteVolume(true)
        );
        assert_eq!(
            PlayerCommand::parse("select_source", Some("Deezer")).unwrap(),
            PlayerCommand::SelectSource("Deezer".to_string())
        );
        assert_eq!(
            PlayerCommand::parse("media_stop", None).unwrap(),
            PlayerCommand::MediaStop
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            PlayerCommand::parse("reboot", None),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(
            PlayerCommand::parse("media_stop", Some("1")),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            PlayerCommand::parse("set_volume_level", Some("loud")),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            PlayerCommand::parse("set_volume_level", None),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_accepted_names() {
        for name in PlayerCommand::accepted_names() {
            assert!(PlayerCommand::is_accepted(name));
        }
        assert_eq!(PlayerCommand::VolumeDown.name(), "volume_down");
        assert_eq!(PlayerCommand::SetVolumeLevel(0.5).to_string(), "set_volume_level(0.5)");
    }
}
