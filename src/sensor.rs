//! Sensor entities fed by battery and playback metadata notifications

use crate::entity::EntityContext;
use crate::protocol::Notification;
use crate::types::PlaybackContentMetadata;
use heck::ToTitleCase;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reported instead of a duration while it is unknown
const UNKNOWN_MINUTES: u32 = 65535;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    BatteryLevel,
    BatteryChargingTime,
    BatteryPlayingTime,
    MediaId,
    InputSignal,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::BatteryLevel,
        SensorKind::BatteryChargingTime,
        SensorKind::BatteryPlayingTime,
        SensorKind::MediaId,
        SensorKind::InputSignal,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            SensorKind::BatteryLevel => "battery-level",
            SensorKind::BatteryChargingTime => "battery-charging-time",
            SensorKind::BatteryPlayingTime => "battery-playing-time",
            SensorKind::MediaId => "media-id",
            SensorKind::InputSignal => "input-signal",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            SensorKind::BatteryLevel => Some("%"),
            SensorKind::BatteryChargingTime | SensorKind::BatteryPlayingTime => Some("min"),
            SensorKind::MediaId | SensorKind::InputSignal => None,
        }
    }

    /// Only the battery level is enabled in a new entity registry
    pub fn enabled_by_default(self) -> bool {
        self == SensorKind::BatteryLevel
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorValue {
    Number(u32),
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Number(value) => write!(f, "{}", value),
            SensorValue::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug)]
struct SensorState {
    available: bool,
    value: Option<SensorValue>,
}

#[derive(Clone)]
pub struct Sensor {
    ctx: EntityContext,
    kind: SensorKind,
    unique_id: String,
    state: Arc<Mutex<SensorState>>,
}

impl Sensor {
    pub fn new(ctx: EntityContext, kind: SensorKind) -> Self {
        let unique_id = ctx.entity_unique_id(kind.suffix());
        Self {
            ctx,
            kind,
            unique_id,
            state: Arc::new(Mutex::new(SensorState {
                available: true,
                value: None,
            })),
        }
    }

    /// One sensor of every kind
    pub fn all(ctx: &EntityContext) -> Vec<Sensor> {
        SensorKind::ALL
            .into_iter()
            .map(|kind| Sensor::new(ctx.clone(), kind))
            .collect()
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn available(&self) -> bool {
        self.state().available
    }

    pub fn value(&self) -> Option<SensorValue> {
        self.state().value.clone()
    }

    fn state(&self) -> MutexGuard<'_, SensorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn handle_notification(&self, notification: &Notification) {
        let value = match (self.kind, notification) {
            (_, Notification::ConnectionState(connected)) => {
                self.state().available = *connected;
                self.ctx.write_state(&self.unique_id);
                return;
            }
            (SensorKind::BatteryLevel, Notification::Battery(battery)) => {
                battery.battery_level.map(|level| SensorValue::Number(level.into()))
            }
            (SensorKind::BatteryChargingTime, Notification::Battery(battery)) => {
                battery_minutes(battery.remaining_charging_time_minutes)
            }
            (SensorKind::BatteryPlayingTime, Notification::Battery(battery)) => {
                battery_minutes(battery.remaining_playing_time_minutes)
            }
            (SensorKind::MediaId, Notification::PlaybackMetadata(metadata)) => metadata
                .source_internal_id
                .clone()
                .map(SensorValue::Text),
            (SensorKind::InputSignal, Notification::PlaybackMetadata(metadata)) => {
                input_signal(metadata).map(SensorValue::Text)
            }
            _ => return,
        };

        self.state().value = value;
        self.ctx.write_state(&self.unique_id);
    }
}

fn battery_minutes(minutes: Option<u32>) -> Option<SensorValue> {
    minutes.map(|m| SensorValue::Number(if m == UNKNOWN_MINUTES { 0 } else { m }))
}

/// `"{encoding} - {processing} - {channels}"`, humanized, empty parts left out
pub fn input_signal(metadata: &PlaybackContentMetadata) -> Option<String> {
    let encoding = metadata.encoding.as_deref().filter(|e| !e.is_empty())?;

    let mut parts = vec![humanize_encoding(encoding)];
    if let Some(processing) = metadata
        .input_channel_processing
        .as_deref()
        .filter(|p| !p.is_empty())
    {
        parts.push(processing.to_title_case());
    }
    if let Some(channels) = metadata.input_channels.as_deref().filter(|c| !c.is_empty()) {
        parts.push(channels.to_string());
    }
    Some(parts.join(" - "))
}

// Single-word encodings are abbreviations: "pcm" becomes "PCM"
fn humanize_encoding(encoding: &str) -> String {
    let titled = encoding.to_title_case();
    if capitalize(encoding) == titled {
        encoding.to_uppercase()
    } else {
        titled
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
