//! Source catalog of a device
//!
//! Audio sources come from the source list, video sources from the remote menu.
//! The catalog is rebuilt in full whenever the device reports a change.

use crate::types::{RemoteMenuItem, Source};
use std::collections::BTreeMap;

/// Sources the adapter knows by name, with their device id and display name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownSource {
    UriStreamer,
    Bluetooth,
    AirPlay,
    ChromeCast,
    Spotify,
    Generator,
    LineIn,
    Spdif,
    NetRadio,
    Local,
    Dlna,
    QPlay,
    Wpl,
    Pl,
    Tv,
    Deezer,
    Beolink,
    TidalConnect,
}

impl KnownSource {
    /// Id used by the device API
    pub const fn id(self) -> &'static str {
        match self {
            KnownSource::UriStreamer => "uriStreamer",
            KnownSource::Bluetooth => "bluetooth",
            KnownSource::AirPlay => "airPlay",
            KnownSource::ChromeCast => "chromeCast",
            KnownSource::Spotify => "spotify",
            KnownSource::Generator => "generator",
            KnownSource::LineIn => "lineIn",
            KnownSource::Spdif => "spdif",
            KnownSource::NetRadio => "netRadio",
            KnownSource::Local => "local",
            KnownSource::Dlna => "dlna",
            KnownSource::QPlay => "qplay",
            KnownSource::Wpl => "wpl",
            KnownSource::Pl => "pl",
            KnownSource::Tv => "tv",
            KnownSource::Deezer => "deezer",
            KnownSource::Beolink => "beolink",
            KnownSource::TidalConnect => "tidalConnect",
        }
    }

    /// Display name as reported in source-change notifications
    pub const fn name(self) -> &'static str {
        match self {
            KnownSource::UriStreamer => "Audio Streamer",
            KnownSource::Bluetooth => "Bluetooth",
            KnownSource::AirPlay => "AirPlay",
            KnownSource::ChromeCast => "Chromecast built-in",
            KnownSource::Spotify => "Spotify Connect",
            KnownSource::Generator => "Tone Generator",
            KnownSource::LineIn => "Line-In",
            KnownSource::Spdif => "Optical",
            KnownSource::NetRadio => "B&O Radio",
            KnownSource::Local => "Local",
            KnownSource::Dlna => "DLNA",
            KnownSource::QPlay => "QPlay",
            KnownSource::Wpl => "Wireless Powerlink",
            KnownSource::Pl => "Powerlink",
            KnownSource::Tv => "TV",
            KnownSource::Deezer => "Deezer",
            KnownSource::Beolink => "Networklink",
            KnownSource::TidalConnect => "Tidal Connect",
        }
    }
}

/// Source ids never offered for selection
pub const HIDDEN_SOURCE_IDS: &[&str] = &[
    "airPlay",
    "bluetooth",
    "chromeCast",
    "generator",
    "local",
    "dlna",
    "qplay",
    "wpl",
    "pl",
    "beolink",
    "usbIn",
];

/// Source list used when the device reports sources the API cannot parse
pub fn fallback_sources() -> Vec<Source> {
    [
        KnownSource::UriStreamer,
        KnownSource::Bluetooth,
        KnownSource::Spotify,
        KnownSource::LineIn,
        KnownSource::Spdif,
        KnownSource::NetRadio,
        KnownSource::Deezer,
        KnownSource::TidalConnect,
    ]
    .into_iter()
    .map(|source| Source::new(source.id(), source.name()))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Activated through the source API
    Audio,
    /// Activated by triggering a remote menu item
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub key: String,
    pub label: String,
    pub kind: SourceKind,
}

/// Selectable sources, audio entries first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCatalog {
    entries: Vec<CatalogEntry>,
}

impl SourceCatalog {
    pub fn build(sources: &[Source], menu: &BTreeMap<String, RemoteMenuItem>) -> Self {
        let mut entries: Vec<CatalogEntry> = Vec::new();

        for source in sources {
            let (Some(id), Some(name)) = (&source.id, &source.name) else {
                continue;
            };
            if source.is_enabled != Some(true)
                || id.is_empty()
                || name.is_empty()
                || HIDDEN_SOURCE_IDS.contains(&id.as_str())
            {
                continue;
            }
            upsert(&mut entries, id, name, SourceKind::Audio);
        }

        for (key, item) in menu {
            if item.available != Some(true) {
                continue;
            }
            let Some(label) = item.label.as_deref().filter(|l| !l.is_empty() && *l != "TV") else {
                continue;
            };
            let is_video = item
                .content
                .as_ref()
                .and_then(|c| c.categories.as_ref())
                .is_some_and(|categories| {
                    !categories.is_empty() && !categories.iter().any(|c| c == "music")
                });
            if is_video {
                upsert(&mut entries, key, label, SourceKind::Video);
            }
        }

        Self { entries }
    }

    /// Labels in display order
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    /// First entry carrying the given label
    pub fn resolve(&self, label: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Later keys replace earlier ones in place
fn upsert(entries: &mut Vec<CatalogEntry>, key: &str, label: &str, kind: SourceKind) {
    let entry = CatalogEntry {
        key: key.to_string(),
        label: label.to_string(),
        kind,
    };
    match entries.iter_mut().find(|e| e.key == key) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteMenuContent;

    fn menu_item(label: &str, categories: &[&str], available: bool) -> RemoteMenuItem {
        RemoteMenuItem {
            available: Some(available),
            content: Some(RemoteMenuContent {
                categories: Some(categories.iter().map(|c| c.to_string()).collect()),
            }),
            label: Some(label.to_string()),
        }
    }

    #[test]
    fn test_hidden_and_disabled_sources_are_skipped() {
        let mut disabled = Source::new("spotify", "Spotify Connect");
        disabled.is_enabled = Some(false);
        let sources = vec![
            Source::new("bluetooth", "Bluetooth"),
            disabled,
            Source::new("deezer", "Deezer"),
            Source::new("lineIn", "Line-In"),
        ];

        let catalog = SourceCatalog::build(&sources, &BTreeMap::new());
        assert_eq!(catalog.labels(), vec!["Deezer", "Line-In"]);
    }

    #[test]
    fn test_video_sources_from_remote_menu() {
        let mut menu = BTreeMap::new();
        menu.insert("hdmi1".to_string(), menu_item("HDMI 1", &["tv"], true));
        menu.insert("radio".to_string(), menu_item("Radio", &["music"], true));
        menu.insert("tv".to_string(), menu_item("TV", &["tv"], true));
        menu.insert("hdmi2".to_string(), menu_item("HDMI 2", &["tv"], false));

        let catalog = SourceCatalog::build(&[Source::new("deezer", "Deezer")], &menu);
        assert_eq!(catalog.labels(), vec!["Deezer", "HDMI 1"]);

        let hdmi = catalog.resolve("HDMI 1").unwrap();
        assert_eq!(hdmi.key, "hdmi1");
        assert_eq!(hdmi.kind, SourceKind::Video);
        assert_eq!(catalog.resolve("Deezer").unwrap().kind, SourceKind::Audio);
        assert!(catalog.resolve("Radio").is_none());
    }

    #[test]
    fn test_fallback_sources_are_selectable() {
        let catalog = SourceCatalog::build(&fallback_sources(), &BTreeMap::new());
        assert!(catalog.resolve(KnownSource::Bluetooth.name()).is_none());
        assert!(catalog.resolve(KnownSource::Deezer.name()).is_some());
        assert!(!catalog.is_empty());
    }
}
