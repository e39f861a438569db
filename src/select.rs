//! Select entities: sound mode and listening position

use crate::entity::EntityContext;
use crate::error::Result;
use crate::protocol::Notification;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SOUND_MODE_SUFFIX: &str = "sound-mode";
pub const LISTENING_POSITION_SUFFIX: &str = "listening-position";

/// Scene tag marking a listening position
pub const LISTENING_POSITION_TAG: &str = "listeningposition";

/// Labelled options in first-seen order
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSet<K> {
    entries: Vec<(String, K)>,
}

impl<K> Default for OptionSet<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Clone + PartialEq> OptionSet<K> {
    /// Add an option; a label seen before keeps its first key
    pub fn insert(&mut self, label: String, key: K) -> bool {
        if self.entries.iter().any(|(existing, _)| *existing == label) {
            tracing::warn!("Duplicate option {} ignored", label);
            return false;
        }
        self.entries.push((label, key));
        true
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn key(&self, label: &str) -> Option<K> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, key)| key.clone())
    }

    pub fn label(&self, key: &K) -> Option<String> {
        self.entries
            .iter()
            .find(|(_, existing)| existing == key)
            .map(|(label, _)| label.clone())
    }
}

#[derive(Debug, Clone)]
struct SelectState<K> {
    available: bool,
    options: OptionSet<K>,
    current: Option<String>,
}

impl<K> Default for SelectState<K> {
    fn default() -> Self {
        Self {
            available: false,
            options: OptionSet::default(),
            current: None,
        }
    }
}

fn lock<K>(state: &Mutex<SelectState<K>>) -> MutexGuard<'_, SelectState<K>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Listening mode of the device, labelled `"{name} - {id}"`
#[derive(Clone)]
pub struct SoundModeSelect {
    ctx: EntityContext,
    unique_id: String,
    state: Arc<Mutex<SelectState<i64>>>,
}

impl SoundModeSelect {
    pub fn new(ctx: EntityContext) -> Self {
        let unique_id = ctx.entity_unique_id(SOUND_MODE_SUFFIX);
        Self {
            ctx,
            unique_id,
            state: Arc::new(Mutex::new(SelectState::default())),
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn available(&self) -> bool {
        lock(&self.state).available
    }

    pub fn options(&self) -> Vec<String> {
        lock(&self.state).options.labels()
    }

    pub fn current_option(&self) -> Option<String> {
        lock(&self.state).current.clone()
    }

    pub async fn attach(&self) -> Result<()> {
        let active = self.ctx.api().active_listening_mode().await?;
        self.update_sound_modes(active.id).await?;
        lock(&self.state).available = true;
        self.ctx.write_state(&self.unique_id);
        Ok(())
    }

    pub async fn handle_notification(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::ActiveListeningMode(mode) => self.update_sound_modes(mode.id).await?,
            Notification::ConnectionState(connected) => lock(&self.state).available = *connected,
            _ => return Ok(()),
        }
        self.ctx.write_state(&self.unique_id);
        Ok(())
    }

    async fn update_sound_modes(&self, active_id: i64) -> Result<()> {
        let modes = self.ctx.api().listening_modes().await?;

        let mut options = OptionSet::default();
        for mode in modes {
            options.insert(format!("{} - {}", mode.name, mode.id), mode.id);
        }

        let mut state = lock(&self.state);
        state.current = options.label(&active_id);
        state.options = options;
        Ok(())
    }

    /// Activate the listening mode behind `option`
    pub async fn select_option(&self, option: &str) -> Result<()> {
        let (key, labels) = {
            let state = lock(&self.state);
            (state.options.key(option), state.options.labels())
        };
        match key {
            Some(mode_id) => self.ctx.api().activate_listening_mode(mode_id).await,
            None => {
                tracing::error!("Invalid sound mode: {}. Valid options are: {:?}", option, labels);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Position {
    scene_key: String,
    speaker_group_id: Option<i64>,
}

/// Listening position, selected by running the matching scene
#[derive(Clone)]
pub struct ListeningPositionSelect {
    ctx: EntityContext,
    unique_id: String,
    state: Arc<Mutex<SelectState<Position>>>,
}

impl ListeningPositionSelect {
    pub fn new(ctx: EntityContext) -> Self {
        let unique_id = ctx.entity_unique_id(LISTENING_POSITION_SUFFIX);
        Self {
            ctx,
            unique_id,
            state: Arc::new(Mutex::new(SelectState::default())),
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn available(&self) -> bool {
        lock(&self.state).available
    }

    pub fn options(&self) -> Vec<String> {
        lock(&self.state).options.labels()
    }

    /// Scene whose first action targets the active speaker group
    pub fn current_option(&self) -> Option<String> {
        lock(&self.state).current.clone()
    }

    pub async fn attach(&self) -> Result<()> {
        self.update_listening_positions(None).await?;
        lock(&self.state).available = true;
        self.ctx.write_state(&self.unique_id);
        Ok(())
    }

    pub async fn handle_notification(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::ActiveSpeakerGroup(group) => {
                self.update_listening_positions(Some(group.id)).await?
            }
            Notification::RemoteMenuChanged => self.update_listening_positions(None).await?,
            Notification::ConnectionState(connected) => lock(&self.state).available = *connected,
            _ => return Ok(()),
        }
        self.ctx.write_state(&self.unique_id);
        Ok(())
    }

    async fn update_listening_positions(&self, active_group: Option<i64>) -> Result<()> {
        let scenes = self.ctx.api().scenes().await?;
        let active_group = match active_group {
            Some(id) => id,
            None => self.ctx.api().active_speaker_group().await?.id,
        };

        let mut options = OptionSet::default();
        let mut current = None;
        for (key, scene) in scenes {
            let is_position = scene
                .tags
                .as_ref()
                .is_some_and(|tags| tags.iter().any(|t| t == LISTENING_POSITION_TAG));
            let Some(label) = scene.label.filter(|_| is_position) else {
                continue;
            };

            let speaker_group_id = scene
                .action_list
                .as_ref()
                .and_then(|actions| actions.first())
                .and_then(|action| action.speaker_group_id);
            let position = Position {
                scene_key: key,
                speaker_group_id,
            };

            if options.insert(label.clone(), position) && speaker_group_id == Some(active_group) {
                current = Some(label);
            }
        }

        let mut state = lock(&self.state);
        state.options = options;
        state.current = current;
        Ok(())
    }

    /// Run the scene behind `option`
    pub async fn select_option(&self, option: &str) -> Result<()> {
        let (position, labels) = {
            let state = lock(&self.state);
            (state.options.key(option), state.options.labels())
        };
        match position {
            Some(position) => self.ctx.api().trigger_scene(&position.scene_key).await,
            None => {
                tracing::error!(
                    "Invalid listening position: {}. Valid options are: {:?}",
                    option,
                    labels
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{set, MockApi};
    use crate::types::{Action, ListeningMode, ListeningModeRef, Scene, SpeakerGroupOverview};
    use std::collections::BTreeMap;
    use tokio::sync::broadcast;

    fn context(api: &Arc<MockApi>) -> EntityContext {
        let (tx, _) = broadcast::channel(16);
        EntityContext::new(api.clone(), "33333333", tx)
    }

    fn scene(label: &str, tags: &[&str], group: i64) -> Scene {
        Scene {
            label: Some(label.to_string()),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            action_list: Some(vec![Action {
                action_type: Some("speakerGroup".to_string()),
                speaker_group_id: Some(group),
                radio_station_id: None,
            }]),
        }
    }

    #[tokio::test]
    async fn test_sound_mode_options() {
        let api = Arc::new(MockApi::new());
        set(
            &api.listening_modes,
            vec![
                ListeningMode {
                    id: 1,
                    name: "Optimal".to_string(),
                },
                ListeningMode {
                    id: 7,
                    name: "Movie".to_string(),
                },
            ],
        );
        set(&api.active_listening_mode, 7);
        let select = SoundModeSelect::new(context(&api));

        select.attach().await.unwrap();

        assert_eq!(select.unique_id(), "33333333-sound-mode");
        assert_eq!(select.options(), vec!["Optimal - 1", "Movie - 7"]);
        assert_eq!(select.current_option().as_deref(), Some("Movie - 7"));

        select
            .handle_notification(&Notification::ActiveListeningMode(ListeningModeRef { id: 1 }))
            .await
            .unwrap();
        assert_eq!(select.current_option().as_deref(), Some("Optimal - 1"));

        api.clear_calls();
        select.select_option("Movie - 7").await.unwrap();
        select.select_option("Music").await.unwrap();
        assert_eq!(api.calls(), vec!["activate_listening_mode 7"]);
    }

    #[tokio::test]
    async fn test_listening_positions() {
        let api = Arc::new(MockApi::new());
        set(
            &api.scenes,
            BTreeMap::from([
                ("a".to_string(), scene("Sofa", &["listeningposition"], 2)),
                ("b".to_string(), scene("Sofa", &["listeningposition"], 3)),
                ("c".to_string(), scene("Desk", &["listeningposition"], 3)),
                ("d".to_string(), scene("Radio", &["favourite"], 3)),
            ]),
        );
        set(&api.active_speaker_group, 3);
        let select = ListeningPositionSelect::new(context(&api));

        select.attach().await.unwrap();

        assert_eq!(select.options(), vec!["Sofa", "Desk"]);
        assert_eq!(select.current_option().as_deref(), Some("Desk"));

        select
            .handle_notification(&Notification::ActiveSpeakerGroup(SpeakerGroupOverview { id: 2 }))
            .await
            .unwrap();
        assert_eq!(select.current_option().as_deref(), Some("Sofa"));

        api.clear_calls();
        select.select_option("Sofa").await.unwrap();
        select.select_option("Kitchen").await.unwrap();
        assert_eq!(api.calls(), vec!["trigger_scene a"]);
    }

    #[tokio::test]
    async fn test_last_matching_position_is_current() {
        let api = Arc::new(MockApi::new());
        set(
            &api.scenes,
            BTreeMap::from([
                ("a".to_string(), scene("Sofa", &["listeningposition"], 3)),
                ("b".to_string(), scene("Desk", &["listeningposition"], 3)),
            ]),
        );
        set(&api.active_speaker_group, 3);
        let select = ListeningPositionSelect::new(context(&api));

        select.attach().await.unwrap();

        assert_eq!(select.options(), vec!["Sofa", "Desk"]);
        assert_eq!(select.current_option().as_deref(), Some("Desk"));
    }

    #[tokio::test]
    async fn test_connection_state_sets_availability() {
        let api = Arc::new(MockApi::new());
        let select = ListeningPositionSelect::new(context(&api));
        select.attach().await.unwrap();
        assert!(select.available());

        select
            .handle_notification(&Notification::ConnectionState(false))
            .await
            .unwrap();
        assert!(!select.available());
        assert!(select.current_option().is_none());
    }
}
