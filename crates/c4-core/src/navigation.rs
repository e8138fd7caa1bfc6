//! Which level is in focus and which parent is open at each level above it.
//!
//! Transitions are pure: each returns the next [`Navigation`] and leaves the
//! receiver untouched. The store mirrors every transition into a [`History`]
//! so a host can replay back/forward moves, and a navigation state can be
//! rebuilt from a location path such as `system/<id>/container/<id>/component/<id>/code`.

use serde::{Deserialize, Serialize};

use crate::model::ViewLevel;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    #[serde(default)]
    pub view_level: ViewLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_system_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_component_id: Option<String>,
}

impl Navigation {
    /// Open a system (showing its containers), or go back to the system level.
    pub fn with_active_system(&self, id: Option<&str>) -> Navigation {
        Navigation {
            view_level: if id.is_some() {
                ViewLevel::Container
            } else {
                ViewLevel::System
            },
            active_system_id: id.map(str::to_string),
            active_container_id: None,
            active_component_id: None,
        }
    }

    pub fn with_active_container(&self, id: Option<&str>) -> Navigation {
        Navigation {
            view_level: if id.is_some() {
                ViewLevel::Component
            } else {
                ViewLevel::Container
            },
            active_system_id: self.active_system_id.clone(),
            active_container_id: id.map(str::to_string),
            active_component_id: None,
        }
    }

    pub fn with_active_component(&self, id: Option<&str>) -> Navigation {
        Navigation {
            view_level: if id.is_some() {
                ViewLevel::Code
            } else {
                ViewLevel::Component
            },
            active_system_id: self.active_system_id.clone(),
            active_container_id: self.active_container_id.clone(),
            active_component_id: id.map(str::to_string),
        }
    }

    /// Jump straight to `level`, dropping every active id at or below it.
    pub fn with_view_level(&self, level: ViewLevel) -> Navigation {
        let keep = |owner: ViewLevel, id: &Option<String>| {
            if owner < level {
                id.clone()
            } else {
                None
            }
        };
        Navigation {
            view_level: level,
            active_system_id: keep(ViewLevel::System, &self.active_system_id),
            active_container_id: keep(ViewLevel::Container, &self.active_container_id),
            active_component_id: keep(ViewLevel::Component, &self.active_component_id),
        }
    }

    /// The parent id selected at `level`, which filters the level below.
    pub fn active_id(&self, level: ViewLevel) -> Option<&str> {
        match level {
            ViewLevel::System => self.active_system_id.as_deref(),
            ViewLevel::Container => self.active_container_id.as_deref(),
            ViewLevel::Component => self.active_component_id.as_deref(),
            ViewLevel::Code => None,
        }
    }

    fn set_active_id(&mut self, level: ViewLevel, id: String) {
        match level {
            ViewLevel::System => self.active_system_id = Some(id),
            ViewLevel::Container => self.active_container_id = Some(id),
            ViewLevel::Component => self.active_component_id = Some(id),
            ViewLevel::Code => {}
        }
    }

    /// Location path for this state, e.g. `system/s1/container/c1/component`.
    pub fn path(&self) -> String {
        let mut segments: Vec<&str> = Vec::new();
        for level in ViewLevel::ALL {
            segments.push(level.as_str());
            if level == self.view_level {
                break;
            }
            if let Some(id) = self.active_id(level) {
                segments.push(id);
            }
        }
        segments.join("/")
    }

    /// Rebuild a state from a location path. Each keyword sets the view level
    /// and an id following it becomes the active id of that level. A path that
    /// ends on an id opens that entity, showing the level below it. Anything
    /// unrecognised yields the initial state.
    pub fn from_path(path: &str) -> Navigation {
        let mut nav = Navigation::default();
        let mut keyword: Option<ViewLevel> = None;
        let mut opened: Option<ViewLevel> = None;
        let trimmed = path.trim().trim_start_matches('#').trim_matches('/');
        for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
            if let Some(level) = ViewLevel::parse(segment) {
                nav.view_level = level;
                keyword = Some(level);
                opened = None;
                continue;
            }
            match keyword.take() {
                Some(level) => {
                    nav.set_active_id(level, segment.to_string());
                    opened = Some(level);
                }
                None => return Navigation::default(),
            }
        }
        let child = opened.and_then(|level| ViewLevel::ALL.get(level.depth() + 1).copied());
        if let Some(child) = child {
            nav.view_level = child;
        }
        nav
    }
}

/// One recorded location. `state` is absent for entries the host created from
/// a bare path, in which case the path is parsed on restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub path: String,
    pub state: Option<Navigation>,
}

impl HistoryEntry {
    pub fn from_navigation(nav: &Navigation) -> Self {
        Self {
            path: nav.path(),
            state: Some(nav.clone()),
        }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: None,
        }
    }

    pub fn navigation(&self) -> Navigation {
        self.state
            .clone()
            .unwrap_or_else(|| Navigation::from_path(&self.path))
    }
}

/// Push-style location history with a cursor for back/forward.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    limit: usize,
}

impl History {
    pub fn new(initial: &Navigation, limit: usize) -> Self {
        Self {
            entries: vec![HistoryEntry::from_navigation(initial)],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record a new location, discarding any forward entries.
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    pub fn back(&mut self) -> Option<Navigation> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].navigation())
    }

    pub fn forward(&mut self) -> Option<Navigation> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].navigation())
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.cursor]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything and start over at `initial`.
    pub fn reset(&mut self, initial: &Navigation) {
        self.entries = vec![HistoryEntry::from_navigation(initial)];
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deep() -> Navigation {
        Navigation::default()
            .with_active_system(Some("s1"))
            .with_active_container(Some("c1"))
            .with_active_component(Some("k1"))
    }

    #[test]
    fn initial_state_is_system_level() {
        let nav = Navigation::default();
        assert_eq!(nav.view_level, ViewLevel::System);
        assert_eq!(nav.active_system_id, None);
        assert_eq!(nav.path(), "system");
    }

    #[test]
    fn drilling_down_sets_levels() {
        let nav = deep();
        assert_eq!(nav.view_level, ViewLevel::Code);
        assert_eq!(nav.active_id(ViewLevel::Container), Some("c1"));
        assert_eq!(nav.path(), "system/s1/container/c1/component/k1/code");
    }

    #[test]
    fn selecting_a_system_clears_descendants() {
        let nav = deep().with_active_system(Some("s2"));
        assert_eq!(nav.view_level, ViewLevel::Container);
        assert_eq!(nav.active_system_id.as_deref(), Some("s2"));
        assert_eq!(nav.active_container_id, None);
        assert_eq!(nav.active_component_id, None);

        let nav = deep().with_active_system(None);
        assert_eq!(nav, Navigation::default());
    }

    #[test]
    fn clearing_container_returns_to_container_level() {
        let nav = deep().with_active_container(None);
        assert_eq!(nav.view_level, ViewLevel::Container);
        assert_eq!(nav.active_system_id.as_deref(), Some("s1"));
        assert_eq!(nav.active_component_id, None);
    }

    #[test]
    fn set_view_level_clears_at_and_below() {
        let nav = deep().with_view_level(ViewLevel::Container);
        assert_eq!(nav.active_system_id.as_deref(), Some("s1"));
        assert_eq!(nav.active_container_id, None);
        assert_eq!(nav.active_component_id, None);

        let nav = deep().with_view_level(ViewLevel::Component);
        assert_eq!(nav.active_container_id.as_deref(), Some("c1"));
        assert_eq!(nav.active_component_id, None);

        let nav = deep().with_view_level(ViewLevel::System);
        assert_eq!(nav, Navigation::default());
    }

    #[test]
    fn path_round_trips() {
        for nav in [
            Navigation::default(),
            Navigation::default().with_active_system(Some("s1")),
            deep().with_view_level(ViewLevel::Component),
            deep(),
        ] {
            assert_eq!(Navigation::from_path(&nav.path()), nav);
        }
    }

    #[test]
    fn from_path_tolerates_prefixes_and_garbage() {
        let nav = Navigation::from_path("#/system/s1/container/");
        assert_eq!(nav.view_level, ViewLevel::Container);
        assert_eq!(nav.active_system_id.as_deref(), Some("s1"));

        let nav = Navigation::from_path("system/s1");
        assert_eq!(nav, Navigation::default().with_active_system(Some("s1")));
        let nav = Navigation::from_path("system/s1/container/c1");
        assert_eq!(nav.view_level, ViewLevel::Component);
        assert_eq!(nav.active_container_id.as_deref(), Some("c1"));

        assert_eq!(Navigation::from_path("nonsense/path"), Navigation::default());
        assert_eq!(Navigation::from_path(""), Navigation::default());
    }

    #[test]
    fn history_back_and_forward() {
        let start = Navigation::default();
        let mut history = History::new(&start, 10);
        let a = start.with_active_system(Some("s1"));
        let b = a.with_active_container(Some("c1"));
        history.push(HistoryEntry::from_navigation(&a));
        history.push(HistoryEntry::from_navigation(&b));

        assert_eq!(history.back(), Some(a.clone()));
        assert_eq!(history.back(), Some(start));
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), Some(a));
        assert_eq!(history.forward(), Some(b));
        assert_eq!(history.forward(), None);
    }

    #[test]
    fn history_push_discards_forward_entries_and_caps_length() {
        let start = Navigation::default();
        let mut history = History::new(&start, 3);
        for id in ["s1", "s2", "s3", "s4"] {
            history.push(HistoryEntry::from_navigation(
                &start.with_active_system(Some(id)),
            ));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.current().path, "system/s4/container");

        history.back();
        history.push(HistoryEntry::from_path("system/s9/container"));
        assert_eq!(history.len(), 3);
        assert_eq!(history.forward(), None);
        assert_eq!(
            history.current().navigation().active_system_id.as_deref(),
            Some("s9")
        );
    }
}
