//! The flat store: single owner of the current [`Model`] snapshot.
//!
//! Every operation builds the next snapshot from the current one and swaps it
//! in; snapshots handed out earlier are never mutated. Collections an operation
//! does not touch stay shared with the previous snapshot. Stale ids, missing
//! parents and duplicate edges are no-ops: adds return `None`, everything else
//! returns `false`, and subscribers are not notified.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::document;
use crate::error::DocumentError;
use crate::id::{IdGenerator, UuidIds};
use crate::model::{
    Block, CodeElement, Component, ConnectionData, Container, Model, System, ViewLevel,
};
use crate::navigation::{History, HistoryEntry, Navigation};
use crate::patch::{BlockPatch, CodeDetails, ConnectionPatch, NewBlock};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Arc<Model>)>;

pub struct Store {
    current: Arc<Model>,
    ids: Box<dyn IdGenerator>,
    settings: Settings,
    history: History,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let model = Model::default();
        Self {
            history: History::new(&model.navigation, settings.history_limit),
            current: Arc::new(model),
            ids: Box::new(UuidIds),
            settings,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Replace the id source, e.g. with [`crate::id::SequentialIds`] for
    /// readable ids.
    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn snapshot(&self) -> Arc<Model> {
        Arc::clone(&self.current)
    }

    pub fn model(&self) -> &Model {
        &self.current
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // --- Subscribers ---

    /// Register a callback run after every change with the new snapshot.
    pub fn subscribe(&mut self, callback: impl FnMut(&Arc<Model>) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn draft(&self) -> Model {
        Model::clone(&self.current)
    }

    fn commit(&mut self, next: Model) {
        self.current = Arc::new(next);
        let snapshot = Arc::clone(&self.current);
        for (_, callback) in &mut self.subscribers {
            callback(&snapshot);
        }
    }

    // --- Add ---

    pub fn add_system(&mut self, draft: NewBlock) -> Option<String> {
        let base = draft.into_base(self.ids.next_id(&self.current));
        Some(self.insert(System { base }))
    }

    pub fn add_container(&mut self, system_id: &str, draft: NewBlock) -> Option<String> {
        if self.current.system(system_id).is_none() {
            trace!(system_id, "add_container: unknown system");
            return None;
        }
        let base = draft.into_base(self.ids.next_id(&self.current));
        Some(self.insert(Container {
            base,
            system_id: system_id.to_string(),
        }))
    }

    /// Add a component under `container_id`; the system key is taken from
    /// the container.
    pub fn add_component(&mut self, container_id: &str, draft: NewBlock) -> Option<String> {
        let Some(container) = self.current.container(container_id) else {
            trace!(container_id, "add_component: unknown container");
            return None;
        };
        let system_id = container.system_id.clone();
        let base = draft.into_base(self.ids.next_id(&self.current));
        Some(self.insert(Component {
            base,
            system_id,
            container_id: container_id.to_string(),
        }))
    }

    /// Add a code element under `component_id`; the system and container keys
    /// are taken from the component.
    pub fn add_code_element(
        &mut self,
        component_id: &str,
        draft: NewBlock,
        details: CodeDetails,
    ) -> Option<String> {
        let Some(component) = self.current.component(component_id) else {
            trace!(component_id, "add_code_element: unknown component");
            return None;
        };
        let system_id = component.system_id.clone();
        let container_id = component.container_id.clone();
        let base = draft.into_base(self.ids.next_id(&self.current));
        Some(self.insert(CodeElement {
            base,
            system_id,
            container_id,
            component_id: component_id.to_string(),
            code_type: details.code_type,
            language: details.language,
            code: details.code,
        }))
    }

    fn insert<T: Block>(&mut self, block: T) -> String {
        let id = block.id().to_string();
        let mut next = self.draft();
        Arc::make_mut(T::collection_mut(&mut next)).push(block);
        debug!(level = %T::LEVEL, id = %id, "added entity");
        self.commit(next);
        id
    }

    // --- Update ---

    pub fn update_system(&mut self, id: &str, patch: &BlockPatch) -> bool {
        self.update::<System>(id, patch)
    }

    pub fn update_container(&mut self, id: &str, patch: &BlockPatch) -> bool {
        self.update::<Container>(id, patch)
    }

    pub fn update_component(&mut self, id: &str, patch: &BlockPatch) -> bool {
        self.update::<Component>(id, patch)
    }

    pub fn update_code_element(&mut self, id: &str, patch: &BlockPatch) -> bool {
        self.update::<CodeElement>(id, patch)
    }

    /// Merge `patch` into the entity and copy its shared part onto every clone
    /// of that entity in all four collections.
    fn update<T: Block>(&mut self, id: &str, patch: &BlockPatch) -> bool {
        let Some(index) = T::collection(&self.current).iter().position(|b| b.id() == id) else {
            trace!(level = %T::LEVEL, id, "update: unknown id");
            return false;
        };
        if patch.is_empty() {
            trace!(level = %T::LEVEL, id, "update: empty patch");
            return false;
        }
        let shared = patch.shared();
        let mut next = self.draft();

        let current = &T::collection(&next)[index];
        let mut updated = current
            .relinked(patch, &next)
            .unwrap_or_else(|| current.clone());
        updated.apply_patch(&shared);
        Arc::make_mut(T::collection_mut(&mut next))[index] = updated;

        let clones = propagate::<System>(&mut next, id, &shared)
            + propagate::<Container>(&mut next, id, &shared)
            + propagate::<Component>(&mut next, id, &shared)
            + propagate::<CodeElement>(&mut next, id, &shared);
        debug!(level = %T::LEVEL, id, clones, "updated entity");
        self.commit(next);
        true
    }

    // --- Remove ---

    pub fn remove_system(&mut self, id: &str) -> bool {
        self.remove::<System>(id)
    }

    pub fn remove_container(&mut self, id: &str) -> bool {
        self.remove::<Container>(id)
    }

    pub fn remove_component(&mut self, id: &str) -> bool {
        self.remove::<Component>(id)
    }

    pub fn remove_code_element(&mut self, id: &str) -> bool {
        self.remove::<CodeElement>(id)
    }

    /// Remove the entity and every clone of it (and clones of those clones),
    /// plus, with `cascade_children`, everything parented under a removed
    /// entity. Connections in the same collection that pointed at a removed
    /// entity are dropped; edges at other levels are left alone.
    fn remove<T: Block>(&mut self, id: &str) -> bool {
        if self.current.get::<T>(id).is_none() {
            trace!(level = %T::LEVEL, id, "remove: unknown id");
            return false;
        }
        let mut doomed = Doomed::default();
        doomed.insert(T::LEVEL, id.to_string());

        let cascade = self.settings.cascade_children;
        let mut changed = true;
        while changed {
            changed = false;
            changed |= doomed.collect::<System>(&self.current, cascade);
            changed |= doomed.collect::<Container>(&self.current, cascade);
            changed |= doomed.collect::<Component>(&self.current, cascade);
            changed |= doomed.collect::<CodeElement>(&self.current, cascade);
        }

        let mut next = self.draft();
        prune::<System>(&mut next, &doomed);
        prune::<Container>(&mut next, &doomed);
        prune::<Component>(&mut next, &doomed);
        prune::<CodeElement>(&mut next, &doomed);
        debug!(level = %T::LEVEL, id, removed = doomed.len(), "removed entity");
        self.commit(next);
        true
    }

    // --- Connections ---

    pub fn connect_systems(&mut self, from_id: &str, connection: ConnectionData) -> bool {
        self.connect::<System>(from_id, connection)
    }

    pub fn connect_containers(&mut self, from_id: &str, connection: ConnectionData) -> bool {
        self.connect::<Container>(from_id, connection)
    }

    pub fn connect_components(&mut self, from_id: &str, connection: ConnectionData) -> bool {
        self.connect::<Component>(from_id, connection)
    }

    pub fn connect_code_elements(&mut self, from_id: &str, connection: ConnectionData) -> bool {
        self.connect::<CodeElement>(from_id, connection)
    }

    /// Append `connection` to the source entity unless it already has an edge
    /// to the same target.
    fn connect<T: Block>(&mut self, from_id: &str, connection: ConnectionData) -> bool {
        let Some(index) = T::collection(&self.current).iter().position(|b| b.id() == from_id) else {
            trace!(level = %T::LEVEL, from_id, "connect: unknown source");
            return false;
        };
        let source = &T::collection(&self.current)[index];
        if source.base().connection_to(&connection.target_id).is_some() {
            trace!(level = %T::LEVEL, from_id, target_id = %connection.target_id, "connect: duplicate edge");
            return false;
        }
        let target_id = connection.target_id.clone();
        let mut next = self.draft();
        Arc::make_mut(T::collection_mut(&mut next))[index]
            .base_mut()
            .connections
            .push(connection);
        debug!(level = %T::LEVEL, from_id, target_id = %target_id, "connected");
        self.commit(next);
        true
    }

    pub fn update_connection(
        &mut self,
        level: ViewLevel,
        source_id: &str,
        target_id: &str,
        patch: &ConnectionPatch,
    ) -> bool {
        let edit = |connections: &mut Vec<ConnectionData>, at: usize| patch.apply(&mut connections[at]);
        match level {
            ViewLevel::System => self.edit_connection::<System>(source_id, target_id, edit),
            ViewLevel::Container => self.edit_connection::<Container>(source_id, target_id, edit),
            ViewLevel::Component => self.edit_connection::<Component>(source_id, target_id, edit),
            ViewLevel::Code => self.edit_connection::<CodeElement>(source_id, target_id, edit),
        }
    }

    pub fn remove_connection(&mut self, level: ViewLevel, source_id: &str, target_id: &str) -> bool {
        let edit = |connections: &mut Vec<ConnectionData>, at: usize| {
            connections.remove(at);
        };
        match level {
            ViewLevel::System => self.edit_connection::<System>(source_id, target_id, edit),
            ViewLevel::Container => self.edit_connection::<Container>(source_id, target_id, edit),
            ViewLevel::Component => self.edit_connection::<Component>(source_id, target_id, edit),
            ViewLevel::Code => self.edit_connection::<CodeElement>(source_id, target_id, edit),
        }
    }

    fn edit_connection<T: Block>(
        &mut self,
        source_id: &str,
        target_id: &str,
        edit: impl FnOnce(&mut Vec<ConnectionData>, usize),
    ) -> bool {
        let found = T::collection(&self.current).iter().enumerate().find_map(|(i, b)| {
            if b.id() != source_id {
                return None;
            }
            let at = b.base().connections.iter().position(|c| c.target_id == target_id)?;
            Some((i, at))
        });
        let Some((index, at)) = found else {
            trace!(level = %T::LEVEL, source_id, target_id, "connection not found");
            return false;
        };
        let mut next = self.draft();
        edit(
            &mut Arc::make_mut(T::collection_mut(&mut next))[index].base_mut().connections,
            at,
        );
        debug!(level = %T::LEVEL, source_id, target_id, "edited connection");
        self.commit(next);
        true
    }

    // --- Whole model ---

    /// Replace every collection and the navigation state at once.
    pub fn set_model(&mut self, model: Model) {
        self.history.reset(&model.navigation);
        debug!(entities = model.entity_count(), "model replaced");
        self.commit(model);
    }

    pub fn export_model(&self) -> Result<String, DocumentError> {
        document::export(&self.current)
    }

    /// Load a document. On any failure the current model is kept and `false`
    /// is returned; the cause is logged.
    pub fn import_model(&mut self, text: &str) -> bool {
        match document::parse(text) {
            Ok(model) => {
                info!(entities = model.entity_count(), "imported document");
                self.set_model(model);
                true
            }
            Err(e) => {
                warn!(error = %e, "rejected document");
                false
            }
        }
    }

    // --- Navigation ---

    pub fn navigation(&self) -> &Navigation {
        &self.current.navigation
    }

    pub fn set_active_system(&mut self, id: Option<&str>) -> bool {
        let nav = self.current.navigation.with_active_system(id);
        self.navigate(nav)
    }

    pub fn set_active_container(&mut self, id: Option<&str>) -> bool {
        let nav = self.current.navigation.with_active_container(id);
        self.navigate(nav)
    }

    pub fn set_active_component(&mut self, id: Option<&str>) -> bool {
        let nav = self.current.navigation.with_active_component(id);
        self.navigate(nav)
    }

    pub fn set_view_level(&mut self, level: ViewLevel) -> bool {
        let nav = self.current.navigation.with_view_level(level);
        self.navigate(nav)
    }

    /// Navigate to a location path typed or linked by the host, recording it
    /// as a path-only history entry.
    pub fn open_location(&mut self, path: &str) -> bool {
        let nav = Navigation::from_path(path);
        if nav == self.current.navigation {
            return false;
        }
        self.history.push(HistoryEntry::from_path(path));
        self.apply_navigation(nav);
        true
    }

    pub fn back(&mut self) -> bool {
        match self.history.back() {
            Some(nav) => self.restore(nav),
            None => false,
        }
    }

    pub fn forward(&mut self) -> bool {
        match self.history.forward() {
            Some(nav) => self.restore(nav),
            None => false,
        }
    }

    fn navigate(&mut self, nav: Navigation) -> bool {
        if nav == self.current.navigation {
            return false;
        }
        self.history.push(HistoryEntry::from_navigation(&nav));
        self.apply_navigation(nav);
        true
    }

    fn restore(&mut self, nav: Navigation) -> bool {
        if nav == self.current.navigation {
            return false;
        }
        self.apply_navigation(nav);
        true
    }

    fn apply_navigation(&mut self, nav: Navigation) {
        debug!(path = %nav.path(), "navigated");
        let mut next = self.draft();
        next.navigation = nav;
        self.commit(next);
    }
}

/// Apply `patch` to every entity of kind `T` whose original is `original_id`.
/// Leaves the collection shared when it holds no such clone.
fn propagate<T: Block>(model: &mut Model, original_id: &str, patch: &BlockPatch) -> usize {
    let is_clone = |b: &T| b.original_id() == Some(original_id);
    if !T::collection(model).iter().any(is_clone) {
        return 0;
    }
    let mut count = 0;
    for block in Arc::make_mut(T::collection_mut(model)).iter_mut() {
        if is_clone(block) {
            block.apply_patch(patch);
            count += 1;
        }
    }
    count
}

/// Ids slated for removal, grouped by the level they live at.
#[derive(Debug, Default)]
struct Doomed {
    by_level: [HashSet<String>; 4],
}

impl Doomed {
    fn insert(&mut self, level: ViewLevel, id: String) -> bool {
        self.by_level[level.depth()].insert(id)
    }

    fn at(&self, level: ViewLevel) -> &HashSet<String> {
        &self.by_level[level.depth()]
    }

    fn contains(&self, id: &str) -> bool {
        self.by_level.iter().any(|set| set.contains(id))
    }

    fn len(&self) -> usize {
        self.by_level.iter().map(HashSet::len).sum()
    }

    /// Add entities of kind `T` that clone a doomed entity or, when
    /// `cascade` is set, hang under a doomed parent. Returns whether anything
    /// new was added.
    fn collect<T: Block>(&mut self, model: &Model, cascade: bool) -> bool {
        let parents = T::LEVEL.parent();
        let found: Vec<String> = T::collection(model)
            .iter()
            .filter(|b| !self.at(T::LEVEL).contains(b.id()))
            .filter(|b| {
                let cloned = b.original_id().is_some_and(|o| self.contains(o));
                let orphaned = cascade
                    && match (parents, b.parent_id()) {
                        (Some(level), Some(parent)) => self.at(level).contains(parent),
                        _ => false,
                    };
                cloned || orphaned
            })
            .map(|b| b.id().to_string())
            .collect();
        let grew = !found.is_empty();
        for id in found {
            self.insert(T::LEVEL, id);
        }
        grew
    }
}

/// Drop doomed entities of kind `T` and edges pointing at them from siblings.
fn prune<T: Block>(model: &mut Model, doomed: &Doomed) {
    let gone = doomed.at(T::LEVEL);
    if gone.is_empty() {
        return;
    }
    let touched = T::collection(model).iter().any(|b| {
        gone.contains(b.id()) || b.base().connections.iter().any(|c| gone.contains(&c.target_id))
    });
    if !touched {
        return;
    }
    let items = Arc::make_mut(T::collection_mut(model));
    items.retain(|b| !gone.contains(b.id()));
    for block in items.iter_mut() {
        block
            .base_mut()
            .connections
            .retain(|c| !gone.contains(&c.target_id));
    }
}
