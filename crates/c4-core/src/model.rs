use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::navigation::Navigation;
use crate::patch::BlockPatch;

// --- Levels ---

/// The four levels of the C4 hierarchy, ordered from the top down.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ViewLevel {
    #[default]
    System,
    Container,
    Component,
    Code,
}

impl ViewLevel {
    pub const ALL: [ViewLevel; 4] = [
        ViewLevel::System,
        ViewLevel::Container,
        ViewLevel::Component,
        ViewLevel::Code,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewLevel::System => "system",
            ViewLevel::Container => "container",
            ViewLevel::Component => "component",
            ViewLevel::Code => "code",
        }
    }

    pub fn parse(s: &str) -> Option<ViewLevel> {
        ViewLevel::ALL.into_iter().find(|level| level.as_str() == s)
    }

    /// Position in the hierarchy, 0 for systems.
    pub fn depth(self) -> usize {
        self as usize
    }

    /// The level whose entities own entities at this level.
    pub fn parent(self) -> Option<ViewLevel> {
        match self {
            ViewLevel::System => None,
            ViewLevel::Container => Some(ViewLevel::System),
            ViewLevel::Component => Some(ViewLevel::Container),
            ViewLevel::Code => Some(ViewLevel::Component),
        }
    }
}

impl fmt::Display for ViewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Shared records ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Back-reference from a clone to the entity it mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OriginalRef {
    pub id: String,
}

/// An outgoing edge to another entity of the same level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Where along the edge the label sits, 0.0 at the source and 1.0 at the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidirectional: Option<bool>,
}

impl ConnectionData {
    pub fn to(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }
}

/// Fields every entity kind carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BaseBlock {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<OriginalRef>,
    #[serde(default)]
    pub connections: Vec<ConnectionData>,
}

impl BaseBlock {
    pub fn original_id(&self) -> Option<&str> {
        self.original.as_ref().map(|o| o.id.as_str())
    }

    pub fn connection_to(&self, target_id: &str) -> Option<&ConnectionData> {
        self.connections.iter().find(|c| c.target_id == target_id)
    }
}

// --- Entity kinds ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct System {
    #[serde(flatten)]
    pub base: BaseBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(flatten)]
    pub base: BaseBlock,
    pub system_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(flatten)]
    pub base: BaseBlock,
    pub system_id: String,
    pub container_id: String,
}

/// Kind of a code element. Names outside this set read as `Other` and are
/// written back as `"other"`; the original name is not kept.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum CodeType {
    #[default]
    Class,
    Interface,
    Function,
    Module,
    Enum,
    Variable,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodeElement {
    #[serde(flatten)]
    pub base: BaseBlock,
    pub system_id: String,
    pub container_id: String,
    pub component_id: String,
    #[serde(default)]
    pub code_type: CodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Behaviour shared by the four entity kinds, so the store can run one
/// implementation of each operation against whichever collection a kind lives in.
pub trait Block: Clone {
    const LEVEL: ViewLevel;

    fn base(&self) -> &BaseBlock;
    fn base_mut(&mut self) -> &mut BaseBlock;

    /// Immediate parent key, `None` for systems.
    fn parent_id(&self) -> Option<&str>;

    fn collection(model: &Model) -> &Arc<Vec<Self>>;
    fn collection_mut(model: &mut Model) -> &mut Arc<Vec<Self>>;

    /// Copy of `self` moved under the parent named by `patch`, with derived keys
    /// refreshed from `model`. `None` when the patch does not move it or names
    /// a parent that does not exist.
    fn relinked(&self, patch: &BlockPatch, model: &Model) -> Option<Self>;

    fn apply_patch(&mut self, patch: &BlockPatch) {
        patch.apply_base(self.base_mut());
    }

    fn id(&self) -> &str {
        &self.base().id
    }

    fn original_id(&self) -> Option<&str> {
        self.base().original_id()
    }
}

impl Block for System {
    const LEVEL: ViewLevel = ViewLevel::System;

    fn base(&self) -> &BaseBlock {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBlock {
        &mut self.base
    }

    fn parent_id(&self) -> Option<&str> {
        None
    }

    fn collection(model: &Model) -> &Arc<Vec<Self>> {
        &model.systems
    }

    fn collection_mut(model: &mut Model) -> &mut Arc<Vec<Self>> {
        &mut model.systems
    }

    fn relinked(&self, _patch: &BlockPatch, _model: &Model) -> Option<Self> {
        None
    }
}

impl Block for Container {
    const LEVEL: ViewLevel = ViewLevel::Container;

    fn base(&self) -> &BaseBlock {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBlock {
        &mut self.base
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.system_id)
    }

    fn collection(model: &Model) -> &Arc<Vec<Self>> {
        &model.containers
    }

    fn collection_mut(model: &mut Model) -> &mut Arc<Vec<Self>> {
        &mut model.containers
    }

    fn relinked(&self, patch: &BlockPatch, model: &Model) -> Option<Self> {
        let system = model.system(patch.system_id.as_deref()?)?;
        Some(Container {
            system_id: system.base.id.clone(),
            ..self.clone()
        })
    }
}

impl Block for Component {
    const LEVEL: ViewLevel = ViewLevel::Component;

    fn base(&self) -> &BaseBlock {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBlock {
        &mut self.base
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.container_id)
    }

    fn collection(model: &Model) -> &Arc<Vec<Self>> {
        &model.components
    }

    fn collection_mut(model: &mut Model) -> &mut Arc<Vec<Self>> {
        &mut model.components
    }

    fn relinked(&self, patch: &BlockPatch, model: &Model) -> Option<Self> {
        let container = model.container(patch.container_id.as_deref()?)?;
        Some(Component {
            system_id: container.system_id.clone(),
            container_id: container.base.id.clone(),
            ..self.clone()
        })
    }
}

impl Block for CodeElement {
    const LEVEL: ViewLevel = ViewLevel::Code;

    fn base(&self) -> &BaseBlock {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseBlock {
        &mut self.base
    }

    fn parent_id(&self) -> Option<&str> {
        Some(&self.component_id)
    }

    fn collection(model: &Model) -> &Arc<Vec<Self>> {
        &model.code_elements
    }

    fn collection_mut(model: &mut Model) -> &mut Arc<Vec<Self>> {
        &mut model.code_elements
    }

    fn relinked(&self, patch: &BlockPatch, model: &Model) -> Option<Self> {
        let component = model.component(patch.component_id.as_deref()?)?;
        Some(CodeElement {
            system_id: component.system_id.clone(),
            container_id: component.container_id.clone(),
            component_id: component.base.id.clone(),
            ..self.clone()
        })
    }

    fn apply_patch(&mut self, patch: &BlockPatch) {
        patch.apply_base(&mut self.base);
        patch.apply_code(self);
    }
}

/// A borrowed entity of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    System(&'a System),
    Container(&'a Container),
    Component(&'a Component),
    CodeElement(&'a CodeElement),
}

impl<'a> EntityRef<'a> {
    pub fn level(&self) -> ViewLevel {
        match self {
            EntityRef::System(_) => ViewLevel::System,
            EntityRef::Container(_) => ViewLevel::Container,
            EntityRef::Component(_) => ViewLevel::Component,
            EntityRef::CodeElement(_) => ViewLevel::Code,
        }
    }

    pub fn base(&self) -> &'a BaseBlock {
        match *self {
            EntityRef::System(s) => &s.base,
            EntityRef::Container(c) => &c.base,
            EntityRef::Component(c) => &c.base,
            EntityRef::CodeElement(c) => &c.base,
        }
    }
}

// --- Flat model ---

/// One immutable snapshot of the four flat collections plus navigation.
///
/// Collections sit behind `Arc` so a snapshot can be cloned cheaply and the
/// store only copies the collections an operation actually touches. Consumers
/// can compare collections between snapshots with `Arc::ptr_eq`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub systems: Arc<Vec<System>>,
    pub containers: Arc<Vec<Container>>,
    pub components: Arc<Vec<Component>>,
    pub code_elements: Arc<Vec<CodeElement>>,
    #[serde(flatten)]
    pub navigation: Navigation,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Block>(&self, id: &str) -> Option<&T> {
        T::collection(self).iter().find(|b| b.id() == id)
    }

    pub fn system(&self, id: &str) -> Option<&System> {
        self.get(id)
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.get(id)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.get(id)
    }

    pub fn code_element(&self, id: &str) -> Option<&CodeElement> {
        self.get(id)
    }

    /// Every entity across the four collections, top level first.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.systems
            .iter()
            .map(EntityRef::System)
            .chain(self.containers.iter().map(EntityRef::Container))
            .chain(self.components.iter().map(EntityRef::Component))
            .chain(self.code_elements.iter().map(EntityRef::CodeElement))
    }

    /// Entities in any collection whose `original.id` is `id`.
    pub fn clones_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = EntityRef<'a>> + 'a {
        self.entities()
            .filter(move |e| e.base().original_id() == Some(id))
    }

    pub fn entity_count(&self) -> usize {
        self.systems.len() + self.containers.len() + self.components.len() + self.code_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count() == 0
    }
}
