use crate::model::{BaseBlock, CodeElement, CodeType, ConnectionData, OriginalRef, Position};

/// Payload for creating an entity. The store assigns the id and parent keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBlock {
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub technology: Option<String>,
    pub position: Position,
    pub original: Option<OriginalRef>,
}

impl NewBlock {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_technology(mut self, technology: impl Into<String>) -> Self {
        self.technology = Some(technology.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Mark the new entity as a clone of `original_id`.
    pub fn clone_of(mut self, original_id: impl Into<String>) -> Self {
        self.original = Some(OriginalRef {
            id: original_id.into(),
        });
        self
    }

    pub(crate) fn into_base(self, id: String) -> BaseBlock {
        BaseBlock {
            id,
            name: self.name,
            description: self.description,
            url: self.url,
            technology: self.technology,
            position: self.position,
            original: self.original,
            connections: Vec::new(),
        }
    }
}

/// Fields only code elements carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeDetails {
    pub code_type: CodeType,
    pub language: Option<String>,
    pub code: Option<String>,
}

/// A partial update of an entity.
///
/// Outer `None` leaves a field untouched; for optional fields `Some(None)`
/// clears it. The parent keys move only the entity being updated and are
/// dropped by [`BlockPatch::shared`] before the patch reaches its clones.
/// Fields a kind does not have are ignored for that kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub url: Option<Option<String>>,
    pub technology: Option<Option<String>>,
    pub position: Option<Position>,
    pub code_type: Option<CodeType>,
    pub language: Option<Option<String>>,
    pub code: Option<Option<String>>,
    pub system_id: Option<String>,
    pub container_id: Option<String>,
    pub component_id: Option<String>,
}

impl BlockPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = Some(description.map(str::to_string));
        self
    }

    pub fn url(mut self, url: Option<&str>) -> Self {
        self.url = Some(url.map(str::to_string));
        self
    }

    pub fn technology(mut self, technology: Option<&str>) -> Self {
        self.technology = Some(technology.map(str::to_string));
        self
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn code_type(mut self, code_type: CodeType) -> Self {
        self.code_type = Some(code_type);
        self
    }

    pub fn language(mut self, language: Option<&str>) -> Self {
        self.language = Some(language.map(str::to_string));
        self
    }

    pub fn code(mut self, code: Option<&str>) -> Self {
        self.code = Some(code.map(str::to_string));
        self
    }

    pub fn system_id(mut self, id: impl Into<String>) -> Self {
        self.system_id = Some(id.into());
        self
    }

    pub fn container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }

    pub fn component_id(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    /// The part of the patch that is safe to copy onto clones: everything but
    /// the parent keys.
    pub fn shared(&self) -> BlockPatch {
        BlockPatch {
            system_id: None,
            container_id: None,
            component_id: None,
            ..self.clone()
        }
    }

    pub fn moves_parent(&self) -> bool {
        self.system_id.is_some() || self.container_id.is_some() || self.component_id.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == BlockPatch::default()
    }

    pub(crate) fn apply_base(&self, base: &mut BaseBlock) {
        if let Some(name) = &self.name {
            base.name = name.clone();
        }
        assign(&mut base.description, &self.description);
        assign(&mut base.url, &self.url);
        assign(&mut base.technology, &self.technology);
        if let Some(position) = self.position {
            base.position = position;
        }
    }

    pub(crate) fn apply_code(&self, element: &mut CodeElement) {
        if let Some(code_type) = self.code_type {
            element.code_type = code_type;
        }
        assign(&mut element.language, &self.language);
        assign(&mut element.code, &self.code);
    }
}

/// A partial update of one connection; same `None`/`Some(None)` convention as
/// [`BlockPatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionPatch {
    pub label: Option<Option<String>>,
    pub technology: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub source_handle: Option<Option<String>>,
    pub target_handle: Option<Option<String>>,
    pub label_position: Option<Option<f64>>,
    pub bidirectional: Option<Option<bool>>,
}

impl ConnectionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: Option<&str>) -> Self {
        self.label = Some(label.map(str::to_string));
        self
    }

    pub fn technology(mut self, technology: Option<&str>) -> Self {
        self.technology = Some(technology.map(str::to_string));
        self
    }

    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = Some(description.map(str::to_string));
        self
    }

    pub fn handles(mut self, source: Option<&str>, target: Option<&str>) -> Self {
        self.source_handle = Some(source.map(str::to_string));
        self.target_handle = Some(target.map(str::to_string));
        self
    }

    pub fn label_position(mut self, position: Option<f64>) -> Self {
        self.label_position = Some(position);
        self
    }

    pub fn bidirectional(mut self, bidirectional: Option<bool>) -> Self {
        self.bidirectional = Some(bidirectional);
        self
    }

    pub(crate) fn apply(&self, connection: &mut ConnectionData) {
        assign(&mut connection.label, &self.label);
        assign(&mut connection.technology, &self.technology);
        assign(&mut connection.description, &self.description);
        assign(&mut connection.source_handle, &self.source_handle);
        assign(&mut connection.target_handle, &self.target_handle);
        assign(&mut connection.label_position, &self.label_position);
        assign(&mut connection.bidirectional, &self.bidirectional);
    }
}

fn assign<T: Clone>(slot: &mut Option<T>, value: &Option<Option<T>>) {
    if let Some(value) = value {
        *slot = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_drops_parent_keys_only() {
        let patch = BlockPatch::new()
            .name("Renamed")
            .technology(Some("Rust"))
            .system_id("s2")
            .container_id("c2");
        let shared = patch.shared();
        assert!(patch.moves_parent());
        assert!(!shared.moves_parent());
        assert_eq!(shared.name.as_deref(), Some("Renamed"));
        assert_eq!(shared.technology, Some(Some("Rust".to_string())));
    }

    #[test]
    fn apply_base_sets_and_clears() {
        let mut base = NewBlock::named("A")
            .with_description("old")
            .with_url("https://example.com")
            .into_base("id-1".into());
        BlockPatch::new()
            .description(None)
            .position(3.0, 4.0)
            .apply_base(&mut base);
        assert_eq!(base.name, "A");
        assert_eq!(base.description, None);
        assert_eq!(base.url.as_deref(), Some("https://example.com"));
        assert_eq!(base.position, Position::new(3.0, 4.0));
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut base = NewBlock::named("A").into_base("id-1".into());
        let before = base.clone();
        assert!(BlockPatch::new().is_empty());
        BlockPatch::new().apply_base(&mut base);
        assert_eq!(base, before);
    }

    #[test]
    fn connection_patch_merges() {
        let mut connection = ConnectionData::to("b").with_label("uses");
        ConnectionPatch::new()
            .technology(Some("gRPC"))
            .bidirectional(Some(true))
            .apply(&mut connection);
        assert_eq!(connection.label.as_deref(), Some("uses"));
        assert_eq!(connection.technology.as_deref(), Some("gRPC"));
        assert_eq!(connection.bidirectional, Some(true));
        assert_eq!(connection.target_id, "b");
    }
}
