//! Id generation for new entities.
//!
//! Ids are unique across all four collections, so a generator sees the whole
//! model rather than a single collection.

use uuid::Uuid;

use crate::model::Model;

pub trait IdGenerator {
    fn next_id(&mut self, model: &Model) -> String;
}

/// Random v4 UUIDs. The default for interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self, _model: &Model) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Readable `"{prefix}-{N}"` ids with N one past the largest already in use,
/// whether issued by this generator or found in the model.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    last: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last: 0,
        }
    }

    fn number_of(&self, id: &str) -> Option<u64> {
        id.strip_prefix(self.prefix.as_str())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("node")
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, model: &Model) -> String {
        let max = model
            .entities()
            .filter_map(|e| self.number_of(&e.base().id))
            .max()
            .unwrap_or(0);
        self.last = self.last.max(max) + 1;
        format!("{}-{}", self.prefix, self.last)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{BaseBlock, System};

    #[test]
    fn sequential_ids_skip_past_existing() {
        let model = Model {
            systems: Arc::new(vec![System {
                base: BaseBlock {
                    id: "node-7".into(),
                    ..BaseBlock::default()
                },
            }]),
            ..Model::default()
        };
        let mut ids = SequentialIds::default();
        assert_eq!(ids.next_id(&model), "node-8");
        assert_eq!(ids.next_id(&model), "node-9");
        assert_eq!(ids.next_id(&Model::default()), "node-10");
    }

    #[test]
    fn sequential_ids_ignore_foreign_prefixes() {
        let mut ids = SequentialIds::new("sys");
        assert_eq!(ids.next_id(&Model::default()), "sys-1");
        assert_eq!(ids.number_of("node-4"), None);
        assert_eq!(ids.number_of("sys-x"), None);
    }

    #[test]
    fn uuid_ids_differ() {
        let mut ids = UuidIds;
        let model = Model::default();
        assert_ne!(ids.next_id(&model), ids.next_id(&model));
    }
}
