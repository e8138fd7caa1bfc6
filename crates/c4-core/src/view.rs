//! The slice of the model a diagram shows for the current navigation state.
//!
//! At the system level every system is shown. Below that, an entity is shown
//! only when its immediate parent key equals the active id one level up, so
//! orphans and entities under other parents simply never appear.

use crate::model::{
    BaseBlock, Block, CodeElement, Component, ConnectionData, Container, Model, System, ViewLevel,
};

#[derive(Debug, Clone, PartialEq)]
pub enum InView<'a> {
    Systems(Vec<&'a System>),
    Containers(Vec<&'a Container>),
    Components(Vec<&'a Component>),
    CodeElements(Vec<&'a CodeElement>),
}

impl<'a> InView<'a> {
    pub fn level(&self) -> ViewLevel {
        match self {
            InView::Systems(_) => ViewLevel::System,
            InView::Containers(_) => ViewLevel::Container,
            InView::Components(_) => ViewLevel::Component,
            InView::CodeElements(_) => ViewLevel::Code,
        }
    }

    pub fn blocks(&self) -> Vec<&'a BaseBlock> {
        match self {
            InView::Systems(items) => items.iter().map(|&b| b.base()).collect(),
            InView::Containers(items) => items.iter().map(|&b| b.base()).collect(),
            InView::Components(items) => items.iter().map(|&b| b.base()).collect(),
            InView::CodeElements(items) => items.iter().map(|&b| b.base()).collect(),
        }
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.blocks().into_iter().map(|b| b.id.as_str()).collect()
    }

    /// Edges between visible entities as `(source id, connection)`. Edges to
    /// entities that are missing or not in view are skipped.
    pub fn edges(&self) -> Vec<(&'a str, &'a ConnectionData)> {
        let blocks = self.blocks();
        let visible: Vec<&str> = blocks.iter().map(|&b| b.id.as_str()).collect();
        blocks
            .into_iter()
            .flat_map(|b| b.connections.iter().map(move |c| (b.id.as_str(), c)))
            .filter(|(_, c)| visible.contains(&c.target_id.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        match self {
            InView::Systems(items) => items.len(),
            InView::Containers(items) => items.len(),
            InView::Components(items) => items.len(),
            InView::CodeElements(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn in_view(model: &Model) -> InView<'_> {
    let nav = &model.navigation;
    match nav.view_level {
        ViewLevel::System => InView::Systems(model.systems.iter().collect()),
        ViewLevel::Container => InView::Containers(children(
            &model.containers,
            nav.active_id(ViewLevel::System),
        )),
        ViewLevel::Component => InView::Components(children(
            &model.components,
            nav.active_id(ViewLevel::Container),
        )),
        ViewLevel::Code => InView::CodeElements(children(
            &model.code_elements,
            nav.active_id(ViewLevel::Component),
        )),
    }
}

fn children<'a, T: Block>(items: &'a [T], parent: Option<&str>) -> Vec<&'a T> {
    let Some(parent) = parent else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|b| b.parent_id() == Some(parent))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;
    use crate::patch::NewBlock;
    use crate::store::Store;

    #[test]
    fn system_level_shows_every_system() {
        let mut store = Store::new().with_ids(SequentialIds::default());
        let a = store.add_system(NewBlock::named("A")).unwrap();
        store.add_system(NewBlock::named("B"));
        store.add_container(&a, NewBlock::named("C"));
        let view = in_view(store.model());
        assert_eq!(view.level(), ViewLevel::System);
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn lower_levels_filter_by_active_parent() {
        let mut store = Store::new().with_ids(SequentialIds::default());
        let a = store.add_system(NewBlock::named("A")).unwrap();
        let b = store.add_system(NewBlock::named("B")).unwrap();
        let c1 = store.add_container(&a, NewBlock::named("C1")).unwrap();
        let c2 = store.add_container(&a, NewBlock::named("C2")).unwrap();
        store.add_container(&b, NewBlock::named("Elsewhere"));
        store.connect_containers(&c1, ConnectionData::to(&c2));
        store.connect_containers(&c1, ConnectionData::to("missing"));

        store.set_active_system(Some(&a));
        let view = in_view(store.model());
        assert_eq!(view.level(), ViewLevel::Container);
        assert_eq!(view.ids(), vec![c1.as_str(), c2.as_str()]);
        let edges = view.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].0, c1.as_str());
        assert_eq!(edges[0].1.target_id, c2);
    }

    #[test]
    fn orphans_and_missing_parents_show_nothing() {
        let mut store = Store::new().with_ids(SequentialIds::default());
        let a = store.add_system(NewBlock::named("A")).unwrap();
        store.add_container(&a, NewBlock::named("C"));
        store.remove_system(&a);

        store.set_view_level(ViewLevel::Container);
        assert!(in_view(store.model()).is_empty());
        store.set_active_system(Some(&a));
        // the container is orphaned but still keyed to the removed system
        assert_eq!(in_view(store.model()).len(), 1);
        store.set_active_system(Some("ghost"));
        assert!(in_view(store.model()).is_empty());
    }
}
