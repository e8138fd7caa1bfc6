//! Core of the C4 diagram editor: a flat store of systems, containers,
//! components and code elements, the navigation state that decides which level
//! is on screen, and the JSON document the whole model is saved as.
//!
//! ```
//! use c4_core::{ConnectionData, NewBlock, Store};
//!
//! let mut store = Store::new();
//! let shop = store.add_system(NewBlock::named("Shop")).unwrap();
//! let bank = store.add_system(NewBlock::named("Bank")).unwrap();
//! store.connect_systems(&shop, ConnectionData::to(&bank).with_label("pays via"));
//! store.set_active_system(Some(&shop));
//!
//! let text = store.export_model().unwrap();
//! let mut copy = Store::new();
//! assert!(copy.import_model(&text));
//! assert_eq!(copy.model(), store.model());
//! ```

pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod navigation;
pub mod patch;
pub mod settings;
pub mod storage;
pub mod store;
pub mod view;

pub use document::{Document, SCHEMA_VERSION};
pub use error::{DocumentError, StorageError};
pub use id::{IdGenerator, SequentialIds, UuidIds};
pub use model::{
    BaseBlock, Block, CodeElement, CodeType, Component, ConnectionData, Container, EntityRef,
    Model, OriginalRef, Position, System, ViewLevel,
};
pub use navigation::{History, HistoryEntry, Navigation};
pub use patch::{BlockPatch, CodeDetails, ConnectionPatch, NewBlock};
pub use settings::Settings;
pub use storage::Storage;
pub use store::{Store, SubscriptionId};
pub use view::{in_view, InView};
