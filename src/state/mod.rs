pub mod catalog;
pub mod sessions;

pub use catalog::{create_shared_catalog_store, CatalogKind, ImageDescriptor, SharedCatalogStore};
pub use sessions::ActiveSessions;
