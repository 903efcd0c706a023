pub mod catalog_manager;
pub mod deploy_manager;
pub mod private_channels;
pub mod registration_manager;

pub use catalog_manager::{create_shared_catalog_manager, SharedCatalogManager};
pub use deploy_manager::{create_shared_deploy_manager, SharedDeployManager};
pub use registration_manager::RegistrationSettings;
