pub mod catalog;
pub mod deploy;
pub mod general;
pub mod register;

pub use catalog::{fetchimages, fetchnodes};
pub use deploy::deploy;
pub use general::{help, ping};
pub use register::register;
