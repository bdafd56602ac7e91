//! Roles, application modules and actions checked by the permission gate.

pub mod action;
pub mod module;
pub mod role;

pub use action::Action;
pub use module::Module;
pub use role::Role;
