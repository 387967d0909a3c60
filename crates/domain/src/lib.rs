//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod operation;
mod role;
mod security;

pub use operation::{
    CatalogEntry, OperationKey, OperationKind, validate_module_path, validate_segment,
};
pub use role::Role;
pub use security::{PermissionEntry, PermissionSet};
