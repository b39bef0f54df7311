//! Feature modules, leaves first:
//! identity -> technology -> records -> usage -> snapshot -> database

pub mod database;
pub mod identity;
pub mod records;
pub mod snapshot;
pub mod technology;
pub mod usage;
