//! Domain models for the circulation server

pub mod actor;
pub mod copy;
pub mod enums;
pub mod hold;
pub mod ledger;
pub mod loan;
pub mod patron;
