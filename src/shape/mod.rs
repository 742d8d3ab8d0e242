//! Pure transformation functions from raw provider payloads to response
//! shapes. Nothing in here does IO; everything is unit testable from
//! fixtures.

pub mod chain;
pub mod expiry;
pub mod quote;
pub mod search;
pub mod validate;
pub mod volatility;
