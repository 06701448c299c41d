//! CouchDB-backed buzzer store.
//!
//! CouchDB's MVCC `_rev` token is exactly the conditional-write primitive the
//! lock needs: a `PUT` carrying a stale revision fails with 409, which maps
//! onto [`CasOutcome::Conflict`](super::CasOutcome).

mod config;
mod error;
mod store;

pub use config::CouchConfig;
pub use error::{CouchDaoError, CouchResult};
pub use store::CouchBuzzerStore;
