// Application layer: ledger components and the service facade over them.

mod accounts;
mod entries;
mod error;
mod service;
mod transfer;

pub use accounts::*;
pub use entries::*;
pub use error::*;
pub use service::*;
pub use transfer::*;
