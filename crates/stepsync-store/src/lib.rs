pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::AccountStore;
pub use types::{AccountPatch, NewAccount, Statistics};
