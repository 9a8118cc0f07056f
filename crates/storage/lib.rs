mod store;

pub mod error;
pub use store::{Store, hash_address};
