pub mod manager;
pub mod read;
pub mod snapshot;
pub mod transaction;
