//! MongoDB access layer

pub mod mongo;

pub use mongo::{IntoIndexes, MongoClient};
