// Object storage layer: where the notified files actually live.

pub mod s3;
pub mod traits;

pub use s3::S3ObjectStore;
pub use traits::{FetchError, ObjectStore};
