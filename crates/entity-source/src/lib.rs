//! Access to the published reporting entities.
//!
//! [`HttpEntityRepository`] performs blocking requests against the data bucket;
//! [`BackgroundLoader`] runs those requests on worker threads so lazily
//! materialized children never stall the event loop.

mod http;
mod worker;

pub use http::{
    DEFAULT_DATA_ROOT, DEFAULT_INDEX_PATH, Endpoints, HttpEntityRepository, SourceError,
    classify_status, decode,
};
pub use worker::BackgroundLoader;
