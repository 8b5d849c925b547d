//! State carried through one crawl iteration
//!
//! # Components
//!
//! - `Source`: which queue a URL was popped from
//! - `FetchStatus`: how the last fetch of a URL ended
//! - `DocumentMeta`: the in-flight descriptor of one crawl attempt
//! - `FetchedPage`: the HTTP response attached to a `DocumentMeta`

mod meta;
mod status;

// Re-export main types
pub use meta::{DocumentMeta, FetchedPage};
pub use status::{FetchStatus, Source};
