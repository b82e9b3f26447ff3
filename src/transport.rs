//! HTTP transport shared by every network client in the crate.

mod http;

pub(crate) use http::{stream_to_file, truncate, write_atomically};

pub use http::{HttpTransport, TransportError};
