pub mod client;
pub mod stream;

pub use client::{HttpEventStream, KesClient};
pub use stream::{CloseHandle, EventStream, StreamError, TraceRecord};
