//! Directory API access: transport, schema-compat shim, and pagination.
//!
//! - **Client**: typed endpoint access over a swappable transport via
//!   [`client::DirectoryClient`]
//! - **Shim**: outbound payload rewrites for the remote's schema drift via
//!   [`shim::transform`]
//! - **Pages**: cursor-order collection walking via [`pages::Paginator`]

pub mod client;
pub mod pages;
pub mod shim;

// Re-export commonly used types
pub use client::{
    ClientConfig, DirectoryClient, DirectoryTransport, HttpTransport, LinkedPage, SearchPage,
    TransportError,
};
pub use pages::{CollectionFetch, Paginator, StreamStatus, DEFAULT_PAGE_DELAY};
