pub mod auth;
pub mod batch;
pub mod client;
pub mod config;
pub mod grid;
pub mod metric;
pub mod resample;
pub mod resolution;
pub mod search;
pub mod transport;
pub use auth::{Credential, CredentialCache, CredentialProvider};
pub use client::{QueryClient, QueryError, SeriesMap, TimeInfo};
pub use config::{Config, SubmetricAlias};
pub use metric::{DataKey, LeafNode};
pub use resolution::Resolution;
pub use transport::{http::HttpTransport, Transport};

mod fetch;
mod session;
