//! Adapter implementations of the ports.

pub mod http_credentials;
pub mod http_rail;
pub mod memory;
pub mod postgres;
pub mod static_credentials;
pub mod stub_rail;

pub use http_credentials::HttpCredentials;
pub use http_rail::HttpRail;
pub use memory::InMemoryTransactionRepository;
pub use postgres::PostgresTransactionRepository;
pub use static_credentials::StaticCredentials;
pub use stub_rail::StubRail;
