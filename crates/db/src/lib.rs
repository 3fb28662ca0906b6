pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoHcp, DemoHcpDataset, SeedResult, VerificationResult};
pub use repositories::{
    HcpRepository, InMemoryStore, InteractionRepository, Repositories, RepositoryError,
    ToolRunRepository,
};
