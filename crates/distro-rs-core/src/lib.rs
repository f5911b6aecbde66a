pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;
pub use config::ResolverContext;

pub mod version;
pub use version::Version;

pub mod artifact;
pub use artifact::Artifact;

pub mod descriptor;
pub use descriptor::Descriptor;

pub mod collaborator;
pub mod resolver;
pub use resolver::DistroResolver;

pub mod differential;
pub use differential::UpgradeDifferential;
pub use differential::calculate_update_differential;

pub mod reconcile;
pub mod server;
pub use server::ServerInstance;
