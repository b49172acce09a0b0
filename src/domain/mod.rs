//! Domain types - descriptors and records independent of how the backend is invoked

pub mod commit;
pub mod publish;
pub mod repository;
pub mod version;

pub use commit::{Changeset, Commit, CommitProperty, Phase};
pub use publish::PublishRequest;
pub use repository::{Repository, DEFAULT_BRANCH};
pub use version::Version;
