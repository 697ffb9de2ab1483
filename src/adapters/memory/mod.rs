pub mod credential_repo;
pub mod token_store;

pub use credential_repo::MemoryCredentialRepository;
pub use token_store::MemoryTokenStore;
