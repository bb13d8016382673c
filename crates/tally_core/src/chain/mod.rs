pub mod config;
pub mod resource;
pub mod resource_limits;
pub mod utils;

// Re-export types for easier access
pub mod name {
    pub use tally_name::Name;
}

pub use tally_error::ChainError;
