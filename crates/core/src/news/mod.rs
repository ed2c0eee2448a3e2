pub mod extract;
pub mod provider;
pub mod types;
