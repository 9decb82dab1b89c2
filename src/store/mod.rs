pub mod backend;
pub mod github;
pub mod types;
