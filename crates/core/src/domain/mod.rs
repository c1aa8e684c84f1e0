pub mod module;
pub mod plan;
pub mod provider;
