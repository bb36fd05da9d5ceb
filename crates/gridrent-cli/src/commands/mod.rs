pub mod config;
pub mod estimate;
pub mod gpu;
pub mod jobs;
pub mod ls;
pub mod provider;
pub mod submit;
