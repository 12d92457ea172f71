pub mod angles;
pub mod config;
pub mod pipeline;
pub mod pose;
pub mod protocol;
pub mod robot;
pub mod sender;
