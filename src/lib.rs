pub mod asset;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod prefetch;
pub mod savefile;
