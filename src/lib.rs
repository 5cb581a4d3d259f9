#[cfg(feature = "providers")]
pub mod app;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod models;
pub mod nft;
pub mod storage;
