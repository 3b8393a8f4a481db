pub mod api;
pub mod config;
pub mod data_models;
pub mod error;
pub mod feed;
pub mod fetcher;
