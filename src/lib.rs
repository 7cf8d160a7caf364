pub mod api;
pub mod fetcher;
pub mod merger;
pub mod models;
pub mod pipeline;
pub mod ranker;
pub mod report;
pub mod schema;
pub mod store;
