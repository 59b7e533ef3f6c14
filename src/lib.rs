pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod feed;
pub mod health;
pub mod json_util;
pub mod live;
pub mod normalize;
pub mod recorder;
pub mod shutdown;
pub mod standings;
pub mod standings_request;
pub mod status;
pub mod timeline;
pub mod types;
