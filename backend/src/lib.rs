pub mod admin;
pub mod auth;
pub mod category;
pub mod config;
pub mod db;
pub mod email;
pub mod geo;
pub mod listing;
pub mod message;
pub mod models;
pub mod offer;
pub mod report;
pub mod review;
pub mod saved;
pub mod schema;
pub mod sweep;
pub mod upload;
pub mod user;
