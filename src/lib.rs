pub mod app;
pub mod audit;
pub mod config;
pub mod web;
