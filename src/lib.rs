//! VastlyWise - admin and content management backend
//!
//! This library provides the HTTP API, persistence and services behind the
//! VastlyWise site: accounts, posts and comments, taxonomy, uploads,
//! notifications, settings, analytics, the admin dashboard and website
//! previews.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
