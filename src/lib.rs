pub mod access;
pub mod app;
pub mod assignments;
pub mod auth;
pub mod config;
pub mod courses;
pub mod discussions;
pub mod enrollment;
pub mod error;
pub mod state;
pub mod storage;
