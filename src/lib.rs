//! Bookshelf - a small library catalog
//!
//! Books, authors and libraries behind a JSON API and server-rendered pages,
//! with session authentication and role-based access.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod web;
