//! HTTP surface: protocol adapters, dispatcher, auth and routing

pub mod adapters;
pub mod api;
pub mod auth;
pub mod dispatch;
