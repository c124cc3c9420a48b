pub mod config;
pub mod logging;

pub mod auth;
pub mod backoff;
pub mod control;
pub mod handler;
pub mod processor;
pub mod session;
pub mod transport;
