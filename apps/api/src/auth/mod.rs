pub mod handlers;
pub mod passwords;
pub mod service;
pub mod sessions;
