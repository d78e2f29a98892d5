pub mod anchor_layout;
pub mod attachment;
pub mod config;
pub mod drag;
pub mod profile;
pub mod reply;
pub mod retry;
pub mod transcript;
pub mod typing;
