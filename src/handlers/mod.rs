pub mod commands;
pub mod discord;
pub mod events;
pub mod router;
