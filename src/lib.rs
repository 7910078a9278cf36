pub mod actions;
pub mod api;
pub mod config;
pub mod drilldown;
pub mod errors;
pub mod flex_id;
pub mod handlers;
pub mod menu;
pub mod poster_grid;
pub mod scrape;
pub mod session;
pub mod setup;
pub mod store;
pub mod ui;
