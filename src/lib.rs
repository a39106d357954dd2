// Client-side core for the partner case dashboard. Headless: the embedding
// UI owns navigation, rendering, and session storage.
pub mod config;
pub mod identity;
pub mod logging;
pub mod lookup;
pub mod poller;
pub mod projection;
pub mod resolve;
pub mod session;
