mod app;
mod components;
mod screens;
mod search_flow;
mod theme;

pub use app::App;
