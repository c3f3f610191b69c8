pub mod app;
pub mod components;
pub mod controller;
pub mod feed;
pub mod headless;
pub mod notify;
pub mod theme;
