pub mod api;
mod app;
mod cli;
mod commands;
pub mod config;
pub mod feed;
pub mod navigation;
mod redact;
pub mod session;
pub mod state;
pub mod types;

pub use redact::redact_secrets;

pub fn run() -> std::process::ExitCode {
    app::run()
}
