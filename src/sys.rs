pub mod display_server;
#[cfg(target_os = "macos")]
pub mod skylight;
