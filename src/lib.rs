//! Area window server core.
//!
//! Window clipping, dirty tracking and the client update protocol of a
//! compositing window server, plus the desktop that stacks windows and the
//! per-window threads that serve their clients.

pub mod config;
pub mod decorator;
pub mod desktop;
pub mod engine;
pub mod errors;
pub mod link;
pub mod locking;
pub mod region;
pub mod server_window;
pub mod shared;
pub mod view;
pub mod window;

#[cfg(test)]
mod testing;

pub use desktop::Desktop;
pub use errors::{ServerError, ServerResult};
pub use server_window::ServerWindow;
pub use window::Window;
