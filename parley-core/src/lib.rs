//! A chat-bot command framework: a registry of commands with typed, interactively prompted
//! arguments, and a dispatcher that turns chat messages (and edits of them) into command runs.
//!
//! The chat service itself stays behind the [`transport::Transport`] trait and settings storage
//! behind [`settings::SettingProvider`]. Everything else hangs off a [`parley::Parley`].

pub mod command;
pub mod dispatch;
pub mod events;
pub mod parley;
pub mod settings;
pub mod transport;

#[cfg(test)]
mod test_util;

pub use self::parley::{Parley, ThreadSafeParley};
