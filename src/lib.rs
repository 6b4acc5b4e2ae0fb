pub mod commands;
pub mod components;
pub mod config;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod lifecycle;
pub mod lock;
pub mod marker;
pub mod paths;
pub mod profiles;
pub mod switch;
pub mod ui;

pub use error::{ErrorKind, ProfileError, Result};
pub use lifecycle::Lifecycle;
pub use switch::{SwitchOutcome, Switcher};

#[cfg(test)]
pub mod test_utils;
