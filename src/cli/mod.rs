pub mod commands;

pub use commands::{CliArgs, UpdateChannelArg};
