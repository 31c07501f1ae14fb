pub mod command;
pub mod commands;
pub mod v1;
pub mod wallet;
