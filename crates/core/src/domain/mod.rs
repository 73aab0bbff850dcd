pub mod command;
pub mod record;
pub mod transcript;
