pub mod command;
pub mod login;
pub mod partner;
pub mod vehicle;
