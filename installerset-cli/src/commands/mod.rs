pub mod install;
pub mod phases;
pub mod ready;
