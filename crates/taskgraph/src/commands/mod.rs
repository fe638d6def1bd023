//! Command implementations that work on the project directory rather than
//! on tasks.

pub mod init;
