pub mod analyze;
pub mod detect;
pub mod init;
pub mod scan;
