pub mod ask;
pub mod clear;
pub mod init;
pub mod migrate;
pub mod serve;
