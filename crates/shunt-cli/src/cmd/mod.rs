pub mod daemon;
pub mod down;
pub mod init;
pub mod logs;
pub mod run;
pub mod status;
pub mod up;
