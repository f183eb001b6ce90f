pub mod channel;
pub mod daemon;
pub mod lock;
pub mod scheduler;
