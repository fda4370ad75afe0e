pub mod app;
pub mod blocking;
pub mod config;
pub mod error;
pub mod pomodoro;
pub mod storage;
pub mod ws;
