pub mod clock;
pub mod cues;
pub mod engine;
pub mod ledger;
#[allow(clippy::module_inception)]
pub mod pomodoro;
