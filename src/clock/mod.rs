// Clock module - WHEN THINGS HAPPENED
// Lamport clock for loose causal ordering between peers

mod lamport;

pub use lamport::LamportClock;
