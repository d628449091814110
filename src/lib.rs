// Configuration loading
pub mod config;

// JSON command console
pub mod console;

// System log capability
pub mod journal;

// Rover state machine
pub mod kernel;

// Status report and instruction wire formats
pub mod protocol;

// Received instruction buffer
pub mod queue;

// Photo archive, downlink and animation boundaries
pub mod uplink;
