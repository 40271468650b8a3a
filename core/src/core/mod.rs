pub mod control;
pub mod path;
pub mod patient;
pub mod payload;
pub mod shared_state;

// Re-export key types for easier access from other carepath modules (and lib.rs)
pub use control::{SaveOutcome, StepAdvance, StepBlock};
pub use patient::{Patient, Visit};
pub use payload::StepPayload;
pub use shared_state::SharedState;
