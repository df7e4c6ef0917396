//! Resumable validator provisioning.
//!
//! Drives a batch of validators from creation at the provisioning service,
//! through registration on the validator network, to funded beacon deposits.
//!
//! ```text
//! run_registration
//!   (empty) ──create──► CREATION_ISSUED ──poll status──► CREATION_CONFIRMED
//!           ──register──► REGISTER_BROADCAST ──receipt──► REGISTERED
//!
//! run_staking
//!   REGISTERED ──deposit data──► DEPOSIT_DATA_GOT
//!           ──front-run guard, stake──► DEPOSIT_BROADCAST ──receipt──► (cleared)
//! ```
//!
//! All progress lives in one persisted [`WorkflowState`]. Every step is
//! written before the next begins, so an invocation can stop anywhere and the
//! next one resumes from the last written phase without repeating a create
//! or a broadcast that already happened.

mod accountant;
mod capacity;
mod error;
mod events;
mod guard;
mod machine;
mod runner;
mod saga;
mod slot;
mod state;

pub use accountant::{DEFAULT_ERROR_THRESHOLD, ErrorAccountant, FailureRecord};
pub use capacity::{CapacitySnapshot, compute_stakeable_validator_count};
pub use error::SagaError;
pub use events::{ChannelNotifier, ClearReason, NoopNotifier, SagaEvent, SagaNotifier};
pub use guard::{DEFAULT_WINDOW_BLOCKS, FrontRunGuard, GuardError};
pub use machine::{Effect, Event, Transition, TransitionError, transition};
pub use runner::{SagaRunner, Trigger, TriggerOutcome};
pub use saga::{Collaborators, RegistrationOutcome, StakingOutcome, ValidatorProvisioningSaga};
pub use slot::StateSlot;
pub use state::{Phase, PhaseKind, STATE_KEY, WorkflowState};
