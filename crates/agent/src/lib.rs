//! Tally Agent - natural-language command interpretation and dispatch
//!
//! The only part of the system with non-trivial control flow:
//! 1. **Interpretation** (`interpreter`) - remote inference with retry,
//!    backoff, and failure classification, falling back to the
//!    deterministic rule matcher (`fallback`) when the endpoint is
//!    unavailable or returns garbage.
//! 2. **Gating** (`dispatch`) - confidence threshold and intent routing;
//!    an uncertain command never mutates the ledger.
//! 3. **Execution** (`executors`) - per-intent validation, derived-value
//!    computation, and a single atomic append with provenance stamped.
//! 4. **Session** (`runtime`) - FIFO processing of submissions and the
//!    append-only transcript.
//!
//! # Safety Principle
//!
//! The inference endpoint is strictly a translator. It never decides
//! amounts, levy math, or whether a record is created; those are
//! deterministic decisions made here, behind the confidence gate.

pub mod attachments;
pub mod dispatch;
pub mod executors;
pub mod fallback;
pub mod interpreter;
pub mod runtime;

pub use attachments::{AttachmentRef, AttachmentService, NoopAttachmentService, SuggestedFields};
pub use dispatch::{DispatchOutcome, Dispatcher, CONFIDENCE_THRESHOLD};
pub use executors::ExecutorError;
pub use interpreter::{
    CommandInterpreter, HttpInferenceClient, InferenceClient, InferenceError, Interpretation,
    InterpretationSource,
};
pub use runtime::{AgentRuntime, SubmissionResult};
