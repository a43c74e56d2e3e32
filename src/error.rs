//! Fatal-error surface. Warnings are not modeled here; they are a side
//! effect emitted by `Machine::warn`, not a `Result::Err`.

use thiserror::Error;

/// A condition that ends interpretation: the caller (`main`) converts this
/// into a process exit, status 0 for `Quit` and status 1 for everything else.
#[derive(Debug, Error)]
pub enum FatalError {
    /// `J`'s forward scan ran off the end of input without finding `M`.
    #[error("mark not found")]
    MarkNotFound,

    /// The macro-execution stack could not grow.
    #[error("recursion too deep")]
    RecursionTooDeep,

    /// `q` invoked with fewer than two macro-execution frames remaining: a
    /// clean exit, not a failure. Propagated through the same channel as the
    /// variants above since opcode dispatch has no other way to unwind to
    /// `main`; callers must distinguish it before choosing an exit code.
    #[error("quit")]
    Quit,
}
