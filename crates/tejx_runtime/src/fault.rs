use thiserror::Error;

/// Fault raised by a host import. Ends the run and surfaces as an `Error:` line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostFault {
    #[error("Exception: {0}")]
    Thrown(String),
    #[error("Division by zero")]
    DivisionByZero,
    /// A host function panicked; the run ends instead of the host process.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Message for a failed instantiation or entry-point call.
pub fn fault_message(err: &anyhow::Error) -> String {
    if let Some(fault) = err.downcast_ref::<HostFault>() {
        return fault.to_string();
    }
    if let Some(trap) = err.downcast_ref::<wasmtime::Trap>() {
        if *trap == wasmtime::Trap::IntegerDivisionByZero {
            return HostFault::DivisionByZero.to_string();
        }
        return trap.to_string();
    }
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_faults_keep_their_text() {
        let err = anyhow::Error::new(HostFault::Thrown("boom".to_string()));
        assert_eq!(fault_message(&err), "Exception: boom");
        let err = anyhow::Error::new(HostFault::DivisionByZero).context("while calling main");
        assert_eq!(fault_message(&err), "Division by zero");
    }

    #[test]
    fn integer_division_trap_uses_fixed_message() {
        let err = anyhow::Error::new(wasmtime::Trap::IntegerDivisionByZero);
        assert_eq!(fault_message(&err), "Division by zero");
    }

    #[test]
    fn other_errors_use_display() {
        let err = anyhow::anyhow!("link failed");
        assert_eq!(fault_message(&err), "link failed");
    }
}
