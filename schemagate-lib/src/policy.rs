//! Exit-code policy: the only caller-visible side effect besides the report.

use schemagate_core::{
    models::report::{GateStatus, ValidationReport},
    GateError,
};

pub const EXIT_PASS: i32 = 0;
pub const EXIT_FAIL: i32 = 1;
pub const EXIT_INVOCATION: i32 = 2;

pub fn exit_code(overall: GateStatus) -> i32 {
    match overall {
        GateStatus::Fail => EXIT_FAIL,
        GateStatus::Pass | GateStatus::Skip => EXIT_PASS,
    }
}

/// Any error that reaches the caller is structural: bad arguments, or no
/// artifacts and no fallback.
pub fn error_exit_code(_err: &GateError) -> i32 {
    EXIT_INVOCATION
}

pub fn outcome(result: &Result<ValidationReport, GateError>) -> i32 {
    match result {
        Ok(report) => exit_code(report.overall_status),
        Err(err) => error_exit_code(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_to_exit_code() {
        assert_eq!(exit_code(GateStatus::Pass), 0);
        assert_eq!(exit_code(GateStatus::Fail), 1);
        assert_eq!(exit_code(GateStatus::Skip), 0);
    }

    #[test]
    fn errors_exit_with_two() {
        let empty = GateError::DiscoveryEmpty { searched: vec![] };
        assert_eq!(outcome(&Err(empty)), 2);
        assert_eq!(error_exit_code(&GateError::Invocation("--live and --snapshot".into())), 2);
    }
}
