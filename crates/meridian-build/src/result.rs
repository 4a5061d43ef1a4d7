//! Interpretation of evaluation results under the keep-going policy

use tracing::warn;

use meridian_core::{BuildError, EvaluationResult, Result};

use crate::evaluator::CycleReporter;

/// Process one evaluation result, taking into account the keep-going setting.
///
/// Cycles are always reported first, whatever the policy. Returns `Ok(false)`
/// if evaluation failed but the build should continue, `Ok(true)` on success.
/// Fails fast otherwise: with a build failure if any cycle was found, or with
/// the first failure's own cause so its kind survives.
pub fn process_result<R>(result: EvaluationResult, keep_going: bool, reporter: &R) -> Result<bool>
where
    R: CycleReporter + ?Sized,
{
    if !result.has_error() {
        return Ok(true);
    }

    let mut has_cycles = false;
    for (key, info) in &result.errors {
        reporter.report_cycles(&info.cycles, key);
        has_cycles |= info.has_cycles();
    }

    if keep_going {
        warn!(failed_nodes = result.errors.len(), has_cycles, "evaluation failed, continuing");
        return Ok(false);
    }

    if has_cycles {
        return Err(BuildError::build_failed());
    }

    let first_cause = result
        .errors
        .into_iter()
        .next()
        .and_then(|(_, info)| info.cause);
    match first_cause {
        Some(cause) => Err(cause.into()),
        None => Err(BuildError::Internal(anyhow::anyhow!(
            "evaluation failed without a recorded cause"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingCycleReporter;
    use meridian_core::{Artifact, CycleInfo, ErrorInfo, FailureCause, NodeKey};

    fn cycle() -> CycleInfo {
        let a: NodeKey = Artifact::derived("a").into();
        let b: NodeKey = Artifact::derived("b").into();
        CycleInfo::new(vec![], vec![a, b])
    }

    fn action_failure(message: &str) -> ErrorInfo {
        ErrorInfo::from_cause(FailureCause::ActionFailed(message.to_string()))
    }

    #[test]
    fn test_success() {
        let reporter = CollectingCycleReporter::default();
        let result = EvaluationResult::success(vec![Artifact::derived("out")]);

        assert!(process_result(result, false, &reporter).unwrap());
        assert!(reporter.reports().is_empty());
    }

    #[test]
    fn test_keep_going_absorbs_failure() {
        let reporter = CollectingCycleReporter::default();
        let result =
            EvaluationResult::default().with_error(Artifact::derived("out"), action_failure("x"));

        assert!(!process_result(result, true, &reporter).unwrap());
        // Every failed node is forwarded, even without cycles.
        assert_eq!(reporter.reports().len(), 1);
        assert!(reporter.reports()[0].0.is_empty());
    }

    #[test]
    fn test_keep_going_reports_cycles_without_failing() {
        let reporter = CollectingCycleReporter::default();
        let result = EvaluationResult::default()
            .with_error(Artifact::derived("a"), ErrorInfo::from_cycles(vec![cycle()]));

        assert!(!process_result(result, true, &reporter).unwrap());
        assert_eq!(reporter.cycle_count(), 1);
    }

    #[test]
    fn test_fail_fast_cycle_is_build_failure() {
        let reporter = CollectingCycleReporter::default();
        let result = EvaluationResult::default()
            .with_error(Artifact::derived("out"), action_failure("first"))
            .with_error(Artifact::derived("a"), ErrorInfo::from_cycles(vec![cycle()]));

        let err = process_result(result, false, &reporter).unwrap_err();
        assert!(matches!(err, BuildError::BuildFailed { message: None }));
        assert_eq!(reporter.reports().len(), 2);
        assert_eq!(reporter.cycle_count(), 1);
    }

    #[test]
    fn test_fail_fast_rethrows_first_cause() {
        let reporter = CollectingCycleReporter::default();
        let result = EvaluationResult::default()
            .with_error(
                Artifact::derived("test.status"),
                ErrorInfo::from_cause(FailureCause::TestFailed("//t:t".to_string())),
            )
            .with_error(Artifact::derived("out"), action_failure("second"));

        let err = process_result(result, false, &reporter).unwrap_err();
        assert!(matches!(err, BuildError::TestExecution(ref m) if m == "//t:t"));
    }

    #[test]
    fn test_fail_fast_without_cause_is_internal() {
        let reporter = CollectingCycleReporter::default();
        let result =
            EvaluationResult::default().with_error(Artifact::derived("out"), ErrorInfo::default());

        let err = process_result(result, false, &reporter).unwrap_err();
        assert!(matches!(err, BuildError::Internal(_)));
    }
}
