//! Pure decision logic of the alert state machine.
//!
//! Per endpoint the machine has three states: HEALTHY (counter 0, no open
//! alert), DEGRADING (0 < counter < threshold, no open alert) and ALERTING
//! (an open TRIGGERED alert). DOWN/TIMEOUT results increment the counter;
//! the rising edge fires when the incremented counter reaches the threshold
//! while no alert is open. An UP result zeroes the counter and, if an alert
//! is open, resolves it on the same transition.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointHealth {
    Healthy,
    Degrading,
    Alerting,
}

/// Current state from the persisted counter and open-alert existence.
pub fn health(consecutive_fails: i32, has_open_alert: bool) -> EndpointHealth {
    if has_open_alert {
        EndpointHealth::Alerting
    } else if consecutive_fails > 0 {
        EndpointHealth::Degrading
    } else {
        EndpointHealth::Healthy
    }
}

/// Rising-edge test, evaluated after the counter increment has been
/// persisted. Uses `>=` so a late duplicate failure past the threshold
/// cannot re-trigger: the open-alert guard wins.
pub fn on_failure(fails_after_increment: i32, threshold: i32, has_open_alert: bool) -> bool {
    fails_after_increment >= threshold && !has_open_alert
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Counter already 0 and nothing open: steady healthy state.
    Nothing,
    /// Counter was non-zero but no alert had opened yet.
    ResetCounter,
    /// Falling edge: zero the counter and resolve the open alert together.
    ResetAndResolve,
}

/// Falling-edge test for an UP result.
pub fn on_success(prior_fails: i32, has_open_alert: bool) -> RecoveryAction {
    if prior_fails == 0 && !has_open_alert {
        RecoveryAction::Nothing
    } else if has_open_alert {
        RecoveryAction::ResetAndResolve
    } else {
        RecoveryAction::ResetCounter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_consecutive_failures_trigger_exactly_once_at_threshold() {
        let threshold = 4;
        let mut open_alert = false;
        let mut triggers = 0;

        for fails in 1..=4 {
            if on_failure(fails, threshold, open_alert) {
                triggers += 1;
                open_alert = true;
            }
        }

        assert_eq!(triggers, 1);
        // Further failures past the threshold never re-trigger.
        assert!(!on_failure(5, threshold, open_alert));
        assert!(!on_failure(20, threshold, open_alert));
    }

    #[test]
    fn threshold_of_one_triggers_on_first_failure() {
        assert!(on_failure(1, 1, false));
    }

    #[test]
    fn below_threshold_failures_do_not_trigger() {
        assert!(!on_failure(1, 4, false));
        assert!(!on_failure(3, 4, false));
    }

    #[test]
    fn late_duplicate_failure_past_threshold_is_guarded_by_open_alert() {
        // Counter raced past threshold while an alert is already open.
        assert!(!on_failure(6, 4, true));
    }

    #[test]
    fn up_result_resolves_only_with_an_open_alert() {
        assert_eq!(on_success(0, false), RecoveryAction::Nothing);
        assert_eq!(on_success(2, false), RecoveryAction::ResetCounter);
        assert_eq!(on_success(5, true), RecoveryAction::ResetAndResolve);
    }

    #[test]
    fn second_up_after_recovery_is_a_noop() {
        // First UP zeroed the counter and resolved the alert; the next UP
        // finds a healthy endpoint.
        assert_eq!(on_success(0, false), RecoveryAction::Nothing);
    }

    #[test]
    fn health_mapping_covers_all_three_states() {
        assert_eq!(health(0, false), EndpointHealth::Healthy);
        assert_eq!(health(2, false), EndpointHealth::Degrading);
        assert_eq!(health(4, true), EndpointHealth::Alerting);
        // Counter already reset while the alert is still open mid-transition.
        assert_eq!(health(0, true), EndpointHealth::Alerting);
    }
}
