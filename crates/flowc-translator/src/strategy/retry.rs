use std::time::Duration;

use flowc_core::{FlowcError, FlowcResult};
use flowc_model::ApiDeployment;
use flowc_types::pb::envoy::config::route::v3::{route, retry_policy, RetryPolicy, Route};
use flowc_types::pb::envoy::extensions::retry::host::previous_hosts::v3::PreviousHostsPredicate;
use flowc_types::{duration, pack, type_url, u32_value};

use super::RetryStrategy;

/// Base interval of the exponential backoff used by budgeted custom retries.
pub const BACKOFF_BASE_INTERVAL: Duration = Duration::from_millis(25);

/// Max interval of the exponential backoff used by budgeted custom retries.
pub const BACKOFF_MAX_INTERVAL: Duration = Duration::from_millis(250);

const RETRIABLE_STATUS_CODES: &str = "retriable-status-codes";

fn attach(route: &mut Route, policy: RetryPolicy) {
    if let Some(route::Action::Route(action)) = route.action.as_mut() {
        action.retry_policy = Some(policy);
    }
}

fn basic_policy(num_retries: u32, retry_on: &str, per_try_timeout: Duration) -> RetryPolicy {
    RetryPolicy {
        retry_on: retry_on.to_string(),
        num_retries: Some(u32_value(num_retries)),
        per_try_timeout: Some(duration(per_try_timeout)),
        ..Default::default()
    }
}

/// Leaves routes untouched.
#[derive(Clone, Debug, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn name(&self) -> &'static str {
        "none"
    }

    fn configure_retry(&self, _route: &mut Route, _deployment: &ApiDeployment) -> FlowcResult<()> {
        Ok(())
    }
}

/// One retry on `5xx,reset`, 5 s per try.
#[derive(Clone, Debug, Default)]
pub struct ConservativeRetry;

impl RetryStrategy for ConservativeRetry {
    fn name(&self) -> &'static str {
        "conservative"
    }

    fn configure_retry(&self, route: &mut Route, _deployment: &ApiDeployment) -> FlowcResult<()> {
        attach(route, basic_policy(1, "5xx,reset", Duration::from_secs(5)));
        Ok(())
    }
}

/// Three retries on a wide set of conditions, avoiding previously tried hosts.
#[derive(Clone, Debug, Default)]
pub struct AggressiveRetry;

impl RetryStrategy for AggressiveRetry {
    fn name(&self) -> &'static str {
        "aggressive"
    }

    fn configure_retry(&self, route: &mut Route, _deployment: &ApiDeployment) -> FlowcResult<()> {
        let mut policy = basic_policy(
            3,
            "5xx,reset,connect-failure,refused-stream",
            Duration::from_secs(2),
        );
        policy.retry_host_predicate = vec![retry_policy::RetryHostPredicate {
            name: type_url::names::PREVIOUS_HOSTS.to_string(),
            config_type: Some(retry_policy::retry_host_predicate::ConfigType::TypedConfig(pack(
                type_url::PREVIOUS_HOSTS_PREDICATE,
                &PreviousHostsPredicate::default(),
            ))),
        }];
        attach(route, policy);
        Ok(())
    }
}

/// Operator-defined retry policy.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomRetry {
    num_retries: u32,
    retry_on: String,
    per_try_timeout: Option<Duration>,
    retriable_status_codes: Vec<u32>,
    backoff: bool,
}

impl CustomRetry {
    /// Create the policy.
    ///
    /// A non-empty status-code list adds `retriable-status-codes` to
    /// `retry_on`. `budget_percent` enables exponential backoff and must be
    /// within `(0, 100]`.
    pub fn new(
        num_retries: u32,
        retry_on: impl Into<String>,
        per_try_timeout: Option<Duration>,
        retriable_status_codes: Vec<u32>,
        budget_percent: Option<f64>,
    ) -> FlowcResult<Self> {
        let mut retry_on: String = retry_on.into();
        if retry_on.trim().is_empty() {
            return Err(FlowcError::validation("retry.retry_on", "must not be empty"));
        }
        if let Some(code) = retriable_status_codes.iter().find(|c| !(100..600).contains(*c)) {
            return Err(FlowcError::validation(
                "retry.retriable_status_codes",
                format!("{code} is not an HTTP status code"),
            ));
        }
        if let Some(budget) = budget_percent {
            if !(budget > 0.0 && budget <= 100.0) {
                return Err(FlowcError::validation(
                    "retry.budget_percent",
                    format!("must be within (0, 100], got {budget}"),
                ));
            }
        }
        if !retriable_status_codes.is_empty()
            && !retry_on.split(',').any(|c| c.trim() == RETRIABLE_STATUS_CODES)
        {
            retry_on.push(',');
            retry_on.push_str(RETRIABLE_STATUS_CODES);
        }
        Ok(Self {
            num_retries,
            retry_on,
            per_try_timeout,
            retriable_status_codes,
            backoff: budget_percent.is_some(),
        })
    }

    /// Effective `retry_on` conditions.
    #[must_use]
    pub fn retry_on(&self) -> &str {
        &self.retry_on
    }
}

impl RetryStrategy for CustomRetry {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn configure_retry(&self, route: &mut Route, _deployment: &ApiDeployment) -> FlowcResult<()> {
        let policy = RetryPolicy {
            retry_on: self.retry_on.clone(),
            num_retries: Some(u32_value(self.num_retries)),
            per_try_timeout: self.per_try_timeout.map(duration),
            retriable_status_codes: self.retriable_status_codes.clone(),
            retry_back_off: self.backoff.then(|| retry_policy::RetryBackOff {
                base_interval: Some(duration(BACKOFF_BASE_INTERVAL)),
                max_interval: Some(duration(BACKOFF_MAX_INTERVAL)),
            }),
            ..Default::default()
        };
        attach(route, policy);
        Ok(())
    }
}
