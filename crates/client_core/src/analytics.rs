use std::collections::BTreeMap;

use tracing::info;

pub type EventAttributes = BTreeMap<String, String>;

/// Fire-and-forget sink for named product analytics events.
pub trait AnalyticsSink: Send + Sync {
    fn log_event(&self, name: &str, attributes: Option<&EventAttributes>);

    fn log_login(&self, method: &str, success: bool) {
        self.log_event("Login", Some(&outcome_attributes(method, success)));
    }

    fn log_signup(&self, method: &str, success: bool) {
        self.log_event("Sign Up", Some(&outcome_attributes(method, success)));
    }
}

fn outcome_attributes(method: &str, success: bool) -> EventAttributes {
    BTreeMap::from([
        ("method".to_string(), method.to_string()),
        ("success".to_string(), success.to_string()),
    ])
}

pub fn single_attribute(key: &str, value: impl Into<String>) -> EventAttributes {
    BTreeMap::from([(key.to_string(), value.into())])
}

/// Emits analytics as `tracing` events under the `analytics` target.
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn log_event(&self, name: &str, attributes: Option<&EventAttributes>) {
        match attributes {
            Some(attributes) => info!(target: "analytics", event = name, ?attributes),
            None => info!(target: "analytics", event = name),
        }
    }
}

pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn log_event(&self, _name: &str, _attributes: Option<&EventAttributes>) {}
}
