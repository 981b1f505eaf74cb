pub mod remediation;
pub mod root_cause;
pub mod router;

pub use remediation::{AutoRemediator, Remediation, RemediationAction};
pub use root_cause::{RootCauseAnalyzer, RootCausePatterns};
pub use router::{EscalatedBreak, ExceptionRouter, RoutedBreak, RoutingRule, RuleKind};
