//! Request authorization gate.
//!
//! Every tool call passes through [`RequestGate::authorize`] before any
//! downstream action. Order is fixed and short-circuits on the first
//! failure:
//!
//! 1. Resolve the available instances (loads configuration on first use)
//! 2. Instance access
//! 3. Operation permission
//! 4. Rate limit
//!
//! A rejected call never touches the limiter.

use crate::error::GateError;
use n8n_gateway_config::{ConfigResolver, RateLimitSettings};
use n8n_gateway_security::{AccessPolicy, Identity, OperationType, RateLimitDecision, RateLimiter};
use std::sync::Arc;
use tracing::{debug, warn};

/// A call that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Environment the call is routed to (the default when none was named).
    pub instance: String,
    pub rate_limit: RateLimitDecision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed(Authorization),
    /// Over the limit; returned to the client as a structured result.
    RateLimited(RateLimitDecision),
}

pub struct RequestGate {
    policy: AccessPolicy,
    limiter: Arc<RateLimiter>,
    rate_limit: RateLimitSettings,
    resolver: Arc<ConfigResolver>,
}

impl RequestGate {
    pub fn new(
        policy: AccessPolicy,
        limiter: Arc<RateLimiter>,
        rate_limit: RateLimitSettings,
        resolver: Arc<ConfigResolver>,
    ) -> Self {
        Self {
            policy,
            limiter,
            rate_limit,
            resolver,
        }
    }

    /// Gate built from the resolver's settings.
    pub fn from_settings(limiter: Arc<RateLimiter>, resolver: Arc<ConfigResolver>) -> Self {
        let settings = resolver.settings();
        let policy = AccessPolicy::new(settings.anonymous_policy);
        let rate_limit = settings.rate_limit;
        Self::new(policy, limiter, rate_limit, resolver)
    }

    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn authorize(
        &self,
        operation: OperationType,
        instance: Option<&str>,
        identity: &Identity,
    ) -> Result<GateDecision, GateError> {
        let config = self.resolver.config()?;
        let available = config.environment_names();

        if let Err(err) = self
            .policy
            .validate_instance_access(instance, &available, identity)
            .and_then(|()| self.policy.validate_operation_permission(operation, identity))
        {
            warn!(
                operation = operation.as_str(),
                kind = err.kind(),
                "Request rejected by access control"
            );
            return Err(err.into());
        }

        let decision = self.limiter.check(
            identity.rate_limit_key(),
            self.rate_limit.max_requests,
            self.rate_limit.window_ms,
        );
        if !decision.allowed {
            warn!(
                operation = operation.as_str(),
                reset_time = decision.reset_time,
                "Rate limit exceeded"
            );
            return Ok(GateDecision::RateLimited(decision));
        }

        let instance = instance.unwrap_or(config.default_env()).to_string();
        debug!(
            operation = operation.as_str(),
            instance = %instance,
            remaining = decision.remaining,
            "Request authorized"
        );
        Ok(GateDecision::Allowed(Authorization {
            instance,
            rate_limit: decision,
        }))
    }
}
