//! Access Control - Instance Whitelist + Role Matrix
//!
//! Two independent checks guard every tool invocation:
//!
//! 1. **Instance access**: the requested instance must exist and be in the
//!    caller's whitelist (or the whitelist must be the `"*"` wildcard).
//! 2. **Operation permission**: the caller's role must be in the operation's
//!    allowed-role set. Roles are never compared numerically; each
//!    operation lists its roles explicitly.
//!
//! Callers without an identity are [`Identity::Anonymous`]. How they are
//! treated is decided by the [`AnonymousPolicy`] the evaluator is built with:
//! `Trusted` reproduces legacy single-user behaviour, `Deny` rejects them.

use crate::sanitize::{sanitize, sanitize_message};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Whitelist entry meaning "every instance".
pub const WILDCARD_INSTANCE: &str = "*";

// =============================================================================
// Roles and Operations
// =============================================================================

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Read,
    Write,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Read => "READ",
            Role::Write => "WRITE",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ" => Ok(Role::Read),
            "WRITE" => Ok(Role::Write),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

const READERS: &[Role] = &[Role::Read, Role::Write, Role::Admin];
const WRITERS: &[Role] = &[Role::Write, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

/// The exact action being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    ReadWorkflow,
    CreateWorkflow,
    UpdateWorkflow,
    DeleteWorkflow,
    ExecuteWorkflow,
    ActivateWorkflow,
    DeactivateWorkflow,
    ReadExecution,
    DeleteExecution,
    ManageTags,
}

impl OperationType {
    pub const ALL: [OperationType; 10] = [
        OperationType::ReadWorkflow,
        OperationType::CreateWorkflow,
        OperationType::UpdateWorkflow,
        OperationType::DeleteWorkflow,
        OperationType::ExecuteWorkflow,
        OperationType::ActivateWorkflow,
        OperationType::DeactivateWorkflow,
        OperationType::ReadExecution,
        OperationType::DeleteExecution,
        OperationType::ManageTags,
    ];

    /// Roles permitted to perform this operation. Never empty.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            OperationType::ReadWorkflow | OperationType::ReadExecution => READERS,
            OperationType::CreateWorkflow
            | OperationType::UpdateWorkflow
            | OperationType::ExecuteWorkflow
            | OperationType::ActivateWorkflow
            | OperationType::DeactivateWorkflow
            | OperationType::ManageTags => WRITERS,
            OperationType::DeleteWorkflow | OperationType::DeleteExecution => ADMINS,
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::ReadWorkflow => "read_workflow",
            OperationType::CreateWorkflow => "create_workflow",
            OperationType::UpdateWorkflow => "update_workflow",
            OperationType::DeleteWorkflow => "delete_workflow",
            OperationType::ExecuteWorkflow => "execute_workflow",
            OperationType::ActivateWorkflow => "activate_workflow",
            OperationType::DeactivateWorkflow => "deactivate_workflow",
            OperationType::ReadExecution => "read_execution",
            OperationType::DeleteExecution => "delete_execution",
            OperationType::ManageTags => "manage_tags",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Instance whitelist. Serialized as a list of names where `"*"` means all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum InstanceScope {
    All,
    Only(BTreeSet<String>),
}

impl InstanceScope {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from(names.into_iter().map(Into::into).collect::<Vec<String>>())
    }

    pub fn allows(&self, instance: &str) -> bool {
        match self {
            InstanceScope::All => true,
            InstanceScope::Only(names) => names.contains(instance),
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            InstanceScope::All => vec![WILDCARD_INSTANCE.to_string()],
            InstanceScope::Only(names) => names.iter().cloned().collect(),
        }
    }
}

impl From<Vec<String>> for InstanceScope {
    fn from(names: Vec<String>) -> Self {
        if names.iter().any(|n| n == WILDCARD_INSTANCE) {
            InstanceScope::All
        } else {
            InstanceScope::Only(names.into_iter().collect())
        }
    }
}

impl From<InstanceScope> for Vec<String> {
    fn from(scope: InstanceScope) -> Self {
        scope.names()
    }
}

/// Resolved permissions of one caller for one request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissions {
    pub allowed_instances: InstanceScope,
    pub role: Role,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl UserPermissions {
    pub fn new(allowed_instances: InstanceScope, role: Role, user_id: impl Into<String>) -> Self {
        Self {
            allowed_instances,
            role,
            user_id: user_id.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Unrestricted identity used outside production.
    pub fn development_admin() -> Self {
        Self::new(InstanceScope::All, Role::Admin, "development-admin")
            .with_session("development-session")
    }
}

// Identifiers stay out of Debug output so they never reach a log verbatim.
impl fmt::Debug for UserPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPermissions")
            .field("allowed_instances", &self.allowed_instances)
            .field("role", &self.role)
            .field("user_id", &"[REDACTED]")
            .field("session_id", &self.session_id.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No permissions asserted by the transport.
    Anonymous,
    Authenticated(UserPermissions),
}

impl Identity {
    /// Key used to bucket this caller in the rate limiter.
    pub fn rate_limit_key(&self) -> &str {
        match self {
            Identity::Anonymous => "anonymous",
            Identity::Authenticated(p) => p.session_id.as_deref().unwrap_or(&p.user_id),
        }
    }
}

/// Treatment of [`Identity::Anonymous`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymousPolicy {
    /// Legacy behaviour: anonymous callers pass both checks.
    #[default]
    Trusted,
    /// Anonymous callers are rejected.
    Deny,
}

impl std::str::FromStr for AnonymousPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trusted" | "allow" => Ok(AnonymousPolicy::Trusted),
            "deny" | "reject" => Ok(AnonymousPolicy::Deny),
            other => Err(format!("Unknown anonymous policy: {}", other)),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Access control failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Routing/configuration problem, not an authorization decision.
    #[error("Instance '{instance}' not found. Available instances: {}", .available.join(", "))]
    InstanceNotFound {
        instance: String,
        available: Vec<String>,
    },

    #[error("Access denied to instance '{instance}'. Allowed instances: {}", .allowed.join(", "))]
    InstanceAccessDenied {
        instance: String,
        allowed: Vec<String>,
    },

    #[error(
        "Operation '{operation}' not permitted for role {role}. Required: {}",
        join_roles(.required)
    )]
    PermissionDenied {
        operation: OperationType,
        role: Role,
        required: Vec<Role>,
    },

    #[error("Authentication required for operation '{operation}'")]
    AnonymousDenied { operation: OperationType },
}

fn join_roles(roles: &[Role]) -> String {
    roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
}

impl AccessError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AccessError::InstanceNotFound { .. } => "instance_not_found",
            AccessError::InstanceAccessDenied { .. } => "instance_access_denied",
            AccessError::PermissionDenied { .. } => "authorization_denied",
            AccessError::AnonymousDenied { .. } => "authentication_required",
        }
    }

    /// True for routing errors caused by configuration rather than identity.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, AccessError::InstanceNotFound { .. })
    }

    /// Message safe to place in a client-visible payload.
    pub fn client_message(&self) -> String {
        sanitize_message(&self.to_string())
    }

    /// Structured, sanitized error details for a client-visible payload.
    pub fn client_payload(&self) -> Value {
        let details = match self {
            AccessError::InstanceNotFound {
                instance,
                available,
            } => json!({ "instance": instance, "available": available }),
            AccessError::InstanceAccessDenied { instance, allowed } => {
                json!({ "instance": instance, "allowed": allowed })
            }
            AccessError::PermissionDenied {
                operation,
                role,
                required,
            } => json!({ "operation": operation, "role": role, "required": required }),
            AccessError::AnonymousDenied { operation } => json!({ "operation": operation }),
        };
        sanitize(&json!({
            "kind": self.kind(),
            "message": self.client_message(),
            "details": details,
        }))
    }
}

// =============================================================================
// Evaluator
// =============================================================================

/// Stateless access evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    anonymous: AnonymousPolicy,
}

impl AccessPolicy {
    pub fn new(anonymous: AnonymousPolicy) -> Self {
        Self { anonymous }
    }

    pub fn anonymous_policy(&self) -> AnonymousPolicy {
        self.anonymous
    }

    /// Check that `instance` exists and the caller may route to it.
    ///
    /// No instance requested means default routing and always passes.
    /// Anonymous callers pass here; the anonymous policy is applied by
    /// [`AccessPolicy::validate_operation_permission`].
    pub fn validate_instance_access<S: AsRef<str>>(
        &self,
        instance: Option<&str>,
        available: &[S],
        identity: &Identity,
    ) -> Result<(), AccessError> {
        let Some(instance) = instance else {
            return Ok(());
        };

        if !available.iter().any(|a| a.as_ref() == instance) {
            return Err(AccessError::InstanceNotFound {
                instance: instance.to_string(),
                available: available.iter().map(|a| a.as_ref().to_string()).collect(),
            });
        }

        match identity {
            Identity::Anonymous => Ok(()),
            Identity::Authenticated(perms) => {
                if perms.allowed_instances.allows(instance) {
                    Ok(())
                } else {
                    Err(AccessError::InstanceAccessDenied {
                        instance: instance.to_string(),
                        allowed: perms.allowed_instances.names(),
                    })
                }
            }
        }
    }

    /// Check that the caller's role may perform `operation`.
    pub fn validate_operation_permission(
        &self,
        operation: OperationType,
        identity: &Identity,
    ) -> Result<(), AccessError> {
        match identity {
            Identity::Anonymous => self.check_anonymous(operation),
            Identity::Authenticated(perms) => {
                if operation.permits(perms.role) {
                    Ok(())
                } else {
                    Err(AccessError::PermissionDenied {
                        operation,
                        role: perms.role,
                        required: operation.allowed_roles().to_vec(),
                    })
                }
            }
        }
    }

    /// Instance check first, then the role check.
    pub fn validate_access<S: AsRef<str>>(
        &self,
        operation: OperationType,
        instance: Option<&str>,
        available: &[S],
        identity: &Identity,
    ) -> Result<(), AccessError> {
        self.validate_instance_access(instance, available, identity)?;
        self.validate_operation_permission(operation, identity)
    }

    fn check_anonymous(&self, operation: OperationType) -> Result<(), AccessError> {
        match self.anonymous {
            AnonymousPolicy::Trusted => Ok(()),
            AnonymousPolicy::Deny => Err(AccessError::AnonymousDenied { operation }),
        }
    }
}
