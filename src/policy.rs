//! # Access Policy
//!
//! Pure allow/deny decisions for every read and write in the service, plus the
//! visibility scope used to filter listing queries. The role of the actor is
//! the primary dispatch key; each role is handled by one exhaustive match so
//! the whole policy can be audited in one place.
//!
//! The policy never fails. Callers turn a `false` into a 403.

use serde::Serialize;
use thiserror::Error;

use crate::models::{RoleKind, UnknownVariant, employee};

/// Role of an actor together with its client affiliation.
///
/// Non-admin roles always carry a `client_id`; administrators never do. Rows
/// that break this rule cannot be turned into an [`Actor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Consultant { client_id: i32 },
    ClientManager { client_id: i32 },
    DewAdmin,
}

impl Role {
    /// Builds a role from its stored parts, enforcing the client invariant.
    pub fn from_parts(kind: RoleKind, client_id: Option<i32>) -> Result<Self, RoleInvariantError> {
        match (kind, client_id) {
            (RoleKind::Consultant, Some(client_id)) => Ok(Role::Consultant { client_id }),
            (RoleKind::ClientManager, Some(client_id)) => Ok(Role::ClientManager { client_id }),
            (RoleKind::DewAdmin, None) => Ok(Role::DewAdmin),
            (RoleKind::DewAdmin, Some(_)) => Err(RoleInvariantError::AdminWithClient),
            (kind, None) => Err(RoleInvariantError::MissingClient(kind)),
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            Role::Consultant { .. } => RoleKind::Consultant,
            Role::ClientManager { .. } => RoleKind::ClientManager,
            Role::DewAdmin => RoleKind::DewAdmin,
        }
    }

    pub fn client_id(&self) -> Option<i32> {
        match self {
            Role::Consultant { client_id } | Role::ClientManager { client_id } => Some(*client_id),
            Role::DewAdmin => None,
        }
    }
}

/// Violations of the role/client pairing rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleInvariantError {
    #[error("dew_admin accounts must not belong to a client")]
    AdminWithClient,
    #[error("{0} accounts must belong to a client")]
    MissingClient(RoleKind),
    #[error(transparent)]
    UnknownRole(#[from] UnknownVariant),
}

/// The authenticated employee performing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i32,
    pub email: String,
    #[serde(flatten)]
    pub role: Role,
}

impl Actor {
    /// Case-insensitive comparison against an address a request was sent to.
    pub fn is_addressed_by(&self, manager_email: &str) -> bool {
        emails_match(&self.email, manager_email)
    }
}

impl TryFrom<&employee::Model> for Actor {
    type Error = RoleInvariantError;

    fn try_from(model: &employee::Model) -> Result<Self, Self::Error> {
        let role = Role::from_parts(model.role_kind()?, model.client_id)?;
        Ok(Actor {
            id: model.id,
            email: model.email.clone(),
            role,
        })
    }
}

/// Who owns a timesheet or a leave request and whom it is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership<'a> {
    pub owner_id: i32,
    pub owner_client_id: Option<i32>,
    pub manager_email: &'a str,
}

/// The record a decision is about, reduced to the fields the policy reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    Client { id: i32 },
    Employee {
        id: i32,
        client_id: Option<i32>,
        role: RoleKind,
    },
    Timesheet(Ownership<'a>),
    TimeOff(Ownership<'a>),
}

/// Kinds of records that can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Client,
    Employee,
    Timesheet,
    TimeOff,
}

/// Mutating operations the policy knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
    AddEntry,
    DeleteEntry,
    Submit,
    Approve,
    Reject,
}

/// Filter applied by listing queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// No restriction.
    All,
    /// Records belonging to the given client (for clients: that client only).
    Client(i32),
    /// Records owned by the given employee (for employees: that employee only).
    Owner(i32),
}

fn emails_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

pub fn can_view(actor: &Actor, resource: &Resource<'_>) -> bool {
    match actor.role {
        Role::DewAdmin => true,
        Role::ClientManager { client_id } => match resource {
            Resource::Client { id } => *id == client_id,
            Resource::Employee {
                client_id: owner, ..
            } => *owner == Some(client_id),
            Resource::Timesheet(ownership) | Resource::TimeOff(ownership) => {
                ownership.owner_client_id == Some(client_id)
            }
        },
        Role::Consultant { client_id } => match resource {
            Resource::Client { id } => *id == client_id,
            Resource::Employee { id, .. } => *id == actor.id,
            Resource::Timesheet(ownership) | Resource::TimeOff(ownership) => {
                ownership.owner_id == actor.id
            }
        },
    }
}

pub fn can_mutate(actor: &Actor, resource: &Resource<'_>, operation: Operation) -> bool {
    use Operation::*;

    match actor.role {
        Role::DewAdmin => match resource {
            Resource::Client { .. } | Resource::Employee { .. } => {
                matches!(operation, Create | Update | Delete)
            }
            // Approval decisions belong to the addressed manager and
            // submission to the owner, even for administrators.
            Resource::Timesheet(ownership) => match operation {
                Create | Update | Delete | AddEntry | DeleteEntry => true,
                Submit => ownership.owner_id == actor.id,
                Approve | Reject => false,
            },
            Resource::TimeOff(_) => false,
        },
        Role::ClientManager { client_id } => match resource {
            Resource::Client { .. } => false,
            Resource::Employee {
                client_id: target_client,
                role,
                ..
            } => {
                matches!(operation, Create | Update | Delete)
                    && *target_client == Some(client_id)
                    && *role != RoleKind::DewAdmin
            }
            Resource::Timesheet(ownership) => match operation {
                Approve | Reject => approval_allowed(actor, client_id, ownership),
                Submit => ownership.owner_id == actor.id,
                Create | Update | Delete | AddEntry | DeleteEntry => false,
            },
            Resource::TimeOff(ownership) => match operation {
                Approve | Reject => approval_allowed(actor, client_id, ownership),
                _ => false,
            },
        },
        Role::Consultant { .. } => match resource {
            Resource::Client { .. } | Resource::Employee { .. } => false,
            Resource::Timesheet(ownership) => match operation {
                Create | Update | Delete | AddEntry | DeleteEntry | Submit => {
                    ownership.owner_id == actor.id
                }
                Approve | Reject => false,
            },
            Resource::TimeOff(ownership) => match operation {
                Create | Update | Delete => ownership.owner_id == actor.id,
                AddEntry | DeleteEntry | Submit | Approve | Reject => false,
            },
        },
    }
}

/// Same client as the owner and named as the approver on the record.
fn approval_allowed(actor: &Actor, client_id: i32, ownership: &Ownership<'_>) -> bool {
    ownership.owner_client_id == Some(client_id) && actor.is_addressed_by(ownership.manager_email)
}

pub fn scope_for(actor: &Actor, resource_type: ResourceType) -> Scope {
    match actor.role {
        Role::DewAdmin => Scope::All,
        Role::ClientManager { client_id } => Scope::Client(client_id),
        Role::Consultant { client_id } => match resource_type {
            ResourceType::Client => Scope::Client(client_id),
            ResourceType::Employee | ResourceType::Timesheet | ResourceType::TimeOff => {
                Scope::Owner(actor.id)
            }
        },
    }
}
