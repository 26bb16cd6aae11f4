//! Konsultn Service Module
//!
//! Users, teams with role-based membership and invitations, projects and
//! tasks, persisted through the generic `crudkit` repository.

// Public exports
pub mod contract;
pub use contract::{
    client::KonsultnApi, error::ServiceError, InvitationAction, InvitationStatus, MemberRequest,
    NewTask, NewTeam, NewUser, Project, Registration, Role, Task, Team, TeamInvitation,
    TeamMember, TeamSummary, TeamUpdate, User, UserView,
};
pub use domain::IdentityProvider;

pub mod module;
pub use module::KonsultnModule;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
