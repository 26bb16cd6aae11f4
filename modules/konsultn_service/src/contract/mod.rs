//! Contract layer - public API for in-process callers
//!
//! Transport-agnostic models, errors and the native client trait.

pub mod client;
pub mod error;
pub mod model;

pub use client::KonsultnApi;
pub use crudkit::{PageParams, Paginated};
pub use error::ServiceError;
pub use model::{
    InvitationAction, InvitationStatus, MemberRequest, NewTask, NewTeam, NewUser, Project,
    Registration, Role, Task, Team, TeamInvitation, TeamMember, TeamSummary, TeamUpdate, User,
    UserView, DEFAULT_USER_STATUS,
};
