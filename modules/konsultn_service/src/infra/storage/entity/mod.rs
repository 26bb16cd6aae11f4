//! SeaORM entities, one module per table
//!
//! Every `ActiveModelBehavior` stamps ids and audit timestamps through
//! [`crudkit::stamp`], so writes made directly on an `ActiveModel` inside a
//! transaction get the same treatment as repository writes.

pub mod project;
pub mod task;
pub mod team;
pub mod team_invitation;
pub mod team_member;
pub mod user;
