//! Schema bootstrap from the entity definitions
//!
//! Creates missing tables and the composite unique indexes the upserts
//! rely on. Versioned migrations are left to the host application.

use super::entity::{project, task, team, team_invitation, team_member, user};
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DbErr, Schema};

pub const TEAM_MEMBER_UNIQUE_INDEX: &str = "idx_team_members_team_user";
pub const TEAM_INVITATION_UNIQUE_INDEX: &str = "idx_team_invitations_team_user";

pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(team::Entity),
        schema.create_table_from_entity(team_member::Entity),
        schema.create_table_from_entity(team_invitation::Entity),
        schema.create_table_from_entity(project::Entity),
        schema.create_table_from_entity(task::Entity),
    ];
    for mut table in tables {
        db.execute(backend.build(table.if_not_exists())).await?;
    }

    for index in unique_indexes() {
        db.execute(backend.build(&index)).await?;
    }

    tracing::info!("konsultn schema ready");
    Ok(())
}

fn unique_indexes() -> [IndexCreateStatement; 2] {
    [
        Index::create()
            .name(TEAM_MEMBER_UNIQUE_INDEX)
            .table(team_member::Entity)
            .col(team_member::Column::TeamId)
            .col(team_member::Column::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name(TEAM_INVITATION_UNIQUE_INDEX)
            .table(team_invitation::Entity)
            .col(team_invitation::Column::TeamId)
            .col(team_invitation::Column::ToUserId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}
