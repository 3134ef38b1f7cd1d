//! Token database entity.

use sea_orm::entity::prelude::*;

use crate::domain::{Token, TokenKind};
use crate::errors::AppError;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub token: String,
    #[sea_orm(column_name = "type")]
    pub token_type: String,
    pub expires_at: DateTimeUtc,
    pub user_id: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Rows with an unknown `type` are treated as corrupt.
impl TryFrom<Model> for Token {
    type Error = AppError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let token_type = model
            .token_type
            .parse::<TokenKind>()
            .map_err(AppError::internal)?;

        Ok(Token {
            id: model.id,
            token: model.token,
            token_type,
            expires_at: model.expires_at,
            user_id: model.user_id,
            created_at: model.created_at,
        })
    }
}
