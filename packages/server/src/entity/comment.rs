use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub story_id: i32,
    #[sea_orm(belongs_to, from = "story_id", to = "id")]
    pub story: HasOne<super::story::Entity>,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    #[sea_orm(has_many)]
    pub replies: HasMany<super::reply::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
