use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Directed follow edge between two users. The composite primary key
/// guarantees at most one edge per (follower, following) pair.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follow")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub follower_id: i32,
    #[sea_orm(primary_key)]
    pub following_id: i32,

    #[sea_orm(belongs_to, from = "follower_id", to = "id", relation_enum = "Follower")]
    pub follower: HasOne<super::user::Entity>,
    #[sea_orm(belongs_to, from = "following_id", to = "id", relation_enum = "Following")]
    pub following: HasOne<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
