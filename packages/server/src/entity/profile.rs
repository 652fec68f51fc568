use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-user profile. Created in the same transaction as the user row,
/// so every user always has exactly one profile.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub bio: Option<String>,

    /// Content hash of the avatar blob, when one has been uploaded.
    pub avatar_hash: Option<String>,
    /// Original avatar upload filename, for content-type guessing.
    pub avatar_filename: Option<String>,
    /// Avatar size in bytes, for the download Content-Length header.
    pub avatar_size: Option<i64>,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
