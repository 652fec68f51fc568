use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "story")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Content hash of the uploaded file in the blob store.
    pub file_hash: String,
    /// Original upload filename.
    pub file_name: String,
    /// MIME content type guessed from the filename.
    pub content_type: Option<String>,
    /// Denormalized to avoid a blob-store round trip for list queries.
    pub file_size: i64,

    /// NULL for uncategorized stories.
    pub category_id: Option<i32>,
    #[sea_orm(belongs_to, from = "category_id", to = "id")]
    pub category: BelongsTo<Option<super::category::Entity>>,

    #[sea_orm(has_many)]
    pub likes: HasMany<super::like::Entity>,

    #[sea_orm(has_many)]
    pub comments: HasMany<super::comment::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
