use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direct message between two users. A conversation is the set of
/// messages where the pair {sender, receiver} matches, ordered by sent_at.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub sender_id: i32,
    #[sea_orm(belongs_to, from = "sender_id", to = "id", relation_enum = "Sender")]
    pub sender: HasOne<super::user::Entity>,

    pub receiver_id: i32,
    #[sea_orm(belongs_to, from = "receiver_id", to = "id", relation_enum = "Receiver")]
    pub receiver: HasOne<super::user::Entity>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    pub sent_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
