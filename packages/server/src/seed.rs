use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{category, message, story};

/// Default story categories seeded on startup.
const DEFAULT_CATEGORIES: &[&str] = &["General", "Fiction", "Non-fiction", "Poetry", "Travel"];

/// Seed the `category` table with defaults. Existing rows are left alone.
/// Returns the number of categories actually inserted.
pub async fn seed_categories(db: &DatabaseConnection) -> Result<u32, DbErr> {
    let mut inserted = 0u32;
    for &name in DEFAULT_CATEGORIES {
        let model = category::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };

        let result = category::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(category::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            // A conflicting insert is a successful statement with zero
            // rows affected, so only nonzero counts as an insert.
            Ok(rows) if rows > 0 => inserted += 1,
            Ok(_) => {}
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if inserted > 0 {
        info!("Seeded {} default categories", inserted);
    }

    Ok(inserted)
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Feed query: SELECT ... FROM story ORDER BY created_at DESC
    let feed_idx = Index::create()
        .if_not_exists()
        .name("idx_story_created")
        .table(story::Entity)
        .col(story::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    // Inbox and conversation queries filter messages by either endpoint
    // and order by sent_at.
    let sender_idx = Index::create()
        .if_not_exists()
        .name("idx_message_sender_sent")
        .table(message::Entity)
        .col(message::Column::SenderId)
        .col(message::Column::SentAt)
        .to_string(PostgresQueryBuilder);

    let receiver_idx = Index::create()
        .if_not_exists()
        .name("idx_message_receiver_sent")
        .table(message::Entity)
        .col(message::Column::ReceiverId)
        .col(message::Column::SentAt)
        .to_string(PostgresQueryBuilder);

    for (name, stmt) in [
        ("idx_story_created", feed_idx),
        ("idx_message_sender_sent", sender_idx),
        ("idx_message_receiver_sent", receiver_idx),
    ] {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {name} exists"),
            Err(e) => tracing::warn!("Failed to create index {name}: {e}"),
        }
    }

    Ok(())
}
