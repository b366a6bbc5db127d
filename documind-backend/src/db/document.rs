//! Persistence operations for documents. Everything here is scoped by the
//! owning user: a document belonging to someone else behaves exactly like a
//! document that does not exist.

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder,
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::document::{self, DocStatus};
use crate::entity::tags::TagList;
use crate::error::Error;

/// Fields for a new document record. Timestamps and the id are assigned at
/// insert time.
#[derive(Clone, Debug, Default)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub file_path: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub status: DocStatus,
    pub tags: Vec<String>,
    pub analysis: Option<String>,
}

/// Partial update: only fields that are `Some` are written.
#[derive(Clone, Debug, Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<DocStatus>,
    pub tags: Option<Vec<String>>,
    pub analysis: Option<String>,
}

/// Listing filter; both criteria are optional and combine with AND.
#[derive(Clone, Debug, Default)]
pub struct DocumentFilter {
    pub status: Option<DocStatus>,
    pub search: Option<String>,
}

pub async fn create(
    conn: &DatabaseConnection,
    new: NewDocument,
) -> Result<document::Model, Error> {
    let now = Utc::now();
    let model = document::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(new.owner_id),
        title: Set(new.title),
        content: Set(new.content),
        file_path: Set(new.file_path),
        file_type: Set(new.file_type),
        file_size: Set(new.file_size),
        status: Set(new.status),
        tags: Set(TagList(new.tags)),
        analysis: Set(new.analysis),
        created: Set(now),
        updated: Set(now),
    };

    let saved = model.insert(conn).await?;
    debug!("Created document {} for owner {}", saved.id, saved.owner_id);
    Ok(saved)
}

pub async fn get(
    conn: &DatabaseConnection,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Option<document::Model>, Error> {
    Ok(document::Entity::find()
        .filter(document::Column::Id.eq(id))
        .filter(document::Column::OwnerId.eq(owner_id))
        .one(conn)
        .await?)
}

/// List the owner's documents, newest-updated first. `search` matches the
/// title case-insensitively (sqlite LIKE; ASCII case folding).
pub async fn list(
    conn: &DatabaseConnection,
    owner_id: Uuid,
    filter: DocumentFilter,
) -> Result<Vec<document::Model>, Error> {
    let mut query = document::Entity::find().filter(document::Column::OwnerId.eq(owner_id));

    if let Some(status) = filter.status {
        query = query.filter(document::Column::Status.eq(status));
    }

    if let Some(search) = filter.search {
        if !search.is_empty() {
            query = query.filter(document::Column::Title.contains(&search));
        }
    }

    Ok(query
        .order_by_desc(document::Column::Updated)
        .all(conn)
        .await?)
}

/// Apply a partial update. Returns `None` when the document does not exist
/// for this owner. The `updated` timestamp is always refreshed.
pub async fn update(
    conn: &DatabaseConnection,
    id: Uuid,
    owner_id: Uuid,
    changes: DocumentChanges,
) -> Result<Option<document::Model>, Error> {
    let Some(existing) = get(conn, id, owner_id).await? else {
        return Ok(None);
    };

    let mut active = existing.into_active_model();
    if let Some(title) = changes.title {
        active.title = Set(title);
    }
    if let Some(content) = changes.content {
        active.content = Set(Some(content));
    }
    if let Some(status) = changes.status {
        active.status = Set(status);
    }
    if let Some(tags) = changes.tags {
        // Supplied tags fully replace the previous set
        active.tags = Set(TagList(tags));
    }
    if let Some(analysis) = changes.analysis {
        active.analysis = Set(Some(analysis));
    }
    active.updated = Set(Utc::now());

    Ok(Some(active.update(conn).await?))
}

/// Delete the owner's document. Returns whether a record was removed.
pub async fn delete(conn: &DatabaseConnection, id: Uuid, owner_id: Uuid) -> Result<bool, Error> {
    let res = document::Entity::delete_many()
        .filter(document::Column::Id.eq(id))
        .filter(document::Column::OwnerId.eq(owner_id))
        .exec(conn)
        .await?;

    if res.rows_affected > 0 {
        debug!("Deleted document {}", id);
    }
    Ok(res.rows_affected > 0)
}
