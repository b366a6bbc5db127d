use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::tags::TagList;

/// Lifecycle status of a document.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "final")]
    Final,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Immutable after creation. Every read/update/delete is scoped to this.
    pub owner_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    /// Storage-relative path of the uploaded file, if any.
    pub file_path: Option<String>,
    /// Lowercase extension without the dot, derived from the original filename.
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub status: DocStatus,
    pub tags: TagList,
    /// AI-derived analysis, overwritten on each analysis run.
    pub analysis: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Default for Model {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: String::new(),
            content: None,
            file_path: None,
            file_type: None,
            file_size: None,
            status: DocStatus::default(),
            tags: TagList::default(),
            analysis: None,
            created: now,
            updated: now,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
