use async_trait::async_trait;
use bytehub_core::DBDateTime;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, DbErr};
use serde::{Deserialize, Serialize};

/// Partitioning applied when a feature is created without one
pub const DEFAULT_PARTITION: &str = "date";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "features")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Name of the owning namespace; unique together with `name`
    pub namespace: String,
    pub name: String,
    pub description: Option<String>,
    /// Storage partitioning granularity (`date`, `month` or `year`)
    pub partition: String,
    pub meta: Option<Json>,
    pub created_at: DBDateTime,
    pub updated_at: DBDateTime,
}

impl Model {
    /// Qualified `namespace/name` identifier
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::namespaces::Entity",
        from = "Column::Namespace",
        to = "super::namespaces::Column::Name"
    )]
    Namespace,
}

impl Related<super::namespaces::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Namespace.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();

        if insert {
            if self.partition.is_not_set() {
                self.partition = Set(DEFAULT_PARTITION.to_string());
            }
            if self.created_at.is_not_set() {
                self.created_at = Set(now);
            }
            if self.updated_at.is_not_set() {
                self.updated_at = Set(now);
            }
        } else {
            self.updated_at = Set(now);
        }

        Ok(self)
    }
}
