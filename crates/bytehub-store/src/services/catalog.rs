//! Transactional catalog of namespaces and features.
//!
//! [`CatalogService`] offers the same list/exists/create/update/delete
//! operations over both record kinds. Each operation opens one transaction,
//! does all of its reads and writes through it and commits at the end; an
//! early return drops the transaction, which rolls it back.

use std::sync::Arc;

use bytehub_core::{FeatureRef, StoreError, StoreResult, Table};
use bytehub_database::DbConnection;
use bytehub_entities::{features, namespaces};
use regex::Regex;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DbErr,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, SqlErr, TransactionTrait,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::options::{FeatureOptions, FeatureUpdate, NamespaceOptions, NamespaceUpdate};

/// Leading columns of every listing, when present
pub const LEADING_COLUMNS: &[&str] = &["namespace", "name", "version", "description", "meta"];

/// A catalog record kind.
///
/// Implementors say how records are identified (an optional namespace column
/// plus a name column), how a new record is built from creation options and
/// how an update patch is applied.
pub trait CatalogEntity: EntityTrait {
    /// Human readable kind used in error messages
    const KIND: &'static str;

    type Active: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send;
    type Create: Send;
    type Patch: Send;

    fn name_column() -> Self::Column;

    /// Column scoping names, if records of this kind live in a namespace
    fn namespace_column() -> Option<Self::Column>;

    fn name_of(model: &Self::Model) -> &str;

    fn new_active_model(namespace: Option<&str>, name: &str, payload: Self::Create) -> Self::Active;

    fn apply_patch(model: Self::Model, patch: Self::Patch) -> Self::Active;

    fn to_record(model: &Self::Model) -> StoreResult<Map<String, Value>>;
}

impl CatalogEntity for namespaces::Entity {
    const KIND: &'static str = "Namespace";

    type Active = namespaces::ActiveModel;
    type Create = NamespaceOptions;
    type Patch = NamespaceUpdate;

    fn name_column() -> Self::Column {
        namespaces::Column::Name
    }

    fn namespace_column() -> Option<Self::Column> {
        None
    }

    fn name_of(model: &namespaces::Model) -> &str {
        &model.name
    }

    fn new_active_model(
        _namespace: Option<&str>,
        name: &str,
        payload: NamespaceOptions,
    ) -> namespaces::ActiveModel {
        namespaces::ActiveModel {
            name: Set(name.to_string()),
            description: Set(payload.description),
            url: Set(payload.url),
            storage_options: Set(payload.storage_options),
            meta: Set(payload.meta),
            ..Default::default()
        }
    }

    fn apply_patch(model: namespaces::Model, patch: NamespaceUpdate) -> namespaces::ActiveModel {
        let mut active: namespaces::ActiveModel = model.into();
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(storage_options) = patch.storage_options {
            active.storage_options = Set(Some(storage_options));
        }
        if let Some(meta) = patch.meta {
            active.meta = Set(Some(meta));
        }
        active
    }

    fn to_record(model: &namespaces::Model) -> StoreResult<Map<String, Value>> {
        to_record(model)
    }
}

impl CatalogEntity for features::Entity {
    const KIND: &'static str = "Feature";

    type Active = features::ActiveModel;
    type Create = FeatureOptions;
    type Patch = FeatureUpdate;

    fn name_column() -> Self::Column {
        features::Column::Name
    }

    fn namespace_column() -> Option<Self::Column> {
        Some(features::Column::Namespace)
    }

    fn name_of(model: &features::Model) -> &str {
        &model.name
    }

    fn new_active_model(
        namespace: Option<&str>,
        name: &str,
        payload: FeatureOptions,
    ) -> features::ActiveModel {
        let mut active = features::ActiveModel {
            namespace: Set(namespace.unwrap_or_default().to_string()),
            name: Set(name.to_string()),
            description: Set(payload.description),
            meta: Set(payload.meta),
            ..Default::default()
        };
        if let Some(partition) = payload.partition {
            active.partition = Set(partition);
        }
        active
    }

    fn apply_patch(model: features::Model, patch: FeatureUpdate) -> features::ActiveModel {
        let mut active: features::ActiveModel = model.into();
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(meta) = patch.meta {
            active.meta = Set(Some(meta));
        }
        active
    }

    fn to_record(model: &features::Model) -> StoreResult<Map<String, Value>> {
        to_record(model)
    }
}

fn to_record<T: serde::Serialize>(model: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(model) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(StoreError::Database {
            reason: format!("catalog row serialised to {}", other),
        }),
        Err(e) => Err(StoreError::Database {
            reason: e.to_string(),
        }),
    }
}

fn identity_condition<E: CatalogEntity>(namespace: Option<&str>, name: Option<&str>) -> Condition {
    let mut condition = Condition::all();
    if let (Some(column), Some(namespace)) = (E::namespace_column(), namespace) {
        condition = condition.add(column.eq(namespace));
    }
    if let Some(name) = name {
        condition = condition.add(E::name_column().eq(name));
    }
    condition
}

fn compile_regex(pattern: Option<&str>) -> StoreResult<Option<Regex>> {
    pattern
        .map(|p| {
            Regex::new(p)
                .map_err(|e| StoreError::invalid_argument(format!("regex {:?}: {}", p, e)))
        })
        .transpose()
}

pub struct CatalogService {
    db: Arc<DbConnection>,
}

impl CatalogService {
    pub fn new(db: Arc<DbConnection>) -> Self {
        Self { db }
    }

    async fn find<E, C>(
        conn: &C,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<E::Model>, DbErr>
    where
        E: CatalogEntity,
        C: sea_orm::ConnectionTrait,
    {
        E::find()
            .filter(identity_condition::<E>(namespace, name))
            .all(conn)
            .await
    }

    /// Records matching the equality filters and, when given, a regex on
    /// the name. `namespace` is ignored for kinds that are not namespaced.
    pub async fn list<E: CatalogEntity>(
        &self,
        namespace: Option<&str>,
        name: Option<&str>,
        regex: Option<&str>,
    ) -> StoreResult<Table> {
        let regex = compile_regex(regex)?;

        let txn = self.db.begin().await?;
        let models = Self::find::<E, _>(&txn, namespace, name).await?;
        txn.commit().await?;

        let records = models
            .iter()
            .filter(|m| regex.as_ref().map_or(true, |re| re.is_match(E::name_of(m))))
            .map(E::to_record)
            .collect::<StoreResult<Vec<_>>>()?;

        debug!("Listed {} {} records", records.len(), E::KIND);
        Ok(Table::from_records(records, LEADING_COLUMNS))
    }

    pub async fn exists<E: CatalogEntity>(
        &self,
        namespace: Option<&str>,
        name: Option<&str>,
    ) -> StoreResult<bool> {
        let txn = self.db.begin().await?;
        let found = Self::find::<E, _>(&txn, namespace, name).await?;
        txn.commit().await?;
        Ok(!found.is_empty())
    }

    /// Insert a record. Namespaced kinds require their namespace to exist.
    pub async fn create<E>(
        &self,
        namespace: Option<&str>,
        name: &str,
        payload: E::Create,
    ) -> StoreResult<()>
    where
        E: CatalogEntity,
        E::Model: IntoActiveModel<E::Active>,
    {
        let txn = self.db.begin().await?;

        if E::namespace_column().is_some() {
            let ns = namespace.ok_or_else(|| {
                StoreError::invalid_input(format!("{} {} has no namespace", E::KIND, name))
            })?;
            let parent = namespaces::Entity::find()
                .filter(namespaces::Column::Name.eq(ns))
                .count(&txn)
                .await?;
            if parent == 0 {
                return Err(StoreError::NamespaceNotFound(ns.to_string()));
            }
        }

        let already_exists = || StoreError::AlreadyExists {
            kind: E::KIND,
            namespace: namespace.filter(|_| E::namespace_column().is_some()).map(str::to_string),
            name: name.to_string(),
        };

        let existing = Self::find::<E, _>(&txn, namespace, Some(name)).await?;
        if !existing.is_empty() {
            return Err(already_exists());
        }

        E::new_active_model(namespace, name, payload)
            .insert(&txn)
            .await
            .map_err(|e| {
                let sql_err = e.sql_err();
                match sql_err {
                    Some(SqlErr::UniqueConstraintViolation(_)) => already_exists(),
                    _ => StoreError::from(e),
                }
            })?;

        txn.commit().await?;
        info!("Created {} {}", E::KIND, name);
        Ok(())
    }

    /// Locate the single record matching the filter, inside `txn`
    async fn find_one<E: CatalogEntity>(
        txn: &sea_orm::DatabaseTransaction,
        namespace: Option<&str>,
        name: &str,
    ) -> StoreResult<E::Model> {
        let mut matches = Self::find::<E, _>(txn, namespace, Some(name)).await?;
        match matches.len() {
            0 => Err(StoreError::not_found(E::KIND, namespace, name)),
            1 => Ok(matches.remove(0)),
            count => Err(StoreError::AmbiguousMatch {
                kind: E::KIND,
                name: name.to_string(),
                count,
            }),
        }
    }

    /// Overwrite the fields set in `patch` on the one matching record
    pub async fn update<E>(
        &self,
        namespace: Option<&str>,
        name: &str,
        patch: E::Patch,
    ) -> StoreResult<()>
    where
        E: CatalogEntity,
        E::Model: IntoActiveModel<E::Active>,
    {
        let txn = self.db.begin().await?;
        let model = Self::find_one::<E>(&txn, namespace, name).await?;
        E::apply_patch(model, patch).update(&txn).await?;
        txn.commit().await?;

        info!("Updated {} {}", E::KIND, name);
        Ok(())
    }

    /// Remove the one matching record and return it
    pub async fn delete<E: CatalogEntity>(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> StoreResult<E::Model> {
        let txn = self.db.begin().await?;
        let model = Self::find_one::<E>(&txn, namespace, name).await?;
        E::delete_many()
            .filter(identity_condition::<E>(namespace, Some(name)))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!("Deleted {} {}", E::KIND, name);
        Ok(model)
    }
}

impl CatalogService {
    /// Fetch a namespace by name
    pub async fn namespace(&self, name: &str) -> StoreResult<namespaces::Model> {
        let txn = self.db.begin().await?;
        let namespace = namespaces::Entity::find()
            .filter(namespaces::Column::Name.eq(name))
            .one(&txn)
            .await?;
        txn.commit().await?;
        namespace.ok_or_else(|| StoreError::NamespaceNotFound(name.to_string()))
    }

    /// Fetch a feature together with the namespace that owns it
    pub async fn feature_with_namespace(
        &self,
        feature: &FeatureRef,
    ) -> StoreResult<(features::Model, namespaces::Model)> {
        let namespace = feature.namespace.as_deref().ok_or_else(|| {
            StoreError::invalid_input(format!("Feature {} has no namespace", feature.name))
        })?;

        let txn = self.db.begin().await?;
        let found = features::Entity::find()
            .find_also_related(namespaces::Entity)
            .filter(features::Column::Namespace.eq(namespace))
            .filter(features::Column::Name.eq(feature.name.as_str()))
            .one(&txn)
            .await?;
        txn.commit().await?;

        match found {
            Some((model, Some(owner))) => {
                debug!("Resolved feature {}", model.qualified_name());
                Ok((model, owner))
            }
            Some((_, None)) => Err(StoreError::NamespaceNotFound(namespace.to_string())),
            None => Err(StoreError::feature_not_found(Some(namespace), &feature.name)),
        }
    }
}
