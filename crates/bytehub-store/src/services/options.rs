//! Typed options for feature store operations.
//!
//! Each struct lists the option names it recognises and the ones it requires,
//! and offers `from_json` for callers holding a dynamic JSON object. Unknown
//! keys and missing mandatory keys are rejected before anything is
//! deserialised.

use bytehub_core::{validate_kwargs, DBDateTime, StoreError, StoreResult};
use bytehub_timeseries::{Frequency, Partition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn parse_options<T: DeserializeOwned>(
    value: Value,
    valid: &[&str],
    mandatory: &[&str],
) -> StoreResult<T> {
    let object: Map<String, Value> = match value {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => {
            return Err(StoreError::invalid_argument(format!(
                "options must be an object, got {}",
                other
            )))
        }
    };
    validate_kwargs(&object, valid, mandatory)?;
    serde_json::from_value(Value::Object(object))
        .map_err(|e| StoreError::invalid_argument(e.to_string()))
}

/// Options for creating a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceOptions {
    pub description: Option<String>,
    /// Storage location shared by every feature of the namespace
    pub url: String,
    pub storage_options: Option<Value>,
    pub meta: Option<Value>,
}

impl NamespaceOptions {
    pub const VALID: &'static [&'static str] = &["description", "url", "storage_options", "meta"];
    pub const MANDATORY: &'static [&'static str] = &["url"];

    pub fn builder() -> NamespaceOptionsBuilder {
        NamespaceOptionsBuilder::new()
    }

    pub fn from_json(value: Value) -> StoreResult<Self> {
        parse_options(value, Self::VALID, Self::MANDATORY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceOptionsBuilder {
    description: Option<String>,
    url: Option<String>,
    storage_options: Option<Value>,
    meta: Option<Value>,
}

impl NamespaceOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn storage_options(mut self, storage_options: Value) -> Self {
        self.storage_options = Some(storage_options);
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn build(self) -> StoreResult<NamespaceOptions> {
        let url = self
            .url
            .ok_or_else(|| StoreError::MissingArgument("url".to_string()))?;
        Ok(NamespaceOptions {
            description: self.description,
            url,
            storage_options: self.storage_options,
            meta: self.meta,
        })
    }
}

/// Fields replaced by a namespace update; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceUpdate {
    pub description: Option<String>,
    pub storage_options: Option<Value>,
    pub meta: Option<Value>,
}

impl NamespaceUpdate {
    pub const VALID: &'static [&'static str] = &["description", "storage_options", "meta"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn storage_options(mut self, storage_options: Value) -> Self {
        self.storage_options = Some(storage_options);
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn from_json(value: Value) -> StoreResult<Self> {
        parse_options(value, Self::VALID, &[])
    }
}

/// Options for creating a feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureOptions {
    pub namespace: Option<String>,
    pub description: Option<String>,
    pub partition: Option<String>,
    pub meta: Option<Value>,
}

impl FeatureOptions {
    pub const VALID: &'static [&'static str] = &["namespace", "description", "partition", "meta"];

    pub fn builder() -> FeatureOptionsBuilder {
        FeatureOptionsBuilder::default()
    }

    pub fn from_json(value: Value) -> StoreResult<Self> {
        let options: Self = parse_options(value, Self::VALID, &[])?;
        options.check_partition()?;
        Ok(options)
    }

    /// Fails with `InvalidArgument` on an unknown partition granularity
    pub(crate) fn check_partition(&self) -> StoreResult<()> {
        if let Some(partition) = &self.partition {
            partition.parse::<Partition>()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureOptionsBuilder {
    options: FeatureOptions,
}

impl FeatureOptionsBuilder {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options.namespace = Some(namespace.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.options.description = Some(description.into());
        self
    }

    pub fn partition(mut self, partition: impl Into<String>) -> Self {
        self.options.partition = Some(partition.into());
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.options.meta = Some(meta);
        self
    }

    /// Fails with `InvalidArgument` on an unknown partition granularity
    pub fn build(self) -> StoreResult<FeatureOptions> {
        self.options.check_partition()?;
        Ok(self.options)
    }
}

/// Fields replaced by a feature update; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureUpdate {
    pub description: Option<String>,
    pub meta: Option<Value>,
}

impl FeatureUpdate {
    pub const VALID: &'static [&'static str] = &["description", "meta"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn from_json(value: Value) -> StoreResult<Self> {
        parse_options(value, Self::VALID, &[])
    }
}

/// Filters for listing namespaces. `namespace` is accepted in place of
/// `name`; when both are given `name` wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNamespaceFilter")]
pub struct NamespaceFilter {
    pub name: Option<String>,
    pub regex: Option<String>,
}

#[derive(Deserialize)]
struct RawNamespaceFilter {
    name: Option<String>,
    namespace: Option<String>,
    regex: Option<String>,
}

impl From<RawNamespaceFilter> for NamespaceFilter {
    fn from(raw: RawNamespaceFilter) -> Self {
        Self {
            name: raw.name.or(raw.namespace),
            regex: raw.regex,
        }
    }
}

impl NamespaceFilter {
    pub const VALID: &'static [&'static str] = &["name", "namespace", "regex"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn from_json(value: Value) -> StoreResult<Self> {
        parse_options(value, Self::VALID, &[])
    }
}

/// Filters for listing features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFilter {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub regex: Option<String>,
}

impl FeatureFilter {
    pub const VALID: &'static [&'static str] = &["name", "namespace", "regex"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn from_json(value: Value) -> StoreResult<Self> {
        parse_options(value, Self::VALID, &[])
    }
}

/// How a multi-feature load combines its per-feature frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Load one feature after another and merge them in a single join
    #[default]
    InMemory,
    /// Load every feature concurrently and merge with pairwise joins
    Parallel,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    pub from_date: Option<DBDateTime>,
    pub to_date: Option<DBDateTime>,
    pub freq: Option<Frequency>,
    pub time_travel: Option<DBDateTime>,
    pub mode: LoadMode,
}

#[derive(Deserialize)]
struct RawLoadOptions {
    from_date: Option<DBDateTime>,
    to_date: Option<DBDateTime>,
    freq: Option<String>,
    time_travel: Option<DBDateTime>,
    #[serde(default)]
    mode: LoadMode,
}

impl LoadOptions {
    pub const VALID: &'static [&'static str] =
        &["from_date", "to_date", "freq", "time_travel", "mode"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_date(mut self, from_date: DBDateTime) -> Self {
        self.from_date = Some(from_date);
        self
    }

    pub fn to_date(mut self, to_date: DBDateTime) -> Self {
        self.to_date = Some(to_date);
        self
    }

    pub fn freq(mut self, freq: Frequency) -> Self {
        self.freq = Some(freq);
        self
    }

    pub fn time_travel(mut self, time_travel: DBDateTime) -> Self {
        self.time_travel = Some(time_travel);
        self
    }

    pub fn mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// `freq` is given as a frequency string such as `"1d"` or `"15min"`
    pub fn from_json(value: Value) -> StoreResult<Self> {
        let raw: RawLoadOptions = parse_options(value, Self::VALID, &[])?;
        let freq = raw.freq.as_deref().map(Frequency::parse).transpose()?;
        Ok(LoadOptions {
            from_date: raw.from_date,
            to_date: raw.to_date,
            freq,
            time_travel: raw.time_travel,
            mode: raw.mode,
        })
    }
}
