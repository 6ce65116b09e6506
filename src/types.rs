use crate::collect::DeferredRegistry;
use indexmap::IndexMap;
use serde::de::{Deserializer, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;
use std::hash::{Hash, Hasher};

/// The two record kinds a dump carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Item,
    Property,
    #[serde(other)]
    Other,
}

/// A language-tagged piece of text (labels, aliases, monolingual values)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonolingualText {
    #[serde(default)]
    pub language: String,
    #[serde(alias = "text")]
    pub value: String,
}

/// One entity from the dump, as it appears in the Wikidata JSON format
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: RecordKind,

    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub labels: IndexMap<String, MonolingualText>,

    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub aliases: IndexMap<String, Vec<MonolingualText>>,

    /// Statement groups keyed by property id
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub claims: IndexMap<String, Vec<Statement>>,

    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub sitelinks: IndexMap<String, SiteLink>,
}

impl EntityRecord {
    /// Label text for a language, if the entity has one
    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels.get(language).map(|l| l.value.as_str())
    }

    /// Alias texts for a language (empty when none)
    pub fn aliases(&self, language: &str) -> impl Iterator<Item = &str> {
        self.aliases
            .get(language)
            .into_iter()
            .flatten()
            .map(|a| a.value.as_str())
    }

    /// The statement group for a property (empty when absent)
    pub fn statements(&self, property: &str) -> &[Statement] {
        self.claims.get(property).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_statement(&self, property: &str) -> bool {
        !self.statements(property).is_empty()
    }

    /// True if any statement of `property` points at the entity `target`
    pub fn has_statement_value(&self, property: &str, target: &str) -> bool {
        self.statements(property).iter().any(|stmt| {
            matches!(stmt.value(), Some(DataValue::EntityId(e)) if e.id() == target)
        })
    }
}

/// A statement; only its main value matters here
#[derive(Debug, Clone, Deserialize)]
pub struct Statement {
    pub mainsnak: Snak,
}

impl Statement {
    /// The statement's value, absent for `somevalue`/`novalue` snaks
    pub fn value(&self) -> Option<&DataValue> {
        self.mainsnak.datavalue.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snak {
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub datavalue: Option<DataValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteLink {
    pub site: String,
    #[serde(default)]
    pub title: String,
}

/// A statement value, closed over the kinds the dump format defines
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawDataValue")]
pub enum DataValue {
    EntityId(EntityIdValue),
    String(String),
    Time(TimeValue),
    GlobeCoordinate(GlobeCoordinate),
    MonolingualText(MonolingualText),
    Quantity(Value),
    /// A kind we do not know, or a known kind with a malformed payload
    Unsupported(String),
}

#[derive(Deserialize)]
struct RawDataValue {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Value,
}

impl From<RawDataValue> for DataValue {
    fn from(raw: RawDataValue) -> Self {
        let RawDataValue { kind, value } = raw;
        let parsed = match kind.as_str() {
            "wikibase-entityid" => serde_json::from_value(value).map(DataValue::EntityId),
            "string" => serde_json::from_value(value).map(DataValue::String),
            "time" => serde_json::from_value(value).map(DataValue::Time),
            "globecoordinate" => serde_json::from_value(value).map(DataValue::GlobeCoordinate),
            "monolingualtext" => serde_json::from_value(value).map(DataValue::MonolingualText),
            "quantity" => Ok(DataValue::Quantity(value)),
            _ => return DataValue::Unsupported(kind),
        };
        parsed.unwrap_or_else(|_| DataValue::Unsupported(kind))
    }
}

/// Reference to another entity
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityIdValue {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "entity-type", default)]
    pub entity_type: Option<String>,
    #[serde(rename = "numeric-id", default)]
    pub numeric_id: Option<u64>,
}

impl EntityIdValue {
    pub fn new(id: impl Into<String>) -> Self {
        EntityIdValue {
            id: Some(id.into()),
            entity_type: None,
            numeric_id: None,
        }
    }

    /// The referenced id; older dumps only carry `entity-type` + `numeric-id`
    pub fn id(&self) -> String {
        if let Some(ref id) = self.id {
            return id.clone();
        }
        let prefix = match self.entity_type.as_deref() {
            Some("property") => "P",
            Some("lexeme") => "L",
            _ => "Q",
        };
        format!("{}{}", prefix, self.numeric_id.unwrap_or_default())
    }
}

/// A point in time, e.g. `+1749-08-28T00:00:00Z`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeValue {
    pub time: String,
    #[serde(default)]
    pub precision: Option<u8>,
    #[serde(default)]
    pub calendarmodel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlobeCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Wikibase serializes empty maps as `[]`
fn map_or_empty_list<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<T> {
        Map(IndexMap<String, T>),
        List(Vec<IgnoredAny>),
    }

    Ok(match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => map,
        MapOrList::List(_) => IndexMap::new(),
    })
}

/// A value collected for an output property.
///
/// References compare and hash by id only. Their display form is looked
/// up in the [`DeferredRegistry`](crate::collect::DeferredRegistry) at
/// write time unless the reference carries its own label.
#[derive(Debug, Clone)]
pub enum ResolvedValue {
    Literal(String),
    Reference { id: String, label: Option<String> },
}

impl ResolvedValue {
    pub fn literal(text: impl Into<String>) -> Self {
        ResolvedValue::Literal(text.into())
    }

    pub fn reference(id: impl Into<String>) -> Self {
        ResolvedValue::Reference {
            id: id.into(),
            label: None,
        }
    }

    pub fn labelled(id: impl Into<String>, label: impl Into<String>) -> Self {
        ResolvedValue::Reference {
            id: id.into(),
            label: Some(label.into()),
        }
    }

    pub fn reference_id(&self) -> Option<&str> {
        match self {
            ResolvedValue::Reference { id, .. } => Some(id),
            ResolvedValue::Literal(_) => None,
        }
    }

    /// Literal text or reference id, ignoring any label
    pub fn raw(&self) -> &str {
        match self {
            ResolvedValue::Literal(text) => text,
            ResolvedValue::Reference { id, .. } => id,
        }
    }

    /// Text written to the output: own label, else registry label, else id
    pub fn display<'a>(&'a self, registry: &'a DeferredRegistry) -> &'a str {
        match self {
            ResolvedValue::Literal(text) => text,
            ResolvedValue::Reference { label: Some(label), .. } => label,
            ResolvedValue::Reference { id, label: None } => registry.display(id),
        }
    }
}

impl PartialEq for ResolvedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ResolvedValue::Literal(a), ResolvedValue::Literal(b)) => a == b,
            (ResolvedValue::Reference { id: a, .. }, ResolvedValue::Reference { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for ResolvedValue {}

impl Hash for ResolvedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        self.raw().hash(state);
    }
}

/// Output-side record: property name to its collected values, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemRecord {
    properties: IndexMap<String, Vec<ResolvedValue>>,
}

impl ItemRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property's values
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<ResolvedValue>) {
        self.properties.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[ResolvedValue]> {
        self.properties.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ResolvedValue])> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Item records keyed by key-property value, in first-insertion order
pub type ItemMap = IndexMap<String, ItemRecord>;

/// Entity id to `"lat, lon"`
pub type CoordinateTable = IndexMap<String, String>;

/// Configuration for extraction
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Entities must have a statement for this property to be selected
    pub qualifying_property: String,

    /// Property whose values key the output records (GND id)
    pub key_property: String,

    /// Property carrying coordinates of referenced entities
    pub coordinate_property: String,

    /// Language of labels and aliases
    pub label_language: String,

    /// Property id to output name, emitted in this order
    pub tracked_properties: IndexMap<String, String>,

    /// Output property the denormalizer filters
    pub occupation_field: String,

    /// Output property the denormalizer adds
    pub derived_field: String,

    /// Log progress every N items (0 disables)
    pub progress_interval: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        let tracked_properties = [
            ("P106", "occupation"),
            ("P21", "gender"),
            ("P569", "date_of_birth"),
            ("P19", "place_of_birth"),
            ("P570", "date_of_death"),
            ("P20", "place_of_death"),
            ("P103", "native_language"),
            ("P1412", "languages"),
            ("P166", "awards"),
            ("P18", "image"),
        ]
        .into_iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect();

        ExtractConfig {
            qualifying_property: String::from("P106"),
            key_property: String::from("P227"),
            coordinate_property: String::from("P625"),
            label_language: String::from("en"),
            tracked_properties,
            occupation_field: String::from("occupation"),
            derived_field: String::from("occupation_writer"),
            progress_interval: 100_000,
        }
    }
}
