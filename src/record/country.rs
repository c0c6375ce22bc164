use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Document field holding the country's name
pub const COUNTRY_NAME_FIELD: &str = "country_name";

/// Normalized indicator field name
///
/// Derived from a headline label by keeping the text before the first `,` or
/// `(`, trimming it, lowercasing it and joining the remaining words with `_`.
/// "GDP per capita (current US$)" becomes `gdp_per_capita`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IndicatorKey(String);

impl IndicatorKey {
    pub fn from_label(label: &str) -> Self {
        let head = label.split([',', '(']).next().unwrap_or_default();
        let key = head
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latest reported value of one indicator and the year it refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub value: String,
    pub year: String,
}

impl MetadataValue {
    /// Builds a value from raw cell text; the year loses its parentheses
    pub fn from_cell(value: &str, raw_year: &str) -> Self {
        let year: String = raw_year.chars().filter(|c| *c != '(' && *c != ')').collect();
        Self {
            value: value.trim().to_string(),
            year: year.trim().to_string(),
        }
    }
}

/// A country name and the path of its detail page, as listed on the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryLink {
    pub name: String,
    pub path: String,
}

/// All scraped data for one country
///
/// Indicators keep the order of the discovered key list. Category labels are
/// attached by the merger and keyed by the dimension's document field.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub country_name: String,
    indicators: Vec<(IndicatorKey, Option<MetadataValue>)>,
    categories: BTreeMap<String, String>,
}

impl CountryRecord {
    pub fn new(country_name: impl Into<String>) -> Self {
        Self {
            country_name: country_name.into(),
            indicators: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    pub fn push_indicator(&mut self, key: IndicatorKey, value: Option<MetadataValue>) {
        self.indicators.push((key, value));
    }

    /// Looks up an indicator; `Some(None)` means the cell was empty
    pub fn indicator(&self, key: &str) -> Option<&Option<MetadataValue>> {
        self.indicators
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    pub fn indicators(&self) -> &[(IndicatorKey, Option<MetadataValue>)] {
        &self.indicators
    }

    pub fn set_category(&mut self, field: &str, label: &str) {
        self.categories.insert(field.to_string(), label.to_string());
    }

    pub fn category(&self, field: &str) -> Option<&str> {
        self.categories.get(field).map(String::as_str)
    }

    /// Renders the record as the document shape that gets persisted
    ///
    /// `country_name` first, then one field per indicator (`null` when the
    /// cell was empty), then one string field per resolved category.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            COUNTRY_NAME_FIELD.to_string(),
            Value::String(self.country_name.clone()),
        );

        for (key, value) in &self.indicators {
            let cell = match value {
                Some(v) => serde_json::json!({ "value": v.value, "year": v.year }),
                None => Value::Null,
            };
            doc.insert(key.to_string(), cell);
        }

        for (field, label) in &self.categories {
            doc.insert(field.clone(), Value::String(label.clone()));
        }

        Value::Object(doc)
    }
}

impl Serialize for CountryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}
