use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExtractError;
use crate::graph::BlockGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    DateOfBirth,
    ExpiryDate,
    Surname,
    GivenNames,
    PassportNumber,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::DateOfBirth => "dateOfBirth",
            CanonicalField::ExpiryDate => "expiryDate",
            CanonicalField::Surname => "surname",
            CanonicalField::GivenNames => "givenNames",
            CanonicalField::PassportNumber => "passportNumber",
        }
    }

    /// Fields whose text goes through the date normalizer.
    pub fn is_date(&self) -> bool {
        matches!(self, CanonicalField::DateOfBirth | CanonicalField::ExpiryDate)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which label set the scanned documents use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentVariant {
    /// "Date of Birth" / "Expiry Date"
    #[default]
    Plain,
    /// English/French labels, five fields including the passport number
    Bilingual,
}

impl FromStr for DocumentVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(DocumentVariant::Plain),
            "bilingual" => Ok(DocumentVariant::Bilingual),
            other => anyhow::bail!("Unknown document variant: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: CanonicalField,
    /// Raw key text as printed on the document
    pub label: String,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(field: CanonicalField, label: &str) -> Self {
        Self {
            field,
            label: label.to_string(),
            required: true,
        }
    }

    pub fn optional(field: CanonicalField, label: &str) -> Self {
        Self {
            field,
            label: label.to_string(),
            required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub variant: DocumentVariant,
    pub fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(variant: DocumentVariant, fields: Vec<FieldSpec>) -> Self {
        Self { variant, fields }
    }

    pub fn for_variant(variant: DocumentVariant) -> Self {
        let fields = match variant {
            DocumentVariant::Plain => vec![
                FieldSpec::required(CanonicalField::DateOfBirth, "Date of Birth"),
                FieldSpec::required(CanonicalField::ExpiryDate, "Expiry Date"),
            ],
            DocumentVariant::Bilingual => vec![
                FieldSpec::required(CanonicalField::Surname, "Surname/ Nom"),
                FieldSpec::required(CanonicalField::GivenNames, "Given Names/ Prénoms"),
                FieldSpec::required(
                    CanonicalField::DateOfBirth,
                    "Date of birth/ Date du naissance",
                ),
                FieldSpec::required(
                    CanonicalField::ExpiryDate,
                    "Date of expiration/ Date d'expiration",
                ),
                FieldSpec::required(
                    CanonicalField::PassportNumber,
                    "Passport No./ No du Passeport",
                ),
            ],
        };

        Self::new(variant, fields)
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::for_variant(DocumentVariant::default())
    }
}

/// Canonical field name -> text, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRecord {
    fields: BTreeMap<CanonicalField, String>,
}

impl FieldRecord {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn date_of_birth(&self) -> Option<&str> {
        self.get(CanonicalField::DateOfBirth)
    }

    pub fn expiry_date(&self) -> Option<&str> {
        self.get(CanonicalField::ExpiryDate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields.iter().map(|(field, value)| (*field, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn insert(&mut self, field: CanonicalField, value: String) {
        self.fields.insert(field, value);
    }

    pub(crate) fn get_mut(&mut self, field: CanonicalField) -> Option<&mut String> {
        self.fields.get_mut(&field)
    }
}

/// Label -> value text for every key block, in block order. Last label wins.
pub fn key_value_pairs(graph: &BlockGraph<'_>) -> HashMap<String, String> {
    let mut pairs = HashMap::new();

    for key in graph.blocks().filter(|block| block.is_key()) {
        let label = graph.text_of(key);
        if label.is_empty() {
            continue;
        }

        let value = graph
            .value_of(key)
            .map(|value| graph.text_of(value))
            .unwrap_or_default();

        if let Some(previous) = pairs.insert(label.clone(), value) {
            debug!(label = %label, previous = %previous, "Duplicate key label, keeping later value");
        }
    }

    pairs
}

pub struct FieldExtractor {
    schema: FieldSchema,
}

impl FieldExtractor {
    pub fn new(schema: FieldSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Map the graph's key/value pairs onto the schema's canonical fields.
    ///
    /// All-or-nothing: any empty required field fails the whole record.
    pub fn extract(&self, graph: &BlockGraph<'_>) -> Result<FieldRecord, ExtractError> {
        if graph.is_empty() {
            return Err(ExtractError::NoBlocks);
        }

        let pairs = key_value_pairs(graph);
        debug!(pairs = pairs.len(), "Collected key/value pairs");

        let mut record = FieldRecord::default();
        let mut missing = Vec::new();

        for spec in &self.schema.fields {
            let value = pairs.get(&spec.label).cloned().unwrap_or_default();
            if spec.required && value.is_empty() {
                missing.push(spec.field);
            }
            record.insert(spec.field, value);
        }

        if !missing.is_empty() {
            return Err(ExtractError::MissingFields(missing));
        }

        Ok(record)
    }
}
