use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    KeyValueSet,
    Page,
    Line,
    Word,
    SelectionElement,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Key,
    Value,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Child,
    Value,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// One node of the forms-analysis output graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub block_type: Option<BlockType>,
    #[serde(default)]
    pub entity_types: Vec<EntityType>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub relationships: Option<Vec<Relationship>>,
}

impl Block {
    /// A `KEY_VALUE_SET` block tagged as `KEY`.
    pub fn is_key(&self) -> bool {
        self.block_type == Some(BlockType::KeyValueSet)
            && self.entity_types.contains(&EntityType::Key)
    }

    pub fn has_relationship(&self, kind: RelationshipType) -> bool {
        self.relationships
            .iter()
            .flatten()
            .any(|rel| rel.relationship_type == kind)
    }

    /// Ids of every relationship of `kind`, in relationship order.
    pub fn relationship_ids(&self, kind: RelationshipType) -> impl Iterator<Item = &str> + '_ {
        self.relationships
            .iter()
            .flatten()
            .filter(move |rel| rel.relationship_type == kind)
            .flat_map(|rel| rel.ids.iter().map(String::as_str))
    }

    pub fn first_relationship(&self, kind: RelationshipType) -> Option<&Relationship> {
        self.relationships
            .iter()
            .flatten()
            .find(|rel| rel.relationship_type == kind)
    }
}

/// Body of an `AnalyzeDocument` response. Only the blocks are consumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeDocumentOutput {
    #[serde(default)]
    pub blocks: Option<Vec<Block>>,
}
