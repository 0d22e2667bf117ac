pub mod error;
pub mod fields;
pub mod graph;
pub mod normalizer;
pub mod schema;
pub mod textract;

pub use error::{DateParseError, ExtractError};
pub use fields::{CanonicalField, DocumentVariant, FieldExtractor, FieldRecord, FieldSchema, FieldSpec};
pub use graph::BlockGraph;
pub use normalizer::DateNormalizer;
pub use schema::{AnalyzeDocumentOutput, Block, BlockType, EntityType, Relationship, RelationshipType};
pub use textract::{DocumentAnalyzer, DocumentLocation, TextractClient};

use tracing::{debug, info};

pub struct Extractor {
    fields: FieldExtractor,
    normalizer: DateNormalizer,
}

impl Extractor {
    pub fn new(schema: FieldSchema) -> Self {
        Self {
            fields: FieldExtractor::new(schema),
            normalizer: DateNormalizer::new(),
        }
    }

    /// Build the record for one document's blocks: index, pair keys with
    /// values, validate, then normalize the date fields.
    pub fn extract_from_blocks(&self, blocks: &[Block]) -> Result<FieldRecord, ExtractError> {
        let graph = BlockGraph::build(blocks);
        debug!(blocks = blocks.len(), indexed = graph.len(), "Built block graph");

        let mut record = self.fields.extract(&graph)?;

        for spec in self.fields.schema().fields.iter().filter(|spec| spec.field.is_date()) {
            let Some(raw) = record.get_mut(spec.field) else {
                continue;
            };
            // Optional date fields may legitimately be blank.
            if raw.is_empty() {
                continue;
            }

            let normalized = self
                .normalizer
                .normalize(raw)
                .map_err(|source| ExtractError::InvalidDate {
                    field: spec.field,
                    source,
                })?;
            *raw = normalized;
        }

        Ok(record)
    }

    /// Run the OCR collaborator on a stored image and extract its fields
    pub async fn extract_document(
        &self,
        analyzer: &dyn DocumentAnalyzer,
        location: &DocumentLocation,
    ) -> Result<FieldRecord, ExtractError> {
        let output = analyzer
            .analyze(location)
            .await
            .map_err(ExtractError::Analysis)?;

        let blocks = match output.blocks {
            Some(blocks) if !blocks.is_empty() => blocks,
            _ => return Err(ExtractError::NoBlocks),
        };

        let record = self.extract_from_blocks(&blocks)?;
        info!(document = %location.name, fields = record.len(), "Extracted document fields");

        Ok(record)
    }

    pub fn schema(&self) -> &FieldSchema {
        self.fields.schema()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(FieldSchema::default())
    }
}
