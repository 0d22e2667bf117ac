use std::collections::HashMap;

use crate::schema::{Block, RelationshipType};

/// Id lookup over one document's blocks.
///
/// The borrowed slice is the arena; the map stores positions into it. Ids that
/// never resolve (dangling relationship targets) simply come back as `None`.
pub struct BlockGraph<'a> {
    blocks: &'a [Block],
    by_id: HashMap<&'a str, usize>,
}

impl<'a> BlockGraph<'a> {
    /// Index every block that carries an id. Later duplicates win.
    pub fn build(blocks: &'a [Block]) -> Self {
        let mut by_id = HashMap::with_capacity(blocks.len());
        for (position, block) in blocks.iter().enumerate() {
            if let Some(id) = block.id.as_deref() {
                by_id.insert(id, position);
            }
        }

        Self { blocks, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a Block> {
        self.by_id.get(id).map(|&position| &self.blocks[position])
    }

    /// All blocks in response order, including those without an id.
    pub fn blocks(&self) -> std::slice::Iter<'a, Block> {
        self.blocks.iter()
    }

    /// Number of indexed (id-bearing) blocks.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Displayed text of a block.
    ///
    /// With `CHILD` relationships: the children's text in relationship order,
    /// single-space joined. Children that don't resolve or carry no text are
    /// skipped. Without them: the block's own text.
    pub fn text_of(&self, block: &Block) -> String {
        if !block.has_relationship(RelationshipType::Child) {
            return block.text.clone().unwrap_or_default();
        }

        block
            .relationship_ids(RelationshipType::Child)
            .filter_map(|id| self.get(id))
            .filter_map(|child| child.text.as_deref())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The block paired with a key through its first `VALUE` relationship.
    pub fn value_of(&self, key: &Block) -> Option<&'a Block> {
        let relationship = key.first_relationship(RelationshipType::Value)?;
        let id = relationship.ids.first()?;
        self.get(id)
    }
}
