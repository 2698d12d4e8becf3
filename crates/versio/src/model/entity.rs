use crate::model::relation::RelationModel;

///
/// EntityModel
/// Minimal, macro-generated runtime model for one entity.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Fully-qualified type path (for diagnostics).
    pub path: &'static str,
    /// Stable name used as the type tag in indexes and caches.
    pub entity_name: &'static str,
    /// Reference-valued fields in declaration order.
    pub relations: &'static [RelationModel],
}

impl EntityModel {
    /// Look up one relation field by name.
    #[must_use]
    pub fn relation(&self, field: &str) -> Option<&'static RelationModel> {
        self.relations.iter().find(|relation| relation.field == field)
    }
}
