/*!
 * Tests for entity models and listing filters
 */

use translation_store::database::repository::PageRequest;
use translation_store::{
    Entity, EntityKind, File, SortColumn, SortOrder, TransUnit, TransUnitFilters,
};

#[test]
fn test_entity_serialize_shouldTagKind() {
    let mut unit = TransUnit::new("menu.home", "messages");
    unit.set_translation("fr", "Accueil");

    let json = serde_json::to_value(Entity::from(unit.clone())).unwrap();
    assert_eq!(json["kind"], "trans_unit");
    assert_eq!(json["key"], "menu.home");
    assert_eq!(json["translations"][0]["locale"], "fr");

    let back: Entity = serde_json::from_value(json).unwrap();
    assert_eq!(back, Entity::TransUnit(unit));
}

#[test]
fn test_entityKind_stagedKind_shouldFoldTranslationsIntoUnits() {
    assert_eq!(EntityKind::Translation.staged_kind(), EntityKind::TransUnit);
    assert_eq!(EntityKind::File.staged_kind(), EntityKind::File);
    assert_eq!(EntityKind::TransUnit.to_string(), "trans_unit");
}

#[test]
fn test_removeTranslation_shouldDropOnlyThatLocale() {
    let mut unit = TransUnit::new("menu.home", "messages");
    unit.set_translation("fr", "Accueil");
    unit.set_translation("en", "Home");

    let removed = unit.remove_translation("fr").expect("fr should exist");
    assert_eq!(removed.content, "Accueil");
    assert!(!unit.has_translation("fr"));
    assert!(unit.has_translation("en"));
    assert!(unit.remove_translation("de").is_none());
}

#[test]
fn test_newManualTranslation_shouldNotCountAsUpdatedSinceImport() {
    let mut unit = TransUnit::new("menu.home", "messages");
    let translation = unit.set_translation("fr", "Accueil");

    assert!(translation.modified_manually);
    assert!(translation.file_id.is_none());
    assert!(!translation.is_updated_since_import());
}

#[test]
fn test_fileNew_withSameContent_shouldShareHashButNotId() {
    let first = File::new("a/messages.fr.json", "fr", ["messages"], b"{\"a\":\"b\"}");
    let second = File::new("b/messages.fr.json", "fr", ["messages"], b"{\"a\":\"b\"}");

    assert_eq!(first.hash, second.hash);
    assert_ne!(first.id, second.id);
}

#[test]
fn test_filters_builders_shouldEnableSearch() {
    let filters = TransUnitFilters::default()
        .with_key("menu")
        .with_content("fr", "Accueil")
        .sorted_by(SortColumn::UpdatedAt, SortOrder::Desc);

    assert!(filters.search);
    assert_eq!(filters.key.as_deref(), Some("menu"));
    assert!(filters.domain.is_none());
    assert_eq!(filters.sort, SortColumn::UpdatedAt);
    assert_eq!(filters.order.to_string(), "DESC");

    let json = serde_json::to_value(&filters).unwrap();
    assert_eq!(json["_search"], true);
}

#[test]
fn test_pageRequest_withValidValues_shouldComputeOffset() {
    let page = PageRequest::new(10, 4).unwrap();
    assert_eq!(page.rows(), 10);
    assert_eq!(page.page(), 4);
    assert_eq!(page.offset(), 30);
}
