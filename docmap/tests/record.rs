use docmap::{
    bson::{Bson, doc},
    memory::InMemoryStore,
    prelude::*,
};

#[derive(Debug, Default, PartialEq, Record)]
struct Page {
    #[record(id)]
    slug: String,
    #[record(rename = "heading")]
    title: String,
    #[record(skip)]
    rendered: Option<String>,
}

#[test]
fn derive_resolves_through_the_umbrella_crate() {
    let schema = Page::schema();

    assert_eq!(schema.name(), "Page");
    assert_eq!(schema.id_field(), Some("slug"));
    assert_eq!(schema.field_names().collect::<Vec<_>>(), ["heading"]);
}

#[tokio::test]
async fn custom_identifiers_and_renamed_fields_round_trip_through_the_store() {
    let handle = StoreHandle::new(InMemoryStore::new());
    let pages = Adaptor::<Page>::new("pages", handle.clone());

    let page = Page {
        slug: "intro".to_string(),
        title: "Introduction".to_string(),
        rendered: Some("<h1>Introduction</h1>".to_string()),
    };

    let outcome = pages.upsert(&page).await.unwrap();
    assert_eq!(outcome.upserted_id, Some(Bson::String("intro".to_string())));

    let raw = handle
        .collection("pages")
        .find_all(doc! {}, FindOptions::new())
        .await
        .unwrap();
    assert_eq!(raw, vec![doc! { "_id": "intro", "heading": "Introduction" }]);

    let fetched = pages.fetch(doc! { "_id": "intro" }, FindOptions::new()).await.unwrap();
    assert_eq!(
        fetched,
        Some(Page {
            slug: "intro".to_string(),
            title: "Introduction".to_string(),
            rendered: None,
        })
    );
}

#[tokio::test]
async fn empty_string_identifiers_still_count_as_set() {
    let pages = Adaptor::<Page>::new("pages", StoreHandle::new(InMemoryStore::new()));

    let outcome = pages.update(&Page::default()).await.unwrap();
    assert_eq!(outcome.matched_count, 0);
}
