mod helpers;

use std::sync::Arc;

use helpers::{doc, StaticProvider};
use sema::error::EngineError;
use sema::store::SemanticStore;

fn store_with(provider: StaticProvider) -> SemanticStore {
    SemanticStore::new(Arc::new(provider))
}

#[tokio::test]
async fn search_on_empty_store_fails() {
    let store = store_with(StaticProvider::ready());
    let err = store.search("x", 3).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyStore));
}

#[tokio::test]
async fn empty_store_beats_uninitialized_provider() {
    // An uninitialized provider on an empty store still reports EmptyStore:
    // the store is checked before the provider is ever touched.
    let store = store_with(StaticProvider::uninitialized());
    let err = store.search("x", 3).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyStore));
}

#[tokio::test]
async fn ingestion_keeps_collections_parallel() {
    let mut store = store_with(StaticProvider::ready());
    assert!(!store.is_ready());

    let appended = store
        .add_documents(
            vec![
                doc("a", "cats are mammals"),
                doc("b", "rockets use fuel"),
                doc("c", "bread needs yeast"),
            ],
            None,
        )
        .await
        .unwrap();

    assert_eq!(appended, 3);
    assert_eq!(store.len(), 3);
    assert!(store.is_ready());
}

#[tokio::test]
async fn empty_ingestion_leaves_ready_unchanged() {
    let mut store = store_with(StaticProvider::ready());
    let appended = store.add_documents(vec![], None).await.unwrap();
    assert_eq!(appended, 0);
    assert!(!store.is_ready());

    let err = store.search("x", 1).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyStore));
}

#[tokio::test]
async fn scores_are_non_increasing_and_top_k_clamps() {
    let mut store = store_with(StaticProvider::ready());
    let docs: Vec<_> = (0..5)
        .map(|i| doc(&format!("d{i}"), &format!("document number {i}")))
        .collect();
    store.add_documents(docs, None).await.unwrap();

    let results = store.search("some query text", 3).await.unwrap();
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score, "ranking must be descending");
    }

    // top_k larger than the corpus is not an error; exactly `size` entries.
    let results = store.search("some query text", 50).await.unwrap();
    assert_eq!(results.len(), 5);
}

#[tokio::test]
async fn repeated_searches_are_deterministic() {
    let mut store = store_with(StaticProvider::ready());
    let docs: Vec<_> = (0..6)
        .map(|i| doc(&format!("d{i}"), &format!("entry about topic {i}")))
        .collect();
    store.add_documents(docs, None).await.unwrap();

    let first = store.search("topic", 6).await.unwrap();
    let second = store.search("topic", 6).await.unwrap();

    let ids = |rs: &[sema::store::ScoredDocument]| -> Vec<String> {
        rs.iter().map(|r| r.document.id.clone()).collect()
    };
    assert_eq!(ids(&first), ids(&second));
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.score, b.score);
    }
}

#[tokio::test]
async fn exact_content_query_ranks_itself_first() {
    let mut store = store_with(StaticProvider::ready());
    store
        .add_documents(
            vec![
                doc("a", "cats are mammals"),
                doc("b", "rockets use fuel"),
                doc("c", "bread needs yeast"),
            ],
            None,
        )
        .await
        .unwrap();

    let results = store.search("rockets use fuel", 3).await.unwrap();
    assert_eq!(results[0].document.id, "b");
    assert!(
        (results[0].score - 1.0).abs() < 1e-5,
        "self-similarity should be ~1.0, got {}",
        results[0].score
    );
}

#[tokio::test]
async fn semantically_closer_document_wins() {
    // "feline animals" sits almost on the same axis as document "a".
    let provider = StaticProvider::ready()
        .with("cats are mammals", &[1.0, 0.0])
        .with("rockets use fuel", &[0.0, 1.0])
        .with("feline animals", &[0.9, 0.1]);
    let mut store = store_with(provider);
    store
        .add_documents(
            vec![doc("a", "cats are mammals"), doc("b", "rockets use fuel")],
            None,
        )
        .await
        .unwrap();

    let top = store.search("feline animals", 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].document.id, "a");

    let both = store.search("feline animals", 2).await.unwrap();
    assert_eq!(both[1].document.id, "b");
    assert!(both[0].score > both[1].score);
}

#[tokio::test]
async fn equal_scores_keep_insertion_order() {
    let provider = StaticProvider::ready()
        .with("first twin", &[0.0, 1.0])
        .with("second twin", &[0.0, 1.0])
        .with("the query", &[0.0, 1.0]);
    let mut store = store_with(provider);
    store
        .add_documents(vec![doc("one", "first twin"), doc("two", "second twin")], None)
        .await
        .unwrap();

    let results = store.search("the query", 2).await.unwrap();
    assert_eq!(results[0].document.id, "one");
    assert_eq!(results[1].document.id, "two");
    assert_eq!(results[0].score, results[1].score);
}

#[tokio::test]
async fn zero_norm_vector_ranks_last() {
    let provider = StaticProvider::ready()
        .with("all zeros", &[0.0, 0.0])
        .with("off axis", &[-1.0, -1.0])
        .with("the query", &[1.0, 0.0]);
    let mut store = store_with(provider);
    store
        .add_documents(vec![doc("zero", "all zeros"), doc("far", "off axis")], None)
        .await
        .unwrap();

    let results = store.search("the query", 2).await.unwrap();
    // Even a negatively-correlated document beats the zero-norm one.
    assert_eq!(results[0].document.id, "far");
    assert_eq!(results[1].document.id, "zero");
    assert_eq!(results[1].score, f32::NEG_INFINITY);
}

#[tokio::test]
async fn duplicate_ids_coexist_as_separate_entries() {
    let mut store = store_with(StaticProvider::ready());
    store
        .add_documents(vec![doc("same", "original text")], None)
        .await
        .unwrap();
    store
        .add_documents(vec![doc("same", "replacement text")], None)
        .await
        .unwrap();

    // Pure append: no dedup, no overwrite.
    assert_eq!(store.len(), 2);
    let results = store.search("original text", 2).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn clear_is_idempotent_and_resets_ready() {
    let mut store = store_with(StaticProvider::ready());
    store
        .add_documents(vec![doc("a", "something")], None)
        .await
        .unwrap();
    assert!(store.is_ready());

    store.clear();
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
    assert!(!store.is_ready());
    let err = store.search("something", 1).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyStore));

    store.clear();
    assert!(!store.is_ready());
}
