use std::collections::HashMap;
use std::sync::Mutex;

use flipdesk_core::{CategoryInfo, CategorySyncConfig, ResolutionSource};

use super::*;

fn info(id: &str, name: &str, leaf: bool, parent: Option<&str>) -> CategoryInfo {
    CategoryInfo {
        category_id: id.to_string(),
        category_name: name.to_string(),
        leaf,
        parent_id: parent.map(str::to_string),
        path: vec![name.to_string()],
    }
}

#[derive(Default)]
struct FakeSource {
    branches: HashMap<String, CategoryBranch>,
    suggestions: Vec<CategoryInfo>,
    branch_error: bool,
    suggest_error: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeSource {
    fn motors() -> Self {
        let mut source = FakeSource::default();
        source.add(
            info("6000", "Motors", false, None),
            vec![info("6001", "Parts", true, Some("6000"))],
        );
        source.add(info("6001", "Parts", true, Some("6000")), vec![]);
        source
    }

    fn add(&mut self, node: CategoryInfo, children: Vec<CategoryInfo>) {
        self.branches
            .insert(node.category_id.clone(), CategoryBranch { node, children });
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("lock").clone()
    }
}

impl CategorySource for FakeSource {
    type Error = String;

    async fn branch(&self, category_id: &str) -> Result<Option<CategoryBranch>, String> {
        if self.branch_error {
            return Err("taxonomy unavailable".to_string());
        }
        Ok(self.branches.get(category_id).cloned())
    }

    async fn suggest(&self, query: &str) -> Result<Vec<CategoryInfo>, String> {
        self.queries.lock().expect("lock").push(query.to_string());
        if self.suggest_error {
            return Err("suggestion service returned 500".to_string());
        }
        Ok(self.suggestions.clone())
    }
}

fn resolver(source: FakeSource) -> LeafResolver<FakeSource> {
    LeafResolver::new(source, &CategorySyncConfig::default())
}

fn with_id(id: &str) -> ResolveRequest {
    ResolveRequest {
        category_id: Some(id.to_string()),
        ..ResolveRequest::default()
    }
}

#[tokio::test]
async fn known_leaf_is_accepted_without_lookup() {
    let source = FakeSource {
        branch_error: true,
        ..FakeSource::default()
    };
    let request = ResolveRequest {
        category_id: Some("177".to_string()),
        category_name: Some("Laptops".to_string()),
        known_leaf: true,
        ..ResolveRequest::default()
    };

    let result = resolver(source).resolve(&request).await;

    assert_eq!(result.category_id, "177");
    assert_eq!(result.category_name, "Laptops");
    assert_eq!(result.source, ResolutionSource::PreResolved);
    assert!(result.is_leaf);
}

#[tokio::test]
async fn leaf_candidate_is_returned_as_is() {
    let result = resolver(FakeSource::motors()).resolve(&with_id("6001")).await;

    assert_eq!(result.category_id, "6001");
    assert_eq!(result.source, ResolutionSource::Candidate);
}

#[tokio::test]
async fn non_leaf_candidate_descends_to_first_leaf_child() {
    let result = resolver(FakeSource::motors()).resolve(&with_id("6000")).await;

    assert_eq!(result.category_id, "6001");
    assert!(result.is_leaf);
    assert_eq!(result.source, ResolutionSource::Descended);
    assert_eq!(result.path, vec!["Motors", "Parts"]);
}

#[tokio::test]
async fn descent_skips_non_leaf_children() {
    let mut source = FakeSource::default();
    source.add(
        info("10", "Collectibles", false, None),
        vec![
            info("11", "Advertising", false, Some("10")),
            info("12", "Animation Art", true, Some("10")),
            info("13", "Autographs", true, Some("10")),
        ],
    );

    let result = resolver(source).resolve(&with_id("10")).await;
    assert_eq!(result.category_id, "12");
}

#[tokio::test]
async fn unknown_id_with_failing_suggestions_falls_back() {
    let source = FakeSource {
        suggest_error: true,
        ..FakeSource::motors()
    };
    let request = ResolveRequest {
        category_id: Some("999999".to_string()),
        title: Some("Vintage brass lamp".to_string()),
        ..ResolveRequest::default()
    };

    let result = resolver(source).resolve(&request).await;

    assert_eq!(result.category_id, "1249");
    assert_eq!(result.category_name, "Everything Else");
    assert_eq!(result.source, ResolutionSource::Fallback);
    assert!(result.is_leaf);
}

#[tokio::test]
async fn lookup_errors_fall_through_to_suggestions() {
    let source = FakeSource {
        branch_error: true,
        suggestions: vec![info("33615", "Brakes", true, Some("6028"))],
        ..FakeSource::default()
    };
    let request = ResolveRequest {
        category_id: Some("6000".to_string()),
        title: Some("Front brake pads".to_string()),
        ..ResolveRequest::default()
    };

    let result = resolver(source).resolve(&request).await;

    assert_eq!(result.category_id, "33615");
    assert_eq!(result.source, ResolutionSource::Suggested);
}

#[tokio::test]
async fn non_leaf_without_leaf_children_uses_suggestion() {
    let mut source = FakeSource::default();
    source.add(
        info("20", "Antiques", false, None),
        vec![info("21", "Architectural", false, Some("20"))],
    );
    source.suggestions = vec![info("37908", "Lamps", true, Some("20"))];
    let request = ResolveRequest {
        category_id: Some("20".to_string()),
        title: Some("Art deco lamp".to_string()),
        ..ResolveRequest::default()
    };

    let result = resolver(source).resolve(&request).await;
    assert_eq!(result.category_id, "37908");
}

#[tokio::test]
async fn non_leaf_suggestion_descends_once() {
    let mut source = FakeSource::motors();
    let mut suggested = info("6000", "Motors", false, None);
    suggested.path = vec!["Motors".to_string()];
    source.suggestions = vec![suggested];
    let request = ResolveRequest {
        title: Some("car parts".to_string()),
        ..ResolveRequest::default()
    };

    let result = resolver(source).resolve(&request).await;

    assert_eq!(result.category_id, "6001");
    assert_eq!(result.source, ResolutionSource::Descended);
}

#[tokio::test]
async fn empty_query_skips_suggestions() {
    let source = FakeSource::default();
    let request = ResolveRequest {
        title: Some("   ".to_string()),
        description: Some("\n\t".to_string()),
        ..ResolveRequest::default()
    };

    let resolver = resolver(source);
    let result = resolver.resolve(&request).await;

    assert_eq!(result.source, ResolutionSource::Fallback);
    assert!(resolver.source.queries().is_empty());
}

#[tokio::test]
async fn malformed_id_skips_lookup() {
    let source = FakeSource {
        branch_error: true,
        ..FakeSource::default()
    };
    let result = resolver(source).resolve(&with_id("abc-123")).await;
    assert_eq!(result.source, ResolutionSource::Fallback);
}

#[tokio::test]
async fn suggestion_query_is_truncated() {
    let mut source = FakeSource::default();
    source.suggestions = vec![info("1", "Thing", true, None)];
    let request = ResolveRequest {
        title: Some("a".repeat(300)),
        description: Some("b".repeat(300)),
        ..ResolveRequest::default()
    };

    let resolver = resolver(source);
    resolver.resolve(&request).await;

    let queries = resolver.source.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].chars().count(), 350);
}

#[tokio::test]
async fn fallback_uses_configured_category() {
    let config = CategorySyncConfig {
        fallback_category_id: "99".to_string(),
        fallback_category_name: "Other".to_string(),
        ..CategorySyncConfig::default()
    };
    let resolver = LeafResolver::new(FakeSource::default(), &config);

    let result = resolver.resolve(&ResolveRequest::default()).await;

    assert_eq!(result.category_id, "99");
    assert_eq!(result.category_name, "Other");
    assert_eq!(result.path, vec!["Other"]);
}

#[tokio::test]
async fn resolve_always_returns_a_leaf() {
    let requests = [
        ResolveRequest::default(),
        with_id("6000"),
        with_id("6001"),
        with_id("not-a-number"),
        with_id("12345678901"),
        ResolveRequest {
            title: Some("anything".to_string()),
            ..ResolveRequest::default()
        },
    ];
    let sources: [fn() -> FakeSource; 2] = [
        FakeSource::motors,
        || FakeSource {
            branch_error: true,
            suggest_error: true,
            ..FakeSource::default()
        },
    ];

    for make_source in sources {
        let resolver = resolver(make_source());
        for request in &requests {
            let result = resolver.resolve(request).await;
            assert!(result.is_leaf, "non-leaf result for {request:?}");
            assert!(!result.category_id.is_empty());
        }
    }
}

#[tokio::test]
async fn validate_reports_existence_and_leaf() {
    let resolver = resolver(FakeSource::motors());

    let parent = resolver.validate("6000").await.expect("validate");
    assert!(parent.exists);
    assert!(!parent.is_leaf);

    let leaf = resolver.validate("6001").await.expect("validate");
    assert!(leaf.exists && leaf.is_leaf);
    assert_eq!(leaf.category_name.as_deref(), Some("Parts"));

    let missing = resolver.validate("424242").await.expect("validate");
    assert!(!missing.exists);

    let malformed = resolver.validate("drop table").await.expect("validate");
    assert!(!malformed.exists);
}

#[tokio::test]
async fn validate_propagates_source_errors() {
    let source = FakeSource {
        branch_error: true,
        ..FakeSource::default()
    };
    assert!(resolver(source).validate("6000").await.is_err());
}

#[tokio::test]
async fn leaf_children_filters_and_extends_path() {
    let mut source = FakeSource::default();
    source.add(
        info("10", "Collectibles", false, None),
        vec![
            info("11", "Advertising", false, Some("10")),
            info("12", "Animation Art", true, Some("10")),
        ],
    );

    let children = resolver(source).leaf_children("10").await.expect("children");

    assert_eq!(children.len(), 1);
    assert_eq!(children[0].category_id, "12");
    assert_eq!(children[0].path, vec!["Collectibles", "Animation Art"]);
}

#[tokio::test]
async fn leaf_children_of_unknown_parent_is_empty() {
    let children = resolver(FakeSource::motors())
        .leaf_children("31337")
        .await
        .expect("children");
    assert!(children.is_empty());
}

#[tokio::test]
async fn suggest_with_blank_input_does_not_call_source() {
    let resolver = resolver(FakeSource::default());
    let suggestions = resolver.suggest("", "  ").await.expect("suggest");
    assert!(suggestions.is_empty());
    assert!(resolver.source.queries().is_empty());
}

#[test]
fn resolve_request_accepts_both_spellings() {
    let snake: ResolveRequest = serde_json::from_value(serde_json::json!({
        "category_id": "6000",
        "known_leaf": false
    }))
    .expect("decode");
    assert_eq!(snake.category_id.as_deref(), Some("6000"));

    let request: ResolveRequest = serde_json::from_value(serde_json::json!({
        "categoryId": "6000",
        "knownLeaf": true,
        "title": "Brake pads"
    }))
    .expect("decode");

    assert_eq!(request.category_id.as_deref(), Some("6000"));
    assert!(request.known_leaf);
    assert!(request.description.is_none());
}
