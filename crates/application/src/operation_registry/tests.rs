use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use hrdesk_core::{AppError, AppResult};
use hrdesk_domain::{CatalogEntry, OperationKey, OperationKind};
use proptest::prelude::*;
use serde_json::Value;

use super::{
    MAX_REGISTRY_DEPTH, OperationDescriptor, OperationHandler, OperationNode, OperationRegistry,
    RegistryMount, RegistryVisitor, extract_catalog, walk_registry,
};
use crate::instrumentation::OperationCall;

struct NoopHandler;

#[async_trait]
impl OperationHandler for NoopHandler {
    async fn handle(&self, _call: &OperationCall<'_>, input: Value) -> AppResult<Value> {
        Ok(input)
    }
}

fn leaf(kind: OperationKind) -> OperationDescriptor {
    OperationDescriptor::protected(kind, "denied", Arc::new(NoopHandler))
}

fn entry(module: &str, action: &str, kind: OperationKind) -> CatalogEntry {
    CatalogEntry {
        module: module.to_owned(),
        action: action.to_owned(),
        kind,
    }
}

fn hr_registry() -> AppResult<OperationRegistry> {
    let user = OperationRegistry::new()
        .with_operation("all", leaf(OperationKind::Query))?
        .with_operation("delete", leaf(OperationKind::Mutation))?;
    let department = OperationRegistry::new().with_operation("getAll", leaf(OperationKind::Query))?;

    OperationRegistry::new()
        .with_group("user", user)?
        .with_group("department", department)
}

#[test]
fn hr_catalog_lists_every_leaf_in_name_order() {
    let registry = hr_registry();
    assert!(registry.is_ok());
    let registry = registry.unwrap_or_default();

    assert_eq!(
        extract_catalog(&registry),
        vec![
            entry("department", "getAll", OperationKind::Query),
            entry("user", "all", OperationKind::Query),
            entry("user", "delete", OperationKind::Mutation),
        ]
    );
}

#[test]
fn empty_registry_yields_empty_catalog() {
    assert!(extract_catalog(&OperationRegistry::new()).is_empty());
}

#[test]
fn root_leaf_has_empty_module() {
    let registry = OperationRegistry::new().with_operation("ping", leaf(OperationKind::Query));
    assert!(registry.is_ok());

    assert_eq!(
        extract_catalog(&registry.unwrap_or_default()),
        vec![entry("", "ping", OperationKind::Query)]
    );
}

#[test]
fn nested_groups_produce_dotted_modules() {
    let registry = OperationRegistry::new()
        .with_operation("upload", leaf(OperationKind::Mutation))
        .and_then(|avatar| OperationRegistry::new().with_group("avatar", avatar))
        .and_then(|profile| OperationRegistry::new().with_group("user", profile));
    assert!(registry.is_ok());

    assert_eq!(
        extract_catalog(&registry.unwrap_or_default()),
        vec![entry("user.avatar", "upload", OperationKind::Mutation)]
    );
}

#[test]
fn failing_mount_is_skipped_and_the_rest_is_returned() {
    let registry = hr_registry().and_then(|registry| {
        registry.with_mount(
            "reports",
            RegistryMount::new(|| Err(AppError::Internal("feature module failed".to_owned()))),
        )
    });
    assert!(registry.is_ok());

    let catalog = extract_catalog(&registry.unwrap_or_default());
    assert_eq!(catalog.len(), 3);
    assert!(catalog.iter().all(|entry| entry.module != "reports"));
}

#[test]
fn mounted_subtree_is_flattened_and_resolvable() {
    let registry = OperationRegistry::new().with_mount(
        "reports",
        RegistryMount::new(|| {
            OperationRegistry::new().with_operation("export", leaf(OperationKind::Mutation))
        }),
    );
    assert!(registry.is_ok());
    let registry = registry.unwrap_or_default();

    assert_eq!(
        extract_catalog(&registry),
        vec![entry("reports", "export", OperationKind::Mutation)]
    );

    let key = OperationKey::new("reports", "export");
    assert!(key.is_ok());
    if let Ok(key) = key {
        let resolved = registry.resolve(&key);
        assert!(matches!(
            resolved,
            Ok(Some(descriptor)) if descriptor.kind() == OperationKind::Mutation
        ));
    }
}

fn looping_mount() -> RegistryMount {
    RegistryMount::new(|| {
        OperationRegistry::new()
            .with_operation("refresh", leaf(OperationKind::Mutation))?
            .with_mount("again", looping_mount())
    })
}

#[derive(Default)]
struct FailedMounts(Vec<String>);

impl RegistryVisitor for FailedMounts {
    fn visit_operation(&mut self, _: &str, _: &str, _: &OperationDescriptor) {}

    fn visit_failed_mount(&mut self, path: &str, _error: &AppError) {
        self.0.push(path.to_owned());
    }
}

#[test]
fn self_mounting_subtree_stops_at_the_depth_limit() {
    let registry = OperationRegistry::new()
        .with_operation("ping", leaf(OperationKind::Query))
        .and_then(|registry| registry.with_mount("cache", looping_mount()));
    assert!(registry.is_ok());
    let registry = registry.unwrap_or_default();

    let catalog = extract_catalog(&registry);
    assert_eq!(catalog.len(), MAX_REGISTRY_DEPTH + 1);
    assert!(catalog.contains(&entry("cache", "refresh", OperationKind::Mutation)));
    assert!(catalog.contains(&entry("", "ping", OperationKind::Query)));

    let mut failed = FailedMounts::default();
    walk_registry(&registry, &mut failed);
    assert_eq!(failed.0.len(), 1);
    assert_eq!(failed.0[0].split('.').count(), MAX_REGISTRY_DEPTH + 1);

    let deep_path = vec!["again"; MAX_REGISTRY_DEPTH + 1].join(".");
    let key = OperationKey::parse_path(format!("cache.{deep_path}.refresh").as_str());
    assert!(key.is_ok());
    if let Ok(key) = key {
        assert!(matches!(registry.resolve(&key), Ok(None)));
    }
}

#[test]
fn unknown_nodes_are_ignored() {
    let mut registry = OperationRegistry::new();
    assert!(
        registry
            .insert("_meta", OperationNode::Unknown("router-config".to_owned()))
            .is_ok()
    );
    assert!(
        registry
            .insert("ping", OperationNode::Leaf(leaf(OperationKind::Query)))
            .is_ok()
    );

    assert_eq!(
        extract_catalog(&registry),
        vec![entry("", "ping", OperationKind::Query)]
    );
}

#[test]
fn registry_rejects_dotted_and_duplicate_names() {
    let dotted =
        OperationRegistry::new().with_operation("user.delete", leaf(OperationKind::Mutation));
    assert!(matches!(dotted, Err(AppError::Validation(_))));

    let duplicate = OperationRegistry::new()
        .with_operation("all", leaf(OperationKind::Query))
        .and_then(|registry| registry.with_operation("all", leaf(OperationKind::Mutation)));
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[test]
fn resolve_misses_groups_and_unknown_paths() {
    let registry = hr_registry().unwrap_or_default();

    for path in ["user", "user.missing", "department.getAll.deeper", "ghost.all"] {
        let key = OperationKey::parse_path(path);
        assert!(key.is_ok(), "{path} should parse");
        if let Ok(key) = key {
            assert!(matches!(registry.resolve(&key), Ok(None)), "{path} must not resolve");
        }
    }
}

#[derive(Debug, Clone)]
enum TreeShape {
    Leaf(OperationKind),
    Group(BTreeMap<String, TreeShape>),
}

fn kind_strategy() -> impl Strategy<Value = OperationKind> {
    prop_oneof![
        Just(OperationKind::Query),
        Just(OperationKind::Mutation),
        Just(OperationKind::Subscription),
    ]
}

fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, TreeShape>> {
    let leaf = kind_strategy().prop_map(TreeShape::Leaf);
    let node = leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-z][a-zA-Z]{0,5}", inner, 0..4).prop_map(TreeShape::Group)
    });

    prop::collection::btree_map("[a-z][a-zA-Z]{0,5}", node, 0..5)
}

fn build(shape: &BTreeMap<String, TreeShape>) -> AppResult<OperationRegistry> {
    let mut registry = OperationRegistry::new();
    for (name, child) in shape {
        let node = match child {
            TreeShape::Leaf(kind) => OperationNode::Leaf(leaf(*kind)),
            TreeShape::Group(children) => OperationNode::Group(build(children)?),
        };
        registry.insert(name.clone(), node)?;
    }

    Ok(registry)
}

fn expected_leaves(
    shape: &BTreeMap<String, TreeShape>,
    prefix: &str,
    out: &mut BTreeSet<(String, String, OperationKind)>,
) {
    for (name, child) in shape {
        match child {
            TreeShape::Leaf(kind) => {
                out.insert((prefix.to_owned(), name.clone(), *kind));
            }
            TreeShape::Group(children) => {
                let module = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                expected_leaves(children, module.as_str(), out);
            }
        }
    }
}

proptest! {
    #[test]
    fn catalog_has_exactly_one_tuple_per_leaf(shape in tree_strategy()) {
        let registry = build(&shape);
        prop_assert!(registry.is_ok());
        let catalog = extract_catalog(&registry.unwrap_or_default());

        let mut expected = BTreeSet::new();
        expected_leaves(&shape, "", &mut expected);

        let actual: BTreeSet<(String, String, OperationKind)> = catalog
            .iter()
            .map(|entry| (entry.module.clone(), entry.action.clone(), entry.kind))
            .collect();

        prop_assert_eq!(catalog.len(), expected.len());
        prop_assert_eq!(actual, expected);
    }
}
