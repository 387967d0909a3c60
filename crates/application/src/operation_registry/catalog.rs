use std::collections::BTreeSet;

use hrdesk_core::AppError;
use hrdesk_domain::{CatalogEntry, OperationKey};
use tracing::{debug, warn};

use super::{MAX_REGISTRY_DEPTH, OperationDescriptor, OperationNode, OperationRegistry};

/// Typed visitor over the operation tree.
pub trait RegistryVisitor {
    /// Called once per leaf with its module path and action name.
    fn visit_operation(&mut self, module: &str, action: &str, descriptor: &OperationDescriptor);

    /// Called when a mounted subtree fails to load.
    fn visit_failed_mount(&mut self, path: &str, error: &AppError) {
        warn!(path, %error, "skipping operation subtree that failed to load");
    }

    /// Called for nodes the visitor does not understand.
    fn visit_unknown(&mut self, path: &str, tag: &str) {
        debug!(path, tag, "skipping unrecognized operation registry node");
    }
}

/// Walks the registry depth-first in name order.
pub fn walk_registry(registry: &OperationRegistry, visitor: &mut dyn RegistryVisitor) {
    walk_group(registry, "", 0, visitor);
}

fn walk_group(
    registry: &OperationRegistry,
    prefix: &str,
    depth: usize,
    visitor: &mut dyn RegistryVisitor,
) {
    for (name, node) in registry.children() {
        match node {
            OperationNode::Leaf(descriptor) => visitor.visit_operation(prefix, name, descriptor),
            OperationNode::Group(group) => {
                let path = join_path(prefix, name);
                match descend(depth, path.as_str()) {
                    Ok(depth) => walk_group(group, path.as_str(), depth, visitor),
                    Err(error) => visitor.visit_failed_mount(path.as_str(), &error),
                }
            }
            OperationNode::Mount(mount) => {
                let path = join_path(prefix, name);
                match descend(depth, path.as_str()).and_then(|depth| Ok((depth, mount.load()?))) {
                    Ok((depth, group)) => walk_group(&group, path.as_str(), depth, visitor),
                    Err(error) => visitor.visit_failed_mount(path.as_str(), &error),
                }
            }
            OperationNode::Unknown(tag) => {
                visitor.visit_unknown(join_path(prefix, name).as_str(), tag.as_str());
            }
        }
    }
}

fn descend(depth: usize, path: &str) -> Result<usize, AppError> {
    if depth >= MAX_REGISTRY_DEPTH {
        return Err(AppError::Validation(format!(
            "operation registry at '{path}' nests deeper than {MAX_REGISTRY_DEPTH} levels"
        )));
    }

    Ok(depth + 1)
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        return name.to_owned();
    }

    format!("{prefix}.{name}")
}

#[derive(Default)]
struct CatalogCollector {
    seen: BTreeSet<OperationKey>,
    entries: Vec<CatalogEntry>,
}

impl RegistryVisitor for CatalogCollector {
    fn visit_operation(&mut self, module: &str, action: &str, descriptor: &OperationDescriptor) {
        let entry = CatalogEntry {
            module: module.to_owned(),
            action: action.to_owned(),
            kind: descriptor.kind(),
        };

        if !self.seen.insert(entry.key()) {
            warn!(module, action, "dropping duplicate operation catalog entry");
            return;
        }

        self.entries.push(entry);
    }
}

/// Flattens the registry into `(module, action, kind)` rows.
///
/// Subtrees that fail to load are logged and left out; everything else is
/// returned.
#[must_use]
pub fn extract_catalog(registry: &OperationRegistry) -> Vec<CatalogEntry> {
    let mut collector = CatalogCollector::default();
    walk_registry(registry, &mut collector);
    collector.entries
}
