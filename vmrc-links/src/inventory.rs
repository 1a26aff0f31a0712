//! Inventory tree assembly and traversal.
//!
//! vCenter exposes folders as flat listings filtered by parent. This module
//! reassembles them into owned per-datacenter trees, then walks the trees to
//! visit every machine record. Folder recursion is bounded by
//! [`MAX_FOLDER_DEPTH`] in both directions: assembly never fetches past the
//! bound and the walker never descends past it.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tracing::{debug, warn};
use vsphere_api::{Error as ApiError, VSphereApi, VmSummary};

use crate::error::Result;

/// Folder recursion bound. Folders nested deeper than this are not entered.
pub const MAX_FOLDER_DEPTH: usize = 10;

/// A node in a datacenter's VM folder tree.
#[derive(Debug, Clone)]
pub enum InventoryNode {
    Folder(FolderNode),
    Machine(VmRecord),
}

#[derive(Debug, Clone)]
pub struct FolderNode {
    pub name: String,
    pub children: Vec<InventoryNode>,
}

/// Connection metadata for one virtual machine.
#[derive(Debug, Clone, Serialize)]
pub struct VmRecord {
    pub moid: String,
    pub name: String,
    pub path: String,
    pub guest: String,
    pub power_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// Fetch the VM folder tree for one datacenter. The returned nodes are the
/// direct entries of the datacenter's root VM folder.
pub async fn fetch_datacenter_tree(
    api: &VSphereApi,
    datacenter: &str,
) -> Result<Vec<InventoryNode>> {
    let detail = api.get_datacenter(datacenter).await?;
    debug!("Root VM folder for {}: {}", detail.name, detail.vm_folder);
    fetch_folder_contents(api, datacenter, &detail.vm_folder, 1).await
}

/// Fetch the entries of one folder. `depth` is the depth of those entries,
/// counted from 1 at the root VM folder's direct children.
fn fetch_folder_contents<'a>(
    api: &'a VSphereApi,
    datacenter: &'a str,
    folder: &'a str,
    depth: usize,
) -> Pin<Box<dyn Future<Output = Result<Vec<InventoryNode>>> + 'a>> {
    Box::pin(async move {
        let mut nodes = Vec::new();

        for child in api.list_folders(Some(datacenter), Some(folder)).await? {
            let children = if depth > MAX_FOLDER_DEPTH {
                warn!(
                    "Folder {:?} nested deeper than {} levels, skipping its contents",
                    child.name, MAX_FOLDER_DEPTH
                );
                Vec::new()
            } else {
                fetch_folder_contents(api, datacenter, &child.folder, depth + 1).await?
            };
            nodes.push(InventoryNode::Folder(FolderNode {
                name: child.name,
                children,
            }));
        }

        for vm in api.list_vms(folder).await? {
            nodes.push(InventoryNode::Machine(fetch_vm_record(api, vm).await?));
        }

        Ok(nodes)
    })
}

/// Join a VM summary with its detail and guest identity.
async fn fetch_vm_record(api: &VSphereApi, summary: VmSummary) -> Result<VmRecord> {
    let detail = api.get_vm(&summary.vm).await?;

    let (guest_full_name, ip_address) = match api.get_guest_identity(&summary.vm).await {
        Ok(identity) => (
            identity.full_name.map(|m| m.default_message),
            identity.ip_address,
        ),
        Err(ApiError::GuestUnavailable) => (None, None),
        Err(e) => return Err(e.into()),
    };

    Ok(VmRecord {
        moid: summary.vm,
        name: summary.name,
        path: detail.path.unwrap_or_default(),
        guest: guest_full_name
            .or(detail.guest_os)
            .unwrap_or_default(),
        power_state: summary.power_state,
        annotation: non_blank(detail.annotation),
        ip_address: non_blank(ip_address),
        question: non_blank(detail.question),
    })
}

/// Blank strings from the API are treated as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Visit every machine record in the tree, depth-first.
pub fn walk<'a, F>(nodes: &'a [InventoryNode], f: &mut F)
where
    F: FnMut(&'a VmRecord),
{
    for node in nodes {
        walk_node(node, 1, f);
    }
}

fn walk_node<'a, F>(node: &'a InventoryNode, depth: usize, f: &mut F)
where
    F: FnMut(&'a VmRecord),
{
    match node {
        InventoryNode::Folder(folder) => {
            if depth > MAX_FOLDER_DEPTH {
                return;
            }
            for child in &folder.children {
                walk_node(child, depth + 1, f);
            }
        }
        InventoryNode::Machine(vm) => f(vm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(moid: &str) -> VmRecord {
        VmRecord {
            moid: moid.to_string(),
            name: moid.to_string(),
            path: format!("[datastore1] {moid}/{moid}.vmx"),
            guest: "Ubuntu Linux (64-bit)".to_string(),
            power_state: "POWERED_ON".to_string(),
            annotation: None,
            ip_address: None,
            question: None,
        }
    }

    fn folder(name: &str, children: Vec<InventoryNode>) -> InventoryNode {
        InventoryNode::Folder(FolderNode {
            name: name.to_string(),
            children,
        })
    }

    /// Chain of `depth` nested folders with `leaf` inside the innermost one.
    fn nested_chain(depth: usize, leaf: InventoryNode) -> InventoryNode {
        let mut node = folder(&format!("f{depth}"), vec![leaf]);
        for level in (1..depth).rev() {
            node = folder(&format!("f{level}"), vec![node]);
        }
        node
    }

    #[test]
    fn test_walk_visits_every_vm_once() {
        let tree = vec![
            folder(
                "production",
                vec![
                    InventoryNode::Machine(record("vm-1")),
                    folder("web", vec![InventoryNode::Machine(record("vm-2"))]),
                ],
            ),
            InventoryNode::Machine(record("vm-3")),
        ];

        let mut visited = Vec::new();
        walk(&tree, &mut |vm| visited.push(vm.moid.clone()));
        assert_eq!(visited, vec!["vm-1", "vm-2", "vm-3"]);
    }

    #[test]
    fn test_walk_skips_folders_beyond_depth_bound() {
        // A VM inside the 9th folder sits at depth 10 and is reachable; a VM
        // inside the 11th folder is behind a folder the walk never enters.
        let reachable = nested_chain(9, InventoryNode::Machine(record("vm-near")));
        let unreachable = nested_chain(11, InventoryNode::Machine(record("vm-deep")));
        let tree = vec![reachable, unreachable];

        let mut visited = Vec::new();
        walk(&tree, &mut |vm| visited.push(vm.moid.clone()));
        assert_eq!(visited, vec!["vm-near"]);
    }

    #[test]
    fn test_walk_empty_tree() {
        let tree = vec![folder("empty", Vec::new())];
        let mut visited: Vec<String> = Vec::new();
        walk(&tree, &mut |vm| visited.push(vm.moid.clone()));
        assert!(visited.is_empty());
    }

    #[test]
    fn test_non_blank_drops_empty_strings() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(String::new())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(
            non_blank(Some("ephemeral runner".to_string())),
            Some("ephemeral runner".to_string())
        );
    }
}
