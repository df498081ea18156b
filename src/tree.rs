//! Page tree resolution.
//!
//! A page tree is fetched into an arena: the ancestor chain (nearest first)
//! and the page's whole subtree, each node holding its permission rows and
//! the arena indexes of its children. Traversals walk indexes, never
//! parent/child pointers.

use std::collections::HashSet;

use crate::error::{PermError, Result};
use crate::tx::PermissionRead;
use crate::types::{Page, Permission};

/// A page with its permission rows and arena child indexes
#[derive(Debug, Clone)]
pub struct PageNode {
    pub page: Page,
    pub permissions: Vec<Permission>,
    pub children: Vec<usize>,
}

/// A page, its ancestor chain and its subtree
#[derive(Debug, Clone)]
pub struct PageTree {
    /// Nearest first; `children` is left empty on ancestors
    pub ancestors: Vec<PageNode>,
    /// Subtree arena; index 0 is the target page
    nodes: Vec<PageNode>,
}

/// Load the ancestor chain of `page`, nearest first
pub fn resolve_ancestors<R: PermissionRead + ?Sized>(tx: &R, page: &Page) -> Result<Vec<PageNode>> {
    let limit = tx.max_tree_depth();
    let mut seen = HashSet::from([page.id.clone()]);
    let mut ancestors = Vec::new();
    let mut next = page.parent_id.clone();
    while let Some(id) = next {
        if !seen.insert(id.clone()) || ancestors.len() >= limit {
            return Err(PermError::Corrupt(format!("ancestor chain of {} loops or exceeds {}", page.id, limit)));
        }
        let parent = tx
            .page(&id)?
            .ok_or_else(|| PermError::Corrupt(format!("page {} has missing parent {}", page.id, id)))?;
        next = parent.parent_id.clone();
        let permissions = tx.page_permissions(&parent.id)?;
        ancestors.push(PageNode { page: parent, permissions, children: Vec::new() });
    }
    Ok(ancestors)
}

impl PageTree {
    /// Fetch the page, its ancestors and its subtree
    pub fn resolve<R: PermissionRead + ?Sized>(tx: &R, page_id: &str) -> Result<Self> {
        let page = tx.require_page(page_id)?;
        let ancestors = resolve_ancestors(tx, &page)?;
        let limit = tx.max_tree_depth();

        let mut seen: HashSet<String> = ancestors.iter().map(|a| a.page.id.clone()).collect();
        seen.insert(page.id.clone());
        let permissions = tx.page_permissions(&page.id)?;
        let mut nodes = vec![PageNode { page, permissions, children: Vec::new() }];

        // (arena index, depth below target)
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            let child_ids = tx.child_ids(&nodes[idx].page.id)?;
            if !child_ids.is_empty() && depth + 1 > limit {
                return Err(PermError::Corrupt(format!("subtree of {} exceeds depth {}", page_id, limit)));
            }
            for id in child_ids {
                if !seen.insert(id.clone()) {
                    return Err(PermError::Corrupt(format!("page {} reached twice below {}", id, page_id)));
                }
                let child = tx
                    .page(&id)?
                    .ok_or_else(|| PermError::Corrupt(format!("child index names missing page {}", id)))?;
                let permissions = tx.page_permissions(&id)?;
                let child_idx = nodes.len();
                nodes.push(PageNode { page: child, permissions, children: Vec::new() });
                nodes[idx].children.push(child_idx);
                stack.push((child_idx, depth + 1));
            }
        }
        Ok(PageTree { ancestors, nodes })
    }

    pub fn target(&self) -> &PageNode {
        &self.nodes[0]
    }

    pub fn node(&self, idx: usize) -> &PageNode {
        &self.nodes[idx]
    }

    pub fn parent(&self) -> Option<&PageNode> {
        self.ancestors.first()
    }

    /// Position of `page_id` in the ancestor chain, 0 being the parent
    pub fn ancestor_position(&self, page_id: &str) -> Option<usize> {
        self.ancestors.iter().position(|a| a.page.id == page_id)
    }

    /// Subtree nodes below the target, parents before children
    pub fn descendants(&self) -> impl Iterator<Item = &PageNode> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.nodes[0].children.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev().copied());
        }
        order.into_iter().map(move |i| &self.nodes[i])
    }
}
