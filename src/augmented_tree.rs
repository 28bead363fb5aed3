use std::fmt;

use crate::aabb::{aabbs_collide, format_aabb, same_aabb, Aabb, AabbRef, MutableAabb};
use crate::space::{SearchControl, Space};

mod node;
use node::{rebalance, AugTreeNode, NodeLink};

/// An AVL tree sorted on `x_min` only, where every node also caches the
/// largest `x_max` of its subtree so whole branches can be skipped during
/// queries. Boxes are stored once (no per-cell fan-out) and insertion and
/// removal are O(log n), which suits wide levels that keep changing, like
/// side scrollers. The cost is that nothing prunes on the y axis, so
/// tall query regions degrade towards a linear scan.
pub struct AugmentedTree {
    root: NodeLink,
}

impl AugmentedTree {
    pub fn new() -> AugmentedTree {
        AugmentedTree { root: None }
    }

    fn add_box(&mut self, bx: AabbRef) {
        match self.root.take() {
            None => self.root = Some(AugTreeNode::new(bx)),
            Some(root) => self.root = Some(Self::recursive_add(root, bx)),
        }
    }

    /// Returns the subtree's new root, which may change when the addition
    /// triggers a rebalance. Ties on `x_min` go left.
    fn recursive_add(mut node: Box<AugTreeNode>, bx: AabbRef) -> Box<AugTreeNode> {
        if bx.x_min() <= node.bx.x_min() {
            match node.left.take() {
                None => node.left = Some(AugTreeNode::new(bx)),
                Some(left) => node.left = Some(Self::recursive_add(left, bx)),
            }
        } else {
            match node.right.take() {
                None => node.right = Some(AugTreeNode::new(bx)),
                Some(right) => node.right = Some(Self::recursive_add(right, bx)),
            }
        }
        node.refresh();
        rebalance(node)
    }

    fn recursive_collision(link: &NodeLink, query: &dyn Aabb) -> Option<AabbRef> {
        let node = link.as_deref()?;
        if query.x_min() > node.max_x {
            return None; // nothing in this subtree reaches the query
        }
        if aabbs_collide(query, node.bx.as_ref()) && !same_aabb(query, node.bx.as_ref()) {
            return Some(node.bx.clone());
        }

        if let Some(hit) = Self::recursive_collision(&node.left, query) {
            return Some(hit);
        }
        if query.x_max() >= node.bx.x_min() {
            if let Some(hit) = Self::recursive_collision(&node.right, query) {
                return Some(hit);
            }
        }
        None
    }

    fn recursive_each_collision(
        link: &NodeLink,
        query: &dyn Aabb,
        visit: &mut dyn FnMut(&AabbRef) -> SearchControl,
    ) -> SearchControl {
        let Some(node) = link.as_deref() else {
            return SearchControl::Continue;
        };
        if query.x_min() > node.max_x {
            return SearchControl::Continue;
        }
        if aabbs_collide(query, node.bx.as_ref()) && !same_aabb(query, node.bx.as_ref()) {
            if visit(&node.bx) == SearchControl::Stop {
                return SearchControl::Stop;
            }
        }

        if Self::recursive_each_collision(&node.left, query, visit) == SearchControl::Stop {
            return SearchControl::Stop;
        }
        if query.x_max() >= node.bx.x_min() {
            if Self::recursive_each_collision(&node.right, query, visit) == SearchControl::Stop {
                return SearchControl::Stop;
            }
        }
        SearchControl::Continue
    }

    /// Detaches and returns the instance identical to `query`, rebalancing
    /// on the way back up.
    fn take_box(&mut self, query: &dyn Aabb) -> Option<AabbRef> {
        let (root, removed) = Self::recursive_remove(self.root.take(), query);
        self.root = root;
        removed
    }

    fn recursive_remove(link: NodeLink, query: &dyn Aabb) -> (NodeLink, Option<AabbRef>) {
        let Some(mut node) = link else {
            return (None, None);
        };
        if query.x_min() > node.max_x {
            return (Some(node), None);
        }

        if same_aabb(query, node.bx.as_ref()) {
            // easy cases: leaf, or a single child takes the node's place
            if node.left.is_none() {
                return (node.right.take(), Some(node.bx));
            }
            if node.right.is_none() {
                return (node.left.take(), Some(node.bx));
            }

            // two children: the in-order successor (leftmost of the right
            // subtree) replaces this node's box
            let right = node.right.take().expect("checked right child");
            let (new_right, successor_bx) = Self::extract_min(right);
            let removed_bx = std::mem::replace(&mut node.bx, successor_bx);
            node.right = new_right;
            node.refresh();
            return (Some(rebalance(node)), Some(removed_bx));
        }

        let (new_left, removed) = Self::recursive_remove(node.left.take(), query);
        node.left = new_left;
        if let Some(removed_bx) = removed {
            node.refresh();
            return (Some(rebalance(node)), Some(removed_bx));
        }
        if query.x_max() >= node.bx.x_min() {
            let (new_right, removed) = Self::recursive_remove(node.right.take(), query);
            node.right = new_right;
            if let Some(removed_bx) = removed {
                node.refresh();
                return (Some(rebalance(node)), Some(removed_bx));
            }
        }
        (Some(node), None)
    }

    /// Removes the subtree's leftmost node, returning the remaining
    /// subtree (rebalanced along the path) and the extracted box.
    fn extract_min(mut node: Box<AugTreeNode>) -> (NodeLink, AabbRef) {
        match node.left.take() {
            None => (node.right.take(), node.bx),
            Some(left) => {
                let (new_left, min_bx) = Self::extract_min(left);
                node.left = new_left;
                node.refresh();
                (Some(rebalance(node)), min_bx)
            }
        }
    }

    /// In-order walk over the boxes whose `x_min` lies in
    /// `[min_x, max_x]`, both inclusive.
    pub fn each_in_x_range(
        &self,
        min_x: i32,
        max_x: i32,
        visit: &mut dyn FnMut(&AabbRef) -> SearchControl,
    ) {
        let _ = Self::recursive_each_in_x_range(&self.root, min_x, max_x, visit);
    }

    fn recursive_each_in_x_range(
        link: &NodeLink,
        min_x: i32,
        max_x: i32,
        visit: &mut dyn FnMut(&AabbRef) -> SearchControl,
    ) -> SearchControl {
        let Some(node) = link.as_deref() else {
            return SearchControl::Continue;
        };
        let key = node.bx.x_min();
        if key >= min_x {
            if Self::recursive_each_in_x_range(&node.left, min_x, max_x, visit) == SearchControl::Stop {
                return SearchControl::Stop;
            }
            if key <= max_x {
                if visit(&node.bx) == SearchControl::Stop {
                    return SearchControl::Stop;
                }
            }
        }
        if key <= max_x {
            // ties go left, so everything on the right has a larger key
            if Self::recursive_each_in_x_range(&node.right, min_x, max_x, visit) == SearchControl::Stop {
                return SearchControl::Stop;
            }
        }
        SearchControl::Continue
    }

    /// The box at the tree's root. Mostly useful for debugging.
    pub fn root_box(&self) -> Option<&AabbRef> {
        self.root.as_deref().map(|node| &node.bx)
    }

    fn readd_subtree(&mut self, node: Box<AugTreeNode>) {
        let AugTreeNode { bx, left, right, .. } = *node;
        self.add_box(bx);
        if let Some(left) = left {
            self.readd_subtree(left);
        }
        if let Some(right) = right {
            self.readd_subtree(right);
        }
    }
}

impl Default for AugmentedTree {
    fn default() -> AugmentedTree {
        AugmentedTree::new()
    }
}

impl Space for AugmentedTree {
    fn clear(&mut self) {
        self.root = None;
    }

    fn insert(&mut self, bx: AabbRef) {
        self.add_box(bx);
    }

    fn collision(&self, query: &dyn Aabb) -> Option<AabbRef> {
        Self::recursive_collision(&self.root, query)
    }

    fn each_collision(&self, query: &dyn Aabb, visit: &mut dyn FnMut(&AabbRef) -> SearchControl) {
        let _ = Self::recursive_each_collision(&self.root, query, visit);
    }

    fn remove(&mut self, query: &dyn Aabb) -> bool {
        self.take_box(query).is_some()
    }

    // Re-keying in place would be possible for many cases, but the
    // bookkeeping is not worth it against a log n remove + add.
    fn relocate(&mut self, bx: &dyn MutableAabb, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        let Some(stored) = self.take_box(bx) else {
            panic!("box to relocate not found in the tree: {}", format_aabb(bx));
        };
        bx.set_bounds(x_min, x_max, y_min, y_max);
        self.add_box(stored);
    }

    fn stabilize(&mut self) {
        let Some(old_root) = self.root.take() else {
            return;
        };
        self.readd_subtree(old_root);
    }
}

impl fmt::Debug for AugmentedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn rec(f: &mut fmt::Formatter<'_>, link: &NodeLink) -> fmt::Result {
            match link.as_deref() {
                None => write!(f, "()"),
                Some(node) => {
                    write!(
                        f,
                        "(H{} | MaxX{} {} -> L",
                        node.height,
                        node.max_x,
                        format_aabb(node.bx.as_ref())
                    )?;
                    rec(f, &node.left)?;
                    write!(f, ", R")?;
                    rec(f, &node.right)?;
                    write!(f, ")")
                }
            }
        }
        rec(f, &self.root)
    }
}
