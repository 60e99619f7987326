//! Tree Module
//!
//! Ordered index: an AVL tree whose nodes also cache their subtree size,
//! which turns rank and k-th element queries into O(log n) descents.
//!
//! ## Node Arena
//! ```text
//!                 ┌───────────────────────────────┐
//!   root ───────▶ │ value │ height │ count         │
//!                 │ left ─┐  right ─┐  parent ─┐   │
//!                 └───────┼─────────┼──────────┼───┘
//!                         ▼         ▼          ▼
//!                      NodeId    NodeId     NodeId     (slotmap keys)
//! ```
//!
//! Parent links are navigation only; the tree owns every node through its
//! slab. Rebalancing walks parent links bottom-up, so neither insertion nor
//! deletion recurses over the tree height.

mod avl;


pub use avl::{AvlTree, Iter, NodeId};
