//! Append-only persistent sequence
//!
//! Every `push` returns a new chain that shares all earlier nodes with the
//! receiver, so extending a long stage definition costs one allocation.

use std::sync::Arc;

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<Arc<Node<T>>>,
}

/// Persistent sequence with O(1) append and shared prefixes
#[derive(Debug)]
pub struct Chain<T> {
    last: Option<Arc<Node<T>>>,
    len: usize,
}

impl<T> Chain<T> {
    pub fn new() -> Self {
        Self { last: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A new chain equal to `self` with `value` appended
    pub fn push(&self, value: T) -> Self {
        Self {
            last: Some(Arc::new(Node {
                value,
                prev: self.last.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_deref().map(|node| &node.value)
    }

    /// Borrow the elements in insertion order
    pub fn to_vec(&self) -> Vec<&T> {
        let mut items = Vec::with_capacity(self.len);
        let mut cursor = self.last.as_deref();
        while let Some(node) = cursor {
            items.push(&node.value);
            cursor = node.prev.as_deref();
        }
        items.reverse();
        items
    }

    /// True when both chains end at the same shared node
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.last, &other.last) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            last: self.last.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for Chain<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len == other.len && self.to_vec() == other.to_vec())
    }
}

impl<T: Eq> Eq for Chain<T> {}

impl<T> Drop for Chain<T> {
    // Unlink iteratively so dropping a long chain cannot overflow the stack
    fn drop(&mut self) {
        let mut cursor = self.last.take();
        while let Some(node) = cursor {
            match Arc::try_unwrap(node) {
                Ok(mut node) => cursor = node.prev.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_does_not_mutate_receiver() {
        let a = Chain::new().push(1).push(2);
        let b = a.push(3);
        assert_eq!(a.to_vec(), vec![&1, &2]);
        assert_eq!(b.to_vec(), vec![&1, &2, &3]);
        assert_eq!(b.len(), 3);
        assert_eq!(b.last(), Some(&3));
    }

    #[test]
    fn branches_share_prefix() {
        let base = Chain::new().push("a");
        let left = base.push("b");
        let right = base.push("c");
        assert_eq!(left.to_vec(), vec![&"a", &"b"]);
        assert_eq!(right.to_vec(), vec![&"a", &"c"]);
        assert_ne!(left, right);
    }

    #[test]
    fn equality_by_content() {
        let a = Chain::new().push(1).push(2);
        let b = Chain::new().push(1).push(2);
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn empty_chain() {
        let chain: Chain<u8> = Chain::default();
        assert!(chain.is_empty());
        assert!(chain.last().is_none());
        assert!(chain.to_vec().is_empty());
    }

    #[test]
    fn long_chain_drops() {
        let mut chain = Chain::new();
        for i in 0..200_000 {
            chain = chain.push(i);
        }
        assert_eq!(chain.len(), 200_000);
        drop(chain);
    }
}
