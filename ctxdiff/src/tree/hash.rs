//! Content hashing.
//!
//! A 32-bit FNV-1a primitive plus the per-node hashing protocol shared by
//! all document families, and the lazy per-tree hash caches. Node hashes
//! depend only on the node's own payload; subtree hashes chain the node
//! hashes of the subtree in document order. The hash is not cryptographic;
//! collisions are broken by structural rechecks in the matcher and
//! resolver.

use std::cell::RefCell;

use super::content::Content;
use super::{NodeId, Tree};

/// FNV-1a offset basis.
const FNV_OFFSET: u32 = 0x811C_9DC5;
/// FNV-1a prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// Type prefix fed before an element name.
pub const HASH_PREFIX_ELEMENT: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
/// Type prefix fed before each attribute key.
pub const HASH_PREFIX_ATTRIBUTE: [u8; 4] = [0x00, 0x00, 0x00, 0x02];
/// Type prefix fed before a text run.
pub const HASH_PREFIX_TEXT: [u8; 4] = [0x00, 0x00, 0x00, 0x03];
/// Separator fed after each string field.
pub const HASH_SEPARATOR: [u8; 2] = [0x00, 0x00];

/// Incremental 32-bit FNV-1a hasher.
#[derive(Debug, Clone)]
pub struct Fnv32 {
    state: u32,
}

impl Fnv32 {
    /// Creates a hasher seeded with the FNV offset basis.
    pub fn new() -> Self {
        Fnv32 { state: FNV_OFFSET }
    }

    /// Feeds a byte sequence into the hasher.
    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= u32::from(b);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    /// Returns the current hash value.
    pub fn get(&self) -> u32 {
        self.state
    }
}

impl Default for Fnv32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Hashes a node payload.
///
/// Elements feed the element prefix, the tag name and a separator, then
/// each attribute in ascending key order as prefix/key/separator/value/
/// separator. Text runs feed the text prefix, the bytes and a separator.
/// All strings are fed as UTF-8.
pub fn content_hash(content: &Content) -> u32 {
    let mut h = Fnv32::new();
    match content {
        Content::Element(e) => {
            h.update(&HASH_PREFIX_ELEMENT);
            h.update(e.name().as_bytes());
            h.update(&HASH_SEPARATOR);
            for (key, value) in e.attrs() {
                h.update(&HASH_PREFIX_ATTRIBUTE);
                h.update(key.as_bytes());
                h.update(&HASH_SEPARATOR);
                h.update(value.as_bytes());
                h.update(&HASH_SEPARATOR);
            }
        }
        Content::Text(t) => {
            h.update(&HASH_PREFIX_TEXT);
            h.update(t.as_bytes());
            h.update(&HASH_SEPARATOR);
        }
    }
    h.get()
}

/// Memoized node and subtree hashes for one tree.
///
/// The cache is external to the tree and written lazily on first access;
/// the tree itself stays immutable while hashed. A cache must be discarded
/// once its tree is mutated.
#[derive(Debug)]
pub struct HashCache {
    node: RefCell<Vec<Option<u32>>>,
    subtree: RefCell<Vec<Option<u32>>>,
}

impl HashCache {
    /// Creates an empty cache sized for the given tree.
    pub fn new(tree: &Tree) -> Self {
        HashCache {
            node: RefCell::new(vec![None; tree.len()]),
            subtree: RefCell::new(vec![None; tree.len()]),
        }
    }

    /// Returns the hash of the node's own payload.
    pub fn node_hash(&self, tree: &Tree, id: NodeId) -> u32 {
        if let Some(hash) = self.node.borrow().get(id.index()).copied().flatten() {
            return hash;
        }
        let hash = content_hash(tree.content(id));
        Self::store(&mut self.node.borrow_mut(), id.index(), hash);
        hash
    }

    /// Returns the hash of the whole subtree rooted at the node.
    ///
    /// FNV-1a over the big-endian node hashes of the subtree in document
    /// order.
    pub fn subtree_hash(&self, tree: &Tree, id: NodeId) -> u32 {
        if let Some(hash) = self.subtree.borrow().get(id.index()).copied().flatten() {
            return hash;
        }
        let mut h = Fnv32::new();
        for node in tree.preorder_of(id) {
            h.update(&self.node_hash(tree, node).to_be_bytes());
        }
        let hash = h.get();
        Self::store(&mut self.subtree.borrow_mut(), id.index(), hash);
        hash
    }

    fn store(slots: &mut Vec<Option<u32>>, index: usize, hash: u32) {
        if index >= slots.len() {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::content::Element;

    fn fnv(bytes: &[u8]) -> u32 {
        let mut h = Fnv32::new();
        h.update(bytes);
        h.get()
    }

    #[test]
    fn test_fnv1a_known_values() {
        // Published FNV-1a 32-bit test vectors.
        assert_eq!(fnv(b""), 0x811C_9DC5);
        assert_eq!(fnv(b"a"), 0xE40C_292C);
        assert_eq!(fnv(b"foobar"), 0xBF9C_F968);
    }

    #[test]
    fn test_fnv1a_incremental() {
        let mut h = Fnv32::new();
        h.update(b"foo");
        h.update(b"bar");
        assert_eq!(h.get(), fnv(b"foobar"));
    }

    #[test]
    fn test_content_hash_discriminates_kinds() {
        // An element named "x" and a text run "x" must not collide via
        // their common payload bytes.
        assert_ne!(
            content_hash(&Content::element("x")),
            content_hash(&Content::text("x"))
        );
    }

    #[test]
    fn test_content_hash_attribute_order_is_stable() {
        let mut e1 = Element::new("a");
        e1.set_attr("href", "x");
        e1.set_attr("id", "y");

        let mut e2 = Element::new("a");
        e2.set_attr("id", "y");
        e2.set_attr("href", "x");

        assert_eq!(
            content_hash(&Content::Element(e1)),
            content_hash(&Content::Element(e2))
        );
    }

    #[test]
    fn test_content_hash_attributes_matter() {
        let plain = Content::element("a");
        let mut e = Element::new("a");
        e.set_attr("href", "x");
        assert_ne!(content_hash(&plain), content_hash(&Content::Element(e)));
    }

    #[test]
    fn test_subtree_hash_equal_for_equal_structure() {
        let build = || {
            let mut t = Tree::with_root(Content::element("ul"));
            let li = t.push(Content::element("li"));
            let text = t.push(Content::text("a"));
            t.append(t.root(), li).unwrap();
            t.append(li, text).unwrap();
            t
        };
        let t1 = build();
        let t2 = build();
        let c1 = HashCache::new(&t1);
        let c2 = HashCache::new(&t2);

        assert_eq!(
            c1.subtree_hash(&t1, t1.root()),
            c2.subtree_hash(&t2, t2.root())
        );
        // The subtree hash of the leaf equals its chained node hash, not
        // the raw node hash.
        let leaf = t1.children(t1.children(t1.root())[0])[0];
        assert_ne!(c1.subtree_hash(&t1, leaf), 0);
    }

    #[test]
    fn test_subtree_hash_sees_deep_changes() {
        let mut t1 = Tree::with_root(Content::element("ul"));
        let li = t1.push(Content::element("li"));
        let text = t1.push(Content::text("a"));
        t1.append(t1.root(), li).unwrap();
        t1.append(li, text).unwrap();

        let mut t2 = Tree::with_root(Content::element("ul"));
        let li2 = t2.push(Content::element("li"));
        let text2 = t2.push(Content::text("b"));
        t2.append(t2.root(), li2).unwrap();
        t2.append(li2, text2).unwrap();

        let c1 = HashCache::new(&t1);
        let c2 = HashCache::new(&t2);
        // Node hashes of the roots agree, subtree hashes do not.
        assert_eq!(c1.node_hash(&t1, t1.root()), c2.node_hash(&t2, t2.root()));
        assert_ne!(
            c1.subtree_hash(&t1, t1.root()),
            c2.subtree_hash(&t2, t2.root())
        );
    }
}
