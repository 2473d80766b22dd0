//! Fixed-depth sparse Merkle tree over voter leaf commitments.
//!
//! Absent leaves hold the zero value, so an empty subtree of height `h` hashes to
//! `zeros[h]`:
//! - zeros[0] = 0
//! - zeros[i] = H(zeros[i-1], zeros[i-1])
//!
//! A direction bit of `false` means the running node is the left child at that level.

use crate::*;
use ark_ff::Zero;
use log::debug;
use std::collections::BTreeMap;
use std::convert::TryFrom;

/// Membership path for a single leaf
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub index: u64,

    #[serde(with = "FrHex")]
    pub leaf: Fr,

    /// Sibling at each level, leaf level first
    #[serde(with = "FrVecHex")]
    pub elements: Vec<Fr>,

    /// `true` where the running node is the right child
    pub directions: Vec<bool>,

    #[serde(with = "FrHex")]
    pub root: Fr,
}

impl MerklePath {
    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    /// Recompute the root from `leaf` along this path and compare with `claimed_root`
    pub fn verify(&self, leaf: Fr, claimed_root: Fr) -> Result<bool, Error> {
        verify_path(leaf, &self.elements, &self.directions, claimed_root)
    }
}

/// The D + 1 roots of all-zero subtrees
pub fn zero_hashes(depth: usize) -> Result<Vec<Fr>, Error> {
    let mut hasher = FieldHasher::new()?;
    zero_hashes_with(&mut hasher, depth)
}

fn zero_hashes_with(hasher: &mut FieldHasher, depth: usize) -> Result<Vec<Fr>, Error> {
    let mut zeros = Vec::with_capacity(depth + 1);
    zeros.push(Fr::zero());
    for i in 1..=depth {
        let below = zeros[i - 1];
        zeros.push(hasher.compress2to1(below, below)?);
    }
    Ok(zeros)
}

/// Root of an empty tree of the given depth
pub fn empty_root(depth: usize) -> Result<Fr, Error> {
    let zeros = zero_hashes(depth)?;
    Ok(zeros[depth])
}

fn check_index(index: u64, depth: usize) -> Result<(), Error> {
    if depth >= 64 || index >> depth != 0 {
        return Err(Error::LeafIndexOutOfRange { index, depth });
    }
    Ok(())
}

/// Hash one populated level into the level above it
fn next_level(
    hasher: &mut FieldHasher,
    level: &BTreeMap<u64, Fr>,
    zero: Fr,
) -> Result<BTreeMap<u64, Fr>, Error> {
    let mut parents = BTreeMap::new();
    for index in level.keys() {
        let parent = index >> 1;
        if parents.contains_key(&parent) {
            continue;
        }
        let left = level.get(&(index & !1)).copied().unwrap_or(zero);
        let right = level.get(&(index | 1)).copied().unwrap_or(zero);
        parents.insert(parent, hasher.compress2to1(left, right)?);
    }
    Ok(parents)
}

fn compute_root_with(
    hasher: &mut FieldHasher,
    leaf: Fr,
    elements: &[Fr],
    directions: &[bool],
) -> Result<Fr, Error> {
    let mut node = leaf;
    for (sibling, is_right) in elements.iter().zip(directions.iter()) {
        node = if *is_right {
            hasher.compress2to1(*sibling, node)?
        } else {
            hasher.compress2to1(node, *sibling)?
        };
    }
    Ok(node)
}

/// Recompute a root bottom-up from a leaf and its path
pub fn compute_root(leaf: Fr, elements: &[Fr], directions: &[bool]) -> Result<Fr, Error> {
    let mut hasher = FieldHasher::new()?;
    compute_root_with(&mut hasher, leaf, elements, directions)
}

/// Check that `leaf` sits under `claimed_root` along the given path.
///
/// A path whose element and direction counts differ never verifies.
pub fn verify_path(
    leaf: Fr,
    elements: &[Fr],
    directions: &[bool],
    claimed_root: Fr,
) -> Result<bool, Error> {
    if elements.len() != directions.len() {
        return Ok(false);
    }
    Ok(compute_root(leaf, elements, directions)? == claimed_root)
}

/// Build the membership path of `index` over a sparse leaf map.
///
/// Siblings are real leaves (or subtree hashes) where another populated leaf shares the
/// subtree, and zero hashes everywhere else. An unpopulated index gets a path for the
/// zero leaf.
pub fn build_path(
    leaves: &BTreeMap<u64, Fr>,
    index: u64,
    depth: usize,
) -> Result<MerklePath, Error> {
    let mut hasher = FieldHasher::new()?;
    let zeros = zero_hashes_with(&mut hasher, depth)?;
    build_path_with(&mut hasher, &zeros, leaves, index, depth)
}

fn build_path_with(
    hasher: &mut FieldHasher,
    zeros: &[Fr],
    leaves: &BTreeMap<u64, Fr>,
    index: u64,
    depth: usize,
) -> Result<MerklePath, Error> {
    check_index(index, depth)?;
    for populated in leaves.keys() {
        check_index(*populated, depth)?;
    }

    let leaf = leaves.get(&index).copied().unwrap_or(zeros[0]);
    let mut elements = Vec::with_capacity(depth);
    let mut directions = Vec::with_capacity(depth);

    let mut level = leaves.clone();
    let mut position = index;
    for height in 0..depth {
        let sibling = level
            .get(&(position ^ 1))
            .copied()
            .unwrap_or(zeros[height]);
        elements.push(sibling);
        directions.push(position & 1 == 1);

        level = next_level(hasher, &level, zeros[height])?;
        position >>= 1;
    }
    let root = level.get(&0).copied().unwrap_or(zeros[depth]);

    debug!(
        "built merkle path for index {} at depth {} ({} populated leaves)",
        index,
        depth,
        leaves.len()
    );

    Ok(MerklePath {
        index,
        leaf,
        elements,
        directions,
        root,
    })
}

/// Build paths for several indices, requiring every path to agree on the root
pub fn build_paths(
    leaves: &BTreeMap<u64, Fr>,
    indices: &[u64],
    depth: usize,
) -> Result<Vec<MerklePath>, Error> {
    let mut hasher = FieldHasher::new()?;
    let zeros = zero_hashes_with(&mut hasher, depth)?;

    let mut paths: Vec<MerklePath> = Vec::with_capacity(indices.len());
    for index in indices {
        let path = build_path_with(&mut hasher, &zeros, leaves, *index, depth)?;
        if let Some(first) = paths.first() {
            if first.root != path.root {
                return Err(Error::InconsistentTree {
                    index: *index,
                    expected: fr_to_hex(&first.root),
                    found: fr_to_hex(&path.root),
                });
            }
        }
        paths.push(path);
    }
    Ok(paths)
}

/// Voter roster as a sparse leaf map, kept by whoever manages eligibility
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(try_from = "TreeRecord", into = "TreeRecord")]
pub struct EligibilityTree {
    depth: usize,
    leaves: BTreeMap<u64, Fr>,
}

impl EligibilityTree {
    pub fn new(depth: usize) -> Self {
        EligibilityTree {
            depth,
            leaves: BTreeMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaves(&self) -> &BTreeMap<u64, Fr> {
        &self.leaves
    }

    /// Place a leaf commitment at `index`.
    ///
    /// Re-inserting the same leaf is a no-op, a different one is a conflict.
    pub fn insert_leaf(&mut self, index: u64, leaf: Fr) -> Result<(), Error> {
        check_index(index, self.depth)?;
        match self.leaves.get(&index) {
            Some(existing) if *existing != leaf => Err(Error::LeafConflict(index)),
            _ => {
                self.leaves.insert(index, leaf);
                Ok(())
            }
        }
    }

    /// Place `Hash(secret)` at `index`
    pub fn insert_secret(&mut self, index: u64, secret: Fr) -> Result<Fr, Error> {
        let leaf = leaf_commitment(secret)?;
        self.insert_leaf(index, leaf)?;
        Ok(leaf)
    }

    pub fn root(&self) -> Result<Fr, Error> {
        for index in self.leaves.keys() {
            check_index(*index, self.depth)?;
        }
        let mut hasher = FieldHasher::new()?;
        let zeros = zero_hashes_with(&mut hasher, self.depth)?;
        let mut level = self.leaves.clone();
        for height in 0..self.depth {
            level = next_level(&mut hasher, &level, zeros[height])?;
        }
        Ok(level.get(&0).copied().unwrap_or(zeros[self.depth]))
    }

    pub fn path(&self, index: u64) -> Result<MerklePath, Error> {
        build_path(&self.leaves, index, self.depth)
    }

    pub fn paths(&self, indices: &[u64]) -> Result<Vec<MerklePath>, Error> {
        build_paths(&self.leaves, indices, self.depth)
    }
}

#[derive(Serialize, Deserialize)]
struct Leaf(#[serde(with = "FrHex")] Fr);

/// Serialized form of a tree. Leaves are re-placed on load so indices get checked.
#[derive(Serialize, Deserialize)]
struct TreeRecord {
    depth: usize,
    leaves: BTreeMap<u64, Leaf>,
}

impl TryFrom<TreeRecord> for EligibilityTree {
    type Error = Error;

    fn try_from(record: TreeRecord) -> Result<Self, Error> {
        let mut tree = EligibilityTree::new(record.depth);
        for (index, Leaf(leaf)) in record.leaves {
            tree.insert_leaf(index, leaf)?;
        }
        Ok(tree)
    }
}

impl From<EligibilityTree> for TreeRecord {
    fn from(tree: EligibilityTree) -> Self {
        TreeRecord {
            depth: tree.depth,
            leaves: tree
                .leaves
                .into_iter()
                .map(|(index, leaf)| (index, Leaf(leaf)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEPTH: usize = 20;

    #[test]
    fn zero_hash_chain() {
        let zeros = zero_hashes(4).unwrap();
        assert_eq!(zeros.len(), 5);
        assert_eq!(zeros[0], Fr::zero());
        for i in 1..zeros.len() {
            assert_eq!(zeros[i], compress2to1(zeros[i - 1], zeros[i - 1]).unwrap());
        }
        assert_eq!(EligibilityTree::new(4).root().unwrap(), zeros[4]);
        assert_eq!(empty_root(4).unwrap(), zeros[4]);
    }

    #[test]
    fn small_tree_by_hand() {
        // depth 2: leaves at 0 and 3
        let a = leaf_commitment(fr_from_u64(11)).unwrap();
        let d = leaf_commitment(fr_from_u64(44)).unwrap();
        let mut tree = EligibilityTree::new(2);
        tree.insert_leaf(0, a).unwrap();
        tree.insert_leaf(3, d).unwrap();

        let left = compress2to1(a, Fr::zero()).unwrap();
        let right = compress2to1(Fr::zero(), d).unwrap();
        let root = compress2to1(left, right).unwrap();
        assert_eq!(tree.root().unwrap(), root);

        let path = tree.path(3).unwrap();
        assert_eq!(path.elements, vec![Fr::zero(), left]);
        assert_eq!(path.directions, vec![true, true]);
        assert_eq!(path.root, root);
        assert!(path.verify(d, root).unwrap());
    }

    #[test]
    fn paths_agree_on_root() {
        let mut tree = EligibilityTree::new(DEPTH);
        for (index, secret) in [(0u64, 123456789u64), (3, 17), (5, 29), (1 << 19, 31)].iter() {
            tree.insert_secret(*index, fr_from_u64(*secret)).unwrap();
        }
        let root = tree.root().unwrap();
        let paths = tree.paths(&[0, 3, 5, 1 << 19, 7]).unwrap();
        for path in paths.iter() {
            assert_eq!(path.root, root);
            assert_eq!(path.depth(), DEPTH);
            assert!(path.verify(path.leaf, root).unwrap());
        }
        // Unpopulated index proves the zero leaf
        assert_eq!(paths[4].leaf, Fr::zero());
    }

    #[test]
    fn index_bounds_and_conflicts() {
        let mut tree = EligibilityTree::new(4);
        assert!(matches!(
            tree.insert_leaf(16, fr_from_u64(1)),
            Err(Error::LeafIndexOutOfRange { index: 16, depth: 4 })
        ));
        tree.insert_leaf(15, fr_from_u64(1)).unwrap();
        tree.insert_leaf(15, fr_from_u64(1)).unwrap();
        assert!(matches!(
            tree.insert_leaf(15, fr_from_u64(2)),
            Err(Error::LeafConflict(15))
        ));

        let mut leaves = BTreeMap::new();
        leaves.insert(99u64, fr_from_u64(1));
        assert!(build_path(&leaves, 0, 4).is_err());
    }

    #[test]
    fn mismatched_path_lengths_never_verify() {
        let path = EligibilityTree::new(3).path(0).unwrap();
        assert!(!verify_path(
            path.leaf,
            &path.elements,
            &path.directions[..2],
            path.root
        )
        .unwrap());
    }

    #[test]
    fn tree_serialization() {
        let mut tree = EligibilityTree::new(8);
        tree.insert_secret(3, fr_from_u64(5)).unwrap();
        let json = serde_json::to_string(&tree).unwrap();
        let back: EligibilityTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back.root().unwrap(), tree.root().unwrap());
        assert_eq!(back.len(), 1);

        // Stored leaves go through the same index check as inserted ones
        let leaf = "0".repeat(63) + "1";
        let in_range = format!("{{\"depth\":4,\"leaves\":{{\"15\":\"{}\"}}}}", leaf);
        assert_eq!(serde_json::from_str::<EligibilityTree>(&in_range).unwrap().len(), 1);
        let out_of_range = format!("{{\"depth\":4,\"leaves\":{{\"16\":\"{}\"}}}}", leaf);
        assert!(serde_json::from_str::<EligibilityTree>(&out_of_range).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn membership_soundness(
            index in 0u64..(1 << DEPTH),
            secret in 1u64..u64::MAX,
            other in 0u64..(1 << DEPTH),
            flip_level in 0usize..DEPTH,
        ) {
            let mut tree = EligibilityTree::new(DEPTH);
            let leaf = tree.insert_secret(index, fr_from_u64(secret)).unwrap();
            if other != index {
                tree.insert_secret(other, fr_from_u64(secret ^ 0x5555)).unwrap();
            }
            let root = tree.root().unwrap();
            let path = tree.path(index).unwrap();
            prop_assert!(path.verify(leaf, root).unwrap());

            // Tampered sibling
            let mut elements = path.elements.clone();
            elements[flip_level] += Fr::from(1u64);
            prop_assert!(!verify_path(leaf, &elements, &path.directions, root).unwrap());

            // Flipped direction
            let mut directions = path.directions.clone();
            directions[flip_level] = !directions[flip_level];
            prop_assert!(!verify_path(leaf, &path.elements, &directions, root).unwrap());

            // Wrong secret
            let wrong = leaf_commitment(fr_from_u64(secret.wrapping_add(1))).unwrap();
            prop_assert!(!path.verify(wrong, root).unwrap());
        }
    }
}
