//! Bottom-up binary Merkle tree over entry leaves.

use warden_core::hash::{sha256_concat, ZERO_HASH};

/// Compute the Merkle root and tree height for a leaf set.
///
/// Odd levels duplicate their last node. An empty leaf set has the zero
/// root and height 0; a single leaf is its own root at height 1.
pub fn merkle_root(leaves: &[String]) -> (String, u32) {
    if leaves.is_empty() {
        return (ZERO_HASH.to_string(), 0);
    }
    let mut level: Vec<String> = leaves.to_vec();
    let mut height = 1u32;
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(level.last().expect("non-empty level").clone());
        }
        level = level
            .chunks(2)
            .map(|pair| sha256_concat(&[&pair[0], &pair[1]]))
            .collect();
        height += 1;
    }
    (level.remove(0), height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: u8) -> String {
        warden_core::hash::sha256_hex(&[n])
    }

    #[test]
    fn empty_is_zero_root() {
        let (root, height) = merkle_root(&[]);
        assert_eq!(root, ZERO_HASH);
        assert_eq!(height, 0);
    }

    #[test]
    fn single_leaf_is_its_own_root() {
        let l = leaf(1);
        let (root, height) = merkle_root(std::slice::from_ref(&l));
        assert_eq!(root, l);
        assert_eq!(height, 1);
    }

    #[test]
    fn odd_level_duplicates_last_leaf() {
        let (three, _) = merkle_root(&[leaf(1), leaf(2), leaf(3)]);
        let (padded, _) = merkle_root(&[leaf(1), leaf(2), leaf(3), leaf(3)]);
        assert_eq!(three, padded);
    }

    #[test]
    fn root_changes_with_any_leaf() {
        let (a, _) = merkle_root(&[leaf(1), leaf(2)]);
        let (b, _) = merkle_root(&[leaf(1), leaf(3)]);
        assert_ne!(a, b);
    }

    #[test]
    fn height_grows_logarithmically() {
        let leaves: Vec<String> = (0..5).map(leaf).collect();
        let (_, height) = merkle_root(&leaves);
        // 5 -> 3 -> 2 -> 1: four levels.
        assert_eq!(height, 4);
    }
}
