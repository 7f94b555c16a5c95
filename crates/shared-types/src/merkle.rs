//! Binary BLAKE3 merkle roots for transaction and receipt lists.

use crate::Hash;
use shared_crypto::Blake3Hasher;

/// Root of an empty list: BLAKE3 of the empty input.
pub const EMPTY_ROOT: Hash = [
    0xaf, 0x13, 0x49, 0xb9, 0xf5, 0xf9, 0xa1, 0xa6, 0xa0, 0x40, 0x4d, 0xea, 0x36, 0xdc, 0xc9, 0x49,
    0x9b, 0xcb, 0x25, 0xc9, 0xad, 0xc1, 0x12, 0xb7, 0xcc, 0x9a, 0x93, 0xca, 0xe4, 0x1f, 0x32, 0x62,
];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Compute the merkle root over `leaves` in order.
///
/// Leaves and inner nodes are domain-separated; an odd node at the end of a
/// level is promoted unchanged.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return EMPTY_ROOT;
    }

    let mut level: Vec<Hash> = leaves
        .iter()
        .map(|leaf| {
            let mut hasher = Blake3Hasher::new();
            hasher.update(&[LEAF_PREFIX]);
            hasher.update(leaf);
            hasher.finalize()
        })
        .collect();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => {
                    let mut hasher = Blake3Hasher::new();
                    hasher.update(&[NODE_PREFIX]);
                    hasher.update(left);
                    hasher.update(right);
                    hasher.finalize()
                }
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }

    level[0]
}
