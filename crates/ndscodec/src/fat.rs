//! File allocation table (FAT / `FATB` / `BTAF`) parsing.
//!
//! A FAT is a flat sequence of 8-byte `(start, end)` absolute offset pairs,
//! one per file ID. Nothing about FAT parsing is container-specific; both the
//! ROM and NARC codecs share this routine.

use byteorder::{ByteOrder, LittleEndian};

/// Parses a FAT section into its `(start, end)` pairs, plus the permutation
/// of file IDs sorted by their start offset (the physical placement order).
pub fn parse_fat(fatb: &[u8]) -> (Vec<(u32, u32)>, Vec<usize>) {
    let entries: Vec<(u32, u32)> = fatb
        .chunks_exact(8)
        .map(|entry| (LittleEndian::read_u32(&entry[0..4]), LittleEndian::read_u32(&entry[4..8])))
        .collect();

    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&i| entries[i].0);

    (entries, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_start_order() {
        let mut fatb = Vec::new();
        fatb.extend_from_slice(&100u32.to_le_bytes());
        fatb.extend_from_slice(&110u32.to_le_bytes());
        fatb.extend_from_slice(&50u32.to_le_bytes());
        fatb.extend_from_slice(&70u32.to_le_bytes());

        let (entries, order) = parse_fat(&fatb);
        assert_eq!(entries, vec![(100, 110), (50, 70)]);
        assert_eq!(order, vec![1, 0]);
    }
}
