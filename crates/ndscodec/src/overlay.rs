//! ARM9/ARM7 overlay tables.
//!
//! Overlays are relocatable code/data blobs loaded on demand at runtime. Each
//! is described by a fixed 32-byte table entry (eight little-endian `u32`
//! words) and backed by a file in the FAT.

use byteorder::{ByteOrder, LittleEndian};

/// A single ARM9 or ARM7 overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    /// The overlay's ID.
    pub id: u32,
    /// The RAM address at which the overlay is to be loaded.
    pub ram_address: u32,
    /// The RAM size of the overlay when loaded.
    pub ram_size: u32,
    pub bss_size: u32,
    pub sinit_init: u32,
    pub sinit_init_end: u32,
    /// The overlay's file data.
    pub data: Vec<u8>,
    pub reserved: u32,
}

/// Parses a 32-byte-per-entry overlay table, pulling each overlay's data out
/// of `files` by the file ID recorded in its table entry.
pub fn parse_overlay_table(table: &[u8], files: &[Vec<u8>]) -> Vec<Overlay> {
    table
        .chunks_exact(32)
        .map(|entry| {
            let mut words = [0u32; 8];
            LittleEndian::read_u32_into(entry, &mut words);
            Overlay {
                id: words[0],
                ram_address: words[1],
                ram_size: words[2],
                bss_size: words[3],
                sinit_init: words[4],
                sinit_init_end: words[5],
                data: files[words[6] as usize].clone(),
                reserved: words[7],
            }
        })
        .collect()
}

/// Builds an overlay table and the sequence of overlay file data, assigning
/// file IDs starting at `file_id_off` in table order.
pub fn construct_overlay_table(overlays: &[Overlay], file_id_off: u32) -> (Vec<u8>, Vec<Vec<u8>>) {
    let mut table = Vec::with_capacity(overlays.len() * 32);
    let mut data_seq = Vec::with_capacity(overlays.len());

    for ov in overlays {
        let file_id = data_seq.len() as u32 + file_id_off;
        data_seq.push(ov.data.clone());

        let words = [
            ov.id,
            ov.ram_address,
            ov.ram_size,
            ov.bss_size,
            ov.sinit_init,
            ov.sinit_init_end,
            file_id,
            ov.reserved,
        ];
        let mut entry = [0u8; 32];
        LittleEndian::write_u32_into(&words, &mut entry);
        table.extend_from_slice(&entry);
    }

    (table, data_seq)
}
