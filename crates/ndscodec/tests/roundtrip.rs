//! Round-trip checks against the crate's public API, rather than its
//! internals (everything here goes through `ndscodec::*`, not `crate::*`).
//! Fixtures are synthetic: there is no reference `.nds`/`.narc` binary
//! checked into this workspace.

use std::collections::HashMap;

use ndscodec::lz10;
use ndscodec::{Header, HeaderField, Narc, Rom, StorageType};

fn tiny_rom() -> Rom {
    let mut header = Header::new(vec![0u8; Header::SIZE]).unwrap();
    let mut title = [0u8; 12];
    title[..4].copy_from_slice(b"TEST");
    header.set(HeaderField::Title, &title);

    let mut files = HashMap::new();
    files.insert("/data/a.bin".to_string(), vec![1, 2, 3, 4, 5]);
    files.insert("/data/nested/b.bin".to_string(), vec![9, 8, 7]);

    Rom {
        header,
        arm9: vec![0xAA; 32],
        arm7: vec![0xBB; 32],
        arm9_overlays: Vec::new(),
        arm7_overlays: Vec::new(),
        files,
        file_order: vec!["/data/a.bin".to_string(), "/data/nested/b.bin".to_string()],
        banner: vec![1u8, 0].into_iter().cycle().take(0x840).collect(),
    }
}

#[test]
fn rom_decompose_then_reassemble_preserves_files_and_crc() {
    let rom = tiny_rom();
    let image = rom.to_bytes(StorageType::Prom, true, 0xFF).unwrap();

    let decomposed = Rom::from_bytes(&image).unwrap();
    assert_eq!(decomposed.files["/data/a.bin"], vec![1, 2, 3, 4, 5]);
    assert_eq!(decomposed.files["/data/nested/b.bin"], vec![9, 8, 7]);
    assert_eq!(decomposed.arm9, rom.arm9);

    let header = Header::new(image[..Header::SIZE].to_vec()).unwrap();
    let declared_size = header.get_le(HeaderField::RomSize) as usize;
    assert!(declared_size < image.len(), "fill_tail should pad past the declared ROM size");
}

#[test]
fn narc_decompose_then_reassemble_preserves_path_map() {
    let mut filename_id_map = HashMap::new();
    filename_id_map.insert("/graphics.bin".to_string(), 0);
    filename_id_map.insert("/scripts/main.bin".to_string(), 1);

    let narc = Narc { files: vec![vec![0xDE, 0xAD], vec![0xBE, 0xEF, 0x00]], filename_id_map };

    let image = narc.to_bytes().unwrap();
    let decomposed = Narc::from_bytes(&image).unwrap();

    assert_eq!(decomposed.files, narc.files);
    assert_eq!(decomposed.filename_id_map, narc.filename_id_map);
}

#[test]
fn lz10_compresses_and_decompresses_through_public_api() {
    let data = b"the quick brown fox the quick brown fox the quick brown fox".to_vec();
    let compressed = lz10::compress(&data, 2, true, true).unwrap();
    assert_eq!(lz10::decompress(&compressed).unwrap(), data);
}
