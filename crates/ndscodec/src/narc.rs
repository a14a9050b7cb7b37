//! NARC: the nested archive container used to pack a DS game's non-ROM-FS
//! assets (graphics, scripts, etc.) into a single file. Structurally a
//! miniature ROM: a FAT (`BTAF`) and FNT (`BTNF`) sit alongside a flat file
//! image (`GMIF`), instead of being scattered across the cartridge.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::fnt;

const HEADER_MAGIC: u32 = 0x4352_414E;
const HEADER_LE_BOM: u16 = 0xFFFE;
const HEADER_VERSION_MARKER: u16 = 0x100;

fn check_section_magic(data: &[u8], pos: usize, expected: &[u8; 4]) -> Result<()> {
    let found: [u8; 4] = data[pos..pos + 4].try_into().expect("slice of length 4");
    if &found != expected {
        return Err(Error::SectionMagic { expected: *expected, found });
    }
    Ok(())
}

/// A decomposed NARC archive: its files, and the path each maps to.
#[derive(Debug, Clone)]
pub struct Narc {
    pub files: Vec<Vec<u8>>,
    pub filename_id_map: HashMap<String, u32>,
}

impl Narc {
    /// Decomposes a full NARC image into its files and path mapping.
    pub fn from_bytes(data: &[u8]) -> Result<Narc> {
        let magic = LittleEndian::read_u32(&data[0..4]);
        if magic != HEADER_MAGIC {
            return Err(Error::BadMagic { expected: HEADER_MAGIC, found: magic });
        }
        let bom = LittleEndian::read_u16(&data[4..6]);
        if bom != HEADER_LE_BOM {
            return Err(Error::BadBom { expected: HEADER_LE_BOM, found: bom });
        }
        let version = LittleEndian::read_u16(&data[6..8]);
        if version != HEADER_VERSION_MARKER {
            return Err(Error::BadVersion { expected: HEADER_VERSION_MARKER, found: version });
        }
        let size = LittleEndian::read_u32(&data[8..12]);
        if size as usize != data.len() {
            return Err(Error::BadSize { declared: size, actual: data.len() });
        }
        let header_size = LittleEndian::read_u16(&data[12..14]) as usize;

        let fatb_pos = header_size;
        check_section_magic(data, fatb_pos, b"BTAF")?;
        let fatb_length = LittleEndian::read_u32(&data[fatb_pos + 4..fatb_pos + 8]) as usize;
        let num_file_entries = LittleEndian::read_u32(&data[fatb_pos + 8..fatb_pos + 12]) as usize;

        let mut fatb_ints = Vec::with_capacity(num_file_entries * 2);
        for i in 0..num_file_entries * 2 {
            let off = fatb_pos + 12 + i * 4;
            fatb_ints.push(LittleEndian::read_u32(&data[off..off + 4]));
        }

        let fntb_pos = fatb_pos + fatb_length;
        check_section_magic(data, fntb_pos, b"BTNF")?;
        let fntb_len = LittleEndian::read_u32(&data[fntb_pos + 4..fntb_pos + 8]) as usize;

        let fimg_pos = fntb_pos + fntb_len;
        check_section_magic(data, fimg_pos, b"GMIF")?;
        let file_data = &data[fimg_pos + 8..];

        let files: Vec<Vec<u8>> = (0..num_file_entries)
            .map(|i| {
                let start = fatb_ints[2 * i] as usize;
                let end = fatb_ints[2 * i + 1] as usize;
                file_data[start..end].to_vec()
            })
            .collect();

        let filename_id_map = fnt::walk_fnt(&data[fntb_pos + 8..fntb_pos + fntb_len]);

        Ok(Narc { files, filename_id_map })
    }

    /// Reassembles the archive's files and path mapping into a full image.
    ///
    /// File IDs are fixed by `filename_id_map`: see
    /// [`fnt::construct_fntb_forced_ids`] for why non-consecutive IDs within
    /// a directory make this fail.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut fatb_contents = vec![0u8; 8 * self.files.len()];
        let mut coff = 0usize;
        for (i, file) in self.files.iter().enumerate() {
            LittleEndian::write_u32(&mut fatb_contents[8 * i..8 * i + 4], coff as u32);
            LittleEndian::write_u32(&mut fatb_contents[8 * i + 4..8 * i + 8], (coff + file.len()) as u32);
            coff += file.len();
            coff += (4 - coff % 4) % 4;
        }

        let mut fatb = Vec::new();
        fatb.extend_from_slice(b"BTAF");
        fatb.extend_from_slice(&((12 + 8 * self.files.len()) as u32).to_le_bytes());
        fatb.extend_from_slice(&(self.files.len() as u32).to_le_bytes());
        fatb.extend_from_slice(&fatb_contents);

        let mut fimg_data = Vec::new();
        for file in &self.files {
            fimg_data.extend_from_slice(file);
            let pad = (4 - file.len() % 4) % 4;
            fimg_data.extend(std::iter::repeat(0u8).take(pad));
        }
        let mut fimg = Vec::new();
        fimg.extend_from_slice(b"GMIF");
        fimg.extend_from_slice(&((coff + 8) as u32).to_le_bytes());
        fimg.extend_from_slice(&fimg_data);

        let fntb_body = fnt::construct_fntb_forced_ids(&self.filename_id_map)?;
        let mut fntb = Vec::new();
        fntb.extend_from_slice(b"BTNF");
        fntb.extend_from_slice(&((8 + fntb_body.len()) as u32).to_le_bytes());
        fntb.extend_from_slice(&fntb_body);

        let mut post_header = Vec::new();
        post_header.extend_from_slice(&fatb);
        post_header.extend_from_slice(&fntb);
        post_header.extend_from_slice(&fimg);

        let mut out = Vec::with_capacity(16 + post_header.len());
        out.extend_from_slice(&HEADER_MAGIC.to_le_bytes());
        out.extend_from_slice(&HEADER_LE_BOM.to_le_bytes());
        out.extend_from_slice(&HEADER_VERSION_MARKER.to_le_bytes());
        out.extend_from_slice(&((0x10 + post_header.len()) as u32).to_le_bytes());
        out.extend_from_slice(&0x10u16.to_le_bytes());
        out.extend_from_slice(&3u16.to_le_bytes());
        out.extend_from_slice(&post_header);

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_bytes() {
        let mut filename_id_map = HashMap::new();
        filename_id_map.insert("/a.bin".to_string(), 0);
        filename_id_map.insert("/dir/b.bin".to_string(), 1);

        let narc = Narc { files: vec![vec![1, 2, 3], vec![4, 5, 6, 7]], filename_id_map };

        let bytes = narc.to_bytes().unwrap();
        let parsed = Narc::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.files, narc.files);
        assert_eq!(parsed.filename_id_map, narc.filename_id_map);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = vec![0u8; 16];
        bytes[0..4].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(Narc::from_bytes(&bytes), Err(Error::BadMagic { .. })));
    }

    #[test]
    fn rejects_size_mismatch() {
        let narc = Narc { files: vec![vec![1, 2, 3]], filename_id_map: HashMap::from([("/a.bin".to_string(), 0)]) };
        let mut bytes = narc.to_bytes().unwrap();
        let true_len = bytes.len() as u32;
        LittleEndian::write_u32(&mut bytes[8..12], true_len + 1);
        assert!(matches!(Narc::from_bytes(&bytes), Err(Error::BadSize { .. })));
    }
}
