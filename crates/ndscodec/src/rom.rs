//! Decomposition and reassembly of a DS ROM image into its logical parts:
//! header, ARM9/ARM7 code, overlays, files, and banner.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::error::{Error, Result};
use crate::fat;
use crate::fnt;
use crate::header::{Header, HeaderField};
use crate::overlay::{construct_overlay_table, parse_overlay_table, Overlay};

const ARM9_FOOTER: [u8; 4] = [0x21, 0x06, 0xC0, 0xDE];
const ROM_ALIGN: usize = 0x200;

const ST_MROM: u64 = 0x51E;
const ST_PROM: u64 = 0xD7E;
const ROMCTRL_DEC_MROM: u64 = 0x586000;
const ROMCTRL_ENC_MROM: u64 = 0x1808F8;
const ROMCTRL_DEC_PROM: u64 = 0x416657;
const ROMCTRL_ENC_PROM: u64 = 0x81808F8;

const TRY_CAPSHIFT_BASE: u64 = 0x20000;
const MAX_CAPSHIFT_PROM: u32 = 15;
const MAX_CAPSHIFT_MROM: u32 = 10;

fn banner_size(version: u16) -> Result<usize> {
    match version {
        1 => Ok(0x840),
        2 => Ok(0x940),
        3 => Ok(0x1240),
        _ => Err(Error::BannerVersionUnknown(version)),
    }
}

/// Which physical cartridge flash this ROM targets. Governs the `ROMCTRL`
/// timing words and the maximum capacity shift accepted when assigning the
/// ROM's declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Mask ROM.
    Mrom,
    /// Programmable (flash) ROM. The common case for homebrew and repacks.
    Prom,
}

impl Default for StorageType {
    fn default() -> Self {
        StorageType::Prom
    }
}

/// The decomposition of a DS ROM into its constituent parts.
#[derive(Debug, Clone)]
pub struct Rom {
    pub header: Header,
    pub arm9: Vec<u8>,
    pub arm7: Vec<u8>,
    pub arm9_overlays: Vec<Overlay>,
    pub arm7_overlays: Vec<Overlay>,
    /// Mapping of file paths (eg. `/a/b.bin`) to file contents.
    pub files: HashMap<String, Vec<u8>>,
    /// The physical order the files are placed in within the ROM, by path.
    pub file_order: Vec<String>,
    pub banner: Vec<u8>,
}

impl Rom {
    /// Decomposes a full ROM image into its parts.
    pub fn from_bytes(rom: &[u8]) -> Result<Rom> {
        let header = Header::new(rom[..HeaderField::EntireHeader.len()].to_vec())?;

        let fatb = header.get_rom_region(rom, HeaderField::FatbRomOffset, HeaderField::FatbBSize);
        let (fat_entries, fat_order) = fat::parse_fat(fatb);
        let file_seq: Vec<Vec<u8>> =
            fat_entries.iter().map(|&(start, end)| rom[start as usize..end as usize].to_vec()).collect();

        let fntb = header.get_rom_region(rom, HeaderField::FntbRomOffset, HeaderField::FntbBSize);
        let filename_id_map = fnt::walk_fnt(fntb);
        let id_filename_map: HashMap<u32, String> =
            filename_id_map.iter().map(|(name, &id)| (id, name.clone())).collect();
        let file_order: Vec<String> =
            fat_order.into_iter().filter_map(|id| id_filename_map.get(&(id as u32)).cloned()).collect();

        let ovt9 = header.get_rom_region(rom, HeaderField::Ovt9RomOffset, HeaderField::Ovt9BSize);
        let ovt7 = header.get_rom_region(rom, HeaderField::Ovt7RomOffset, HeaderField::Ovt7BSize);
        let arm9_overlays = parse_overlay_table(ovt9, &file_seq);
        let arm7_overlays = parse_overlay_table(ovt7, &file_seq);

        let arm9_start = header.get_le(HeaderField::Arm9RomOffset) as usize;
        let mut arm9_len = header.get_le(HeaderField::Arm9LoadSize) as usize;
        if arm9_start + arm9_len + 12 <= rom.len() && rom[arm9_start + arm9_len..arm9_start + arm9_len + 4] == ARM9_FOOTER
        {
            arm9_len += 12;
        }
        let arm9 = rom[arm9_start..arm9_start + arm9_len].to_vec();

        let arm7 = header.get_rom_region(rom, HeaderField::Arm7RomOffset, HeaderField::Arm7LoadSize).to_vec();

        let banner_off = header.get_le(HeaderField::BannerRomOffset) as usize;
        let banner_version = LittleEndian::read_u16(&rom[banner_off..banner_off + 2]);
        let banner = rom[banner_off..banner_off + banner_size(banner_version)?].to_vec();

        let files: HashMap<String, Vec<u8>> =
            filename_id_map.iter().map(|(name, &id)| (name.clone(), file_seq[id as usize].clone())).collect();

        debug!("decomposed rom: {} files, {} arm9 overlays, {} arm7 overlays", files.len(), arm9_overlays.len(), arm7_overlays.len());

        Ok(Rom { header, arm9, arm7, arm9_overlays, arm7_overlays, files, file_order, banner })
    }

    /// Reassembles the ROM's parts into a full image.
    ///
    /// `fill_with` is the single byte used for inter-section alignment
    /// padding and, if `fill_tail` is set, for padding the image up to the
    /// capacity implied by its computed size.
    pub fn to_bytes(&self, storage_type: StorageType, fill_tail: bool, fill_with: u8) -> Result<Vec<u8>> {
        let (ovt9, ovys9) = construct_overlay_table(&self.arm9_overlays, 0);
        let (ovt7, ovys7) = construct_overlay_table(&self.arm7_overlays, ovys9.len() as u32);

        let mut fatb = vec![0u8; (ovys9.len() + ovys7.len() + self.files.len()) * 8];
        let mut fatb_i = 0usize;
        let mut post: Vec<u8> = Vec::new();
        let mut header = Header::new(self.header.as_bytes().to_vec())?;

        let (romctrl_dec, romctrl_enc, secure_delay) = match storage_type {
            StorageType::Mrom => (ROMCTRL_DEC_MROM, ROMCTRL_ENC_MROM, ST_MROM),
            StorageType::Prom => (ROMCTRL_DEC_PROM, ROMCTRL_ENC_PROM, ST_PROM),
        };
        header.set_le(HeaderField::RomctrlDec, romctrl_dec);
        header.set_le(HeaderField::RomctrlEnc, romctrl_enc);
        header.set_le(HeaderField::SecureDelay, secure_delay);

        let align = |post: &mut Vec<u8>| -> usize {
            let padding = (ROM_ALIGN - post.len() % ROM_ALIGN) % ROM_ALIGN;
            post.extend(std::iter::repeat(fill_with).take(padding));
            padding
        };

        header.set_le(HeaderField::Arm9RomOffset, (Header::SIZE + post.len()) as u64);
        post.extend_from_slice(&self.arm9);
        align(&mut post);

        if self.arm9.len() > 12 && self.arm9[self.arm9.len() - 12..self.arm9.len() - 8] == ARM9_FOOTER {
            header.set_le(HeaderField::Arm9LoadSize, (self.arm9.len() - 12) as u64);
        } else {
            header.set_le(HeaderField::Arm9LoadSize, self.arm9.len() as u64);
        }

        write_overlays(
            &mut header,
            HeaderField::Ovt9RomOffset,
            HeaderField::Ovt9BSize,
            &ovt9,
            &ovys9,
            &mut post,
            &mut fatb,
            &mut fatb_i,
            fill_with,
        );

        header.set_le(HeaderField::Arm7RomOffset, (Header::SIZE + post.len()) as u64);
        post.extend_from_slice(&self.arm7);
        align(&mut post);
        header.set_le(HeaderField::Arm7LoadSize, self.arm7.len() as u64);

        write_overlays(
            &mut header,
            HeaderField::Ovt7RomOffset,
            HeaderField::Ovt7BSize,
            &ovt7,
            &ovys7,
            &mut post,
            &mut fatb,
            &mut fatb_i,
            fill_with,
        );

        if !self.files.is_empty() {
            let (fntb, filename_id_map) = fnt::construct_fntb(self.files.keys(), (ovys9.len() + ovys7.len()) as u32);

            header.set_le(HeaderField::FntbRomOffset, (Header::SIZE + post.len()) as u64);
            post.extend_from_slice(&fntb);
            align(&mut post);
            header.set_le(HeaderField::FntbBSize, fntb.len() as u64);

            let mut file_off = Header::SIZE + post.len() + size_after_padding(fatb.len()) + size_after_padding(self.banner.len());

            for path in &self.file_order {
                let file = &self.files[path];
                let id = filename_id_map[path] as usize;
                LittleEndian::write_u32(&mut fatb[id * 8..id * 8 + 4], file_off as u32);
                LittleEndian::write_u32(&mut fatb[id * 8 + 4..id * 8 + 8], (file_off + file.len()) as u32);
                file_off += size_after_padding(file.len());
            }
        } else {
            header.set_le(HeaderField::FntbRomOffset, 0);
            header.set_le(HeaderField::FntbBSize, 0);
        }

        header.set_le(HeaderField::FatbRomOffset, (Header::SIZE + post.len()) as u64);
        post.extend_from_slice(&fatb);
        align(&mut post);
        header.set_le(HeaderField::FatbBSize, fatb.len() as u64);

        header.set_le(HeaderField::BannerRomOffset, (Header::SIZE + post.len()) as u64);
        post.extend_from_slice(&self.banner);
        let mut last_padding = align(&mut post);

        for path in &self.file_order {
            post.extend_from_slice(&self.files[path]);
            last_padding = align(&mut post);
        }

        if last_padding > 0 {
            let new_len = post.len() - last_padding;
            post.truncate(new_len);
        }

        let rom_size = Header::SIZE + post.len();

        let max_shift = match storage_type {
            StorageType::Mrom => MAX_CAPSHIFT_MROM,
            StorageType::Prom => MAX_CAPSHIFT_PROM,
        };
        let mut found_shift = None;
        for shift in 0..max_shift {
            if (rom_size as u64) < (TRY_CAPSHIFT_BASE << shift) {
                found_shift = Some(shift);
                break;
            }
        }
        let shift = found_shift.ok_or(Error::RomTooBig { size: rom_size, max_shift })?;
        header.set_le(HeaderField::ChipCapacity, shift as u64);

        let tail_size = TRY_CAPSHIFT_BASE << shift;

        header.set_le(HeaderField::RomSize, rom_size as u64);
        header.set_le(HeaderField::HeaderSize, Header::SIZE as u64);
        header.set_le(HeaderField::StaticFooter, 0x4BA0);

        let prefix_len = HeaderField::HeaderCrc.offset();
        let crc = common::util::crc16(&header.as_bytes()[..prefix_len], 0xFFFF);
        header.set_le(HeaderField::HeaderCrc, crc as u64);

        if fill_tail {
            let target = tail_size as usize;
            if target > Header::SIZE + post.len() {
                post.extend(std::iter::repeat(fill_with).take(target - Header::SIZE - post.len()));
            }
        }

        let mut out = header.as_bytes().to_vec();
        out.extend_from_slice(&post);
        Ok(out)
    }
}

fn size_after_padding(size: usize) -> usize {
    size + (ROM_ALIGN - size % ROM_ALIGN) % ROM_ALIGN
}

#[allow(clippy::too_many_arguments)]
fn write_overlays(
    header: &mut Header,
    rom_offset_field: HeaderField,
    bsize_field: HeaderField,
    ovt: &[u8],
    ovys: &[Vec<u8>],
    post: &mut Vec<u8>,
    fatb: &mut [u8],
    fatb_i: &mut usize,
    fill_with: u8,
) {
    header.set_le(rom_offset_field, if !ovt.is_empty() { (Header::SIZE + post.len()) as u64 } else { 0 });
    header.set_le(bsize_field, ovt.len() as u64);

    post.extend_from_slice(ovt);
    let padding = (ROM_ALIGN - post.len() % ROM_ALIGN) % ROM_ALIGN;
    post.extend(std::iter::repeat(fill_with).take(padding));

    for ovy in ovys {
        let cur_off = Header::SIZE + post.len();
        LittleEndian::write_u32(&mut fatb[*fatb_i..*fatb_i + 4], cur_off as u32);
        LittleEndian::write_u32(&mut fatb[*fatb_i + 4..*fatb_i + 8], (cur_off + ovy.len()) as u32);
        *fatb_i += 8;

        post.extend_from_slice(ovy);
        let padding = (ROM_ALIGN - post.len() % ROM_ALIGN) % ROM_ALIGN;
        post.extend(std::iter::repeat(fill_with).take(padding));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_rom() -> Rom {
        let mut header = Header::new(vec![0u8; Header::SIZE]).unwrap();
        header.set(HeaderField::Title, &[0u8; 12]);
        Rom {
            header,
            arm9: vec![0xAA; 16],
            arm7: vec![0xBB; 16],
            arm9_overlays: Vec::new(),
            arm7_overlays: Vec::new(),
            files: HashMap::new(),
            file_order: Vec::new(),
            banner: vec![1, 0, 0, 0].into_iter().cycle().take(0x840).collect(),
        }
    }

    #[test]
    fn roundtrips_empty_rom_through_bytes() {
        let rom = minimal_rom();
        let bytes = rom.to_bytes(StorageType::Prom, true, 0xFF).unwrap();
        let parsed = Rom::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.arm9, rom.arm9);
        assert_eq!(parsed.arm7, rom.arm7);
        assert!(parsed.files.is_empty());
    }

    #[test]
    fn roundtrips_rom_with_files() {
        // `from_bytes` logs a decomposition summary; run with `RUST_LOG=debug`
        // to see it. Ignore the error: other tests in this binary may have
        // already initialized the logger.
        let _ = pretty_env_logger::try_init();

        let mut rom = minimal_rom();
        rom.files.insert("/a.bin".to_string(), vec![1, 2, 3, 4]);
        rom.files.insert("/dir/b.bin".to_string(), vec![5, 6]);
        rom.file_order = vec!["/a.bin".to_string(), "/dir/b.bin".to_string()];

        let bytes = rom.to_bytes(StorageType::Prom, true, 0xFF).unwrap();
        let parsed = Rom::from_bytes(&bytes).unwrap();

        assert_eq!(parsed.files["/a.bin"], vec![1, 2, 3, 4]);
        assert_eq!(parsed.files["/dir/b.bin"], vec![5, 6]);
    }

    #[test]
    fn header_crc_is_recomputed_on_serialize() {
        let rom = minimal_rom();
        let bytes = rom.to_bytes(StorageType::Prom, true, 0xFF).unwrap();
        let header = Header::new(bytes[..Header::SIZE].to_vec()).unwrap();
        let prefix_len = HeaderField::HeaderCrc.offset();
        let expected = common::util::crc16(&header.as_bytes()[..prefix_len], 0xFFFF);
        assert_eq!(header.get_le(HeaderField::HeaderCrc), expected as u64);
    }
}
