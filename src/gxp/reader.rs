use std::io::{self, Read, Seek, SeekFrom};

use crate::gxp::include::*;
use crate::gxp::GxpError;
use crate::utils::common;

#[derive(Debug, Clone)]
pub struct PartitionEntry {
    pub name: String,
    pub size: u32, //header block plus body, bytes on disk
    pub version: u32,
    pub implicit: bool, //legacy hidden entry, owns no filename or size table slot
}

/// Everything the pipelines need to know about one firmware image: the
/// resolved device family, the partition table and the inferred length of
/// the table region.
#[derive(Debug, Clone)]
pub struct ContainerMap {
    pub personality: Personality,
    pub entries: Vec<PartitionEntry>,
    pub header_len: u64,
    pub sizes_pos: u64, //absolute offset of the size table, remaster patches it in place
    pub file_len: u64,
}

fn table_err(e: io::Error, table: &'static str) -> GxpError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        GxpError::ShortTable(table)
    } else {
        GxpError::Io(e)
    }
}

/// Parse the container tables and recover the layout.
///
/// The region holding the filename/size/version tables has no stored
/// length; it is whatever remains after subtracting every partition's size
/// from the file length. On success the stream is positioned at the first
/// partition header.
pub fn read_container<R: Read + Seek>(input: &mut R) -> Result<ContainerMap, GxpError> {
    let file_len = input.seek(SeekFrom::End(0))?;
    input.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    input.read_exact(&mut magic).map_err(|e| table_err(e, "filename"))?;
    if u32::from_le_bytes(magic) != MAGIC_SIGNATURE {
        return Err(GxpError::BadSignature);
    }

    //collect the filenames. unused slots are zero filled and get walked
    //over; the scan stops once a slot starts with a zero byte but carries
    //a nonzero byte in positions 1..4, which in practice is the first
    //entry of the size table (partition sizes are 0x100 aligned)
    let mut names: Vec<String> = Vec::new();
    let mut first_slot = [0u8; FILENAME_SLOT_LEN];
    loop {
        if names.len() == FILENAME_SLOTS {
            return Err(GxpError::TooManyFilenames);
        }

        let mut slot = [0u8; FILENAME_SLOT_LEN];
        input.read_exact(&mut slot).map_err(|e| table_err(e, "filename"))?;

        if slot[0] == 0 {
            if slot[1] != 0 || slot[2] != 0 || slot[3] != 0 {
                break;
            }
            continue;
        }

        if names.is_empty() {
            first_slot = slot;
        }
        names.push(common::string_from_bytes(&slot));
    }

    if names.is_empty() {
        return Err(GxpError::EmptyFilenameTable);
    }

    let personality = Personality::resolve(&names[0])
        .ok_or_else(|| GxpError::UnknownFamily(names[0].clone()))?;
    if names.len() > personality.max_entries() {
        return Err(GxpError::TooManyFilenames);
    }

    //the scan overshot by one slot, back up onto the size table
    let sizes_pos = input.seek(SeekFrom::Current(-(FILENAME_SLOT_LEN as i64)))?;

    let mut sizes: Vec<u32> = Vec::new();
    let mut image_sum: u64 = 0;
    for _ in 0..names.len() {
        let mut word = [0u8; 4];
        input.read_exact(&mut word).map_err(|e| table_err(e, "size"))?;
        let size = u32::from_le_bytes(word);
        image_sum += size as u64;
        sizes.push(size);
    }

    //the size table always reserves the family's full capacity
    let unused_slots = personality.max_entries() - names.len();
    input.seek(SeekFrom::Current((unused_slots * 4) as i64))?;

    let mut versions: Vec<u32> = Vec::new();
    for _ in 0..names.len() {
        let mut word = [0u8; 4];
        input.read_exact(&mut word).map_err(|e| table_err(e, "version"))?;
        versions.push(u32::from_le_bytes(word));
    }

    if file_len <= image_sum {
        return Err(GxpError::UnexpectedHeaderFormat);
    }
    let mut header_len = file_len - image_sum;

    let mut entries: Vec<PartitionEntry> = names
        .into_iter()
        .zip(sizes)
        .zip(versions)
        .map(|((name, size), version)| PartitionEntry { name, size, version, implicit: false })
        .collect();

    //older GXP21xx images carry a hidden local partition at the end of the
    //file, named inside the first filename slot; the real table region is
    //a fixed 0x1C0 bytes and the leftover belongs to that partition
    if personality.legacy_extra_file() && first_slot[LEGACY_NAME_OFFSET] != 0 {
        if header_len <= LEGACY_HEADER_LEN {
            return Err(GxpError::UnexpectedHeaderFormat);
        }
        entries.push(PartitionEntry {
            name: common::string_from_bytes(&first_slot[LEGACY_NAME_OFFSET..]),
            size: (header_len - LEGACY_HEADER_LEN) as u32,
            version: 0,
            implicit: true,
        });
        header_len = LEGACY_HEADER_LEN;
    }

    for entry in &entries {
        if entry.size as usize % CIPHER_CHUNK != 0 {
            return Err(GxpError::MisalignedPartition {
                name: entry.name.clone(),
                size: entry.size,
            });
        }
        if (entry.size as usize) < HEADER_BLOCK_LEN {
            return Err(GxpError::PartitionTooSmall {
                name: entry.name.clone(),
                size: entry.size,
            });
        }
    }

    input.seek(SeekFrom::Start(header_len))?;

    Ok(ContainerMap { personality, entries, header_len, sizes_pos, file_len })
}
