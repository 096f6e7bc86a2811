pub mod cipher;
pub mod include;
pub mod reader;

use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use binrw::{BinReaderExt, BinWriterExt};
use thiserror::Error;

use crate::utils::common;
use include::*;
use reader::ContainerMap;

#[derive(Error, Debug)]
pub enum GxpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("header parse error: {0}")]
    Header(#[from] binrw::Error),
    #[error("bad signature")]
    BadSignature,
    #[error("too many filenames")]
    TooManyFilenames,
    #[error("premature EOF in {0} table")]
    ShortTable(&'static str),
    #[error("no entries found in filename table")]
    EmptyFilenameTable,
    #[error("file doesn't correspond to known formats ({0})")]
    UnknownFamily(String),
    #[error("unexpected header format")]
    UnexpectedHeaderFormat,
    #[error("image size 0x{size:x} of {name} is unlikely given cipher algorithm")]
    MisalignedPartition { name: String, size: u32 },
    #[error("partition {name} (0x{size:x}) is smaller than its header block")]
    PartitionTooSmall { name: String, size: u32 },
    #[error("image {0} fails signature test")]
    SignatureTest(String),
    #[error("file {0} already exists")]
    OutputExists(PathBuf),
    #[error("provided image file ({0}) name doesn't match any found in input firmware")]
    NoMatchingImage(PathBuf),
    #[error("provided image has a size 0x{0:x} incompatible with the cipher algorithm")]
    MisalignedImage(u64),
    #[error("partition {0} has no table slot and cannot be replaced")]
    ImplicitReplacement(String),
    #[error("cipher error: {0}")]
    Cipher(String),
}

/// Read and decrypt the 512 byte header block of the partition the stream
/// is positioned at. Returns the plaintext block together with its parsed
/// prefix.
fn read_part_header<R: Read>(input: &mut R, name: &str) -> Result<([u8; HEADER_BLOCK_LEN], PartHeader), GxpError> {
    let mut block = [0u8; HEADER_BLOCK_LEN];
    input.read_exact(&mut block)?;
    cipher::decrypt_header(&mut block)?;

    let header: PartHeader = Cursor::new(&block[..]).read_le()?;
    if header.signature != MAGIC_SIGNATURE {
        return Err(GxpError::SignatureTest(name.to_string()));
    }

    Ok((block, header))
}

/// Decrypt every partition of a firmware image into `output_folder`, one
/// file per partition named by its table entry.
pub fn extract_gxp(input_file: &Path, output_folder: &Path) -> Result<(), GxpError> {
    let mut input = File::open(input_file)?;
    let map = reader::read_container(&mut input)?;

    println!(
        "\n{} firmware image, {} partition(s), table region {} bytes",
        map.personality.prefix(),
        map.entries.len(),
        map.header_len
    );

    //refuse to clobber anything before the first byte is written
    for entry in &map.entries {
        let path = output_folder.join(&entry.name);
        if path.exists() {
            return Err(GxpError::OutputExists(path));
        }
    }
    fs::create_dir_all(output_folder)?;

    for (i, entry) in map.entries.iter().enumerate() {
        let (block, header) = read_part_header(&mut input, &entry.name)?;

        println!("\n({}/{}) - {}, Size: {}", i + 1, map.entries.len(), entry.name, entry.size);
        println!(
            "- Version: {}, Date: {}, Checksum: {:04x}",
            header.version_string(),
            header.date_string(),
            header.checksum
        );

        let part_key = derive_part_key(&block);
        let mut body = common::read_exact(&mut input, entry.size as usize - HEADER_BLOCK_LEN)?;
        let checksum = cipher::decrypt_body(&mut body, &part_key)?;

        let output_path = output_folder.join(&entry.name);
        let mut out_file = OpenOptions::new().write(true).create(true).open(output_path)?;
        out_file.write_all(&body)?;
        println!("- Saved file!");

        if checksum != header.checksum {
            println!(
                "WARNING: checksum of {} ({:04x}) does not match header",
                entry.name, checksum
            );
        }
    }

    println!("\nExtraction finished!");

    Ok(())
}

fn find_matching_entry(map: &ContainerMap, revised_image: &Path) -> Option<usize> {
    let path_string = revised_image.to_string_lossy();
    map.entries.iter().position(|e| path_string.contains(&e.name))
}

/// Rebuild a firmware image with one partition's payload replaced. All
/// other partitions pass through byte for byte; the matched partition gets
/// a recomputed checksum and size, a version with bit 0 toggled, and a
/// freshly encrypted header and body.
pub fn remaster_gxp(
    input_file: &Path,
    output_file: &Path,
    revised_image: &Path,
) -> Result<(), GxpError> {
    let mut input = File::open(input_file)?;
    let map = reader::read_container(&mut input)?;

    let matched = find_matching_entry(&map, revised_image)
        .ok_or_else(|| GxpError::NoMatchingImage(revised_image.to_path_buf()))?;
    if map.entries[matched].implicit {
        return Err(GxpError::ImplicitReplacement(map.entries[matched].name.clone()));
    }

    let mut payload = fs::read(revised_image)?;
    if payload.len() % CIPHER_CHUNK != 0 {
        return Err(GxpError::MisalignedImage(payload.len() as u64));
    }
    let new_checksum = cipher::word_checksum(&payload);

    println!(
        "\nReplacing {} ({} -> {} bytes), checksum {:04x}",
        map.entries[matched].name,
        map.entries[matched].size,
        payload.len() + HEADER_BLOCK_LEN,
        new_checksum
    );

    //patch the table region in memory: new on disk size for the matched
    //partition and its version with bit 0 flipped
    let explicit = map.entries.iter().filter(|e| !e.implicit).count();
    let table_end = map.sizes_pos as usize + 4 * map.personality.max_entries() + 4 * explicit;
    if map.header_len < table_end as u64 {
        return Err(GxpError::UnexpectedHeaderFormat);
    }

    input.seek(SeekFrom::Start(0))?;
    let mut region = common::read_exact(&mut input, map.header_len as usize)?;

    let size_off = map.sizes_pos as usize + 4 * matched;
    let new_size = (payload.len() + HEADER_BLOCK_LEN) as u32;
    region[size_off..size_off + 4].copy_from_slice(&new_size.to_le_bytes());

    let version_off = map.sizes_pos as usize + 4 * map.personality.max_entries() + 4 * matched;
    let old_version = u32::from_le_bytes(region[version_off..version_off + 4].try_into().unwrap());
    region[version_off..version_off + 4].copy_from_slice(&(old_version ^ 1).to_le_bytes());

    let mut output = File::create(output_file)?;
    output.write_all(&region)?;

    for (i, entry) in map.entries.iter().enumerate() {
        if i == matched {
            let (mut block, mut header) = read_part_header(&mut input, &entry.name)?;

            header.checksum = new_checksum;
            header.image_size = payload.len() as u32;
            header.version ^= 1;
            let mut cur = Cursor::new(&mut block[..]);
            cur.write_le(&header)?;

            //the body key is derived from the header as it will sit on
            //disk, so the updated fields take part in it
            let part_key = derive_part_key(&block);

            cipher::encrypt_header(&mut block)?;
            output.write_all(&block)?;

            cipher::encrypt_body(&mut payload, &part_key)?;
            output.write_all(&payload)?;

            //the original payload is discarded
            input.seek(SeekFrom::Current(entry.size as i64 - HEADER_BLOCK_LEN as i64))?;
            println!("({}/{}) - {} replaced", i + 1, map.entries.len(), entry.name);
        } else {
            common::copy_chunks(&mut input, &mut output, entry.size as u64, CIPHER_CHUNK)?;
            println!("({}/{}) - {} copied", i + 1, map.entries.len(), entry.name);
        }
    }

    println!("\nRemaster finished!");

    Ok(())
}
