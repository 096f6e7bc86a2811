use binrw::{BinRead, BinWrite};

pub const MAGIC_SIGNATURE: u32 = 0x23C9_7AF9;

pub const HEADER_BLOCK_LEN: usize = 0x200; //every partition starts with one encrypted 512 byte header block
pub const CIPHER_CHUNK: usize = 32; //partition bodies are ciphered 32 bytes at a time, IV reset each chunk
pub const FILENAME_SLOTS: usize = 8; //on disk capacity of the filename table
pub const FILENAME_SLOT_LEN: usize = 64;
pub const KEY_MATERIAL_OFFSET: usize = 16; //offset of the id field in the decrypted header block

//older GXP21xx images hide a second filename inside the first slot and keep
//a fixed 0x1C0 byte table region, with the hidden partition at the end of the file
pub const LEGACY_NAME_OFFSET: usize = 24;
pub const LEGACY_HEADER_LEN: u64 = 0x1C0;

// -- PARTITION HEADER --
// interpreted prefix of the 512 byte header block, after decryption

#[derive(Debug, Clone, BinRead, BinWrite)]
pub struct PartHeader {
    pub signature: u32, //must equal MAGIC_SIGNATURE once decrypted
    pub version: u32,
    pub partition_size: u32,
    pub image_size: u32,
    pub id: u16,
    pub checksum: u16, //16 bit word sum complement of the plaintext body
    pub year: u16,
    pub day: u8,
    pub month: u8,
    pub minute: u8,
    pub hour: u8,
    pub hwid: u16,
    pub mask: [u16; 2],
}

impl PartHeader {
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            (self.version >> 24) & 0xFF,
            (self.version >> 16) & 0xFF,
            (self.version >> 8) & 0xFF,
            self.version & 0xFF
        )
    }
    pub fn date_string(&self) -> String {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

// -- DEVICE FAMILIES --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Personality {
    Gxp21,
    Gxp1,
}

impl Personality {
    //order matters, "gxp1" would also match every GXP21xx image
    const RESOLVE_ORDER: [Personality; 2] = [Personality::Gxp21, Personality::Gxp1];

    pub fn resolve(first_name: &str) -> Option<Personality> {
        Personality::RESOLVE_ORDER
            .into_iter()
            .find(|p| first_name.starts_with(p.prefix()))
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Personality::Gxp21 => "gxp21",
            Personality::Gxp1 => "gxp1",
        }
    }

    pub fn max_entries(&self) -> usize {
        match self {
            Personality::Gxp21 => 6,
            Personality::Gxp1 => 8,
        }
    }

    pub fn legacy_extra_file(&self) -> bool {
        match self {
            Personality::Gxp21 => true,
            Personality::Gxp1 => false,
        }
    }
}

/// Derive the body cipher key for one partition from its decrypted header
/// block. The key is the 16 bytes starting at the id field with each
/// adjacent byte pair swapped.
pub fn derive_part_key(header_block: &[u8]) -> [u8; 16] {
    let material = &header_block[KEY_MATERIAL_OFFSET..KEY_MATERIAL_OFFSET + 16];
    let mut key = [0u8; 16];
    for i in (0..16).step_by(2) {
        key[i] = material[i + 1];
        key[i + 1] = material[i];
    }
    key
}

// -- dec key --
pub static DEFAULT_KEY: [u8; 16] = [
    0x6A, 0xA3, 0x1C, 0x8E, 0x5D, 0x21, 0xF0, 0x44,
    0x9B, 0x72, 0xE5, 0x0F, 0xC6, 0x38, 0xD1, 0x57,
];

pub static IV: [u8; 16] = [
    0x4F, 0x2B, 0x96, 0xE1, 0x0A, 0xD8, 0x63, 0x35,
    0xB7, 0x1E, 0x82, 0xC9, 0x54, 0xFA, 0x2D, 0x70,
];

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::{BinReaderExt, BinWriterExt};
    use std::io::Cursor;

    #[test]
    fn personality_resolution_is_order_sensitive() {
        assert_eq!(Personality::resolve("gxp21xyz"), Some(Personality::Gxp21));
        assert_eq!(Personality::resolve("gxp1test"), Some(Personality::Gxp1));
        assert_eq!(Personality::resolve("gxp2130boot.bin"), Some(Personality::Gxp21));
        assert_eq!(Personality::resolve("snom870"), None);
    }

    #[test]
    fn personality_profiles() {
        assert_eq!(Personality::Gxp21.max_entries(), 6);
        assert!(Personality::Gxp21.legacy_extra_file());
        assert_eq!(Personality::Gxp1.max_entries(), 8);
        assert!(!Personality::Gxp1.legacy_extra_file());
    }

    #[test]
    fn part_key_swaps_adjacent_bytes() {
        let mut block = [0u8; HEADER_BLOCK_LEN];
        for (i, b) in block.iter_mut().enumerate() {
            *b = i as u8;
        }
        let key = derive_part_key(&block);
        assert_eq!(key[0], block[KEY_MATERIAL_OFFSET + 1]);
        assert_eq!(key[1], block[KEY_MATERIAL_OFFSET]);
        assert_eq!(key[14], block[KEY_MATERIAL_OFFSET + 15]);
        assert_eq!(key[15], block[KEY_MATERIAL_OFFSET + 14]);
    }

    #[test]
    fn part_header_layout_round_trip() {
        let header = PartHeader {
            signature: MAGIC_SIGNATURE,
            version: 0x0100_0302,
            partition_size: 0x220,
            image_size: 0x20,
            id: 0x1234,
            checksum: 0xBEEF,
            year: 2019,
            day: 2,
            month: 5,
            minute: 30,
            hour: 4,
            hwid: 0xCAFE,
            mask: [1, 2],
        };

        let mut cur = Cursor::new(Vec::new());
        cur.write_le(&header).unwrap();
        let bytes = cur.into_inner();
        assert_eq!(bytes.len(), 28);
        //id sits right after the four u32 fields, this offset anchors key derivation
        assert_eq!(&bytes[KEY_MATERIAL_OFFSET..KEY_MATERIAL_OFFSET + 2], &0x1234u16.to_le_bytes());

        let back: PartHeader = Cursor::new(&bytes).read_le().unwrap();
        assert_eq!(back.signature, header.signature);
        assert_eq!(back.checksum, header.checksum);
        assert_eq!(back.mask, header.mask);
        assert_eq!(back.version_string(), "1.0.3.2");
        assert_eq!(back.date_string(), "2019-05-02 04:30");
    }
}
