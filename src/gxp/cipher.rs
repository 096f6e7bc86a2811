use crate::gxp::include::{CIPHER_CHUNK, DEFAULT_KEY, IV};
use crate::gxp::GxpError;
use crate::utils::aes::{decrypt_aes128_cbc_nopad, encrypt_aes128_cbc_nopad};

/// Decrypt a partition's 512 byte header block in place with the fixed
/// firmware key. The block is one chained CBC run.
pub fn decrypt_header(block: &mut [u8]) -> Result<(), GxpError> {
    decrypt_aes128_cbc_nopad(block, &DEFAULT_KEY, &IV).map_err(|e| GxpError::Cipher(e.to_string()))
}

/// Inverse of [`decrypt_header`], used when writing a rebuilt header back
/// to a remastered image.
pub fn encrypt_header(block: &mut [u8]) -> Result<(), GxpError> {
    encrypt_aes128_cbc_nopad(block, &DEFAULT_KEY, &IV).map_err(|e| GxpError::Cipher(e.to_string()))
}

/// Decrypt a partition body in place with its header-derived key and
/// return the checksum the header should carry.
///
/// The body is ciphered in 32 byte chunks with the IV reset for every
/// chunk. This is how the vendor firmware does it; chaining the CBC state
/// across chunks produces images the devices reject.
pub fn decrypt_body(data: &mut [u8], key: &[u8; 16]) -> Result<u16, GxpError> {
    let mut sum: u16 = 0;
    for chunk in data.chunks_exact_mut(CIPHER_CHUNK) {
        decrypt_aes128_cbc_nopad(chunk, key, &IV).map_err(|e| GxpError::Cipher(e.to_string()))?;
        sum = sum.wrapping_add(word_sum(chunk));
    }
    Ok(0u16.wrapping_sub(sum))
}

/// Encrypt a plaintext partition body in place, chunked the same way as
/// [`decrypt_body`].
pub fn encrypt_body(data: &mut [u8], key: &[u8; 16]) -> Result<(), GxpError> {
    for chunk in data.chunks_exact_mut(CIPHER_CHUNK) {
        encrypt_aes128_cbc_nopad(chunk, key, &IV).map_err(|e| GxpError::Cipher(e.to_string()))?;
    }
    Ok(())
}

/// Checksum a plaintext body: the stored value is the two's complement of
/// the 16 bit little endian word sum, so summing the body words plus the
/// checksum always lands on zero mod 65536.
pub fn word_checksum(data: &[u8]) -> u16 {
    0u16.wrapping_sub(word_sum(data))
}

fn word_sum(data: &[u8]) -> u16 {
    data.chunks_exact(2)
        .fold(0u16, |acc, w| acc.wrapping_add(u16::from_le_bytes([w[0], w[1]])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gxp::include::HEADER_BLOCK_LEN;

    fn sample_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(7)).collect()
    }

    #[test]
    fn checksum_law() {
        let payload = sample_bytes(96);
        let checksum = word_checksum(&payload);
        let total = payload
            .chunks_exact(2)
            .fold(0u16, |acc, w| acc.wrapping_add(u16::from_le_bytes([w[0], w[1]])))
            .wrapping_add(checksum);
        assert_eq!(total, 0);
    }

    #[test]
    fn header_block_round_trips() {
        let original = sample_bytes(HEADER_BLOCK_LEN);

        let mut block = original.clone();
        decrypt_header(&mut block).unwrap();
        encrypt_header(&mut block).unwrap();
        assert_eq!(block, original);

        let mut block = original.clone();
        encrypt_header(&mut block).unwrap();
        decrypt_header(&mut block).unwrap();
        assert_eq!(block, original);
    }

    #[test]
    fn body_round_trips_and_reports_checksum() {
        let key = [0x42u8; 16];
        let plain = sample_bytes(4 * CIPHER_CHUNK);
        let expected = word_checksum(&plain);

        let mut data = plain.clone();
        encrypt_body(&mut data, &key).unwrap();
        assert_ne!(data, plain);
        let checksum = decrypt_body(&mut data, &key).unwrap();
        assert_eq!(data, plain);
        assert_eq!(checksum, expected);
    }

    #[test]
    fn body_chunks_are_ciphered_independently() {
        let key = [0x42u8; 16];
        //two identical chunks must yield identical ciphertext because the
        //IV is reset per chunk instead of chaining across the body
        let mut data = sample_bytes(CIPHER_CHUNK).repeat(2);
        encrypt_body(&mut data, &key).unwrap();
        let (a, b) = data.split_at(CIPHER_CHUNK);
        assert_eq!(a, b);
    }
}
