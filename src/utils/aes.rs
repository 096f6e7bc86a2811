use aes::Aes128;
use cbc::{
    cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit},
    Decryptor, Encryptor,
};

type Aes128CbcDec = Decryptor<Aes128>;
type Aes128CbcEnc = Encryptor<Aes128>;

pub fn decrypt_aes128_cbc_nopad(
    data: &mut [u8],
    key: &[u8; 16],
    iv: &[u8; 16],
) -> Result<(), Box<dyn std::error::Error>> {
    let decryptor = Aes128CbcDec::new(key.into(), iv.into());
    decryptor
        .decrypt_padded_mut::<NoPadding>(data)
        .map_err(|e| format!("UnpadError: {:?}", e))?;

    Ok(())
}

pub fn encrypt_aes128_cbc_nopad(
    data: &mut [u8],
    key: &[u8; 16],
    iv: &[u8; 16],
) -> Result<(), Box<dyn std::error::Error>> {
    let msg_len = data.len();
    let encryptor = Aes128CbcEnc::new(key.into(), iv.into());
    encryptor
        .encrypt_padded_mut::<NoPadding>(data, msg_len)
        .map_err(|e| format!("PadError: {:?}", e))?;

    Ok(())
}
