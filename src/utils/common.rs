use std::io::{self, Read, Write};

pub fn read_exact<R: Read>(reader: &mut R, size: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; size];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn string_from_bytes(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).to_string()
}

/// Copy `total` bytes from `reader` to `writer` in `chunk`-sized pieces.
/// `total` must be a multiple of `chunk`.
pub fn copy_chunks<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total: u64,
    chunk: usize,
) -> io::Result<()> {
    let mut buf = vec![0u8; chunk];
    let mut remaining = total;
    while remaining > 0 {
        reader.read_exact(&mut buf)?;
        writer.write_all(&buf)?;
        remaining -= chunk as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn string_from_bytes_stops_at_nul() {
        let buf = b"boot.bin\0\0\0garbage";
        assert_eq!(string_from_bytes(buf), "boot.bin");
        assert_eq!(string_from_bytes(b"nonul"), "nonul");
    }

    #[test]
    fn copy_chunks_moves_exact_amount() {
        let src: Vec<u8> = (0..96u8).collect();
        let mut reader = Cursor::new(src.clone());
        let mut out = Vec::new();
        copy_chunks(&mut reader, &mut out, 64, 32).unwrap();
        assert_eq!(out, &src[..64]);
        assert_eq!(reader.position(), 64);
    }
}
