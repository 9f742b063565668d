use sensirion_i2c::crc8;

use crate::error::ProtocolError;

/// Bytes per word on the wire: big-endian data followed by its CRC.
pub(crate) const WORD_LEN: usize = 3;

/// Sensirion CRC-8 (polynomial 0x31, init 0xFF) over the given bytes.
pub(crate) fn crc(data: &[u8]) -> u8 {
    crc8::calculate(data)
}

/// Frames `words` into `out` and returns the number of bytes written.
///
/// `out` must hold at least `words.len() * WORD_LEN` bytes.
pub(crate) fn encode_words(words: &[u16], out: &mut [u8]) -> usize {
    for (word, chunk) in words.iter().zip(out.chunks_exact_mut(WORD_LEN)) {
        let bytes = word.to_be_bytes();
        chunk[0] = bytes[0];
        chunk[1] = bytes[1];
        chunk[2] = crc(&bytes);
    }
    words.len() * WORD_LEN
}

/// Checks every word of a response and unpacks it into `words`.
///
/// The whole read is rejected if one checksum is wrong.
pub(crate) fn decode_words(bytes: &[u8], words: &mut [u16]) -> Result<(), ProtocolError> {
    if bytes.len() != words.len() * WORD_LEN {
        return Err(ProtocolError::MalformedFrame);
    }
    crc8::validate(bytes).map_err(|_| ProtocolError::Checksum)?;
    for (chunk, word) in bytes.chunks_exact(WORD_LEN).zip(words.iter_mut()) {
        *word = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(())
}
