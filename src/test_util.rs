use crate::crc;

pub(crate) const ADDR: u8 = crate::transport::DEFAULT_ADDRESS;

/// Response bytes: every word followed by its CRC.
pub(crate) fn words(words: &[u16]) -> Vec<u8> {
    let mut out = vec![0u8; words.len() * crc::WORD_LEN];
    crc::encode_words(words, &mut out);
    out
}

/// A bare command write.
pub(crate) fn cmd(opcode: u16) -> Vec<u8> {
    opcode.to_be_bytes().to_vec()
}

/// A command write with CRC-framed arguments.
pub(crate) fn cmd_args(opcode: u16, args: &[u16]) -> Vec<u8> {
    let mut out = cmd(opcode);
    out.extend(words(args));
    out
}

/// Product-name response words for `name`, NUL padded.
pub(crate) fn name_words(name: &str) -> [u16; 16] {
    let mut bytes = [0u8; 32];
    bytes[..name.len()].copy_from_slice(name.as_bytes());
    let mut out = [0u16; 16];
    for (word, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        *word = u16::from_be_bytes([pair[0], pair[1]]);
    }
    out
}

/// Instant `secs` seconds after boot.
pub(crate) fn at(secs: u64) -> crate::Instant {
    crate::Instant::from_ticks(secs * 1000)
}

/// Start-up handshake of an auto-detected module with clean status and
/// nothing to configure.
pub(crate) fn startup(name: &str) -> Vec<embedded_hal_mock::eh1::i2c::Transaction> {
    use embedded_hal_mock::eh1::i2c::Transaction;
    let stop = if name == "SEN60" { 0x3f86 } else { 0x0104 };
    vec![
        Transaction::write(ADDR, cmd(0xd014)),
        Transaction::read(ADDR, words(&name_words(name))),
        Transaction::write(ADDR, cmd(stop)),
        Transaction::write(ADDR, cmd(0xd210)),
        Transaction::read(ADDR, words(&[0, 0])),
    ]
}
