//! Server default collation lookup

/// Collation name for a handshake character-set id, `"other"` when unknown.
#[must_use]
pub const fn charset_name(id: u8) -> &'static str {
    match id {
        0x01 => "big5_chinese_ci",
        0x02 => "latin2_czech_cs",
        0x03 => "dec8_swedish_ci",
        0x04 => "cp850_general_ci",
        0x05 => "latin1_german1_ci",
        0x06 => "hp8_english_ci",
        0x07 => "koi8r_general_ci",
        0x08 => "latin1_swedish_ci",
        0x09 => "latin2_general_ci",
        0x0a => "swe7_swedish_ci",
        0x21 => "utf8mb3_general_ci",
        0x2d => "utf8mb4_general_ci",
        0x2e => "utf8mb4_bin",
        0x3f => "binary",
        0xe0 => "utf8mb4_unicode_ci",
        0xff => "utf8mb4_0900_ai_ci",
        _ => "other",
    }
}
