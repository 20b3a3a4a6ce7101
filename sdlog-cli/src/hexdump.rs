//! Sector hex dump in the classic offset-prefixed layout.

fn hex_row(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print `data` as rows of 16 hex bytes with a gap after the eighth.
pub fn print_sector(data: &[u8]) {
    println!("Offset: 00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F");
    println!("-------------------------------------------------------");
    for (row, chunk) in data.chunks(16).enumerate() {
        let (left, right) = chunk.split_at(chunk.len().min(8));
        println!("{:06X}: {}  {}", row * 16, hex_row(left), hex_row(right));
    }
}
