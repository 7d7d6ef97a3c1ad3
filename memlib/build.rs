fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    // Generated here rather than in a const fn: the table is 64KiB of
    // entries and blows through the const-eval step limit, and build.rs
    // output is cached across compilations anyway.
    let out_dir = std::env::var_os("OUT_DIR").unwrap();
    let path = std::path::Path::new(&out_dir).join("hex_pairs.rs");
    let table = format!("{:?}", hex_pair_table());
    std::fs::write(
        &path,
        format!("pub(crate) const HEX_PAIRS: [[u8; 256]; 256] = {};", table),
    )
    .unwrap();
}

/// For every pair of ASCII bytes, the byte value of the two hex digits they
/// spell. Non-hex input maps to 0.
fn hex_pair_table() -> [[u8; 256]; 256] {
    let mut table = [[0u8; 256]; 256];
    for high in 0..=255u8 {
        for low in 0..=255u8 {
            table[high as usize][low as usize] = hex_digit(high) << 4 | hex_digit(low);
        }
    }
    table
}

fn hex_digit(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'A'..=b'F' => byte - b'A' + 10,
        b'a'..=b'f' => byte - b'a' + 10,
        _ => 0,
    }
}
