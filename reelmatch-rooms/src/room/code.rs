use rand::Rng;

/// Unambiguous alphabet: no 0/O or 1/I.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 6;

/// Random shareable room code. Not guaranteed unique; the store rejects duplicates.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Trims and upper-cases user input. `None` if the result is not a well-formed code.
pub fn normalize(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let well_formed = code.len() == CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b));
    well_formed.then_some(code)
}
