use std::{env, fs, path::PathBuf};

/// Number of page-table levels used when `MLPT_LEVELS` is not set.
const DEFAULT_LEVELS: usize = 3;

/// Number of page-offset bits used when `MLPT_POBITS` is not set.
const DEFAULT_POBITS: u32 = 10;

fn main() {
    println!("cargo:rerun-if-env-changed=MLPT_LEVELS");
    println!("cargo:rerun-if-env-changed=MLPT_POBITS");

    let levels: usize = read_env("MLPT_LEVELS").unwrap_or(DEFAULT_LEVELS);
    let pobits: u32 = read_env("MLPT_POBITS").unwrap_or(DEFAULT_POBITS);

    // Sanity checks (fail fast during build)
    assert!(levels >= 1, "MLPT_LEVELS must be at least 1 (got {levels})");
    assert!(
        (4..=32).contains(&pobits),
        "MLPT_POBITS must be in 4..=32 so a table holds at least two entries (got {pobits})"
    );
    let width = (levels as u64)
        .saturating_mul(u64::from(pobits - 3))
        .saturating_add(u64::from(pobits));
    assert!(
        width <= 64,
        "MLPT_POBITS + MLPT_LEVELS * (MLPT_POBITS - 3) must fit into 64 bits (got {width})"
    );

    let out = PathBuf::from(env::var("OUT_DIR").unwrap()).join("geometry.rs");
    let contents = format!(
        "/// Number of page-table levels walked to translate one address.\n\
         pub const LEVELS: usize = {levels};\n\n\
         /// Number of bits used for the page offset.\n\
         pub const POBITS: u32 = {pobits};\n"
    );
    fs::write(&out, contents).unwrap();
}

fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    let Ok(value) = raw.trim().parse() else {
        panic!("{name} must be an unsigned integer (got {raw:?})");
    };
    Some(value)
}
