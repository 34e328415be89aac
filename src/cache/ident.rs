//! Random identifiers for stored image files.

use rand::distributions::Alphanumeric;
use rand::Rng;

pub const DEFAULT_SECTIONS: usize = 5;
pub const DEFAULT_PHRASE_LEN: usize = 5;
pub const DEFAULT_SEPARATOR: &str = "-";

/// Generate an id like `aB3dE-9xYz1-...` using the default shape.
pub fn random_id() -> String {
    random_id_with(DEFAULT_SECTIONS, DEFAULT_PHRASE_LEN, DEFAULT_SEPARATOR)
}

/// Generate `sections` groups of `phrase_len` characters from `[A-Za-z0-9]`
/// joined by `separator`. Collisions are not checked.
pub fn random_id_with(sections: usize, phrase_len: usize, separator: &str) -> String {
    let mut rng = rand::thread_rng();
    (0..sections)
        .map(|_| {
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(phrase_len)
                .map(char::from)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(separator)
}
