//! Small text helpers shared by the commands.

const UNITS: [(&str, i64); 6] = [
    ("week", 7 * 24 * 60 * 60 * 1000),
    ("day", 24 * 60 * 60 * 1000),
    ("hour", 60 * 60 * 1000),
    ("minute", 60 * 1000),
    ("second", 1000),
    ("millisecond", 1),
];

/// Human readable duration using the two largest non-zero units,
/// e.g. "1 hour, 5 minutes". Milliseconds only show below one second.
pub fn humanize_ms(ms: i64) -> String {
    let mut rest = ms.max(0);
    if rest < 1000 {
        return plural(rest, "millisecond");
    }

    let mut parts = Vec::new();
    for (name, size) in UNITS.iter().take(UNITS.len() - 1) {
        let count = rest / size;
        rest %= size;
        if count > 0 {
            parts.push(plural(count, name));
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(", ")
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Upper-case the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(humanize_ms(0), "0 milliseconds");
        assert_eq!(humanize_ms(1), "1 millisecond");
        assert_eq!(humanize_ms(1_500), "1 second");
        assert_eq!(humanize_ms(65_000), "1 minute, 5 seconds");
        assert_eq!(humanize_ms(2 * 3_600_000 + 60_000 + 5_000), "2 hours, 1 minute");
        assert_eq!(humanize_ms(3 * 86_400_000 + 5_000), "3 days, 5 seconds");
        assert_eq!(humanize_ms(-10), "0 milliseconds");
    }

    #[test]
    fn capitalizes() {
        assert_eq!(capitalize("tag"), "Tag");
        assert_eq!(capitalize(""), "");
    }
}
