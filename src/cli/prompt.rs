//! Interactive stdin prompts for setup and pairing

use std::io::BufRead;

/// Read a 1-based selection, returning the 0-based index.
///
/// Empty input, "q", or anything out of range aborts.
pub fn select_index(reader: &mut impl BufRead, count: usize) -> Option<usize> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("q") {
        return None;
    }

    let choice: usize = trimmed.parse().ok()?;
    if choice >= 1 && choice <= count {
        Some(choice - 1)
    } else {
        None
    }
}

/// Read a PIN code. Empty input aborts.
pub fn read_pin(reader: &mut impl BufRead) -> Option<String> {
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_index_is_one_based() {
        assert_eq!(select_index(&mut "1\n".as_bytes(), 3), Some(0));
        assert_eq!(select_index(&mut "3\n".as_bytes(), 3), Some(2));
    }

    #[test]
    fn select_index_rejects_out_of_range() {
        assert_eq!(select_index(&mut "0\n".as_bytes(), 3), None);
        assert_eq!(select_index(&mut "4\n".as_bytes(), 3), None);
    }

    #[test]
    fn select_index_aborts_on_quit_or_empty() {
        assert_eq!(select_index(&mut "q\n".as_bytes(), 3), None);
        assert_eq!(select_index(&mut "\n".as_bytes(), 3), None);
        assert_eq!(select_index(&mut "speaker\n".as_bytes(), 3), None);
    }

    #[test]
    fn read_pin_trims_whitespace() {
        assert_eq!(read_pin(&mut "  4321 \n".as_bytes()), Some("4321".into()));
    }

    #[test]
    fn read_pin_aborts_on_empty() {
        assert_eq!(read_pin(&mut "\n".as_bytes()), None);
    }
}
