//! `.lgt` scattering-length tables: `atom real imag` per line, in table units.

use std::fmt::Write as _;
use std::path::Path;

use tracing::{info, warn};

use crate::constants::SCATTERING_LENGTH_SCALE;
use crate::error::{MdReflError, Result};
use crate::scatlen::ScatteringTable;

pub fn parse_lgt(content: &str) -> Result<ScatteringTable> {
    let mut table = ScatteringTable::new();
    for (i, line) in content.lines().enumerate() {
        let lineno = i + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0].starts_with('#') {
            continue;
        }
        if parts.len() != 3 {
            return Err(MdReflError::parse(
                lineno,
                format!("expected 'atom real imag', found {} fields", parts.len()),
            ));
        }
        let number = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| MdReflError::parse(lineno, format!("invalid number '{s}'")))
        };
        let (real, imag) = (number(parts[1])?, number(parts[2])?);
        if !table.insert_table_units(parts[0], real, imag) {
            warn!(atom = parts[0], line = lineno, "duplicate atom type ignored");
        }
    }
    Ok(table)
}

/// Render a table in `.lgt` layout, converting back to table units.
pub fn format_lgt(table: &ScatteringTable) -> String {
    let mut out = String::new();
    for entry in table.iter() {
        let _ = writeln!(
            out,
            "{} {} {}",
            entry.atom_type,
            entry.real / SCATTERING_LENGTH_SCALE,
            entry.imag / SCATTERING_LENGTH_SCALE
        );
    }
    out
}

pub fn read_lgt(path: &Path) -> Result<ScatteringTable> {
    let content = std::fs::read_to_string(path).map_err(|e| MdReflError::io(path, e))?;
    let table = parse_lgt(&content).map_err(|e| e.in_file(path))?;
    info!(path = %path.display(), atom_types = table.len(), "read scattering lengths");
    Ok(table)
}

pub fn write_lgt(path: &Path, table: &ScatteringTable) -> Result<()> {
    std::fs::write(path, format_lgt(table)).map_err(|e| MdReflError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_and_scale() {
        let table = parse_lgt("C1 6.646 0\nH1 -3.739 0.0\n\n").unwrap();
        assert_eq!(table.len(), 2);
        let (re, im) = table.lookup("H1").unwrap();
        assert_relative_eq!(re, -3.739e-5, max_relative = 1e-12);
        assert_eq!(im, 0.0);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let table = parse_lgt("C1 6.646 0\nC1 1.0 1.0\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_relative_eq!(table.lookup("C1").unwrap().0, 6.646e-5, max_relative = 1e-12);
    }

    #[test]
    fn test_wrong_field_count() {
        let err = parse_lgt("C1 6.646\n").unwrap_err();
        assert!(matches!(err, MdReflError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_round_trip() {
        let table = parse_lgt("C1 6.646 0\nOW 5.803 0.0001\nB10 -0.1 0.213\n").unwrap();
        let again = parse_lgt(&format_lgt(&table)).unwrap();
        assert_eq!(again.len(), table.len());
        for (a, b) in table.iter().zip(again.iter()) {
            assert_eq!(a.atom_type, b.atom_type);
            assert_relative_eq!(a.real, b.real, max_relative = 1e-14);
            assert_relative_eq!(a.imag, b.imag, max_relative = 1e-14);
        }
    }
}
