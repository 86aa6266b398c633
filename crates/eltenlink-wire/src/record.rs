//! Fixed-width record reading.
//!
//! Header blocks and homogeneous listings place a known number of fields per
//! record at consecutive line offsets. Nothing in the payload labels the
//! fields; correctness is pure offset arithmetic.

/// Parses an integer field, defaulting to 0 on any failure.
///
/// The protocol carries no schema, so a field expected to be numeric can
/// arrive blank or garbled; per-field resilience beats failing the record.
#[must_use]
pub fn parse_int(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

/// An ordered tuple of positional fields sliced from consecutive lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Builds a record from raw field values.
    #[must_use]
    pub const fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field `index` exactly as sliced from the payload.
    #[must_use]
    pub fn raw(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", String::as_str)
    }

    /// Field `index`, trimmed; empty if absent.
    #[must_use]
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", |f| f.trim())
    }

    /// Field `index` parsed as an integer, defaulting to 0.
    #[must_use]
    pub fn int(&self, index: usize) -> i64 {
        parse_int(self.field(index))
    }

    /// Field `index` interpreted as a boolean flag: any non-empty value
    /// other than `"0"` is true.
    #[must_use]
    pub fn flag(&self, index: usize) -> bool {
        let value = self.field(index);
        !value.is_empty() && value != "0"
    }
}

/// Slices consecutive lines into fixed-width records.
///
/// Reads up to `count` records of `width` fields each, starting at `start`.
/// When the remaining lines cannot fill one more complete record the reader
/// stops early and the partial tail is dropped: the server is known to
/// truncate long listings, and a shortened listing is more useful than none.
#[must_use]
pub fn read_records(lines: &[String], start: usize, count: usize, width: usize) -> Vec<Record> {
    if width == 0 {
        return Vec::new();
    }
    let mut records = Vec::with_capacity(count.min(lines.len() / width));
    let mut index = start;
    for _ in 0..count {
        let Some(fields) = lines.get(index..index + width) else {
            tracing::debug!(
                read = records.len(),
                declared = count,
                width,
                "listing truncated mid-record; dropping partial tail"
            );
            break;
        };
        records.push(Record::new(fields.to_vec()));
        index += width;
    }
    records
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|&l| l.to_owned()).collect()
    }

    #[test]
    fn test_two_records_of_width_two() {
        let input = lines(&["0", "2", "alice", "true", "bob", "false"]);
        let records = read_records(&input, 2, 2, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field(0), "alice");
        assert_eq!(records[0].field(1), "true");
        assert_eq!(records[1].field(0), "bob");
        assert_eq!(records[1].field(1), "false");
    }

    #[test]
    fn test_truncated_tail_dropped() {
        let input = lines(&["a", "b", "c", "d", "e"]);
        // Three declared records of width two, but only two and a half fit.
        let records = read_records(&input, 0, 3, 2);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let input = lines(&["x", " padded ", "9", "0"]);
        let records = read_records(&input, 0, 2, 2);
        let rebuilt: Vec<&str> = records
            .iter()
            .flat_map(|r| (0..r.len()).map(|i| r.raw(i)))
            .collect();
        assert_eq!(rebuilt, vec!["x", " padded ", "9", "0"]);
    }

    #[test]
    fn test_numeric_defaults_to_zero() {
        let record = Record::new(vec!["abc".to_owned(), " 12 ".to_owned()]);
        assert_eq!(record.int(0), 0);
        assert_eq!(record.int(1), 12);
        assert_eq!(record.int(5), 0);
    }

    #[test]
    fn test_zero_width_yields_nothing() {
        let input = lines(&["a", "b"]);
        assert!(read_records(&input, 0, 5, 0).is_empty());
    }
}
