/// Line statistics of a single file changed by a pull request.
///
/// Counts are kept in their wire encoding and only interpreted by [`total_change_count`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    pub filename: String,
    pub additions: String,
    pub deletions: String,
}

impl ChangeRecord {
    pub fn new(filename: &str, additions: &str, deletions: &str) -> Self {
        Self {
            filename: filename.to_string(),
            additions: additions.to_string(),
            deletions: deletions.to_string(),
        }
    }
}

/// Sums additions and deletions over all changed files.
///
/// A count that cannot be parsed contributes zero, so one malformed record never prevents
/// the PR from being labeled.
pub fn total_change_count(records: &[ChangeRecord]) -> u64 {
    records
        .iter()
        .map(|record| {
            parse_count(&record.filename, "additions", &record.additions)
                .saturating_add(parse_count(&record.filename, "deletions", &record.deletions))
        })
        .fold(0u64, u64::saturating_add)
}

fn parse_count(filename: &str, field: &str, value: &str) -> u64 {
    match value.trim().parse::<u64>() {
        Ok(count) => count,
        Err(error) => {
            tracing::warn!("Cannot parse {field} of {filename} ({value:?}): {error}, using 0");
            0
        }
    }
}
