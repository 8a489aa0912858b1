use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Invalid range because {end} < {begin}")]
    Invalid { begin: i32, end: i32 },

    #[error("Range {begin}..={end} is too large to summarize")]
    Overflow { begin: i32, end: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSummary {
    pub sum: i32,
    pub count: i32,
}

/// Sum and count of all integers in `begin..=end`.
pub fn numbers_in_range(begin: i32, end: i32) -> Result<RangeSummary, RangeError> {
    if end < begin {
        return Err(RangeError::Invalid { begin, end });
    }

    let count = i64::from(end) - i64::from(begin) + 1;
    let sum = (i64::from(begin) + i64::from(end)) * count / 2;
    let overflow = || RangeError::Overflow { begin, end };
    Ok(RangeSummary {
        sum: i32::try_from(sum).map_err(|_| overflow())?,
        count: i32::try_from(count).map_err(|_| overflow())?,
    })
}
