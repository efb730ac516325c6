use crate::models::{BASE_SCORE, Publication, PublicationScoreBreakdown};
use crate::ranking::journal::is_high_impact;

pub const IMPACT_BONUS: i64 = 5;

/// Bonus for a publication of the given age in years. A future year gives a
/// negative age and lands in the top bucket.
pub fn recency_bonus(age: i32) -> i64 {
    if age <= 1 {
        10
    } else if age <= 3 {
        5
    } else if age <= 5 {
        2
    } else {
        1
    }
}

pub fn impact_bonus(journal: &str) -> i64 {
    if is_high_impact(journal) { IMPACT_BONUS } else { 0 }
}

/// Scores one publication against the cycle's reference year.
///
/// Missing fields never fail: no year counts as `current_year`, no journal
/// counts as an empty name.
pub fn score_publication(publication: &Publication, current_year: i32) -> PublicationScoreBreakdown {
    let age = current_year - publication.year.unwrap_or(current_year);
    let journal = publication.journal.as_deref().unwrap_or("");

    PublicationScoreBreakdown::new(BASE_SCORE, recency_bonus(age), impact_bonus(journal))
}
