/// Venues that earn the impact bonus. Entries are lowercase.
pub const HIGH_IMPACT_JOURNALS: &[&str] = &[
    "nature",
    "science",
    "cell",
    "lancet",
    "jama",
    "bmj",
    "plos one",
    "nature neuroscience",
    "neuron",
    "brain",
    "journal of neuroscience",
    "proceedings of the national academy of sciences",
    "nature communications",
    "scientific reports",
];

/// Case-insensitive lookup against [`HIGH_IMPACT_JOURNALS`].
///
/// A name also matches when its first space-separated token is a listed
/// venue, so "Nature Methods" counts through "nature". Punctuation is kept:
/// "Nature's Digest" has first token "nature's" and does not match.
pub fn is_high_impact(journal: &str) -> bool {
    if journal.is_empty() {
        return false;
    }

    let lower = journal.to_lowercase();
    let first_token = lower.split(' ').next().unwrap_or_default();

    HIGH_IMPACT_JOURNALS.contains(&lower.as_str()) || HIGH_IMPACT_JOURNALS.contains(&first_token)
}
