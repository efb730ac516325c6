use std::sync::LazyLock;

use regex::Regex;

static DOI_URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(dx\.)?doi\.org/").expect("valid DOI prefix regex"));

static DOI_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\S+/\S+$").expect("valid DOI shape regex"));

/// Strips a `https://doi.org/` style prefix and lowercases.
pub fn normalize_doi(raw: &str) -> String {
    DOI_URL_PREFIX.replace(raw.trim(), "").to_lowercase()
}

pub fn is_valid_doi(raw: &str) -> bool {
    DOI_SHAPE.is_match(&normalize_doi(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_resolver_prefixes() {
        assert_eq!(normalize_doi("https://doi.org/10.1038/NN.4242"), "10.1038/nn.4242");
        assert_eq!(normalize_doi("http://dx.doi.org/10.1126/Science.1"), "10.1126/science.1");
        assert_eq!(normalize_doi("10.1016/J.NEURON.2020.01.001"), "10.1016/j.neuron.2020.01.001");
    }

    #[test]
    fn validates_shape() {
        assert!(is_valid_doi("10.1038/nn.4242"));
        assert!(is_valid_doi("https://doi.org/10.1038/nn.4242"));
        assert!(!is_valid_doi("11.1038/nn.4242"));
        assert!(!is_valid_doi("10.1038"));
        assert!(!is_valid_doi("doi:10.1038/nn.4242"));
    }
}
