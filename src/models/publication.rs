use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublicationType {
    #[default]
    JournalArticle,
    ConferenceProceeding,
    Book,
    BookChapter,
    Preprint,
    Other,
}

impl PublicationType {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::JournalArticle => "journal-article",
            Self::ConferenceProceeding => "conference-proceeding",
            Self::Book => "book",
            Self::BookChapter => "book-chapter",
            Self::Preprint => "preprint",
            Self::Other => "other",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "journal-article" => Self::JournalArticle,
            "conference-proceeding" => Self::ConferenceProceeding,
            "book" => Self::Book,
            "book-chapter" => Self::BookChapter,
            "preprint" => Self::Preprint,
            _ => Self::Other,
        }
    }
}

/// A publication attached to a user by DOI. Never edited after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: i64,
    pub user_id: i64,
    pub doi: String,
    pub title: String,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub publication_type: PublicationType,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PublicationRow {
    pub id: i64,
    pub user_id: i64,
    pub doi: String,
    pub title: String,
    pub authors_json: Option<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub publication_type: Option<String>,
    pub abstract_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PublicationRow> for Publication {
    fn from(row: PublicationRow) -> Self {
        let authors = row
            .authors_json
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .unwrap_or_default();

        Self {
            id: row.id,
            user_id: row.user_id,
            doi: row.doi,
            title: row.title,
            authors,
            journal: row.journal,
            year: row.year,
            publication_type: row
                .publication_type
                .as_deref()
                .map(PublicationType::from_code)
                .unwrap_or_default(),
            abstract_text: row.abstract_text,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePublication {
    pub doi: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub publication_type: PublicationType,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_publication_type_maps_to_other() {
        assert_eq!(PublicationType::from_code("dataset"), PublicationType::Other);
        assert_eq!(
            PublicationType::from_code("Book-Chapter"),
            PublicationType::BookChapter
        );
    }

    #[test]
    fn row_with_malformed_authors_json_yields_empty_authors() {
        let row = PublicationRow {
            id: 7,
            user_id: 3,
            doi: "10.1000/xyz".to_string(),
            title: "Title".to_string(),
            authors_json: Some("not json".to_string()),
            journal: None,
            year: None,
            publication_type: None,
            abstract_text: None,
            created_at: Utc::now(),
        };

        let publication = Publication::from(row);
        assert!(publication.authors.is_empty());
        assert_eq!(publication.publication_type, PublicationType::JournalArticle);
    }
}
