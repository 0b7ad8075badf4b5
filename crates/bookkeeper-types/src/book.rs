use crate::ids::BookId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookCategory {
    /// The primary numbered series.
    MainSequence,
    BranchBook3,
    BranchBook5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    Published,
    PrePublication,
    InDevelopment,
}

/// Catalog metadata for a title. Reference data owned outside the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub book_number: Option<u32>,
    pub category: BookCategory,
    pub publication_status: PublicationStatus,
    pub is_active: bool,
    pub sort_order: i32,
}

impl Book {
    /// `"Book 3"` for numbered titles, otherwise the title.
    pub fn label(&self) -> String {
        match self.book_number {
            Some(n) => format!("Book {n}"),
            None => self.title.clone(),
        }
    }
}
