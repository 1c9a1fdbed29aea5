use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn absolute_url(&self) -> String {
        format!("/tag/{}/", self.slug)
    }
}
