use serde::Serialize;

/// Page-number pagination over a result set of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous: Option<i64>,
    pub next: Option<i64>,
}

impl PageInfo {
    /// Resolves the raw `page` query value against `total` rows.
    ///
    /// Missing or non-numeric values select the first page. Numbers outside
    /// `1..=num_pages` select the last page. An empty set is page 1 of 1.
    pub fn resolve(raw: Option<&str>, total: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = ((total.max(0) + per_page - 1) / per_page).max(1);

        let number = match raw.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if (1..=num_pages).contains(&n) => n,
            Some(Ok(_)) => num_pages,
            Some(Err(_)) | None => 1,
        };

        Self {
            number,
            num_pages,
            per_page,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous: (number > 1).then(|| number - 1),
            next: (number < num_pages).then(|| number + 1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}
