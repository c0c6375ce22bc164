use std::collections::BTreeSet;

/// One value of a category dimension and the path of its member listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLink {
    pub name: String,
    pub path: String,
}

/// The member countries of one category value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMembers {
    pub label: String,
    pub members: BTreeSet<String>,
}

impl CategoryMembers {
    pub fn new(label: impl Into<String>, members: impl IntoIterator<Item = String>) -> Self {
        Self {
            label: label.into(),
            members: members.into_iter().collect(),
        }
    }

    pub fn contains(&self, country: &str) -> bool {
        self.members.contains(country)
    }
}

/// Crawl result for one dimension
///
/// `values` keeps the order in which the listing page presents the category
/// values; the merger's first/last policies depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionIndex {
    /// Document field the resolved label is stored under
    pub field: String,
    /// Header text the dimension was found under
    pub header: String,
    pub values: Vec<CategoryMembers>,
}

impl DimensionIndex {
    pub fn new(field: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            header: header.into(),
            values: Vec::new(),
        }
    }

    pub fn members(&self, label: &str) -> Option<&BTreeSet<String>> {
        self.values
            .iter()
            .find(|v| v.label == label)
            .map(|v| &v.members)
    }

    /// Labels of every value listing `country`, in listing order
    pub fn labels_for(&self, country: &str) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| v.contains(country))
            .map(|v| v.label.as_str())
            .collect()
    }
}

/// Category crawl results for every configured dimension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    dimensions: Vec<DimensionIndex>,
}

impl CategoryIndex {
    pub fn new(dimensions: Vec<DimensionIndex>) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> &[DimensionIndex] {
        &self.dimensions
    }

    pub fn dimension(&self, field: &str) -> Option<&DimensionIndex> {
        self.dimensions.iter().find(|d| d.field == field)
    }
}
