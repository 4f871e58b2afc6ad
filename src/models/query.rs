use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// A record field as named in a query. Schema fields map to their own
/// storage; any other name addresses the free-form attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    Id,
    Name,
    Quantity,
    Price,
    CreatedAt,
    UpdatedAt,
    Attribute(&'a str),
}

impl<'a> Field<'a> {
    pub fn parse(key: &'a str) -> Self {
        match key {
            "id" | "_id" => Field::Id,
            "name" => Field::Name,
            "quantity" => Field::Quantity,
            "price" => Field::Price,
            "created_at" => Field::CreatedAt,
            "updated_at" => Field::UpdatedAt,
            other => Field::Attribute(other),
        }
    }
}

/// Parsed list request: an equality filter set plus an ordered sort list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: IndexMap<String, String>,
    pub sort: Vec<SortKey>,
}

impl ListQuery {
    /// Build from raw query pairs in request order. Extra parameters are
    /// merged first, `filter` pairs are applied on top of them.
    pub fn from_params(params: Vec<(String, String)>) -> Self {
        let mut sort = None;
        let mut filter = None;
        let mut filters = IndexMap::new();

        for (key, value) in params {
            match key.as_str() {
                "sort" => sort = Some(value),
                "filter" => filter = Some(value),
                _ => {
                    filters.insert(key, value);
                }
            }
        }

        if let Some(raw) = filter {
            filters.extend(parse_filter(&raw));
        }

        Self {
            filters,
            sort: sort.map(|raw| parse_sort(&raw)).unwrap_or_default(),
        }
    }
}

/// `"price,-quantity"` → price ascending, then quantity descending.
/// A field named twice keeps its first position and its last direction.
pub fn parse_sort(raw: &str) -> Vec<SortKey> {
    let mut keys: IndexMap<&str, SortDirection> = IndexMap::new();

    for entry in raw.split(',') {
        let (field, direction) = match entry.strip_prefix('-') {
            Some(field) => (field, SortDirection::Descending),
            None => (entry, SortDirection::Ascending),
        };
        if field.is_empty() {
            continue;
        }
        keys.insert(field, direction);
    }

    keys.into_iter()
        .map(|(field, direction)| SortKey {
            field: field.to_string(),
            direction,
        })
        .collect()
}

/// `"name:Widget,color:red"` → `{name: Widget, color: red}`. Each entry is
/// split on its first `:`; entries without one are skipped.
pub fn parse_filter(raw: &str) -> IndexMap<String, String> {
    raw.split(',')
        .filter_map(|entry| entry.split_once(':'))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
