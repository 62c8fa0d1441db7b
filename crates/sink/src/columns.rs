//! Column references parsed from the sink's header row.
//!
//! A header is parsed once into a [`ColumnRef`]; rows are then built by interpreting the
//! references against each correlated hit, first match wins:
//! metadata, exact event field, `ep.` suffix, `user.` suffix, `items.<n>.<field>`, dotted path.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaColumn {
    Timestamp,
    PageUrl,
    PageNum,
    ExecutionTime,
    ResponseStatus,
    ResponseBody,
}

impl MetaColumn {
    pub fn from_header(header: &str) -> Option<Self> {
        Some(match header {
            "timestamp" => MetaColumn::Timestamp,
            "page_url" => MetaColumn::PageUrl,
            "page_num" => MetaColumn::PageNum,
            "execution_time" => MetaColumn::ExecutionTime,
            "response_status" => MetaColumn::ResponseStatus,
            "response_body" => MetaColumn::ResponseBody,
            _ => return None,
        })
    }
}

/// Lookup tried when the header is not an exact event field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fallback {
    EventParam(String),
    User(String),
    Item { index: usize, field: String },
    Path(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnRef {
    Meta(MetaColumn),
    Field { name: String, fallback: Fallback },
}

impl ColumnRef {
    pub fn parse(header: &str) -> Self {
        if let Some(meta) = MetaColumn::from_header(header) {
            return ColumnRef::Meta(meta);
        }
        ColumnRef::Field {
            name: header.to_string(),
            fallback: Fallback::parse(header),
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(
            self,
            ColumnRef::Field {
                fallback: Fallback::Path(_),
                ..
            }
        )
    }
}

impl Fallback {
    fn parse(header: &str) -> Self {
        if let Some(suffix) = header.strip_prefix("ep.") {
            return Fallback::EventParam(suffix.to_string());
        }
        if let Some(suffix) = header.strip_prefix("user.") {
            return Fallback::User(suffix.to_string());
        }
        if let Some(rest) = header.strip_prefix("items.") {
            if let Some((index, field)) = rest.split_once('.') {
                if let Ok(index) = index.parse::<usize>() {
                    if !field.is_empty() {
                        return Fallback::Item {
                            index,
                            field: field.to_string(),
                        };
                    }
                }
            }
        }
        Fallback::Path(header.split('.').map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_kinds() {
        assert_eq!(
            ColumnRef::parse("response_status"),
            ColumnRef::Meta(MetaColumn::ResponseStatus)
        );
        assert_eq!(
            ColumnRef::parse("ep.origin"),
            ColumnRef::Field {
                name: "ep.origin".into(),
                fallback: Fallback::EventParam("origin".into())
            }
        );
        assert_eq!(
            ColumnRef::parse("user.client_id"),
            ColumnRef::Field {
                name: "user.client_id".into(),
                fallback: Fallback::User("client_id".into())
            }
        );
        assert_eq!(
            ColumnRef::parse("items.1.item_name"),
            ColumnRef::Field {
                name: "items.1.item_name".into(),
                fallback: Fallback::Item {
                    index: 1,
                    field: "item_name".into()
                }
            }
        );
        assert!(ColumnRef::parse("items.first.item_name").is_path());
        assert!(ColumnRef::parse("response.status").is_path());
        assert!(ColumnRef::parse("cu").is_path());
    }
}
