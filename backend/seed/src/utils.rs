use chrono::DateTime;

use crate::models::{Field, Record, RefTable};

const CREATED_AT: &str = "created_at";

/// Copies `record` with `created_at` turned from epoch milliseconds into a date.
///
/// A falsy `created_at` is dropped rather than defaulted. Values that are not
/// numbers, or fall outside the representable range, are kept as they are.
pub fn convert_timestamp_to_date(record: &Record) -> Record {
    let mut converted = record.clone();

    match converted.remove(CREATED_AT) {
        Some(created_at) if created_at.is_truthy() => {
            converted.insert(CREATED_AT.to_string(), to_date(created_at));
        }
        _ => {}
    }

    converted
}

fn to_date(field: Field) -> Field {
    let millis = match &field {
        Field::Integer(ms) => Some(*ms),
        Field::Float(ms) if ms.is_finite() => Some(ms.trunc() as i64),
        _ => None,
    };

    match millis.and_then(DateTime::from_timestamp_millis) {
        Some(date) => Field::Date(date),
        None => field,
    }
}

/// Maps each record's `key` value to its `value` field. Later records win on
/// duplicate keys; records without `key` are skipped.
pub fn create_ref(records: &[Record], key: &str, value: &str) -> RefTable {
    records
        .iter()
        .filter_map(|record| {
            let source = record.get(key)?;
            let target = record.get(value).cloned().unwrap_or(Field::Null);

            Some((source.key(), target))
        })
        .collect()
}

/// Renames `created_by` to `author`, resolves `belongs_to` through
/// `id_lookup` into `article_id` and normalizes `created_at`.
pub fn format_comments(comments: &[Record], id_lookup: &RefTable) -> Vec<Record> {
    comments
        .iter()
        .map(|comment| {
            let mut rest = comment.clone();
            let created_by = rest.remove("created_by");
            let belongs_to = rest.remove("belongs_to");

            let mut formatted = Record::new();

            if let Some(article_id) = belongs_to.and_then(|title| id_lookup.get(&title.key())) {
                formatted.insert("article_id".to_string(), article_id.clone());
            }

            if let Some(author) = created_by {
                formatted.insert("author".to_string(), author);
            }

            formatted.extend(convert_timestamp_to_date(&rest));
            formatted
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    const TIMESTAMP: i64 = 1557572706232;

    fn record<const N: usize>(fields: [(&str, Field); N]) -> Record {
        fields
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect()
    }

    #[test]
    fn test_converts_created_at_to_date() {
        let input = record([("created_at", Field::Integer(TIMESTAMP))]);
        let result = convert_timestamp_to_date(&input);

        let expected = Utc.timestamp_millis_opt(TIMESTAMP).unwrap();
        assert_eq!(result["created_at"], Field::Date(expected));
    }

    #[test]
    fn test_convert_does_not_mutate_input() {
        let input = record([("created_at", Field::Integer(TIMESTAMP))]);
        let control = input.clone();

        let _ = convert_timestamp_to_date(&input);
        assert_eq!(input, control);
    }

    #[test]
    fn test_falsy_created_at_is_dropped() {
        let input = record([
            ("created_at", Field::Integer(0)),
            ("key1", Field::Bool(true)),
            ("key2", Field::Integer(1)),
        ]);
        let result = convert_timestamp_to_date(&input);

        assert!(!result.contains_key("created_at"));
        assert_eq!(result["key1"], Field::Bool(true));
        assert_eq!(result["key2"], Field::Integer(1));

        for falsy in [Field::Null, Field::Text(String::new()), Field::Bool(false)] {
            let result = convert_timestamp_to_date(&record([("created_at", falsy)]));
            assert!(result.is_empty());
        }
    }

    #[test]
    fn test_missing_created_at_leaves_record_alone() {
        let input = record([("key", Field::from("value"))]);
        assert_eq!(convert_timestamp_to_date(&input), input);
    }

    #[test]
    fn test_non_numeric_created_at_is_kept() {
        let input = record([("created_at", Field::from("yesterday"))]);
        assert_eq!(convert_timestamp_to_date(&input), input);

        let out_of_range = record([("created_at", Field::Integer(i64::MAX))]);
        assert_eq!(convert_timestamp_to_date(&out_of_range), out_of_range);
    }

    #[test]
    fn test_create_ref_empty() {
        assert!(create_ref(&[], "title", "article_id").is_empty());
    }

    #[test]
    fn test_create_ref_single_item() {
        let input = [record([
            ("title", Field::from("title1")),
            ("article_id", Field::Integer(1)),
            ("name", Field::from("name1")),
        ])];

        let by_title = create_ref(&input, "title", "article_id");
        assert_eq!(by_title, RefTable::from([("title1".to_string(), Field::Integer(1))]));

        let by_name = create_ref(&input, "name", "title");
        assert_eq!(by_name, RefTable::from([("name1".to_string(), Field::from("title1"))]));
    }

    #[test]
    fn test_create_ref_many_items() {
        let input: Vec<Record> = (1..=3)
            .map(|n| {
                record([
                    ("title", Field::from(format!("title{n}"))),
                    ("article_id", Field::Integer(n)),
                ])
            })
            .collect();

        let lookup = create_ref(&input, "title", "article_id");
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup["title2"], Field::Integer(2));
    }

    #[test]
    fn test_create_ref_last_write_wins() {
        let input = [
            record([("title", Field::from("dup")), ("article_id", Field::Integer(1))]),
            record([("title", Field::from("dup")), ("article_id", Field::Integer(2))]),
        ];

        let lookup = create_ref(&input, "title", "article_id");
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["dup"], Field::Integer(2));
    }

    #[test]
    fn test_create_ref_missing_fields() {
        let input = [
            record([("title", Field::from("no id"))]),
            record([("article_id", Field::Integer(9))]),
        ];

        let lookup = create_ref(&input, "title", "article_id");
        assert_eq!(lookup, RefTable::from([("no id".to_string(), Field::Null)]));
    }

    #[test]
    fn test_format_comments_empty() {
        assert!(format_comments(&[], &RefTable::new()).is_empty());
    }

    #[test]
    fn test_format_comments_renames_author() {
        let comments = [
            record([("created_by", Field::from("ant"))]),
            record([("created_by", Field::from("bee"))]),
        ];
        let formatted = format_comments(&comments, &RefTable::new());

        assert_eq!(formatted[0]["author"], Field::from("ant"));
        assert!(!formatted[0].contains_key("created_by"));
        assert_eq!(formatted[1]["author"], Field::from("bee"));
        assert!(!formatted[1].contains_key("created_by"));
    }

    #[test]
    fn test_format_comments_resolves_article_id() {
        let comments = [
            record([("belongs_to", Field::from("title1"))]),
            record([("belongs_to", Field::from("title2"))]),
        ];
        let lookup = RefTable::from([
            ("title1".to_string(), Field::Integer(1)),
            ("title2".to_string(), Field::Integer(2)),
        ]);
        let formatted = format_comments(&comments, &lookup);

        assert_eq!(formatted[0]["article_id"], Field::Integer(1));
        assert_eq!(formatted[1]["article_id"], Field::Integer(2));
        assert!(!formatted[0].contains_key("belongs_to"));
    }

    #[test]
    fn test_format_comments_unresolved_title() {
        let comments = [record([("belongs_to", Field::from("missing"))])];
        let formatted = format_comments(&comments, &RefTable::new());

        assert!(formatted[0].is_empty());
    }

    #[test]
    fn test_format_comments_converts_timestamp() {
        let comments = [record([
            ("created_at", Field::Integer(TIMESTAMP)),
            ("body", Field::from("great")),
            ("votes", Field::Integer(16)),
        ])];
        let formatted = format_comments(&comments, &RefTable::new());

        let expected = Utc.timestamp_millis_opt(TIMESTAMP).unwrap();
        assert_eq!(formatted[0]["created_at"], Field::Date(expected));
        assert_eq!(formatted[0]["body"], Field::from("great"));
        assert_eq!(formatted[0]["votes"], Field::Integer(16));
    }

    #[test]
    fn test_format_comments_zero_timestamp() {
        let comments = [record([
            ("created_by", Field::from("ant")),
            ("belongs_to", Field::from("t1")),
            ("created_at", Field::Integer(0)),
        ])];
        let lookup = RefTable::from([("t1".to_string(), Field::Integer(1))]);

        let formatted = format_comments(&comments, &lookup);
        let expected = record([("article_id", Field::Integer(1)), ("author", Field::from("ant"))]);

        assert_eq!(formatted, vec![expected]);
    }

    #[test]
    fn test_format_comments_does_not_mutate_input() {
        let comments = vec![record([
            ("created_by", Field::from("ant")),
            ("belongs_to", Field::from("t1")),
        ])];
        let control = comments.clone();

        let _ = format_comments(&comments, &RefTable::new());
        assert_eq!(comments, control);
    }
}
