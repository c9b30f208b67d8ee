//! Aggregation pipelines.
//!
//! A pipeline is an ordered list of [`Stage`]s evaluated over a collection.
//! `Lookup` joins documents from another collection by field equality,
//! probing an index on the foreign field when one exists and otherwise
//! hashing a single scan of the foreign collection.

use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::collection::{sort_documents, Collection};
use crate::document::{get_path, set_path, Document, ID_FIELD};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::index::{encode_primary, SortOrder};

/// Accumulator used by [`Stage::Group`].
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Number of documents in the group.
    Count,
    /// Mean of a numeric field; `null` for an empty group.
    Avg(String),
}

/// Output expression used by [`Stage::Project`].
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Copy the value at a field path.
    Field(String),
    /// Length of the array at a field path (0 when missing).
    Size(String),
}

/// One step of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    /// One output document per array element; empty arrays drop the document.
    Unwind(String),
    Group {
        key: Option<String>,
        accumulators: Vec<(String, Accumulator)>,
    },
    Project(Vec<(String, Projection)>),
    Sort(Vec<(String, SortOrder)>),
    Limit(usize),
}

impl Stage {
    pub fn lookup(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Stage::Lookup {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
        }
    }

    pub fn unwind(path: impl Into<String>) -> Self {
        Stage::Unwind(path.into())
    }
}

/// Options for [`Collection::aggregate`].
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Index driving the leading `Match` stage.
    pub hint: Option<String>,
}

impl AggregateOptions {
    pub fn hint(index: impl Into<String>) -> Self {
        Self {
            hint: Some(index.into()),
        }
    }
}

impl Collection {
    /// Run a pipeline over this collection.
    pub fn aggregate(&self, pipeline: &[Stage], options: &AggregateOptions) -> Result<Vec<Document>> {
        let leading = match pipeline.first() {
            Some(Stage::Match(filter)) => filter.clone(),
            _ => Filter::All,
        };
        let (mut docs, _) = self.candidates(&leading, options.hint.as_deref())?;

        for stage in pipeline {
            docs = self.apply_stage(stage, docs)?;
        }
        Ok(docs)
    }

    fn apply_stage(&self, stage: &Stage, mut docs: Vec<Document>) -> Result<Vec<Document>> {
        match stage {
            Stage::Match(filter) => {
                docs.retain(|doc| filter.matches(doc));
                Ok(docs)
            }
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => self.lookup(docs, from, local_field, foreign_field, as_field),
            Stage::Unwind(path) => Ok(unwind(docs, path)),
            Stage::Group { key, accumulators } => Ok(group(docs, key.as_deref(), accumulators)),
            Stage::Project(fields) => Ok(docs.into_iter().map(|doc| project(&doc, fields)).collect()),
            Stage::Sort(keys) => {
                sort_documents(&mut docs, keys);
                Ok(docs)
            }
            Stage::Limit(0) => Err(Error::InvalidPipeline("limit must be positive".into())),
            Stage::Limit(n) => {
                docs.truncate(*n);
                Ok(docs)
            }
        }
    }

    fn lookup(
        &self,
        mut docs: Vec<Document>,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
    ) -> Result<Vec<Document>> {
        if from.is_empty() || as_field.is_empty() {
            return Err(Error::InvalidPipeline(
                "lookup requires a source collection and an output field".into(),
            ));
        }

        let foreign = self.database().collection(from)?;
        let foreign_docs = if foreign.index_on(foreign_field).is_some() {
            let mut seen = HashMap::new();
            for doc in &docs {
                let value = get_path(doc, local_field).cloned().unwrap_or(Value::Null);
                seen.entry(encode_primary(&value)).or_insert(value);
            }
            let values: Vec<Value> = seen.into_values().collect();
            foreign.lookup_by(foreign_field, &values)?
        } else {
            foreign.scan_all()?
        };

        let mut by_key: HashMap<Vec<u8>, Vec<Value>> = HashMap::new();
        for doc in foreign_docs {
            let key = encode_primary(get_path(&doc, foreign_field).unwrap_or(&Value::Null));
            by_key.entry(key).or_default().push(Value::Object(doc));
        }

        for doc in &mut docs {
            let key = encode_primary(get_path(doc, local_field).unwrap_or(&Value::Null));
            let matches = by_key.get(&key).cloned().unwrap_or_default();
            set_path(doc, as_field, Value::Array(matches));
        }
        Ok(docs)
    }
}

fn unwind(docs: Vec<Document>, path: &str) -> Vec<Document> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        let items = match get_path(&doc, path) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                out.push(doc);
                continue;
            }
        };

        for item in items {
            let mut copy = doc.clone();
            set_path(&mut copy, path, item);
            out.push(copy);
        }
    }
    out
}

struct GroupState {
    key: Value,
    count: u64,
    /// Running (sum, numeric values seen) per accumulator.
    sums: Vec<(f64, u64)>,
}

fn group(docs: Vec<Document>, key: Option<&str>, accumulators: &[(String, Accumulator)]) -> Vec<Document> {
    let mut order: Vec<GroupState> = Vec::new();
    let mut slots: HashMap<Vec<u8>, usize> = HashMap::new();

    for doc in &docs {
        let key_value = key
            .and_then(|k| get_path(doc, k).cloned())
            .unwrap_or(Value::Null);
        let slot = *slots.entry(encode_primary(&key_value)).or_insert_with(|| {
            order.push(GroupState {
                key: key_value.clone(),
                count: 0,
                sums: vec![(0.0, 0); accumulators.len()],
            });
            order.len() - 1
        });

        let state = &mut order[slot];
        state.count += 1;
        for (i, (_, acc)) in accumulators.iter().enumerate() {
            match acc {
                Accumulator::Count => {}
                Accumulator::Avg(field) => {
                    if let Some(Value::Number(n)) = get_path(doc, field) {
                        let entry = &mut state.sums[i];
                        entry.0 += n.as_f64().unwrap_or(0.0);
                        entry.1 += 1;
                    }
                }
            }
        }
    }

    order
        .into_iter()
        .map(|state| {
            let mut out = Document::new();
            out.insert(ID_FIELD.to_string(), state.key);
            for (i, (name, acc)) in accumulators.iter().enumerate() {
                let (sum, seen) = state.sums[i];
                let value = match acc {
                    Accumulator::Count => Value::from(state.count),
                    Accumulator::Avg(_) if seen == 0 => Value::Null,
                    Accumulator::Avg(_) => float_value(sum / seen as f64),
                };
                out.insert(name.clone(), value);
            }
            out
        })
        .collect()
}

fn project(doc: &Document, fields: &[(String, Projection)]) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for (name, projection) in fields {
        let value = match projection {
            Projection::Field(path) => match get_path(doc, path) {
                Some(v) => v.clone(),
                None => continue,
            },
            Projection::Size(path) => match get_path(doc, path) {
                Some(Value::Array(items)) => Value::from(items.len()),
                _ => Value::from(0),
            },
        };
        out.insert(name.clone(), value);
    }
    out
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::index::IndexSpec;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn seed(db: &Database) {
        let users = db.collection("users").unwrap();
        users
            .insert_many(vec![
                doc(json!({"_id": 1, "username": "alice"})),
                doc(json!({"_id": 2, "username": "bob"})),
            ])
            .unwrap();
        let posts = db.collection("posts").unwrap();
        posts
            .insert_many(vec![
                doc(json!({"_id": 10, "user_id": 1, "status": "active", "title": "x"})),
                doc(json!({"_id": 11, "user_id": 1, "status": "draft", "title": "y"})),
                doc(json!({"_id": 12, "user_id": 2, "status": "active", "title": "z"})),
            ])
            .unwrap();
        let likes = db.collection("likes").unwrap();
        likes
            .insert_many(vec![
                doc(json!({"post_id": 10, "user_id": 2})),
                doc(json!({"post_id": 10, "user_id": 1})),
                doc(json!({"post_id": 11, "user_id": 2})),
            ])
            .unwrap();
    }

    fn join_pipeline() -> Vec<Stage> {
        vec![
            Stage::Match(Filter::eq("status", "active")),
            Stage::lookup("likes", "_id", "post_id", "likes"),
            Stage::Match(Filter::not_empty("likes")),
            Stage::lookup("users", "user_id", "_id", "author"),
            Stage::unwind("author"),
            Stage::Project(vec![
                ("title".into(), Projection::Field("title".into())),
                ("author".into(), Projection::Field("author.username".into())),
                ("like_count".into(), Projection::Size("likes".into())),
            ]),
        ]
    }

    #[test]
    fn test_lookup_join_with_and_without_index() {
        let db = Database::temporary().unwrap();
        seed(&db);
        let posts = db.collection("posts").unwrap();

        let scanned = posts
            .aggregate(&join_pipeline(), &AggregateOptions::default())
            .unwrap();
        assert_eq!(
            scanned,
            vec![doc(json!({"_id": 10, "title": "x", "author": "alice", "like_count": 2}))]
        );

        let mut likes = db.collection("likes").unwrap();
        likes.create_index(IndexSpec::new("post_id").asc("post_id")).unwrap();
        let mut posts = db.collection("posts").unwrap();
        posts.create_index(IndexSpec::new("status").asc("status")).unwrap();

        let indexed = posts
            .aggregate(&join_pipeline(), &AggregateOptions::hint("status"))
            .unwrap();
        assert_eq!(indexed, scanned);
    }

    #[test]
    fn test_group_count_and_avg() {
        let db = Database::temporary().unwrap();
        seed(&db);
        let posts = db.collection("posts").unwrap();

        let per_user = posts
            .aggregate(
                &[
                    Stage::Group {
                        key: Some("user_id".into()),
                        accumulators: vec![("posts".into(), Accumulator::Count)],
                    },
                    Stage::Sort(vec![("_id".into(), SortOrder::Asc)]),
                ],
                &AggregateOptions::default(),
            )
            .unwrap();
        assert_eq!(
            per_user,
            vec![
                doc(json!({"_id": 1, "posts": 2})),
                doc(json!({"_id": 2, "posts": 1})),
            ]
        );

        let avg = posts
            .aggregate(
                &[
                    Stage::lookup("likes", "_id", "post_id", "likes"),
                    Stage::Project(vec![("n".into(), Projection::Size("likes".into()))]),
                    Stage::Group {
                        key: None,
                        accumulators: vec![
                            ("avg".into(), Accumulator::Avg("n".into())),
                            ("count".into(), Accumulator::Count),
                        ],
                    },
                ],
                &AggregateOptions::default(),
            )
            .unwrap();
        assert_eq!(avg.len(), 1);
        assert_eq!(avg[0]["count"], json!(3));
        assert_eq!(avg[0]["avg"], json!(1.0));
    }

    #[test]
    fn test_unwind_drops_empty_arrays() {
        let docs = vec![
            doc(json!({"_id": 1, "tags": ["a", "b"]})),
            doc(json!({"_id": 2, "tags": []})),
        ];
        let out = unwind(docs, "tags");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["tags"], json!("a"));
        assert_eq!(out[1]["tags"], json!("b"));
    }

    #[test]
    fn test_group_on_empty_input_yields_nothing() {
        let out = group(Vec::new(), None, &[("avg".into(), Accumulator::Avg("n".into()))]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let db = Database::temporary().unwrap();
        seed(&db);
        let posts = db.collection("posts").unwrap();
        let err = posts
            .aggregate(&[Stage::Limit(0)], &AggregateOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPipeline(_)));
    }
}
