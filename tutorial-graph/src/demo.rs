//! The tutorial catalogue: a fixed dataset and the schema serving it.

use std::sync::Arc;

use crate::data_source::DataSource;
use crate::error::DataSourceError;
use crate::error::FieldError;
use crate::error::SchemaError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::resolver::Resolved;
use crate::spec::ArgumentDefinition;
use crate::spec::FieldType;
use crate::spec::ObjectType;
use crate::spec::RootField;
use crate::spec::Schema;

/// The collection holding every [`Tutorial`].
pub const TUTORIALS: &str = "tutorials";

/// The query run when none is given on the command line.
pub const DEFAULT_QUERY: &str = r#"
{
    tutorial(id: 1) {
        Title
        Author {
            Name
            Tutorials
        }
    }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tutorial {
    pub id: i32,
    pub title: String,
    pub author: Author,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    /// Ids of the tutorials written by this author.
    pub tutorials: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub body: String,
}

/// The catalogue: a single tutorial.
pub fn populate() -> Vec<Tutorial> {
    vec![Tutorial {
        id: 1,
        title: "Go tutorial".to_string(),
        author: Author {
            name: "Elliot Forbes".to_string(),
            tutorials: vec![1],
        },
        comments: vec![Comment {
            body: "First!".to_string(),
        }],
    }]
}

/// Stores `tutorials` in the [`TUTORIALS`] collection, keyed by their id.
pub fn data_source(tutorials: Vec<Tutorial>) -> Result<DataSource, DataSourceError> {
    DataSource::builder()
        .collection(TUTORIALS, tutorials, |tutorial: &Tutorial| {
            i64::from(tutorial.id)
        })
        .build()
}

/// The schema of the catalogue, with its root fields reading from `data`.
///
/// ```graphql
/// type RootQuery {
///   tutorial(id: Int): Tutorial
///   list: [Tutorial]
/// }
/// ```
pub fn tutorial_schema(data: Arc<DataSource>) -> Result<Schema, SchemaError> {
    let comment = ObjectType::builder::<Comment>("Comment")
        .field("body", FieldType::String, |comment: &Comment| {
            comment.body.as_str().into()
        })
        .build();

    let author = ObjectType::builder::<Author>("Author")
        .field("Name", FieldType::String, |author: &Author| {
            author.name.as_str().into()
        })
        .field(
            "Tutorials",
            FieldType::list(FieldType::Int),
            |author: &Author| Resolved::list(author.tutorials.iter().copied()),
        )
        .build();

    let tutorial = ObjectType::builder::<Tutorial>("Tutorial")
        .field("ID", FieldType::Int, |tutorial: &Tutorial| tutorial.id.into())
        .field("Title", FieldType::String, |tutorial: &Tutorial| {
            tutorial.title.as_str().into()
        })
        .field(
            "Author",
            FieldType::named("Author"),
            |tutorial: &Tutorial| Resolved::record(tutorial.author.clone()),
        )
        .field(
            "Comments",
            FieldType::list(FieldType::named("Comment")),
            |tutorial: &Tutorial| {
                Resolved::list(tutorial.comments.iter().cloned().map(Resolved::record))
            },
        )
        .build();

    let by_id = Arc::clone(&data);
    Schema::builder()
        .query_type_name("RootQuery")
        .object_type(comment)
        .object_type(author)
        .object_type(tutorial)
        .root_field(
            RootField::new("tutorial", FieldType::named("Tutorial"))
                .description("Get Tutorial by ID")
                .argument(ArgumentDefinition::new("id", FieldType::Int))
                .resolve_with(move |_, arguments: &Object| {
                    let id = arguments
                        .get("id")
                        .and_then(Value::as_i64)
                        .ok_or_else(|| FieldError::MissingArgument("id".to_string()))?;
                    Ok(by_id.find_by_id(TUTORIALS, id)?)
                }),
        )
        .root_field(
            RootField::new("list", FieldType::list(FieldType::named("Tutorial")))
                .description("Get all Tutorials")
                .resolve_with(move |_, _| Ok(data.list_all(TUTORIALS)?)),
        )
        .build()
}

/// The catalogue schema over the [`populate`]d dataset.
pub fn schema() -> anyhow::Result<Schema> {
    let data = Arc::new(data_source(populate())?);
    Ok(tutorial_schema(data)?)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn every_tutorial_is_found_by_its_id() {
        let tutorials = populate();
        let data = data_source(tutorials.clone()).unwrap();
        for tutorial in &tutorials {
            let found = data.find_by_id(TUTORIALS, i64::from(tutorial.id)).unwrap();
            assert_eq!(found.downcast_ref::<Tutorial>().map(|t| t.id), Some(tutorial.id));
        }
    }

    #[test]
    fn sdl() {
        let schema = schema().unwrap();
        insta::assert_snapshot!(schema.to_sdl(), @r###"
        schema {
          query: RootQuery
        }

        type RootQuery {
          "Get Tutorial by ID"
          tutorial(id: Int): Tutorial
          "Get all Tutorials"
          list: [Tutorial]
        }

        type Comment {
          body: String
        }

        type Author {
          Name: String
          Tutorials: [Int]
        }

        type Tutorial {
          ID: Int
          Title: String
          Author: Author
          Comments: [Comment]
        }
        "###);
    }
}
