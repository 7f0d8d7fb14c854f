#![allow(dead_code)]

use oxide_schema_core::prelude::*;

pub fn column(name: &str, ty: &str, nullable: bool) -> ColumnMetadata {
    ColumnMetadata {
        nullable,
        ..ColumnMetadata::new(name, ty)
    }
}

pub fn primary_key(columns: &[&str]) -> IndexMetadata {
    IndexMetadata {
        name: IndexMetadata::PRIMARY.into(),
        expressions: columns.iter().map(|c| (*c).to_string()).collect(),
        index_type: "BTREE".into(),
        unique: true,
        primary: true,
        visible: true,
        ..IndexMetadata::default()
    }
}

pub fn foreign_key(name: &str, column: &str, table: &str) -> ForeignKeyMetadata {
    ForeignKeyMetadata {
        name: name.into(),
        columns: vec![column.into()],
        referenced_table: table.into(),
        referenced_columns: vec!["id".into()],
        ..ForeignKeyMetadata::default()
    }
}

pub fn table(name: &str, columns: Vec<ColumnMetadata>) -> TableMetadata {
    let mut table = TableMetadata {
        columns,
        ..TableMetadata::new(name)
    };
    if table.column("id").is_some() {
        table.indexes.push(primary_key(&["id"]));
    }
    table
}

pub fn database(tables: Vec<TableMetadata>) -> DatabaseSchemaMetadata {
    let mut db = DatabaseSchemaMetadata::new("app");
    db.ensure_schema("").tables = tables;
    db
}

/// A small blog schema: users, posts referencing users, and a view.
pub fn blog() -> DatabaseSchemaMetadata {
    let users = table(
        "users",
        vec![
            column("id", "int", false),
            column("email", "varchar(255)", false),
        ],
    );
    let mut posts = table(
        "posts",
        vec![
            column("id", "int", false),
            column("author_id", "int", true),
            column("title", "varchar(200)", true),
        ],
    );
    posts
        .foreign_keys
        .push(foreign_key("fk_posts_author", "author_id", "users"));
    let mut db = database(vec![users, posts]);
    db.schemas[0].views.push(ViewMetadata {
        name: "recent_posts".into(),
        definition: "select `id` from `posts`".into(),
        ..ViewMetadata::default()
    });
    db
}
