#![allow(dead_code)]

use oxide_schema_core::model::DatabaseSchemaMetadata;
use oxide_schema_core::{get_database_schema_diff, Advice, MetadataDiff};
use oxide_schema_mysql::{generate_migration, parse_to_metadata, walk_through};

/// A schema with keys, a foreign key, a view, a routine and a trigger.
pub const SHOP_V1: &str = "\
CREATE TABLE users (
  id INT NOT NULL AUTO_INCREMENT,
  email VARCHAR(255) NOT NULL,
  PRIMARY KEY (id),
  UNIQUE KEY uk_email (email)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;

CREATE TABLE posts (
  id INT NOT NULL,
  user_id INT NOT NULL,
  title VARCHAR(100),
  PRIMARY KEY (id),
  KEY idx_user (user_id),
  CONSTRAINT fk_posts_user FOREIGN KEY (user_id) REFERENCES users (id)
) ENGINE=InnoDB;

CREATE VIEW recent AS SELECT id, title FROM posts;
";

/// [`SHOP_V1`] after a release: `posts` replaced by `comments`, `users`
/// widened and commented.
pub const SHOP_V2: &str = "\
CREATE TABLE users (
  id BIGINT NOT NULL AUTO_INCREMENT,
  email VARCHAR(320) NOT NULL,
  name VARCHAR(64) NOT NULL DEFAULT '',
  PRIMARY KEY (id),
  UNIQUE KEY uk_email (email)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='accounts';

CREATE TABLE comments (
  id INT NOT NULL,
  user_id BIGINT NOT NULL,
  body TEXT,
  PRIMARY KEY (id),
  CONSTRAINT fk_comments_user FOREIGN KEY (user_id) REFERENCES users (id)
);

CREATE VIEW recent AS SELECT id FROM comments;
";

pub fn parse(sql: &str) -> DatabaseSchemaMetadata {
    parse_to_metadata(sql).unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e}"))
}

pub fn diff(old: &str, new: &str) -> MetadataDiff {
    get_database_schema_diff(&parse(old), &parse(new))
}

pub fn migrate(old: &str, new: &str) -> String {
    generate_migration(&diff(old, new)).unwrap_or_else(|e| panic!("Failed to generate: {e}"))
}

/// Replays `script` on `metadata`, failing on any advice.
pub fn replay(metadata: &mut DatabaseSchemaMetadata, script: &str) {
    let advice: Option<Advice> = walk_through(metadata, script)
        .unwrap_or_else(|e| panic!("Failed to walk through:\n{script}\nError: {e}"));
    assert!(
        advice.is_none(),
        "Unexpected advice {advice:?} for script:\n{script}"
    );
}

/// Asserts that two snapshots have no structural difference.
pub fn assert_same_schema(actual: &DatabaseSchemaMetadata, expected: &DatabaseSchemaMetadata) {
    let diff = get_database_schema_diff(actual, expected);
    assert!(diff.is_empty(), "Snapshots differ: {diff:#?}");
}
