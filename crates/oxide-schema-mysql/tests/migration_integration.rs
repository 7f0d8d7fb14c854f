//! Generated migrations replayed through the walk-through.

mod common;

use common::{assert_same_schema, migrate, parse, replay, SHOP_V1, SHOP_V2};

fn assert_migrates(from: &str, to: &str) {
    let script = migrate(from, to);
    let mut replayed = parse(from);
    replay(&mut replayed, &script);
    assert_same_schema(&replayed, &parse(to));
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not found in:\n{haystack}"))
}

// ====================================================================
// Symmetry
// ====================================================================

#[test]
fn test_forward_migration_reaches_target() {
    assert_migrates(SHOP_V1, SHOP_V2);
}

#[test]
fn test_reverse_migration_reaches_source() {
    assert_migrates(SHOP_V2, SHOP_V1);
}

#[test]
fn test_migration_from_empty_schema() {
    assert_migrates("", SHOP_V1);
    assert_migrates(SHOP_V1, "");
}

#[test]
fn test_index_and_check_changes_replay() {
    let from = "CREATE TABLE t (
  a INT NOT NULL,
  b INT,
  c VARCHAR(10),
  KEY idx_b (b),
  CONSTRAINT chk_a CHECK (a > 0)
);";
    let to = "CREATE TABLE t (
  a INT NOT NULL,
  b INT,
  d INT NOT NULL DEFAULT 0,
  PRIMARY KEY (a),
  KEY idx_b (b, d),
  UNIQUE KEY uk_d (d),
  CONSTRAINT chk_a CHECK (a > 1)
);";
    assert_migrates(from, to);
    assert_migrates(to, from);
}

// ====================================================================
// Ordering
// ====================================================================

#[test]
fn test_drop_phase_precedes_create_phase() {
    let script = migrate(SHOP_V1, SHOP_V2);
    let drop_posts = position(&script, "DROP TABLE IF EXISTS `posts`");
    let create_comments = position(&script, "CREATE TABLE `comments`");
    let add_fk = position(&script, "ALTER TABLE `comments` ADD CONSTRAINT `fk_comments_user`");
    let view = position(&script, "CREATE OR REPLACE VIEW `recent` AS SELECT id FROM comments");
    assert!(drop_posts < create_comments);
    assert!(create_comments < add_fk);
    assert!(add_fk < view);
}

#[test]
fn test_referencing_tables_dropped_first() {
    let from = "\
CREATE TABLE a (id INT NOT NULL, PRIMARY KEY (id));
CREATE TABLE b (id INT NOT NULL, a_id INT, PRIMARY KEY (id),
  CONSTRAINT fk_b_a FOREIGN KEY (a_id) REFERENCES a (id));
CREATE TABLE c (id INT NOT NULL, b_id INT,
  CONSTRAINT fk_c_b FOREIGN KEY (b_id) REFERENCES b (id));
";
    let script = migrate(from, "");
    let c = position(&script, "DROP TABLE IF EXISTS `c`");
    let b = position(&script, "DROP TABLE IF EXISTS `b`");
    let a = position(&script, "DROP TABLE IF EXISTS `a`");
    assert!(c < b && b < a, "wrong drop order:\n{script}");
}

#[test]
fn test_new_column_lands_after_its_predecessor() {
    let script = migrate(SHOP_V1, SHOP_V2);
    assert!(script.contains(
        "ALTER TABLE `users` ADD COLUMN `name` varchar(64) NOT NULL DEFAULT '' AFTER `email`;"
    ));
    assert!(script.contains("ALTER TABLE `users` COMMENT='accounts';"));
}
