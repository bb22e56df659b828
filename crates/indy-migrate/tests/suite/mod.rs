use indy_migrate::{migrate_source, SourceMigration};
use indy_syntax::{parse_java, print_canonical};
use pretty_assertions::assert_eq;

mod errors;
mod locals;
mod preserve;
mod writes;

pub(crate) fn migrate(src: &str) -> SourceMigration {
    migrate_source(src).expect("migrates")
}

/// Canonical layout of `src` without blank lines, so expectations don't have
/// to spell out where the printer puts them.
pub(crate) fn layout(src: &str) -> String {
    let unit = parse_java(src).expect("parses");
    print_canonical(&unit)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Migrates `before`, compares with `after` and checks that migrating the
/// result again changes nothing.
#[track_caller]
pub(crate) fn assert_migrates(before: &str, after: &str) -> SourceMigration {
    let migrated = migrate(before);
    assert!(migrated.report.is_changed(), "nothing was migrated");
    assert_eq!(layout(&migrated.text), layout(after));

    let again = migrate(&migrated.text);
    assert!(
        !again.report.is_changed(),
        "second run changed {:?}",
        again.report
    );
    assert_eq!(again.text, migrated.text);
    migrated
}
