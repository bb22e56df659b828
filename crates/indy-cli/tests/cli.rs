use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const WRAP_ADVICE: &str = r#"import net.bytebuddy.asm.Advice;

public class WrapArgumentAdvice {

    @Advice.OnMethodEnter(suppress = Throwable.class)
    public static void enterSchedule(
            @Advice.Argument(value = 2, readOnly = false) Runnable runnable) {
        runnable = TaskWrapper.wrap(runnable);
    }

}
"#;

const PLAIN_CLASS: &str = r#"public class Main {
    public static void main(String[] args) {
        System.out.println("hello");
    }
}
"#;

fn indy() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("indy"))
}

fn tiny_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("src").create_dir_all().unwrap();
    temp.child("src/WrapArgumentAdvice.java")
        .write_str(WRAP_ADVICE)
        .unwrap();
    temp.child("src/Main.java").write_str(PLAIN_CLASS).unwrap();
    temp
}

#[test]
fn help_mentions_commands() {
    indy().arg("--help").assert().success().stdout(
        predicate::str::contains("migrate").and(predicate::str::contains("check")),
    );
}

#[test]
fn migrate_prints_a_diff_and_leaves_files_alone() {
    let temp = tiny_project();

    indy()
        .arg("migrate")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--- a/src/WrapArgumentAdvice.java")
                .and(predicate::str::contains(
                    "+import net.bytebuddy.asm.Advice.AssignReturned;",
                ))
                .and(predicate::str::contains("+        return TaskWrapper.wrap(runnable);"))
                .and(predicate::str::contains("Main.java").not())
                .and(predicate::str::contains("migrated: 1"))
                .and(predicate::str::contains("unchanged: 1")),
        );

    temp.child("src/WrapArgumentAdvice.java")
        .assert(WRAP_ADVICE);
}

#[test]
fn migrate_write_rewrites_files_and_check_passes_afterwards() {
    let temp = tiny_project();

    indy()
        .arg("check")
        .arg(temp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "needs migration: src/WrapArgumentAdvice.java",
        ));

    indy()
        .arg("migrate")
        .arg(temp.path())
        .arg("--write")
        .assert()
        .success();

    temp.child("src/WrapArgumentAdvice.java").assert(
        predicate::str::contains("@AssignReturned.ToArguments({@ToArgument(2)})")
            .and(predicate::str::contains("readOnly").not()),
    );
    temp.child("src/Main.java").assert(PLAIN_CLASS);

    indy()
        .arg("check")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("migrated: 0"));
}

#[test]
fn json_summary_lists_files() {
    let temp = tiny_project();

    let output = indy()
        .arg("migrate")
        .arg(temp.path())
        .arg("--json")
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["files_scanned"].as_u64().unwrap(), 2);
    assert_eq!(v["migrated"].as_u64().unwrap(), 1);
    assert_eq!(v["unchanged"].as_u64().unwrap(), 1);
    assert_eq!(v["failed"].as_u64().unwrap(), 0);

    let files = v["files"].as_array().unwrap();
    let migrated = files
        .iter()
        .find(|file| file["status"] == "migrated")
        .unwrap();
    assert_eq!(
        migrated["migrated_classes"],
        serde_json::json!(["WrapArgumentAdvice"])
    );
    assert!(migrated.get("diff").is_none());
}

#[test]
fn failing_files_are_reported_and_skipped() {
    let temp = tiny_project();
    temp.child("src/Broken.java")
        .write_str(
            r#"import net.bytebuddy.asm.Advice;

public class Broken {
    @Advice.OnMethodExit
    public static void exit(@Advice.Local("a") Object a) {
    }
}
"#,
        )
        .unwrap();

    indy()
        .arg("migrate")
        .arg(temp.path())
        .arg("--write")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed: 1").and(predicate::str::contains("migrated: 1")))
        .stderr(predicate::str::contains("Broken.java"));

    temp.child("src/WrapArgumentAdvice.java")
        .assert(predicate::str::contains("@ToArgument(2)"));
}

#[test]
fn excluded_files_are_not_scanned() {
    let temp = tiny_project();
    temp.child("indy.toml")
        .write_str(
            r#"
[batch]
exclude = ["src/WrapArgumentAdvice.java"]
"#,
        )
        .unwrap();

    indy()
        .arg("check")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files_scanned: 1"));
}

#[test]
fn invalid_config_exits_with_usage_error() {
    let temp = tiny_project();
    temp.child("indy.toml")
        .write_str(
            r#"
[output]
indent_width = 0
"#,
        )
        .unwrap();

    indy()
        .arg("migrate")
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("output.indent_width"));
}

#[test]
fn explicit_config_path_is_used() {
    let temp = tiny_project();
    let config = TempDir::new().unwrap();
    config
        .child("custom.toml")
        .write_str(
            r#"
[batch]
include = ["**/Main.java"]
"#,
        )
        .unwrap();

    indy()
        .arg("check")
        .arg(temp.path())
        .arg("--config")
        .arg(config.child("custom.toml").path())
        .assert()
        .success()
        .stdout(predicate::str::contains("files_scanned: 1"));
}

#[test]
fn missing_directory_is_an_error() {
    let temp = TempDir::new().unwrap();

    indy()
        .arg("check")
        .arg(temp.child("nope").path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is not a directory"));
}
