#![allow(clippy::unwrap_used, reason = "tests")]

use std::path::Path;
use std::process::{Command, Output};

fn hrefs_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hrefs"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd.env_remove("HREFS_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stdout).into_owned();
}

fn stderr(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stderr).into_owned();
}

#[test]
fn resolve_simple_key() {
    let output = hrefs_cmd("library").args(["resolve", "Book", "7"]).output().unwrap();
    assert!(output.status.success(), "resolve failed: {}", stderr(&output));
    assert_eq!(stdout(&output), "key: 7\nurl: http://example.com/books/7\n");
}

#[test]
fn resolve_composite_key_through_mount() {
    let output = hrefs_cmd("library").args(["resolve", "page", "[3, 10]"]).output().unwrap();
    assert!(output.status.success(), "resolve failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains(r#"key: ["http://example.com/books/3",10]"#), "{out}");
    assert!(out.contains("url: http://example.com/books/3/pages/10"), "{out}");
}

#[test]
fn resolve_url_of_reference_keyed_target() {
    let output = hrefs_cmd("library")
        .args(["resolve", "Cover", "http://example.com/books/3/cover"])
        .output()
        .unwrap();
    assert!(output.status.success(), "resolve failed: {}", stderr(&output));
    assert!(stdout(&output).contains(r#"key: "http://example.com/books/3""#));
}

#[test]
fn resolve_self_referencing_target() {
    let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    let output = hrefs_cmd("library").args(["resolve", "Library", id]).output().unwrap();
    assert!(output.status.success(), "resolve failed: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        format!("key: \"{id}\"\nurl: http://example.com/libraries/{id}\n")
    );
}

#[test]
fn unresolvable_url_fails_with_exit_code_1() {
    let output = hrefs_cmd("library")
        .args(["resolve", "Book", "http://example.com/nope/7"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error: could not resolve"), "{}", stderr(&output));
}

#[test]
fn unknown_target_fails() {
    let output = hrefs_cmd("library").args(["resolve", "Unicorn", "1"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown target: `Unicorn`"));
}

#[test]
fn routes_lists_full_paths() {
    let output = hrefs_cmd("library").arg("routes").output().unwrap();
    assert!(output.status.success(), "routes failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("get_book  /books/{id}  [id]"), "{out}");
    assert!(
        out.contains("books:get_page  /books/{book_id}/pages/{page_number}  [book_id, page_number]"),
        "{out}"
    );
    assert!(out.contains("books:get_cover  /books/{book_id}/cover  [book_id]"), "{out}");
}

#[test]
fn targets_lists_key_shapes() {
    let output = hrefs_cmd("library").arg("targets").output().unwrap();
    assert!(output.status.success(), "targets failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Book  get_book  int  [id]  /books/{id}"), "{out}");
    assert!(out.contains("Page  books:get_page  (book: Href<Book>, page_number: int)  [book_id, page_number]"), "{out}");
    assert!(out.contains("Cover  books:get_cover  Href<Book>  [book_id]"), "{out}");
    assert!(out.contains("Library  get_library  uuid  [id]"), "{out}");
}

#[test]
fn resolve_without_base_url_fails() {
    let output = hrefs_cmd("routes-only").args(["resolve", "Book", "7"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("config has no base_url"));

    let routes = hrefs_cmd("routes-only").arg("routes").output().unwrap();
    assert!(routes.status.success(), "routes failed: {}", stderr(&routes));
}

#[test]
fn missing_config_is_reported() {
    let output = hrefs_cmd("library")
        .args(["--config", "missing.toml", "routes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("config not found: missing.toml"));
}
