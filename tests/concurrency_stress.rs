mod support;

use std::collections::HashSet;
use std::process::{Child, Command};

use assert_cmd::cargo::cargo_bin;
use taskboard::storage::Storage;

use support::TestBoard;

const WRITERS: usize = 6;

fn spawn_add(board: &TestBoard, text: &str) -> std::io::Result<Child> {
    Command::new(cargo_bin("tb"))
        .env_remove("TASKBOARD_BACKEND")
        .env_remove("TASKBOARD_URL")
        .env_remove("TASKBOARD_API_KEY")
        .arg("--data-dir")
        .arg(board.path())
        .args(["-q", "task", "add", text])
        .spawn()
}

#[test]
fn parallel_adds_get_distinct_ids() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");

    let children = (0..WRITERS)
        .map(|n| spawn_add(&board, &format!("task {n}")))
        .collect::<std::io::Result<Vec<_>>>()?;
    for mut child in children {
        assert!(child.wait()?.success());
    }

    let storage = Storage::new(board.path());
    let tasks = storage.read_tasks()?;
    assert_eq!(tasks.len(), WRITERS);
    let ids: HashSet<i64> = tasks.iter().map(|task| task.id).collect();
    assert_eq!(ids.len(), WRITERS);
    let texts: HashSet<&str> = tasks.iter().map(|task| task.text.as_str()).collect();
    assert_eq!(texts.len(), WRITERS);
    Ok(())
}

