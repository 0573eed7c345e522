use predicates::str::contains;

mod support;

use support::TestBoard;

#[test]
fn task_lifecycle_through_the_cli() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");

    let id = board.add_task("buy milk");
    let list = board.json(&["task", "list"]);
    assert_eq!(list["total"], 1);
    assert_eq!(list["tasks"][0]["text"], "buy milk");
    assert_eq!(list["tasks"][0]["column"], "incomplete");

    let toggled = board.json(&["task", "toggle", &id.to_string()]);
    assert_eq!(toggled["completed"], true);
    assert_eq!(toggled["column"], "complete");

    let comment = board.json(&["comment", "add", &id.to_string(), "get 2%"]);
    assert_eq!(comment["user_name"], "Ann");
    assert_eq!(comment["content"], "get 2%");

    let comments = board.json(&["comment", "list", &id.to_string()]);
    assert_eq!(comments["total"], 1);

    let removed = board.json(&["task", "rm", &id.to_string()]);
    assert_eq!(removed["comments_removed"], 1);

    let list = board.json(&["task", "list"]);
    assert_eq!(list["total"], 0);
    let comments = board.json(&["comment", "list"]);
    assert_eq!(comments["total"], 0);
}

#[test]
fn tasks_list_newest_first_and_filter_by_column() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    let first = board.add_task("first");
    let second = board.add_task("second");
    board.json(&["task", "toggle", &first.to_string()]);

    let list = board.json(&["task", "list"]);
    assert_eq!(list["tasks"][0]["id"], second);
    assert_eq!(list["tasks"][1]["id"], first);

    let done = board.json(&["task", "list", "--column", "Done"]);
    assert_eq!(done["total"], 1);
    assert_eq!(done["tasks"][0]["id"], first);

    let todo = board.json(&["task", "list", "--column", "todo"]);
    assert_eq!(todo["total"], 1);
    assert_eq!(todo["tasks"][0]["id"], second);
}

#[test]
fn blank_task_text_is_rejected() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");

    let (code, error) = board.json_err(&["task", "add", "   "]);
    assert_eq!(code, 2);
    assert_eq!(error["kind"], "validation");
    assert_eq!(board.json(&["task", "list"])["total"], 0);
}

#[test]
fn edit_changes_text_and_completion() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    let id = board.add_task("buy milk").to_string();

    let edited = board.json(&["task", "edit", &id, "--text", "buy oat milk", "--done"]);
    assert_eq!(edited["text"], "buy oat milk");
    assert_eq!(edited["completed"], true);

    let (code, _) = board.json_err(&["task", "edit", &id]);
    assert_eq!(code, 2);
}

#[test]
fn unknown_ids_are_not_found() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");

    let (code, error) = board.json_err(&["task", "toggle", "999"]);
    assert_eq!(code, 2);
    assert_eq!(error["kind"], "not_found");
    assert_eq!(error["details"]["task_id"], 999);

    let (code, _) = board.json_err(&["comment", "add", "999", "hello"]);
    assert_eq!(code, 2);
    let (code, _) = board.json_err(&["comment", "rm", "999"]);
    assert_eq!(code, 2);
}

#[test]
fn board_show_and_move() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    let id = board.add_task("buy milk").to_string();

    let moved = board.json(&["board", "move", &id, "done"]);
    assert_eq!(moved["moved"], true);
    assert_eq!(moved["column"], "complete");

    let again = board.json(&["board", "move", &id, "Done"]);
    assert_eq!(again["moved"], false);

    let shown = board.json(&["board", "show"]);
    assert_eq!(shown["columns"][0]["title"], "Todo");
    assert_eq!(shown["columns"][0]["tasks"].as_array().unwrap().len(), 0);
    assert_eq!(shown["columns"][1]["title"], "Done");
    assert_eq!(shown["columns"][1]["tasks"][0]["text"], "buy milk");

    board
        .tb()
        .args(["board", "move", &id, "sideways"])
        .assert()
        .code(2)
        .stderr(contains("unknown column"));
}

#[test]
fn configured_column_titles_are_used() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::new();
    board.write_config("[board]\nincomplete_title = \"Backlog\"\ncomplete_title = \"Shipped\"\n")?;
    board.signup("a@example.com", "Ann");
    let id = board.add_task("release").to_string();

    let moved = board.json(&["board", "move", &id, "shipped"]);
    assert_eq!(moved["column"], "complete");

    board
        .tb()
        .args(["board", "show"])
        .assert()
        .success()
        .stdout(contains("Backlog"))
        .stdout(contains("Shipped:\n- #"));
    Ok(())
}

#[test]
fn comments_are_oldest_first() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    let id = board.add_task("buy milk").to_string();
    board.json(&["comment", "add", &id, "first"]);
    board.json(&["comment", "add", &id, "second"]);

    let comments = board.json(&["comment", "list", &id]);
    assert_eq!(comments["comments"][0]["content"], "first");
    assert_eq!(comments["comments"][1]["content"], "second");

    let comment_id = comments["comments"][0]["id"].to_string();
    board.json(&["comment", "rm", &comment_id]);
    let comments = board.json(&["comment", "list", &id]);
    assert_eq!(comments["total"], 1);
    assert_eq!(comments["comments"][0]["content"], "second");
}
