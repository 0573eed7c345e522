use predicates::str::contains;

mod support;

use support::{TestBoard, PASSWORD};

#[test]
fn signup_signs_in_and_persists_across_runs() {
    let board = TestBoard::new();
    let data = board.signup("Ann@Example.com", "Ann");
    assert_eq!(data["user"]["email"], "ann@example.com");
    assert_eq!(data["tasks"], 0);

    let whoami = board.json(&["whoami"]);
    assert_eq!(whoami["user"]["name"], "Ann");
}

#[test]
fn duplicate_signup_is_an_auth_error() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");

    let (code, error) = board.json_err(&[
        "signup",
        "a@example.com",
        "--name",
        "Other",
        "--password",
        PASSWORD,
    ]);
    assert_eq!(code, 3);
    assert_eq!(error["kind"], "duplicate_email");
}

#[test]
fn signin_checks_the_password() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    board.json(&["signout"]);

    let (code, error) = board.json_err(&["signin", "a@example.com", "--password", "wrong-one"]);
    assert_eq!(code, 3);
    assert_eq!(error["kind"], "invalid_credentials");
    assert!(board.json(&["whoami"])["user"].is_null());

    board
        .tb()
        .env("TASKBOARD_PASSWORD", PASSWORD)
        .args(["signin", "a@example.com"])
        .assert()
        .success()
        .stdout(contains("signed in as Ann"));
}

#[test]
fn signout_hides_the_previous_users_tasks() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    board.add_task("ann's task");
    board.json(&["signout"]);

    let (code, error) = board.json_err(&["task", "list"]);
    assert_eq!(code, 3);
    assert_eq!(error["kind"], "unauthenticated");

    board.signup("b@example.com", "Bob");
    assert_eq!(board.json(&["task", "list"])["total"], 0);
}

#[test]
fn switching_users_swaps_the_board() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    board.add_task("ann's task");
    board.signup("b@example.com", "Bob");
    board.add_task("bob's first");
    board.add_task("bob's second");

    let users = board.json(&["user", "list"]);
    let active: Vec<&str> = users["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|user| user["active"] == true)
        .map(|user| user["email"].as_str().unwrap())
        .collect();
    assert_eq!(active, vec!["b@example.com"]);

    let switched = board.json(&["user", "switch", "a@example.com"]);
    assert_eq!(switched["name"], "Ann");
    assert_eq!(board.json(&["task", "list"])["total"], 1);

    let (code, error) = board.json_err(&["user", "switch", "nobody@example.com"]);
    assert_eq!(code, 2);
    assert_eq!(error["kind"], "not_found");
}

#[test]
fn switching_can_be_disabled() -> Result<(), Box<dyn std::error::Error>> {
    let board = TestBoard::new();
    board.write_config("[session]\nallow_switch = false\n")?;
    board.signup("a@example.com", "Ann");

    let (code, _) = board.json_err(&["user", "switch", "a@example.com"]);
    assert_eq!(code, 2);
    Ok(())
}

#[test]
fn profile_update_keeps_old_comment_names() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    let id = board.add_task("buy milk").to_string();
    board.json(&["comment", "add", &id, "written as Ann"]);

    let updated = board.json(&["profile", "update", "--name", "Annie"]);
    assert_eq!(updated["name"], "Annie");
    assert_eq!(board.json(&["profile", "show"])["name"], "Annie");

    let comments = board.json(&["comment", "list", &id]);
    assert_eq!(comments["comments"][0]["user_name"], "Ann");

    board.json(&["comment", "add", &id, "written as Annie"]);
    let comments = board.json(&["comment", "list", &id]);
    assert_eq!(comments["comments"][1]["user_name"], "Annie");
}

#[test]
fn profile_update_needs_a_field() {
    let board = TestBoard::new();
    board.signup("a@example.com", "Ann");
    let (code, error) = board.json_err(&["profile", "update"]);
    assert_eq!(code, 2);
    assert_eq!(error["kind"], "invalid_argument");
}
