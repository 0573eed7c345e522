//! What `tb` prints: a short human report, or one `taskboard.v1` JSON
//! envelope per command with either `data` or `error` in it.

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "taskboard.v1";

const DETAILS: &str = "Details";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Human report: a header line, key/value summary, titled lists
/// (one per board column, say), then warnings and next steps.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    sections: Vec<(String, Vec<String>)>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            sections: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.push_item(DETAILS, value);
    }

    /// Append to the list titled `section`, opening it on first use.
    pub fn push_item(&mut self, section: &str, value: impl Into<String>) {
        match self.sections.iter_mut().find(|(title, _)| title == section) {
            Some((_, items)) => items.push(value.into()),
            None => self.sections.push((section.to_string(), vec![value.into()])),
        }
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Body<'a, T: Serialize> {
    Data(&'a T),
    Error(JsonError),
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(flatten)]
    body: Body<'a, T>,
    #[serde(skip_serializing_if = "is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    next_steps: &'a [String],
}

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

impl<T: Serialize> Envelope<'_, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            body: Body::Data(data),
            warnings: human.map(|h| h.warnings.as_slice()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
        }
        .print();
    }

    match human {
        Some(human) if !options.quiet => println!("{}", format_human(human)),
        _ => {}
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            body: Body::Error(JsonError::from(err)),
            warnings: &[],
            next_steps: &next_steps,
        }
        .print();
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = vec![output.header.clone()];

    if !output.summary.is_empty() {
        lines.push(String::new());
        lines.push("Summary:".to_string());
        for (key, value) in &output.summary {
            if value.is_empty() {
                lines.push(format!("- {key}"));
            } else {
                lines.push(format!("- {key}: {value}"));
            }
        }
    }
    for (title, items) in &output.sections {
        push_section(&mut lines, title, items);
    }
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// Global flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &["--data-dir", "--backend", "--events"];

/// Commands whose name only makes sense with their subcommand.
const GROUPS: &[&str] = &["profile", "user", "task", "comment", "board"];

/// Best-effort command name for error envelopes, read before clap parses.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut words = Vec::new();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg);
        let grouped = GROUPS.contains(&words[0].as_str());
        if words.len() == 2 || !grouped {
            break;
        }
    }

    if words.is_empty() {
        "tb".to_string()
    } else {
        words.join(" ")
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::Unauthenticated => vec!["tb signin <email>".to_string()],
        Error::InvalidCredentials => vec!["check the email and password, or tb signup".to_string()],
        Error::DuplicateEmail(_) => vec!["tb signin <email>".to_string()],
        Error::TaskNotFound(_) => vec!["tb task list".to_string()],
        Error::CommentNotFound(_) => vec!["tb comment list".to_string()],
        Error::UserNotFound(_) => vec!["tb user list".to_string()],
        Error::InvalidConfig(_) => vec!["fix .taskboard.toml then retry".to_string()],
        Error::Http(_) | Error::Persistence(_) => {
            vec!["check the remote url and network, then retry".to_string()]
        }
        _ => Vec::new(),
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_output_lists_sections_in_order() {
        let mut human = HumanOutput::new("tb task add: created #3");
        human.push_summary("text", "buy milk");
        human.push_summary("column", "Todo");
        human.push_warning("comments failed to load");
        human.push_next_step("tb task toggle 3");

        let text = format_human(&human);
        let summary = text.find("Summary:").unwrap();
        let warnings = text.find("Warnings:").unwrap();
        let next = text.find("Next steps:").unwrap();
        assert!(summary < warnings && warnings < next);
        assert!(text.contains("- text: buy milk"));
        assert!(!text.contains("Details:"));
    }

    #[test]
    fn auth_errors_point_at_signin() {
        let steps = error_next_steps(&Error::Unauthenticated);
        assert_eq!(steps, vec!["tb signin <email>".to_string()]);
    }

    #[test]
    fn command_name_skips_flag_values() {
        let args = |list: &[&str]| list.iter().map(|arg| arg.to_string()).collect::<Vec<_>>();
        assert_eq!(
            command_name(args(&["--data-dir", "/tmp/x", "--json", "task", "add", "milk"])),
            "task add"
        );
        assert_eq!(command_name(args(&["signin", "a@example.com"])), "signin");
        assert_eq!(command_name(args(&["--events=-", "board"])), "board");
        assert_eq!(command_name(args(&["--json"])), "tb");
    }

    #[test]
    fn named_sections_collect_their_items() {
        let mut human = HumanOutput::new("tb board: 3 task(s)");
        human.push_item("Todo", "#3 buy milk");
        human.push_item("Done", "#1 call mum");
        human.push_item("Todo", "#2 water plants");

        let text = format_human(&human);
        assert!(text.contains("Todo:\n- #3 buy milk\n- #2 water plants"));
        assert!(text.find("Todo:").unwrap() < text.find("Done:").unwrap());
    }

    #[test]
    fn error_envelope_carries_the_error_object() {
        let envelope = Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command: "task toggle",
            status: "error",
            body: Body::Error(JsonError::from(&Error::TaskNotFound(9))),
            warnings: &[],
            next_steps: &[],
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["error"]["kind"], "not_found");
        assert_eq!(value["error"]["details"]["task_id"], 9);
        assert!(value.get("data").is_none());
        assert!(value.get("warnings").is_none());
    }
}
