use taskboard::output::{format_human, HumanOutput};

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("tb task add: created #4");
    human.push_summary("text", "buy milk");
    human.push_detail("#4 [ ] buy milk");
    human.push_warning("comments failed to load; showing none");
    human.push_next_step("tb task toggle 4");

    let rendered = format_human(&human);
    assert!(rendered.contains("tb task add: created #4"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- text: buy milk"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- #4 [ ] buy milk"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("- comments failed to load; showing none"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- tb task toggle 4"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("tb whoami: not signed in");
    let rendered = format_human(&human);
    assert_eq!(rendered, "tb whoami: not signed in");
}
