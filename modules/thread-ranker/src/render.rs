//! Terminal rendering of the model's Markdown answer.

use crossterm::style::Stylize;
use pulldown_cmark::{Event, Options, Parser, Tag};

const BULLET: &str = "• ";
const RULE_WIDTH: usize = 40;

#[derive(Default)]
struct Emphasis {
    strong: usize,
    italic: usize,
    heading: bool,
}

/// Render Markdown for a terminal. With `styled` off the result is plain
/// text with the markup removed, for pipes and files.
pub fn render_markdown(markdown: &str, styled: bool) -> String {
    let mut out = String::new();
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut emphasis = Emphasis::default();
    let mut in_code_block = false;

    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if lists.is_empty() {
                    blank_line(&mut out);
                }
            }
            Event::End(Tag::Paragraph) => newline(&mut out),

            Event::Start(Tag::Heading(..)) => {
                blank_line(&mut out);
                emphasis.heading = true;
            }
            Event::End(Tag::Heading(..)) => {
                emphasis.heading = false;
                newline(&mut out);
            }

            Event::Start(Tag::List(start)) => {
                if lists.is_empty() {
                    blank_line(&mut out);
                } else {
                    newline(&mut out);
                }
                lists.push(start);
            }
            Event::End(Tag::List(_)) => {
                lists.pop();
                newline(&mut out);
            }
            Event::Start(Tag::Item) => {
                newline(&mut out);
                out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str(BULLET),
                }
            }
            Event::End(Tag::Item) => newline(&mut out),

            Event::Start(Tag::Strong) => emphasis.strong += 1,
            Event::End(Tag::Strong) => emphasis.strong = emphasis.strong.saturating_sub(1),
            Event::Start(Tag::Emphasis) => emphasis.italic += 1,
            Event::End(Tag::Emphasis) => emphasis.italic = emphasis.italic.saturating_sub(1),

            Event::Start(Tag::CodeBlock(_)) => {
                blank_line(&mut out);
                in_code_block = true;
            }
            Event::End(Tag::CodeBlock(_)) => {
                in_code_block = false;
                newline(&mut out);
            }

            Event::Text(text) if in_code_block => {
                for line in text.lines() {
                    let line = format!("    {line}");
                    if styled {
                        out.push_str(&line.as_str().dim().to_string());
                    } else {
                        out.push_str(&line);
                    }
                    out.push('\n');
                }
            }
            Event::Text(text) => out.push_str(&paint(&text, &emphasis, styled)),
            Event::Code(code) => {
                if styled {
                    out.push_str(&(&*code).cyan().to_string());
                } else {
                    out.push_str(&code);
                }
            }
            Event::Html(html) => out.push_str(&html),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => {
                blank_line(&mut out);
                out.push_str(&"─".repeat(RULE_WIDTH));
                out.push('\n');
            }
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

fn paint(text: &str, emphasis: &Emphasis, styled: bool) -> String {
    if !styled {
        return text.to_string();
    }
    let mut content = text.stylize();
    if emphasis.heading {
        content = content.bold().underlined();
    }
    if emphasis.strong > 0 {
        content = content.bold();
    }
    if emphasis.italic > 0 {
        content = content.italic();
    }
    content.to_string()
}

fn newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn blank_line(out: &mut String) {
    if out.is_empty() {
        return;
    }
    newline(out);
    if !out.ends_with("\n\n") {
        out.push('\n');
    }
}
