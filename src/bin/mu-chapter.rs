use std::env;
use std::process::ExitCode;

use mu_chapter::{
    build_section_file, ChapterConfig, ChapterError, ChapterParser, FixedWidthMetrics, MarkupMode,
    Page, PageElement, ParseStats, SectionCache, TextBlock,
};

#[derive(Clone, Debug)]
enum Json {
    Bool(bool),
    Num(i64),
    Str(String),
    Arr(Vec<Json>),
    Obj(Vec<(String, Json)>),
}

impl Json {
    fn render(&self, pretty: bool) -> String {
        let mut out = String::new();
        self.write_into(&mut out, pretty.then_some(0));
        out
    }

    /// `indent` is the current nesting level, or `None` for compact output.
    fn write_into(&self, out: &mut String, indent: Option<usize>) {
        match self {
            Json::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            Json::Num(v) => out.push_str(&v.to_string()),
            Json::Str(v) => write_json_string(out, v),
            Json::Arr(items) => write_container(out, indent, ('[', ']'), items, |out, item, inner| {
                item.write_into(out, inner)
            }),
            Json::Obj(fields) => write_container(
                out,
                indent,
                ('{', '}'),
                fields,
                |out, (key, value), inner| {
                    write_json_string(out, key);
                    out.push_str(if inner.is_some() { ": " } else { ":" });
                    value.write_into(out, inner);
                },
            ),
        }
    }
}

fn write_container<T>(
    out: &mut String,
    indent: Option<usize>,
    (open, close): (char, char),
    entries: &[T],
    mut write_entry: impl FnMut(&mut String, &T, Option<usize>),
) {
    out.push(open);
    let inner = indent.map(|level| level + 1);
    for (idx, entry) in entries.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if let Some(level) = inner {
            out.push('\n');
            out.push_str(&"  ".repeat(level));
        }
        write_entry(out, entry, inner);
    }
    if let (Some(level), false) = (indent, entries.is_empty()) {
        out.push('\n');
        out.push_str(&"  ".repeat(level));
    }
    out.push(close);
}

fn write_json_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let mut rest = args.into_iter().skip(1).collect::<Vec<_>>();
    let pretty = pop_flag(&mut rest, "--pretty");
    let legacy = pop_flag(&mut rest, "--legacy");
    let width = pop_number(&mut rest, "--width")?;
    let height = pop_number(&mut rest, "--height")?;

    if rest.is_empty() || rest[0] == "--help" || rest[0] == "-h" {
        print_help();
        return Ok(());
    }

    let mut config = ChapterConfig::default();
    if let Some(width) = width {
        config.viewport_width = width;
    }
    if let Some(height) = height {
        config.viewport_height = height;
    }
    if legacy {
        config.markup_mode = MarkupMode::Legacy;
    }
    let metrics = FixedWidthMetrics::default();

    let cmd = rest.remove(0);
    match cmd.as_str() {
        "pages" => {
            let path = first_arg(&rest, "pages requires <xhtml_path>")?;
            let mut pages = Vec::new();
            let stats = ChapterParser::new(config, &metrics)
                .parse_file(&path, |page| pages.push(page))
                .map_err(display_err)?;
            let output = Json::Obj(vec![
                ("chapter".to_string(), Json::Str(path)),
                ("stats".to_string(), stats_json(&stats)),
                (
                    "pages".to_string(),
                    Json::Arr(pages.iter().map(page_json).collect()),
                ),
            ]);
            println!("{}", output.render(pretty));
        }
        "text" => {
            let path = first_arg(&rest, "text requires <xhtml_path>")?;
            let mut index = 0usize;
            ChapterParser::new(config, &metrics)
                .parse_file(&path, |page| {
                    println!("--- page {} ---", index + 1);
                    for element in &page.elements {
                        match element {
                            PageElement::Line(line) => {
                                let indent = " ".repeat(usize::from(line.block.left_margin() / 8));
                                println!("{}{}", indent, line.block.text());
                            }
                            PageElement::Image(image) => {
                                println!("[image {} {}x{}]", image.path, image.width, image.height);
                            }
                        }
                    }
                    index += 1;
                })
                .map_err(display_err)?;
        }
        "section" => {
            let path = first_arg(&rest, "section requires <xhtml_path> <cache_path>")?;
            let cache_path = rest
                .get(1)
                .cloned()
                .ok_or_else(|| "section requires <xhtml_path> <cache_path>".to_string())?;
            let mut parser = ChapterParser::new(config.clone(), &metrics);
            let stats =
                build_section_file(&mut parser, &path, &cache_path).map_err(display_err)?;
            let cache = SectionCache::open(&cache_path, &config).map_err(|e| e.to_string())?;
            let output = Json::Obj(vec![
                ("chapter".to_string(), Json::Str(path)),
                ("cache".to_string(), Json::Str(cache_path)),
                ("stats".to_string(), stats_json(&stats)),
                ("stored_pages".to_string(), Json::Num(cache.page_count() as i64)),
            ]);
            println!("{}", output.render(pretty));
        }
        other => return Err(format!("unknown command '{}'", other)),
    }
    Ok(())
}

fn first_arg(args: &[String], msg: &str) -> Result<String, String> {
    args.first().cloned().ok_or_else(|| msg.to_string())
}

fn pop_flag(args: &mut Vec<String>, flag: &str) -> bool {
    if let Some(pos) = args.iter().position(|a| a == flag) {
        args.remove(pos);
        true
    } else {
        false
    }
}

fn pop_number(args: &mut Vec<String>, flag: &str) -> Result<Option<u16>, String> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        return Err(format!("{} requires a value", flag));
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    value
        .parse::<u16>()
        .map(Some)
        .map_err(|_| format!("invalid value for {}: {}", flag, value))
}

fn stats_json(stats: &ParseStats) -> Json {
    Json::Obj(vec![
        ("pages".to_string(), Json::Num(stats.pages as i64)),
        ("lines".to_string(), Json::Num(stats.lines as i64)),
        ("images_placed".to_string(), Json::Num(stats.images_placed as i64)),
        ("images_skipped".to_string(), Json::Num(stats.images_skipped as i64)),
        ("forced_splits".to_string(), Json::Num(stats.forced_splits as i64)),
    ])
}

fn block_json(block: &TextBlock) -> Json {
    Json::Arr(
        block
            .iter()
            .map(|(word, x, style)| {
                Json::Obj(vec![
                    ("word".to_string(), Json::Str(word.to_string())),
                    ("x".to_string(), Json::Num(i64::from(x))),
                    ("style".to_string(), Json::Str(format!("{:?}", style))),
                ])
            })
            .collect(),
    )
}

fn page_json(page: &Page) -> Json {
    Json::Arr(
        page.elements
            .iter()
            .map(|element| match element {
                PageElement::Line(line) => Json::Obj(vec![
                    ("type".to_string(), Json::Str("line".to_string())),
                    ("y".to_string(), Json::Num(i64::from(line.y))),
                    (
                        "alignment".to_string(),
                        Json::Str(format!("{:?}", line.block.alignment())),
                    ),
                    (
                        "left_margin".to_string(),
                        Json::Num(i64::from(line.block.left_margin())),
                    ),
                    (
                        "blockquote".to_string(),
                        Json::Bool(line.block.is_blockquote()),
                    ),
                    ("words".to_string(), block_json(&line.block)),
                ]),
                PageElement::Image(image) => Json::Obj(vec![
                    ("type".to_string(), Json::Str("image".to_string())),
                    ("path".to_string(), Json::Str(image.path.clone())),
                    ("x".to_string(), Json::Num(i64::from(image.x))),
                    ("y".to_string(), Json::Num(i64::from(image.y))),
                    ("width".to_string(), Json::Num(i64::from(image.width))),
                    ("height".to_string(), Json::Num(i64::from(image.height))),
                ]),
            })
            .collect(),
    )
}

fn display_err(err: ChapterError) -> String {
    err.to_string()
}

fn print_help() {
    let help = r#"mu-chapter - paginate EPUB chapter XHTML

USAGE:
  mu-chapter [--pretty] [--legacy] [--width <px>] [--height <px>] <command> [args...]

COMMANDS:
  pages <xhtml_path>
  text <xhtml_path>
  section <xhtml_path> <cache_path>

NOTES:
  - Layout uses fixed-width metrics (10px per character, 20px lines).
  - `pages` and `section` emit JSON; `text` emits one line per laid-out line.
  - Images are not converted; `<img>` elements are reported as skipped.
"#;
    println!("{}", help);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Json {
        Json::Obj(vec![
            ("ok".to_string(), Json::Bool(true)),
            (
                "words".to_string(),
                Json::Arr(vec![Json::Str("a\"b".to_string()), Json::Num(-3)]),
            ),
            ("empty".to_string(), Json::Arr(Vec::new())),
        ])
    }

    #[test]
    fn test_compact_json() {
        assert_eq!(
            sample().render(false),
            r#"{"ok":true,"words":["a\"b",-3],"empty":[]}"#
        );
    }

    #[test]
    fn test_pretty_json() {
        let expected = "{\n  \"ok\": true,\n  \"words\": [\n    \"a\\\"b\",\n    -3\n  ],\n  \"empty\": []\n}";
        assert_eq!(sample().render(true), expected);
    }

    #[test]
    fn test_control_characters_escaped() {
        let mut out = String::new();
        write_json_string(&mut out, "tab\there\u{1}");
        assert_eq!(out, "\"tab\\there\\u0001\"");
    }
}
