//! Text shapes of the guarded exit blocks.

const INDENT: &str = "    ";

/// Indent every line of `code` by one level. Blank lines stay empty.
pub(crate) fn indented(code: &str) -> String {
    code.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("{INDENT}{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `if (<condition>) { ... }` with one body line per non-empty part.
pub(crate) fn guarded_block(condition: &str, parts: &[String]) -> String {
    let mut out = format!("if ({condition}) {{\n");
    for part in parts.iter().filter(|p| !p.is_empty()) {
        out.push_str(&indented(part));
        out.push('\n');
    }
    out.push('}');
    out
}

/// Shared tail of every exit block.
pub(crate) struct ExitTail {
    pub release_temps: String,
    pub var_description: String,
    pub line_number: String,
    pub exception_exit: String,
}

impl ExitTail {
    fn into_parts(self) -> [String; 4] {
        [self.release_temps, self.var_description, self.line_number, format!("goto {};", self.exception_exit)]
    }
}

pub(crate) fn error_catch_exception(condition: &str, fetch: &[String; 3], tail: ExitTail) -> String {
    let mut parts = vec![
        "assert(ERROR_OCCURRED());".to_string(),
        format!("FETCH_ERROR_OCCURRED(&{}, &{}, &{});", fetch[0], fetch[1], fetch[2]),
    ];
    parts.extend(tail.into_parts());
    guarded_block(condition, &parts)
}

pub(crate) fn error_catch_quick_exception(condition: &str, quick_exception: &str, tail: ExitTail) -> String {
    let mut parts = vec![guarded_block(
        "!ERROR_OCCURRED()",
        &[format!("SET_CURRENT_EXCEPTION_TYPE0({quick_exception});")],
    )];
    parts.extend(tail.into_parts());
    guarded_block(condition, &parts)
}

/// Used for both formatted messages and name lookup failures.
pub(crate) fn error_format_exception(condition: &str, set_exception: &[String], tail: ExitTail) -> String {
    let mut parts = vec![set_exception.join("\n")];
    parts.extend(tail.into_parts());
    guarded_block(condition, &parts)
}
