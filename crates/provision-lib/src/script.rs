//! Typed shell script model
//!
//! Generated scripts are assembled from [`Step`]s instead of raw string
//! concatenation. Every caller-controlled value passes through
//! [`shell_quote`] (command words) or is embedded in a quoted heredoc
//! (file contents), so values cannot terminate the enclosing quoting.
//! A script renders either as a multi-line POSIX script or as a single
//! command line chained with `&&`.

/// Base heredoc delimiter; a numeric suffix is added on collision
const HEREDOC_DELIMITER: &str = "__PROVISION_EOF__";

/// Quote a value for safe use as a single POSIX shell word
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | ',' | '=' | '@' | '%' | '+')
}

/// Replace control characters (newlines included) with spaces
///
/// Single-line values embedded in heredocs or comments must not be able to
/// start a new line.
pub fn neutralize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// One word of a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    /// Literal value, quoted on render
    Lit(String),
    /// Reference to a shell variable, rendered as `"$NAME"`
    Var(&'static str),
    /// Trusted shell text emitted as-is
    Raw(String),
}

impl Word {
    pub fn lit(value: impl Into<String>) -> Self {
        Word::Lit(value.into())
    }

    pub fn raw(value: impl Into<String>) -> Self {
        Word::Raw(value.into())
    }

    fn render(&self) -> String {
        match self {
            Word::Lit(value) => shell_quote(value),
            Word::Var(name) => format!("\"${}\"", name),
            Word::Raw(text) => text.clone(),
        }
    }
}

impl From<&str> for Word {
    fn from(value: &str) -> Self {
        Word::Lit(value.to_string())
    }
}

/// A single operation in a generated script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `# text`; dropped from one-liners
    Comment(String),
    /// `NAME=value`
    Assign { name: &'static str, value: Word },
    /// A command; best-effort commands never fail the script
    Run { words: Vec<Word>, best_effort: bool },
    /// Write (or append) fixed contents to a file
    WriteFile {
        path: Word,
        contents: String,
        append: bool,
    },
    /// Append `marker` followed by `block` unless `marker` is already present
    ///
    /// A file not ending in a newline gets one first, so the marker always
    /// starts its own line.
    AppendIfAbsent {
        path: Word,
        marker: String,
        block: Vec<String>,
    },
    /// Trusted shell text emitted as-is; must not embed caller values
    Raw(String),
}

impl Step {
    pub fn comment(text: impl Into<String>) -> Self {
        Step::Comment(text.into())
    }

    pub fn run<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        Step::Run {
            words: words.into_iter().map(Into::into).collect(),
            best_effort: false,
        }
    }

    pub fn best_effort<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        Step::Run {
            words: words.into_iter().map(Into::into).collect(),
            best_effort: true,
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Step::Raw(text.into())
    }

    pub fn write_file(path: Word, contents: impl Into<String>) -> Self {
        Step::WriteFile {
            path,
            contents: contents.into(),
            append: false,
        }
    }

    fn render(&self) -> Option<String> {
        match self {
            Step::Comment(text) => Some(format!("# {}", neutralize(text))),
            Step::Assign { name, value } => Some(format!("{}={}", name, value.render())),
            Step::Run { words, best_effort } => {
                let line = render_words(words);
                if *best_effort {
                    Some(format!("{} || true", line))
                } else {
                    Some(line)
                }
            }
            Step::WriteFile {
                path,
                contents,
                append,
            } => {
                let redirect = if *append { ">>" } else { ">" };
                let lines: Vec<&str> = contents.lines().collect();
                let delimiter = pick_delimiter(&lines);
                Some(format!(
                    "cat {} {} <<'{}'\n{}\n{}",
                    redirect,
                    path.render(),
                    delimiter,
                    lines.join("\n"),
                    delimiter
                ))
            }
            Step::AppendIfAbsent {
                path,
                marker,
                block,
            } => {
                let mut lines: Vec<&str> = vec![marker.as_str()];
                lines.extend(block.iter().map(String::as_str));
                let delimiter = pick_delimiter(&lines);
                let target = path.render();
                Some(format!(
                    "if ! grep -qF {} {} 2>/dev/null; then\n{}\ncat >> {} <<'{}'\n{}\n{}\nfi",
                    shell_quote(marker),
                    target,
                    newline_guard(&target),
                    target,
                    delimiter,
                    lines.join("\n"),
                    delimiter
                ))
            }
            Step::Raw(text) => Some(text.clone()),
        }
    }

    fn render_inline(&self) -> Option<String> {
        match self {
            Step::Comment(_) => None,
            Step::Assign { .. } => self.render(),
            Step::Run { words, best_effort } => {
                let line = render_words(words);
                if *best_effort {
                    Some(format!("{{ {} || true; }}", line))
                } else {
                    Some(line)
                }
            }
            Step::WriteFile {
                path,
                contents,
                append,
            } => {
                let redirect = if *append { ">>" } else { ">" };
                Some(format!(
                    "{} {} {}",
                    render_printf(contents.lines()),
                    redirect,
                    path.render()
                ))
            }
            Step::AppendIfAbsent {
                path,
                marker,
                block,
            } => {
                let target = path.render();
                let lines = std::iter::once(marker.as_str()).chain(block.iter().map(String::as_str));
                Some(format!(
                    "{{ grep -qF {} {} 2>/dev/null || {{ {}; {} >> {}; }}; }}",
                    shell_quote(marker),
                    target,
                    newline_guard(&target),
                    render_printf(lines),
                    target
                ))
            }
            Step::Raw(text) => Some(text.clone()),
        }
    }
}

fn render_words(words: &[Word]) -> String {
    words
        .iter()
        .map(Word::render)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Terminate a non-empty file's last line; always exits 0
fn newline_guard(target: &str) -> String {
    format!(
        "if [ -s {t} ] && [ -n \"$(tail -c 1 {t})\" ]; then echo >> {t}; fi",
        t = target
    )
}

fn render_printf<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::from("printf '%s\\n'");
    for line in lines {
        out.push(' ');
        out.push_str(&shell_quote(line));
    }
    out
}

fn pick_delimiter(lines: &[&str]) -> String {
    heredoc_delimiter(HEREDOC_DELIMITER, lines.iter().copied())
}

/// Delimiter based on `base` guaranteed not to appear as a line of the body
pub fn heredoc_delimiter<'a>(base: &str, lines: impl Iterator<Item = &'a str> + Clone) -> String {
    let mut delimiter = base.to_string();
    let mut n = 0;
    while lines.clone().any(|l| l == delimiter) {
        n += 1;
        delimiter = format!("{}{}", base, n);
    }
    delimiter
}

/// An ordered list of steps rendered as a POSIX shell script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellScript {
    steps: Vec<Step>,
    exit_on_error: bool,
}

impl ShellScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `set -e` so any non-best-effort failure stops the script
    pub fn exit_on_error(mut self) -> Self {
        self.exit_on_error = true;
        self
    }

    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn extend(&mut self, steps: impl IntoIterator<Item = Step>) -> &mut Self {
        self.steps.extend(steps);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Render as a multi-line script with a shebang
    pub fn render(&self) -> String {
        let mut out = String::from("#!/bin/sh\n");
        if self.exit_on_error {
            out.push_str("set -e\n");
        }
        for step in &self.steps {
            if let Some(text) = step.render() {
                out.push_str(&text);
                out.push('\n');
            }
        }
        out
    }

    /// Render as one command line; steps are chained with `&&`
    pub fn render_oneliner(&self) -> String {
        self.steps
            .iter()
            .filter_map(Step::render_inline)
            .collect::<Vec<_>>()
            .join(" && ")
    }
}
