//! Chat command grammar
//!
//! An ordered rule table evaluated first-match-wins against the trimmed line.
//! Keywords compare ASCII case-insensitively; arguments keep their case.

use tracing::trace;

/// Entries reported by `log`
pub const DEFAULT_LOG_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Help,
    Status,
    Log(usize),
    Pull,
    Push,
    Commit(String),
    Diff,
    Branch,
    Checkout(String),
    CreateBranch(String),
    Stash,
    StashPop,
    Reset,
    Revert(String),
    Show(String),
    Blame { file: String, line: u32 },
    MergeStatus,
    StashMerge,
    /// Code review of the working tree diff, or of a file when the diff is trivial
    Review(Option<String>),
    FreeText(String),
}

impl ParsedCommand {
    /// Operation name used in failure messages
    pub fn name(&self) -> &'static str {
        match self {
            ParsedCommand::Help => "help",
            ParsedCommand::Status => "status",
            ParsedCommand::Log(_) => "log",
            ParsedCommand::Pull => "pull",
            ParsedCommand::Push => "push",
            ParsedCommand::Commit(_) => "commit",
            ParsedCommand::Diff => "diff",
            ParsedCommand::Branch => "branch",
            ParsedCommand::Checkout(_) => "checkout",
            ParsedCommand::CreateBranch(_) => "create-branch",
            ParsedCommand::Stash => "stash",
            ParsedCommand::StashPop => "stash pop",
            ParsedCommand::Reset => "reset",
            ParsedCommand::Revert(_) => "revert",
            ParsedCommand::Show(_) => "show",
            ParsedCommand::Blame { .. } => "blame",
            ParsedCommand::MergeStatus => "merge-status",
            ParsedCommand::StashMerge => "stash-merge",
            ParsedCommand::Review(_) => "review",
            ParsedCommand::FreeText(_) => "ask",
        }
    }

    /// Everything except `/help` needs a bound repository
    pub fn requires_repository(&self) -> bool {
        !matches!(self, ParsedCommand::Help)
    }

    /// Commands after which cached repository status is stale
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ParsedCommand::Pull
                | ParsedCommand::Push
                | ParsedCommand::Commit(_)
                | ParsedCommand::Checkout(_)
                | ParsedCommand::CreateBranch(_)
                | ParsedCommand::Stash
                | ParsedCommand::StashPop
                | ParsedCommand::Reset
                | ParsedCommand::Revert(_)
                | ParsedCommand::StashMerge
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Command(ParsedCommand),
    /// A keyword matched but its argument was missing or invalid
    Malformed { usage: &'static str },
}

impl ParseOutcome {
    pub fn command(&self) -> Option<&ParsedCommand> {
        match self {
            ParseOutcome::Command(cmd) => Some(cmd),
            ParseOutcome::Malformed { .. } => None,
        }
    }
}

enum Rule {
    /// The whole line is the keyword
    Exact(&'static str, ParsedCommand),
    /// Keyword, one whitespace separator, then the rest of the line.
    /// `verbatim` keeps the argument untouched (commit messages).
    Argument {
        keyword: &'static str,
        usage: &'static str,
        verbatim: bool,
        build: fn(String) -> ParsedCommand,
    },
    /// `blame <file> <line>`
    Blame,
}

const BLAME_USAGE: &str = "blame <file> <line>";

/// Evaluation order matters: `stash pop` before `stash`, exact forms before argument forms
const RULES: &[(&str, Rule)] = &[
    ("help", Rule::Exact("/help", ParsedCommand::Help)),
    ("status", Rule::Exact("status", ParsedCommand::Status)),
    ("log", Rule::Exact("log", ParsedCommand::Log(DEFAULT_LOG_COUNT))),
    ("pull", Rule::Exact("pull", ParsedCommand::Pull)),
    ("push", Rule::Exact("push", ParsedCommand::Push)),
    ("diff", Rule::Exact("diff", ParsedCommand::Diff)),
    ("branch", Rule::Exact("branch", ParsedCommand::Branch)),
    ("stash pop", Rule::Exact("stash pop", ParsedCommand::StashPop)),
    ("stash", Rule::Exact("stash", ParsedCommand::Stash)),
    ("reset", Rule::Exact("reset", ParsedCommand::Reset)),
    ("merge-status", Rule::Exact("merge-status", ParsedCommand::MergeStatus)),
    ("stash-merge", Rule::Exact("stash-merge", ParsedCommand::StashMerge)),
    ("review", Rule::Exact("review", ParsedCommand::Review(None))),
    (
        "commit",
        Rule::Argument {
            keyword: "commit",
            usage: "commit <message>",
            verbatim: true,
            build: ParsedCommand::Commit,
        },
    ),
    (
        "checkout",
        Rule::Argument {
            keyword: "checkout",
            usage: "checkout <branch>",
            verbatim: false,
            build: ParsedCommand::Checkout,
        },
    ),
    (
        "create-branch",
        Rule::Argument {
            keyword: "create-branch",
            usage: "create-branch <name>",
            verbatim: false,
            build: ParsedCommand::CreateBranch,
        },
    ),
    (
        "revert",
        Rule::Argument {
            keyword: "revert",
            usage: "revert <commit>",
            verbatim: false,
            build: ParsedCommand::Revert,
        },
    ),
    (
        "show",
        Rule::Argument {
            keyword: "show",
            usage: "show <commit>",
            verbatim: false,
            build: ParsedCommand::Show,
        },
    ),
    (
        "review <file>",
        Rule::Argument {
            keyword: "review",
            usage: "review [file]",
            verbatim: false,
            build: review_file,
        },
    ),
    ("blame", Rule::Blame),
];

fn review_file(file: String) -> ParsedCommand {
    ParsedCommand::Review(Some(file.trim_end().to_string()))
}

impl Rule {
    fn evaluate(&self, line: &str) -> Option<ParseOutcome> {
        match self {
            Rule::Exact(keyword, cmd) => line
                .eq_ignore_ascii_case(keyword)
                .then(|| ParseOutcome::Command(cmd.clone())),
            Rule::Argument {
                keyword,
                usage,
                verbatim,
                build,
            } => {
                let rest = strip_keyword(line, keyword)?;
                let arg = if *verbatim { rest } else { rest.trim_start() };
                if arg.trim().is_empty() {
                    return Some(ParseOutcome::Malformed { usage: *usage });
                }
                Some(ParseOutcome::Command(build(arg.to_string())))
            }
            Rule::Blame => {
                let rest = strip_keyword(line, "blame")?;
                Some(parse_blame(rest.trim()).unwrap_or(ParseOutcome::Malformed {
                    usage: BLAME_USAGE,
                }))
            }
        }
    }
}

/// `Some(rest)` when `line` starts with `keyword` followed by whitespace or nothing
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let head = line.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &line[keyword.len()..];
    let mut chars = rest.chars();
    match chars.next() {
        None => Some(""),
        Some(c) if c.is_whitespace() => Some(chars.as_str()),
        Some(_) => None,
    }
}

/// Path token (may contain spaces), then a positive line number
fn parse_blame(rest: &str) -> Option<ParseOutcome> {
    let (file, line) = rest.rsplit_once(char::is_whitespace)?;
    let file = file.trim_end();
    if file.is_empty() || line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let line: u32 = line.parse().ok().filter(|n| *n > 0)?;
    Some(ParseOutcome::Command(ParsedCommand::Blame {
        file: file.to_string(),
        line,
    }))
}

/// Parse one chat line
pub fn parse(raw: &str) -> ParseOutcome {
    let line = raw.trim();
    for (name, rule) in RULES {
        if let Some(outcome) = rule.evaluate(line) {
            trace!("grammar rule matched: {}", name);
            return outcome;
        }
    }
    ParseOutcome::Command(ParsedCommand::FreeText(line.to_string()))
}
