//! Line-pattern extraction for languages without a bundled grammar.
//!
//! Each line is tested against an ordered list of anchored regexes and the
//! first match whose name survives the reject list wins. Lines that match
//! nothing are ignored, so a file never fails here. Class-like matches open a
//! scope that lasts while later lines stay indented deeper than the class line.

use crate::error::{Result, SymbolError};
use crate::extractor::SymbolExtractor;
use crate::language::Language;
use crate::structural::collapse_whitespace;
use crate::types::{ExtractedSymbol, SymbolKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Names that a loose pattern can pick up from control flow or expressions
const REJECTED_NAMES: &[&str] = &[
    "if", "else", "for", "foreach", "while", "switch", "catch", "return", "new", "throw", "do",
    "try", "case", "await", "using", "lock", "sizeof", "typeof", "nameof", "when", "match", "func",
    "fun", "var", "let", "val", "function", "class", "struct", "yield", "goto", "in", "is", "as",
];

/// `@Annotation(...)` or `[Attribute]` prefixes allowed in front of a declaration
const AT_PREFIX: &str = r"(?:@[A-Za-z_][\w.]*(?:\([^)]*\))?\s+)*";
const BRACKET_PREFIX: &str = r"(?:\[[^\]]*\]\s*)*";

static RULES: Lazy<HashMap<Language, LanguageRules>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for language in [
        Language::Go,
        Language::Java,
        Language::Kotlin,
        Language::Ruby,
        Language::Php,
        Language::Swift,
        Language::CSharp,
    ] {
        match LanguageRules::build(language) {
            Ok(rules) => {
                map.insert(language, rules);
            }
            Err(e) => log::error!("Invalid symbol pattern for {}: {e}", language.as_str()),
        }
    }
    map
});

static INLINE_ANNOTATION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"@([A-Za-z_][\w.]*)").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleKind {
    Class,
    Function,
    Lambda,
}

struct Rule {
    kind: RuleKind,
    regex: Regex,
}

struct LanguageRules {
    rules: Vec<Rule>,
    /// Matches a whole trimmed line holding only an annotation/attribute
    annotation: Option<Regex>,
    /// Marks an async declaration when present on the declaration line
    async_marker: Option<Regex>,
    /// Whether `@Name` tokens in front of a declaration count as decorators
    inline_annotations: bool,
}

impl LanguageRules {
    fn build(language: Language) -> std::result::Result<Self, regex::Error> {
        use RuleKind::{Class, Function, Lambda};

        let (rules, annotation, async_marker): (Vec<(RuleKind, String)>, Option<&str>, Option<&str>) =
            match language {
                Language::Go => (
                    vec![
                        (
                            Class,
                            r"^\s*type\s+(?P<name>[A-Za-z_]\w*)(?:\[[^\]]*\])?\s+(?:struct|interface)\b"
                                .to_string(),
                        ),
                        (
                            Function,
                            r"^\s*func\s+(?:\(\s*(?:[A-Za-z_]\w*\s+)?\*?\s*(?P<receiver>[A-Za-z_]\w*)[^)]*\)\s*)?(?P<name>[A-Za-z_]\w*)\s*[\[(]"
                                .to_string(),
                        ),
                        (
                            Lambda,
                            r"^\s*(?:var\s+)?(?P<name>[A-Za-z_]\w*)\s*(?::=|=)\s*func\s*\(".to_string(),
                        ),
                    ],
                    None,
                    None,
                ),
                Language::Java => (
                    vec![
                        (
                            Class,
                            format!(
                                r"^\s*{AT_PREFIX}(?:(?:public|protected|private|static|final|abstract|sealed|non-sealed|strictfp)\s+)*(?:class|interface|enum|record|@interface)\s+(?P<name>[A-Za-z_]\w*)"
                            ),
                        ),
                        (
                            Function,
                            format!(
                                r"^\s*{AT_PREFIX}(?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]+>\s+)?(?P<ret>[\w.$\[\]?]+(?:<[^()]*?>)?(?:\[\])*)\s+(?P<name>[A-Za-z_$][\w$]*)\s*\("
                            ),
                        ),
                        (
                            Lambda,
                            r"^\s*(?:(?:public|protected|private|static|final)\s+)*[\w.$\[\]?]+(?:<[^()]*?>)?\s+(?P<name>[A-Za-z_$][\w$]*)\s*=\s*(?:\([^)]*\)|[A-Za-z_]\w*)\s*->"
                                .to_string(),
                        ),
                    ],
                    Some(r"^@[A-Za-z_][\w.]*(?:\([^)]*\))?$"),
                    None,
                ),
                Language::Kotlin => (
                    vec![
                        (
                            Class,
                            format!(
                                r"^\s*{AT_PREFIX}(?:(?:public|private|protected|internal|open|abstract|sealed|data|enum|inner|annotation|value|final|companion|expect|actual)\s+)*(?:class|interface|object)\s+(?P<name>[A-Za-z_]\w*)"
                            ),
                        ),
                        (
                            Function,
                            format!(
                                r"^\s*{AT_PREFIX}(?:(?:public|private|protected|internal|open|override|abstract|final|inline|operator|infix|tailrec|external|suspend|expect|actual)\s+)*fun\s+(?:<[^>]+>\s*)?(?:[\w.<>?]+\.)?(?P<name>[A-Za-z_]\w*)\s*\("
                            ),
                        ),
                        (
                            Lambda,
                            r"^\s*(?:(?:private|public|protected|internal)\s+)?(?:val|var)\s+(?P<name>[A-Za-z_]\w*)\s*(?::[^=]+)?=\s*(?:suspend\s*)?\{"
                                .to_string(),
                        ),
                    ],
                    Some(r"^@[A-Za-z_][\w.:]*(?:\([^)]*\))?$"),
                    Some(r"\bsuspend\b"),
                ),
                Language::Ruby => (
                    vec![
                        (
                            Class,
                            r"^\s*(?:class|module)\s+(?P<name>[A-Z]\w*(?:::[A-Z]\w*)*)".to_string(),
                        ),
                        (
                            Function,
                            r"^\s*def\s+(?:self\.)?(?P<name>[A-Za-z_]\w*[?!=]?)".to_string(),
                        ),
                        (
                            Lambda,
                            r"^\s*(?P<name>[a-z_]\w*)\s*=\s*(?:lambda\b|->|proc\b|Proc\.new\b)"
                                .to_string(),
                        ),
                    ],
                    None,
                    None,
                ),
                Language::Php => (
                    vec![
                        (
                            Class,
                            r"^\s*(?:(?:abstract|final|readonly)\s+)*(?:class|interface|trait|enum)\s+(?P<name>[A-Za-z_]\w*)"
                                .to_string(),
                        ),
                        (
                            Function,
                            r"^\s*(?:(?:public|protected|private|static|abstract|final)\s+)*function\s+&?(?P<name>[A-Za-z_]\w*)\s*\("
                                .to_string(),
                        ),
                        (
                            Lambda,
                            r"^\s*\$(?P<name>[A-Za-z_]\w*)\s*=\s*(?:static\s+)?(?:function|fn)\s*\("
                                .to_string(),
                        ),
                    ],
                    Some(r"^#\[[A-Za-z_\\][^\]]*\]$"),
                    None,
                ),
                Language::Swift => (
                    vec![
                        (
                            Class,
                            format!(
                                r"^\s*{AT_PREFIX}(?:(?:public|private|fileprivate|internal|open|final|indirect)\s+)*(?:class|struct|protocol|enum|actor|extension)\s+(?P<name>[A-Za-z_]\w*)"
                            ),
                        ),
                        (
                            Function,
                            format!(
                                r"^\s*{AT_PREFIX}(?:(?:public|private|fileprivate|internal|open|final|override|static|class|mutating|nonmutating|convenience|required)\s+)*func\s+(?P<name>[A-Za-z_]\w*)\s*[<(]"
                            ),
                        ),
                        (
                            Lambda,
                            r"^\s*(?:(?:public|private|fileprivate|internal|static|lazy)\s+)*(?:let|var)\s+(?P<name>[A-Za-z_]\w*)\s*(?::[^=]+)?=\s*\{[^}]*\bin\b"
                                .to_string(),
                        ),
                    ],
                    Some(r"^@[A-Za-z_]\w*(?:\([^)]*\))?$"),
                    Some(r"\basync\b"),
                ),
                Language::CSharp => (
                    vec![
                        (
                            Class,
                            format!(
                                r"^\s*{BRACKET_PREFIX}(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly|unsafe|file|new|ref)\s+)*(?:class|interface|struct|record|enum)\s+(?P<name>[A-Za-z_]\w*)"
                            ),
                        ),
                        (
                            Function,
                            format!(
                                r"^\s*{BRACKET_PREFIX}(?:(?:public|private|protected|internal|static|virtual|override|abstract|sealed|async|extern|unsafe|new|partial|readonly)\s+)*(?P<ret>[\w.\[\]?]+(?:<[^()]*?>)?(?:\[\])*\??)\s+(?P<name>[A-Za-z_]\w*)\s*(?:<[^>]*>)?\s*\("
                            ),
                        ),
                        (
                            Lambda,
                            r"^\s*(?:(?:public|private|protected|internal|static|readonly)\s+)*(?:var|Func<[^=]*>|Action(?:<[^=]*>)?)\s+(?P<name>[A-Za-z_]\w*)\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_]\w*)\s*=>"
                                .to_string(),
                        ),
                    ],
                    Some(r"^\[[A-Za-z_][^\]]*\]$"),
                    Some(r"\basync\b"),
                ),
                _ => (Vec::new(), None, None),
            };

        let rules = rules
            .into_iter()
            .map(|(kind, pattern)| Ok(Rule { kind, regex: Regex::new(&pattern)? }))
            .collect::<std::result::Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules,
            annotation: annotation.map(Regex::new).transpose()?,
            async_marker: async_marker.map(Regex::new).transpose()?,
            inline_annotations: matches!(
                language,
                Language::Java | Language::Kotlin | Language::Swift
            ),
        })
    }
}

/// A declaration found on one line
struct LineMatch<'a> {
    kind: RuleKind,
    name: &'a str,
    name_start: usize,
    receiver: Option<&'a str>,
}

impl LanguageRules {
    fn match_line<'a>(&self, line: &'a str) -> Option<LineMatch<'a>> {
        self.rules.iter().find_map(|rule| {
            let caps = rule.regex.captures(line)?;
            let name = caps.name("name")?;
            if is_rejected(name.as_str()) {
                return None;
            }
            if caps.name("ret").is_some_and(|ret| is_rejected(ret.as_str())) {
                return None;
            }
            Some(LineMatch {
                kind: rule.kind,
                name: name.as_str(),
                name_start: name.start(),
                receiver: caps.name("receiver").map(|r| r.as_str()),
            })
        })
    }
}

fn is_rejected(word: &str) -> bool {
    REJECTED_NAMES.contains(&word)
}

/// Regex-table extractor for one language
#[derive(Debug, Clone, Copy)]
pub struct PatternExtractor {
    language: Language,
}

impl PatternExtractor {
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }
}

impl SymbolExtractor for PatternExtractor {
    fn language(&self) -> Language {
        self.language
    }

    fn extract(&self, path: &str, content: &str) -> Result<Vec<ExtractedSymbol>> {
        let rules = RULES
            .get(&self.language)
            .ok_or_else(|| SymbolError::unsupported_language(self.language.as_str()))?;

        let mut scanner = Scanner::new(self.language, rules, path);
        for (idx, line) in content.lines().enumerate() {
            scanner.line(idx + 1, line);
        }
        Ok(scanner.symbols)
    }
}

/// Per-file scan state
struct Scanner<'r> {
    language: Language,
    rules: &'r LanguageRules,
    path: &'r str,
    /// Open class scopes as (indent, name)
    scopes: Vec<(usize, String)>,
    pending_docs: Vec<String>,
    pending_annotations: Vec<String>,
    /// Inside a `/* ... */` block that has not closed yet
    in_block_comment: bool,
    symbols: Vec<ExtractedSymbol>,
}

impl<'r> Scanner<'r> {
    fn new(language: Language, rules: &'r LanguageRules, path: &'r str) -> Self {
        Self {
            language,
            rules,
            path,
            scopes: Vec::new(),
            pending_docs: Vec::new(),
            pending_annotations: Vec::new(),
            in_block_comment: false,
            symbols: Vec::new(),
        }
    }

    fn line(&mut self, line_no: usize, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.reset_pending();
            return;
        }

        if self.in_block_comment {
            if trimmed.contains("*/") {
                self.in_block_comment = false;
            }
            let text = trimmed.trim_end_matches("*/").trim_start_matches('*').trim();
            if !text.is_empty() && !is_markup(text) {
                self.pending_docs.push(text.to_string());
            }
            return;
        }

        if let Some(annotation) = &self.rules.annotation {
            if annotation.is_match(trimmed) {
                self.pending_annotations.push(annotation_name(trimmed));
                return;
            }
        }

        if let Some(text) = comment_text(self.language, trimmed) {
            if trimmed.starts_with("/*") && !trimmed[2..].contains("*/") {
                self.in_block_comment = true;
            }
            if !text.is_empty() && !is_markup(text) {
                self.pending_docs.push(text.to_string());
            }
            return;
        }

        // An opening brace on its own line belongs to the declaration above
        if !trimmed.starts_with('{') {
            let indent = indent_width(line);
            while self.scopes.last().is_some_and(|(scope_indent, _)| *scope_indent >= indent) {
                self.scopes.pop();
            }
        }

        match self.rules.match_line(line) {
            Some(found) => self.push(line_no, line, &found),
            None => self.reset_pending(),
        }
    }

    fn push(&mut self, line_no: usize, line: &str, found: &LineMatch<'_>) {
        let parent = found
            .receiver
            .map(str::to_string)
            .or_else(|| self.scopes.last().map(|(_, name)| name.clone()));

        let kind = match found.kind {
            RuleKind::Class => SymbolKind::Class,
            RuleKind::Function | RuleKind::Lambda if parent.is_some() => SymbolKind::Method,
            RuleKind::Function | RuleKind::Lambda => {
                let is_async = self
                    .rules
                    .async_marker
                    .as_ref()
                    .is_some_and(|marker| marker.is_match(line));
                if is_async {
                    SymbolKind::AsyncFunction
                } else {
                    SymbolKind::Function
                }
            }
        };

        let mut decorators = std::mem::take(&mut self.pending_annotations);
        if self.rules.inline_annotations {
            if let Some(inline) = INLINE_ANNOTATION.as_ref() {
                let prefix = line.get(..found.name_start).unwrap_or("");
                decorators.extend(
                    inline
                        .captures_iter(prefix)
                        .filter_map(|c| c.get(1))
                        .map(|m| m.as_str())
                        .filter(|name| *name != "interface")
                        .map(str::to_string),
                );
            }
        }
        let docstring = self.pending_docs.first().cloned();
        self.pending_docs.clear();

        self.symbols.push(
            ExtractedSymbol::new(found.name, kind, signature(line), self.path, line_no)
                .docstring(docstring)
                .decorators(decorators)
                .parent(parent.as_deref()),
        );

        if found.kind == RuleKind::Class {
            self.scopes.push((indent_width(line), found.name.to_string()));
        }
    }

    fn reset_pending(&mut self) {
        self.pending_docs.clear();
        self.pending_annotations.clear();
    }
}

/// Declaration text up to the body brace, on one line
fn signature(line: &str) -> String {
    let head = line.split('{').next().unwrap_or(line);
    collapse_whitespace(head.trim().trim_end_matches(';'))
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Comment body when `trimmed` opens a comment.
///
/// Continuation lines of a `/* ... */` block are handled by the scanner, so a
/// leading `*` outside one stays code (`*cfg = defaults`).
fn comment_text(language: Language, trimmed: &str) -> Option<&str> {
    let prefix = language
        .comment_prefixes()
        .iter()
        .find(|prefix| trimmed.starts_with(*prefix))?;
    let body = trimmed[prefix.len()..].trim_end_matches("*/");
    Some(body.trim_start_matches(['/', '*', '#']).trim())
}

/// XML doc tags such as `<summary>` carry no text of their own
fn is_markup(text: &str) -> bool {
    text.starts_with('<') && text.ends_with('>')
}

/// `@Get("/x")` / `[HttpPost]` / `#[Route("/")]` -> `Get` / `HttpPost` / `Route`
fn annotation_name(trimmed: &str) -> String {
    let inner = trimmed
        .trim_start_matches(['#', '@', '['])
        .trim_end_matches(']');
    inner
        .split(|c: char| c == '(' || c == ',' || c.is_whitespace())
        .next()
        .unwrap_or(inner)
        .to_string()
}
