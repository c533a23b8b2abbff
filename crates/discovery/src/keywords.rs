use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Priority band of a keyword; earlier variants rank first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordTier {
    /// Programming-domain term
    Domain,
    Regular,
    /// Only produced when nothing else survived filtering
    Fallback,
}

/// A normalized search term
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub tier: KeywordTier,
}

impl Keyword {
    pub fn new(text: impl Into<String>, tier: KeywordTier) -> Self {
        Self {
            text: text.into(),
            tier,
        }
    }
}

/// Turns a free-form task description into ranked keywords
#[derive(Debug, Clone, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract keywords: domain terms first, then regular ones, each tier in
    /// order of first appearance. Never returns an empty list.
    pub fn extract(&self, task: &str) -> Vec<Keyword> {
        let tokens = tokenize(task);
        if tokens.is_empty() {
            return vec![Keyword::new(task.trim(), KeywordTier::Fallback)];
        }

        let mut kept = Vec::new();
        let mut filtered = Vec::new();
        for token in tokens {
            match token {
                Token::Word(word) => {
                    if is_noise(&word) {
                        filtered.push(word);
                    } else {
                        let tier = if DOMAIN_TERMS.contains(word.as_str()) {
                            KeywordTier::Domain
                        } else {
                            KeywordTier::Regular
                        };
                        kept.push(Keyword::new(word, tier));
                    }
                }
                Token::Mapped(english) => {
                    let tier = if DOMAIN_TERMS.contains(english) {
                        KeywordTier::Domain
                    } else {
                        KeywordTier::Regular
                    };
                    kept.push(Keyword::new(english, tier));
                }
                Token::Native(term) => kept.push(Keyword::new(term, KeywordTier::Regular)),
            }
        }

        if kept.is_empty() {
            return most_frequent(&filtered)
                .map(|word| vec![Keyword::new(word, KeywordTier::Fallback)])
                .unwrap_or_else(|| vec![Keyword::new(task.trim(), KeywordTier::Fallback)]);
        }

        let mut seen = HashSet::new();
        kept.retain(|keyword| seen.insert(keyword.text.clone()));
        // Stable: relative order within a tier is preserved
        kept.sort_by_key(|keyword| keyword.tier);
        kept
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    /// Lower-cased word from a spaced script
    Word(String),
    /// CJK dictionary term with an English equivalent
    Mapped(&'static str),
    /// CJK dictionary term or unmatched fragment kept as written
    Native(String),
}

fn tokenize(task: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cjk_run = String::new();

    for segment in task.split_word_bounds() {
        if segment.chars().all(is_cjk) {
            cjk_run.push_str(segment);
            continue;
        }
        if !cjk_run.is_empty() {
            scan_cjk(&cjk_run, &mut tokens);
            cjk_run.clear();
        }
        if !segment.chars().any(char::is_alphanumeric) {
            continue;
        }
        for part in segment.split(['_', '-', '/', '.']) {
            for word in split_camel_case(part) {
                tokens.push(Token::Word(word.to_lowercase()));
            }
        }
    }
    if !cjk_run.is_empty() {
        scan_cjk(&cjk_run, &mut tokens);
    }

    tokens
}

/// Longest-match-first dictionary scan over a run of CJK characters.
/// Unmatched characters accumulate into fragments; one-character fragments are dropped.
fn scan_cjk(run: &str, tokens: &mut Vec<Token>) {
    let chars: Vec<char> = run.chars().collect();
    let mut fragment = String::new();
    let mut i = 0;

    while i < chars.len() {
        let longest = (1..=(*MAX_CJK_TERM_CHARS).min(chars.len() - i))
            .rev()
            .find_map(|len| {
                let candidate: String = chars[i..i + len].iter().collect();
                CJK_DICTIONARY
                    .get(candidate.as_str())
                    .map(|meaning| (len, candidate, *meaning))
            });

        match longest {
            Some((len, term, meaning)) => {
                flush_fragment(&mut fragment, tokens);
                match meaning {
                    CjkMeaning::English(english) => tokens.push(Token::Mapped(english)),
                    CjkMeaning::Native => tokens.push(Token::Native(term)),
                    CjkMeaning::Stop => {}
                }
                i += len;
            }
            None => {
                fragment.push(chars[i]);
                i += 1;
            }
        }
    }
    flush_fragment(&mut fragment, tokens);
}

fn flush_fragment(fragment: &mut String, tokens: &mut Vec<Token>) {
    if fragment.chars().count() >= 2 {
        tokens.push(Token::Native(fragment.clone()));
    }
    fragment.clear();
}

/// Split camelCase / PascalCase: `getUserID` -> `get`, `User`, `ID`
pub(crate) fn split_camel_case(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (idx, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && !current.is_empty() {
            let prev_lower = chars[idx - 1].is_lowercase() || chars[idx - 1].is_ascii_digit();
            let next_lower = chars.get(idx + 1).is_some_and(|next| next.is_lowercase());
            let prev_upper = chars[idx - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn is_noise(word: &str) -> bool {
    if word.chars().all(|c| c.is_numeric()) {
        return true;
    }
    if word.len() == 1 && word.is_ascii() {
        return true;
    }
    STOP_WORDS.contains(word)
}

/// Highest-frequency token, ties broken by earliest occurrence
fn most_frequent(words: &[String]) -> Option<&str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in words {
        *counts.entry(word.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for word in words {
        let count = counts[word.as_str()];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((word.as_str(), count));
        }
    }
    best.map(|(word, _)| word)
}

fn is_cjk(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1100..=0x11FF      // Hangul Jamo
            | 0x3040..=0x309F // Hiragana
            | 0x30A0..=0x30FF // Katakana
            | 0x3130..=0x318F // Hangul compatibility Jamo
            | 0x31F0..=0x31FF // Katakana phonetic extensions
            | 0x3400..=0x4DBF // CJK extension A
            | 0x4E00..=0x9FFF // CJK unified ideographs
            | 0xAC00..=0xD7AF // Hangul syllables
            | 0xF900..=0xFAFF // CJK compatibility ideographs
            | 0x20000..=0x2A6DF
    )
}

#[derive(Debug, Clone, Copy)]
enum CjkMeaning {
    English(&'static str),
    Native,
    Stop,
}

static CJK_DICTIONARY: Lazy<HashMap<&'static str, CjkMeaning>> = Lazy::new(|| {
    use CjkMeaning::{English, Native, Stop};
    [
        // Chinese
        ("认证", English("auth")),
        ("鉴权", English("auth")),
        ("登录", English("login")),
        ("登出", English("logout")),
        ("注册", English("register")),
        ("用户", English("user")),
        ("账户", English("account")),
        ("账号", English("account")),
        ("会话", English("session")),
        ("密码", English("password")),
        ("权限", English("permission")),
        ("数据库", English("database")),
        ("缓存", English("cache")),
        ("配置", English("config")),
        ("错误", English("error")),
        ("异常", English("exception")),
        ("日志", English("log")),
        ("测试", English("test")),
        ("接口", English("api")),
        ("路由", English("route")),
        ("服务", English("service")),
        ("模型", English("model")),
        ("文件", English("file")),
        ("搜索", English("search")),
        ("支付", English("payment")),
        ("订单", English("order")),
        ("消息", English("message")),
        ("通知", English("notification")),
        ("修复", English("fix")),
        ("添加", English("add")),
        ("增加", English("add")),
        ("删除", English("remove")),
        ("更新", English("update")),
        ("重构", English("refactor")),
        ("实现", English("implement")),
        ("优化", English("optimize")),
        ("功能", Native),
        ("模块", Native),
        ("页面", Native),
        ("一个", Stop),
        ("这个", Stop),
        ("那个", Stop),
        ("我们", Stop),
        ("需要", Stop),
        ("请帮", Stop),
        ("帮我", Stop),
        ("可以", Stop),
        ("的", Stop),
        ("了", Stop),
        ("和", Stop),
        ("在", Stop),
        ("是", Stop),
        ("把", Stop),
        ("请", Stop),
        ("我", Stop),
        ("吗", Stop),
        ("呢", Stop),
        // Japanese
        ("認証", English("auth")),
        ("ログイン", English("login")),
        ("ユーザー", English("user")),
        ("データベース", English("database")),
        ("キャッシュ", English("cache")),
        ("設定", English("config")),
        ("エラー", English("error")),
        ("テスト", English("test")),
        ("追加", English("add")),
        ("修正", English("fix")),
        ("削除", English("remove")),
        ("ください", Stop),
        ("して", Stop),
        ("を", Stop),
        ("に", Stop),
        ("は", Stop),
        ("が", Stop),
        ("の", Stop),
        ("で", Stop),
        // Korean
        ("인증", English("auth")),
        ("로그인", English("login")),
        ("사용자", English("user")),
        ("데이터베이스", English("database")),
        ("캐시", English("cache")),
        ("설정", English("config")),
        ("오류", English("error")),
        ("테스트", English("test")),
        ("추가", English("add")),
        ("수정", English("fix")),
        ("삭제", English("remove")),
    ]
    .into_iter()
    .collect()
});

static MAX_CJK_TERM_CHARS: Lazy<usize> = Lazy::new(|| {
    CJK_DICTIONARY
        .keys()
        .map(|term| term.chars().count())
        .max()
        .unwrap_or(2)
});

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "then", "else", "to", "of", "in", "on", "at",
        "by", "for", "with", "from", "into", "onto", "about", "as", "is", "are", "was", "were",
        "be", "been", "being", "am", "do", "does", "did", "doing", "done", "have", "has", "had",
        "it", "its", "this", "that", "these", "those", "i", "me", "my", "we", "our", "us", "you",
        "your", "he", "she", "they", "them", "their", "there", "here", "what", "which", "who",
        "whom", "when", "where", "why", "how", "all", "any", "some", "can", "could", "would",
        "will", "shall", "may", "might", "must", "should", "not", "no", "so", "too", "very",
        "just", "also", "please", "kindly", "make", "makes", "made", "making", "need", "needs",
        "want", "wants", "like", "let", "lets", "help", "thanks", "thank", "sure", "able", "use",
        "using", "via", "etc", "thing", "things", "stuff", "way", "bit", "now", "again", "only",
        "more", "most", "other", "such", "each", "own", "same", "than", "up", "down", "out",
        "over", "under", "after", "before", "while", "during", "because", "until", "both",
    ]
    .into_iter()
    .collect()
});

static DOMAIN_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // verbs
        "fix", "add", "refactor", "implement", "remove", "update", "delete", "create", "optimize",
        "debug", "migrate", "rename", "validate", "parse", "deploy", "configure", "handle",
        "integrate", "improve", "support", "render", "fetch", "sync", "upload", "download",
        // nouns
        "auth", "authentication", "authorization", "login", "logout", "signup", "register",
        "user", "users", "account", "session", "token", "password", "permission", "role", "cache",
        "database", "db", "api", "endpoint", "route", "router", "server", "client", "request",
        "response", "model", "schema", "migration", "query", "config", "configuration",
        "settings", "error", "exception", "log", "logging", "logger", "test", "tests", "payment",
        "order", "email", "notification", "file", "search", "index", "queue", "worker", "job",
        "middleware", "controller", "service", "handler", "component", "hook", "state", "store",
        "form", "validation", "security", "encryption", "http", "websocket", "graphql", "jwt",
        "oauth", "cli", "parser", "scheduler", "message",
    ]
    .into_iter()
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn texts(keywords: &[Keyword]) -> Vec<&str> {
        keywords.iter().map(|k| k.text.as_str()).collect()
    }

    #[test]
    fn test_domain_terms_come_first() {
        let keywords = KeywordExtractor::new().extract("Please add rate limiting to the user login endpoint");
        assert_eq!(
            texts(&keywords),
            vec!["add", "user", "login", "endpoint", "rate", "limiting"]
        );
        assert_eq!(keywords[0].tier, KeywordTier::Domain);
        assert_eq!(keywords[4].tier, KeywordTier::Regular);
    }

    #[test]
    fn test_identifier_splitting() {
        let keywords = KeywordExtractor::new().extract("getUser in user_service/api.py fails with HTTPServer");
        assert_eq!(
            texts(&keywords),
            vec!["user", "service", "api", "http", "server", "get", "py", "fails"]
        );
    }

    #[test]
    fn test_camel_case_split() {
        assert_eq!(split_camel_case("getUserID"), vec!["get", "User", "ID"]);
        assert_eq!(split_camel_case("HTTPServer"), vec!["HTTP", "Server"]);
        assert_eq!(split_camel_case("lowercase"), vec!["lowercase"]);
        assert_eq!(split_camel_case("parseV2Config"), vec!["parse", "V2", "Config"]);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let keywords = KeywordExtractor::new().extract("cache the cache of Cache misses");
        assert_eq!(texts(&keywords), vec!["cache", "misses"]);
    }

    #[test]
    fn test_numbers_and_single_letters_dropped() {
        let keywords = KeywordExtractor::new().extract("bump x to 42 in parser");
        assert_eq!(texts(&keywords), vec!["parser", "bump"]);
    }

    #[test]
    fn test_all_stop_words_fall_back_to_most_frequent() {
        let keywords = KeywordExtractor::new().extract("do it, do it now, please do");
        assert_eq!(keywords, vec![Keyword::new("do", KeywordTier::Fallback)]);

        let keywords = KeywordExtractor::new().extract("it is what it is");
        assert_eq!(keywords, vec![Keyword::new("it", KeywordTier::Fallback)]);
    }

    #[test]
    fn test_punctuation_only_returns_trimmed_input() {
        let keywords = KeywordExtractor::new().extract("  ?!  ");
        assert_eq!(keywords, vec![Keyword::new("?!", KeywordTier::Fallback)]);

        let keywords = KeywordExtractor::new().extract(" \t\n ");
        assert_eq!(keywords, vec![Keyword::new("", KeywordTier::Fallback)]);
    }

    #[test]
    fn test_chinese_terms_map_to_english() {
        let keywords = KeywordExtractor::new().extract("请帮我修复用户认证的问题");
        assert_eq!(texts(&keywords), vec!["fix", "user", "auth", "问题"]);
        assert!(keywords[..3].iter().all(|k| k.tier == KeywordTier::Domain));
        assert_eq!(keywords[3].tier, KeywordTier::Regular);
    }

    #[test]
    fn test_single_cjk_fragments_dropped() {
        let keywords = KeywordExtractor::new().extract("的 缓存 了");
        assert_eq!(texts(&keywords), vec!["cache"]);
    }

    #[test]
    fn test_mixed_scripts() {
        let keywords = KeywordExtractor::new().extract("ログイン API を修正");
        assert_eq!(texts(&keywords), vec!["login", "api", "fix"]);

        let keywords = KeywordExtractor::new().extract("사용자 인증 추가");
        assert_eq!(texts(&keywords), vec!["user", "auth", "add"]);
    }

    proptest! {
        #[test]
        fn proptest_never_empty(task in "\\PC{0,64}") {
            let keywords = KeywordExtractor::new().extract(&task);
            prop_assert!(!keywords.is_empty());
        }

        #[test]
        fn proptest_tiers_sorted_and_unique(task in "[a-zA-Z_ ]{0,80}") {
            let keywords = KeywordExtractor::new().extract(&task);
            prop_assert!(keywords.windows(2).all(|w| w[0].tier <= w[1].tier));
            let unique: HashSet<&str> = keywords.iter().map(|k| k.text.as_str()).collect();
            prop_assert_eq!(unique.len(), keywords.len());
        }

        #[test]
        fn proptest_deterministic(task in "\\PC{0,64}") {
            let extractor = KeywordExtractor::new();
            prop_assert_eq!(extractor.extract(&task), extractor.extract(&task));
        }

        #[test]
        fn proptest_kept_keywords_are_lowercase(task in "[a-zA-Z ]{1,60}") {
            for keyword in KeywordExtractor::new().extract(&task) {
                if keyword.tier != KeywordTier::Fallback {
                    prop_assert_eq!(keyword.text.to_lowercase(), keyword.text);
                }
            }
        }
    }
}
