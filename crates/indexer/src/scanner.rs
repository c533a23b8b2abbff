use crate::config::DEFAULT_MAX_FILE_BYTES;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Lists the project files worth looking at (.gitignore aware)
#[derive(Debug, Clone)]
pub struct FileScanner {
    root: PathBuf,
    max_file_bytes: u64,
    extra_ignored: Vec<String>,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            extra_ignored: Vec::new(),
        }
    }

    #[must_use]
    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Additional directory names to skip, on top of the built-in list
    #[must_use]
    pub fn ignore_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_ignored
            .extend(dirs.into_iter().map(|d| d.as_ref().to_lowercase()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root, returning absolute paths in walk order.
    ///
    /// Entries that cannot be read are logged and skipped.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let extra = self.extra_ignored.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true) // hidden files are never listed
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(move |entry| !is_ignored_scope(entry.path(), &root, &extra));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    match entry.metadata() {
                        Ok(meta) if meta.len() > self.max_file_bytes => {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.max_file_bytes
                            );
                            continue;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            log::warn!("Failed to stat {}: {e}", path.display());
                            continue;
                        }
                    }

                    if is_noise_file(path) {
                        log::debug!("Skipping noisy artifact {}", path.display());
                        continue;
                    }

                    if !is_listed_file(path) {
                        continue;
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        log::debug!("Found {} files under {}", files.len(), self.root.display());
        files
    }

    /// Scan and return root-relative paths with forward slashes
    pub fn scan_relative(&self) -> Vec<String> {
        self.scan()
            .iter()
            .map(|path| relative_path(&self.root, path))
            .collect()
    }
}

/// Root-relative, forward-slash form of `path`; paths outside the root are kept whole
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut normalized = relative.to_string_lossy().to_string();
    if normalized.contains('\\') {
        normalized = normalized.replace('\\', "/");
    }
    normalized
}

/// Whether a directory name is one of the standard non-source scopes
pub fn is_ignored_dir_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    IGNORED_SCOPES.iter().any(|ignored| *ignored == lowered)
}

fn is_ignored_scope(path: &Path, root: &Path, extra: &[String]) -> bool {
    if let Ok(relative) = path.strip_prefix(root) {
        for component in relative.components() {
            if let std::path::Component::Normal(name) = component {
                let lowered = name.to_string_lossy().to_lowercase();
                if IGNORED_SCOPES.iter().any(|ignored| *ignored == lowered)
                    || extra.iter().any(|ignored| *ignored == lowered)
                {
                    return true;
                }
            }
        }
    }
    false
}

fn is_listed_file(path: &Path) -> bool {
    if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
        if matches!(file_name, "Dockerfile" | "Makefile" | "Justfile" | "Gemfile" | "Rakefile") {
            return true;
        }
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|candidate| *candidate == ext)
        })
}

fn is_noise_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            NOISE_FILE_NAMES
                .iter()
                .any(|candidate| name.eq_ignore_ascii_case(candidate))
                || name.ends_with(".lock")
                || name.ends_with(".min.js")
        })
}

const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    // pipeline state
    ".context",
    // caches / builds
    ".cache",
    "node_modules",
    ".next",
    ".nuxt",
    ".turbo",
    ".parcel-cache",
    "build",
    "dist",
    "out",
    "coverage",
    "target",
    ".gradle",
    ".terraform",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".venv",
    "venv",
    "env",
    // vendored code
    "vendor",
    "third_party",
    "third-party",
    "pods",
];

const NOISE_FILE_NAMES: &[&str] = &[
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "cargo.lock",
    "poetry.lock",
    "composer.lock",
    "gemfile.lock",
    "go.sum",
];

/// Code, docs and config worth ranking against a task
const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Languages with symbol extraction
    "rs", "py", "pyw", "pyi", "js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx", "go", "java",
    "kt", "kts", "rb", "php", "swift", "cs",
    // Other code
    "c", "h", "cpp", "cc", "hpp", "scala", "dart", "lua", "ex", "exs", "sh", "bash", "zsh", "sql",
    "proto", "vue", "svelte",
    // Docs
    "md", "mdx", "rst", "txt",
    // Config
    "yaml", "yml", "json", "toml", "ini", "cfg", "conf", "xml", "html", "css", "scss",
];
