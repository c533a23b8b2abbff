use context_indexer::{FailureKind, IndexerConfig, IndexerError, SymbolIndexer};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    for (path, content) in files {
        let full = temp.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(full, content).expect("write file");
    }
    temp
}

fn indexer(temp: &TempDir) -> SymbolIndexer {
    SymbolIndexer::new(temp.path(), IndexerConfig::default()).expect("indexer")
}

#[tokio::test]
async fn unchanged_file_hits_cache_and_one_byte_change_misses() {
    let temp = project(&[("auth.py", "def login(user: str) -> bool:\n    return True\n")]);
    let indexer = indexer(&temp);

    let first = indexer.index_file("auth.py").expect("index").expect("supported");
    assert_eq!(first.path, "auth.py");
    assert_eq!(indexer.cache().stats().writes, 1);

    let second = indexer.index_file("auth.py").expect("index").expect("supported");
    assert_eq!(second, first);
    assert_eq!(indexer.cache().stats().hits(), 1);

    std::fs::write(
        temp.path().join("auth.py"),
        "def login(user: str) -> int:\n    return True\n",
    )
    .expect("rewrite");
    let third = indexer.index_file("auth.py").expect("index").expect("supported");
    assert_ne!(third.content_hash, first.content_hash);
    assert_eq!(third.symbols[0].signature, "def login(user: str) -> int");
    assert_eq!(indexer.cache().stats().misses, 2);
    assert_eq!(indexer.cache().stats().writes, 2);
}

#[tokio::test]
async fn cache_survives_a_new_indexer() {
    let temp = project(&[("src/lib.rs", "pub fn run() {}\n")]);
    let first = indexer(&temp).index_file("src/lib.rs").unwrap().unwrap();

    let fresh = indexer(&temp);
    let again = fresh.index_file("src/lib.rs").unwrap().unwrap();
    assert_eq!(again, first);
    assert_eq!(fresh.cache().stats().disk_hits, 1);
}

#[tokio::test]
async fn same_file_under_several_paths_is_indexed_once() {
    let temp = project(&[("a.py", "def a():\n    pass\n"), ("b.py", "def b():\n    pass\n")]);
    let indexer = indexer(&temp);
    let paths = vec![
        PathBuf::from("a.py"),
        temp.path().join("a.py"),
        PathBuf::from("b.py"),
        PathBuf::from("a.py"),
    ];

    let batch = indexer.batch_index(&paths).await.expect("batch");
    assert_eq!(batch.symbols.len(), 2);
    assert_eq!(batch.stats.files, 2);
    assert_eq!(batch.stats.symbols, 2);
    assert_eq!(indexer.cache().stats().writes, 2);
}

#[tokio::test]
async fn batch_with_one_broken_file_reports_it() {
    let temp = project(&[
        ("a.py", "def a():\n    pass\n"),
        ("b.py", "class B:\n    pass\n"),
        ("c.rs", "fn c() {}\n"),
        ("d.ts", "export function d(): void {}\n"),
        ("broken.py", "def broken(:\n    pass\n"),
    ]);
    let indexer = indexer(&temp);
    let paths: Vec<PathBuf> = ["a.py", "b.py", "c.rs", "d.ts", "broken.py"]
        .iter()
        .map(|p| temp.path().join(p))
        .collect();

    let batch = indexer.batch_index(&paths).await.expect("partial success");
    assert_eq!(batch.symbols.len(), 4);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].path, "broken.py");
    assert_eq!(batch.failures[0].kind, FailureKind::Parse);
    assert!(batch.skipped.is_empty());
    assert_eq!(batch.stats.files, 4);
    assert_eq!(batch.stats.failures, 1);
}

#[tokio::test]
async fn every_path_lands_in_exactly_one_bucket() {
    let temp = project(&[
        ("ok.py", "def ok(): pass\n"),
        ("README.md", "# docs\n"),
        ("latin1.py", ""),
    ]);
    std::fs::write(temp.path().join("latin1.py"), [0x64, 0xe9, 0x66]).unwrap();
    let indexer = indexer(&temp);

    let batch = indexer
        .batch_index(&["ok.py", "README.md", "latin1.py", "missing.py"])
        .await
        .expect("one success");

    assert_eq!(batch.symbols.keys().collect::<Vec<_>>(), vec!["ok.py"]);
    assert_eq!(batch.skipped, vec!["README.md".to_string()]);
    let mut kinds: Vec<(String, FailureKind)> = batch
        .failures
        .iter()
        .map(|f| (f.path.clone(), f.kind))
        .collect();
    kinds.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        kinds,
        vec![
            ("latin1.py".to_string(), FailureKind::Decode),
            ("missing.py".to_string(), FailureKind::Io),
        ]
    );
}

#[tokio::test]
async fn total_failure_is_an_error() {
    let temp = project(&[("bad.rs", "fn main( {"), ("worse.py", "class (")]);
    let indexer = indexer(&temp);

    let err = indexer
        .batch_index(&["bad.rs", "worse.py"])
        .await
        .expect_err("nothing succeeded");
    match err {
        IndexerError::TotalFailure { failures } => assert_eq!(failures.len(), 2),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn only_skips_is_not_a_failure() {
    let temp = project(&[("notes.md", "# notes")]);
    let batch = indexer(&temp).batch_index(&["notes.md"]).await.unwrap();
    assert!(batch.symbols.is_empty());
    assert_eq!(batch.skipped.len(), 1);
}

#[tokio::test]
async fn index_project_clears_records_of_deleted_files() {
    let temp = project(&[
        ("src/app.py", "def main():\n    pass\n"),
        ("src/old.py", "def legacy():\n    pass\n"),
        ("node_modules/dep/index.js", "function dep() {}\n"),
    ]);
    let indexer = indexer(&temp);

    let batch = indexer.index_project().await.expect("index project");
    assert_eq!(
        batch.symbols.keys().cloned().collect::<Vec<_>>(),
        vec!["src/app.py".to_string(), "src/old.py".to_string()]
    );
    assert_eq!(batch.stats.stale_removed, 0);

    std::fs::remove_file(temp.path().join("src/old.py")).unwrap();
    let batch = indexer.index_project().await.expect("reindex");
    assert_eq!(batch.symbols.len(), 1);
    assert_eq!(batch.stats.cache_hits, 1);
    assert_eq!(batch.stats.stale_removed, 1);
    assert_eq!(indexer.clear_stale().await.unwrap(), 0);
}

#[tokio::test]
async fn missing_root_is_invalid() {
    let temp = TempDir::new().unwrap();
    let err = SymbolIndexer::new(temp.path().join("nope"), IndexerConfig::default()).unwrap_err();
    assert!(matches!(err, IndexerError::InvalidPath(_)));
}
