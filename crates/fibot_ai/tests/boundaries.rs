use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(p) = stack.pop() {
        let entries = match fs::read_dir(&p) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for ent in entries.flatten() {
            let path = ent.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn pipeline_modules_only_reach_models_through_traits() {
    // Network access stays in the client and adapter modules. Everything else
    // goes through `Llm`, `Embedder` or `DatasetSource`.
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let pure = ["chunking", "index", "retrieve", "synth", "prompts", "finance", "rag.rs", "output.rs"];

    let files = collect_rs_files(&src_root);
    assert!(!files.is_empty());

    for f in files {
        let rel = f.strip_prefix(&src_root).unwrap_or(&f);
        let first = rel
            .components()
            .next()
            .and_then(|c| c.as_os_str().to_str())
            .unwrap_or_default();
        if !pure.contains(&first) {
            continue;
        }
        let text = fs::read_to_string(&f).unwrap_or_default();
        assert!(!text.contains("ureq"), "direct HTTP use found in {}", f.display());
        assert!(
            !text.contains("GeminiClient") && !text.contains("OllamaClient"),
            "concrete client found in {}",
            f.display()
        );
    }
}

#[test]
fn only_the_history_store_writes_answers() {
    // Pipelines record through `HistoryStore`; SQL lives in fibot_core.
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    for f in collect_rs_files(&src_root) {
        let text = fs::read_to_string(&f).unwrap_or_default();
        assert!(!text.contains("INSERT INTO"), "raw SQL found in {}", f.display());
    }
}
