//! File classification, hashing, and preview generation (spec §4.3).
//!
//! Classification is deterministic: extension decides `FileKind` first,
//! falling back to a lightweight content sniff when the extension is
//! unknown; `FileCategory` is then assigned from name/path heuristics.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    SourceCode,
    Documentation,
    Configuration,
    Data,
    Image,
    Video,
    Audio,
    Archive,
    Binary,
    Text,
    Application,
    Unknown,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::SourceCode => "source_code",
            FileKind::Documentation => "documentation",
            FileKind::Configuration => "configuration",
            FileKind::Data => "data",
            FileKind::Image => "image",
            FileKind::Video => "video",
            FileKind::Audio => "audio",
            FileKind::Archive => "archive",
            FileKind::Binary => "binary",
            FileKind::Text => "text",
            FileKind::Application => "application",
            FileKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Readme,
    License,
    Changelog,
    Dependencies,
    ProjectConfig,
    Docker,
    Test,
    Documentation,
    Examples,
    Scripts,
    Configuration,
    General,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Readme => "readme",
            FileCategory::License => "license",
            FileCategory::Changelog => "changelog",
            FileCategory::Dependencies => "dependencies",
            FileCategory::ProjectConfig => "project_config",
            FileCategory::Docker => "docker",
            FileCategory::Test => "test",
            FileCategory::Documentation => "documentation",
            FileCategory::Examples => "examples",
            FileCategory::Scripts => "scripts",
            FileCategory::Configuration => "configuration",
            FileCategory::General => "general",
        }
    }
}

pub struct FileClassification {
    pub kind: FileKind,
    pub category: FileCategory,
    pub line_count: usize,
    pub content_hash: String,
    pub preview: Option<String>,
}

const PREVIEW_MAX_CHARS: usize = 500;
const PREVIEW_SKIP_BYTES: u64 = 1024 * 1024;

fn extension_of(path: &str) -> Option<String> {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn kind_by_extension(ext: &str) -> Option<FileKind> {
    Some(match ext {
        "rs" | "py" | "js" | "ts" | "tsx" | "jsx" | "go" | "java" | "c" | "cpp" | "h" | "hpp"
        | "rb" | "php" | "swift" | "kt" | "scala" | "cs" => FileKind::SourceCode,
        "md" | "rst" | "adoc" | "txt" => FileKind::Documentation,
        "toml" | "yaml" | "yml" | "ini" | "cfg" | "conf" => FileKind::Configuration,
        "json" | "csv" | "tsv" | "parquet" => FileKind::Data,
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "bmp" | "webp" => FileKind::Image,
        "mp4" | "mov" | "avi" | "mkv" => FileKind::Video,
        "mp3" | "wav" | "flac" | "ogg" => FileKind::Audio,
        "zip" | "tar" | "gz" | "bz2" | "xz" | "7z" => FileKind::Archive,
        "exe" | "dll" | "so" | "dylib" | "bin" => FileKind::Binary,
        "html" | "xml" | "css" => FileKind::Application,
        _ => return None,
    })
}

fn sniff_kind(content: &[u8]) -> FileKind {
    if content.contains(&0) {
        FileKind::Binary
    } else if std::str::from_utf8(content).is_ok() {
        FileKind::Text
    } else {
        FileKind::Unknown
    }
}

fn category_for(path: &str) -> FileCategory {
    let lower = path.to_ascii_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);

    if name.starts_with("readme") {
        FileCategory::Readme
    } else if name.starts_with("license") || name.starts_with("licence") || name.starts_with("copying") {
        FileCategory::License
    } else if name.starts_with("changelog") || name.starts_with("changes") || name.starts_with("history") {
        FileCategory::Changelog
    } else if matches!(
        name,
        "cargo.toml" | "package.json" | "requirements.txt" | "gemfile" | "go.mod" | "pyproject.toml"
    ) {
        FileCategory::Dependencies
    } else if name.starts_with("dockerfile") || name.contains("docker-compose") {
        FileCategory::Docker
    } else if lower.contains("/test/")
        || lower.contains("/tests/")
        || name.starts_with("test_")
        || name.ends_with("_test.rs")
        || name.ends_with(".test.ts")
    {
        FileCategory::Test
    } else if lower.contains("/docs/") || lower.contains("/doc/") {
        FileCategory::Documentation
    } else if lower.contains("/examples/") || lower.contains("/demo/") {
        FileCategory::Examples
    } else if lower.contains("/scripts/") || name.ends_with(".sh") {
        FileCategory::Scripts
    } else if matches!(
        extension_of(&lower).as_deref(),
        Some("toml" | "yaml" | "yml" | "ini" | "cfg" | "conf")
    ) {
        FileCategory::Configuration
    } else {
        FileCategory::General
    }
}

pub fn classify_file(path: &str, content: &[u8]) -> FileClassification {
    let kind = extension_of(path)
        .and_then(|ext| kind_by_extension(&ext))
        .unwrap_or_else(|| sniff_kind(content));
    let category = category_for(path);

    let line_count = if matches!(kind, FileKind::Binary | FileKind::Unknown) {
        0
    } else {
        bytecount_lines(content)
    };

    let content_hash = format!("{:x}", md5::compute(content));

    let preview = if (content.len() as u64) >= PREVIEW_SKIP_BYTES {
        None
    } else {
        std::str::from_utf8(content).ok().map(|text| {
            let mut chars = text.chars();
            let truncated: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
            if chars.next().is_some() {
                format!("{truncated}…")
            } else {
                truncated
            }
        })
    };

    FileClassification {
        kind,
        category,
        line_count,
        content_hash,
        preview,
    }
}

fn bytecount_lines(content: &[u8]) -> usize {
    if content.is_empty() {
        return 0;
    }
    content.iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_source_and_category() {
        let c = classify_file("src/lib.rs", b"fn main() {}\n");
        assert_eq!(c.kind, FileKind::SourceCode);
        assert_eq!(c.category, FileCategory::General);
        assert_eq!(c.line_count, 1);
    }

    #[test]
    fn readme_is_documentation_category() {
        let c = classify_file("README.md", b"# hello\n");
        assert_eq!(c.category, FileCategory::Readme);
    }

    #[test]
    fn large_file_skips_preview() {
        let big = vec![b'a'; 2 * 1024 * 1024];
        let c = classify_file("big.txt", &big);
        assert!(c.preview.is_none());
    }

    #[test]
    fn preview_truncates_with_ellipsis() {
        let long_text = "x".repeat(600);
        let c = classify_file("notes.txt", long_text.as_bytes());
        let preview = c.preview.unwrap();
        assert!(preview.ends_with('…'));
        assert_eq!(preview.chars().count(), 501);
    }

    #[test]
    fn binary_sniffed_without_extension() {
        let c = classify_file("blob", &[0u8, 1, 2, 3]);
        assert_eq!(c.kind, FileKind::Binary);
    }
}
