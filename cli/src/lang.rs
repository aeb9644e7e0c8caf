//! File extension → LSP language identifier lookup.

use std::path::Path;

/// The language id a server should treat this file as, judged purely by
/// extension. `None` means the file type is not recognized; directory
/// walks skip such files, while explicitly named files fall back to
/// `plaintext` at the call site.
#[must_use]
pub fn language_id_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let language_id = match extension.as_str() {
        "bib" => "bibtex",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hh" | "hpp" => "cpp",
        "css" => "css",
        "f90" => "fortran-modern",
        "go" => "go",
        "htm" | "html" | "xhtml" => "html",
        "java" => "java",
        "js" => "javascript",
        "json" => "json",
        "kt" | "kts" => "kotlin",
        "lua" => "lua",
        "markdown" | "md" => "markdown",
        "org" => "org",
        "py" => "python",
        "rb" => "ruby",
        "rs" => "rust",
        "rst" => "restructuredtext",
        "bash" | "sh" => "shellscript",
        "cls" | "sty" | "tex" => "latex",
        "toml" => "toml",
        "ts" => "typescript",
        "txt" => "plaintext",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        _ => return None,
    };
    Some(language_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_extensions() {
        assert_eq!(language_id_for_path(Path::new("notes.md")), Some("markdown"));
        assert_eq!(language_id_for_path(Path::new("paper.tex")), Some("latex"));
        assert_eq!(language_id_for_path(Path::new("refs.bib")), Some("bibtex"));
        assert_eq!(language_id_for_path(Path::new("a/b/readme.txt")), Some("plaintext"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert_eq!(language_id_for_path(Path::new("NOTES.MD")), Some("markdown"));
    }

    #[test]
    fn unrecognized_or_missing_extension_is_none() {
        assert_eq!(language_id_for_path(Path::new("binary.xyz")), None);
        assert_eq!(language_id_for_path(Path::new("Makefile")), None);
    }
}
