//! Person folder discovery
//!
//! The source root holds one subfolder per person; each subfolder holds that
//! person's PDFs directly (no recursion). Reserved working folders are
//! skipped, and `generation.json` can rename and reorder persons.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};

use crate::config::{reserved_folder_names, GenerationConfig};
use crate::error::{Error, Result};
use crate::naming::display_name_from_filename;

/// One input PDF belonging to a person
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    /// Path of the source PDF
    pub source_path: PathBuf,
    /// Original file name, used for ordering
    pub file_name: String,
    /// Label shown in the TOC and bookmarks
    pub display_name: String,
}

impl DocumentEntry {
    /// Build an entry from a PDF path, deriving its label from the file name
    pub fn from_path(source_path: PathBuf) -> Self {
        let file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let display_name = display_name_from_filename(&file_name);

        Self {
            source_path,
            file_name,
            display_name,
        }
    }
}

/// A person folder and its documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    /// Folder name; identity of the person
    pub folder_name: String,
    /// Display name (folder name unless configured)
    pub alias: String,
    /// Explicit position from the configuration
    pub order: Option<i64>,
    /// Documents sorted by file name
    pub documents: Vec<DocumentEntry>,
}

impl Person {
    /// Create a person with the configuration applied
    pub fn new(folder_name: &str, documents: Vec<DocumentEntry>, config: Option<&GenerationConfig>) -> Self {
        let settings = config.and_then(|c| c.settings_for(folder_name));

        let alias = settings
            .and_then(|s| s.alias.as_deref())
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(folder_name)
            .to_string();

        let mut documents = documents;
        documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        Self {
            folder_name: folder_name.to_string(),
            alias,
            order: settings.and_then(|s| s.order),
            documents,
        }
    }
}

/// Ordering between persons
///
/// Explicitly ordered persons come first by number; the rest follow in
/// folder-name order. Equal numbers fall back to the folder name.
pub fn compare_persons(a: &Person, b: &Person) -> Ordering {
    match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.folder_name.cmp(&b.folder_name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.folder_name.cmp(&b.folder_name),
    }
}

/// Sort persons in dossier order
pub fn sort_persons(persons: &mut [Person]) {
    persons.sort_by(compare_persons);
}

/// Discover persons under the source root
///
/// Folders without any PDF are dropped with a warning. The result is sorted
/// in dossier order.
pub fn discover(root: &Path, config: Option<&GenerationConfig>) -> Result<Vec<Person>> {
    let entries = std::fs::read_dir(root).map_err(|source| Error::SourceUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let reserved = reserved_folder_names();
    let mut persons = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|source| Error::SourceUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let folder_name = entry.file_name().to_string_lossy().into_owned();
        if reserved.contains(&folder_name.as_str()) {
            log::debug!("Skipping reserved folder: {}", folder_name);
            continue;
        }
        if folder_name.starts_with('.') {
            log::debug!("Skipping hidden folder: {}", folder_name);
            continue;
        }

        log::info!("Processing folder: {}", folder_name);
        let pdfs = find_pdf_files(&path)?;
        if pdfs.is_empty() {
            log::warn!("No PDF files found in {}, skipping", folder_name);
            continue;
        }

        let documents = pdfs.into_iter().map(DocumentEntry::from_path).collect();
        persons.push(Person::new(&folder_name, documents, config));
    }

    if let Some(config) = config {
        for name in config.persons.keys() {
            if !persons.iter().any(|p| &p.folder_name == name) {
                log::debug!("Configuration entry '{}' matches no folder with PDFs", name);
            }
        }
    }

    sort_persons(&mut persons);
    Ok(persons)
}

/// List the PDF files directly inside a folder (extension match ignores case)
pub fn find_pdf_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.pdf", Pattern::escape(&folder.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let paths = glob_with(&pattern, options).map_err(|e| Error::General(format!("Invalid glob pattern: {}", e)))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Cannot read {}: {}", e.path().display(), e.error()),
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonSettings;
    use std::fs;
    use tempfile::TempDir;

    fn person(name: &str, order: Option<i64>) -> Person {
        Person {
            folder_name: name.to_string(),
            alias: name.to_string(),
            order,
            documents: vec![],
        }
    }

    fn touch(path: &Path) {
        fs::write(path, b"%PDF-1.4\n").unwrap();
    }

    #[test]
    fn test_explicit_order_before_alphabetical() {
        let mut persons = vec![person("B", Some(2)), person("A", Some(1)), person("C", None)];
        sort_persons(&mut persons);
        let names: Vec<_> = persons.iter().map(|p| p.folder_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unordered_persons_follow_ordered_ones() {
        let mut persons = vec![
            person("aaron", None),
            person("zoe", Some(10)),
            person("bea", None),
            person("yann", Some(-1)),
        ];
        sort_persons(&mut persons);
        let names: Vec<_> = persons.iter().map(|p| p.folder_name.as_str()).collect();
        assert_eq!(names, vec!["yann", "zoe", "aaron", "bea"]);
    }

    #[test]
    fn test_equal_order_ties_break_by_folder_name() {
        let mut persons = vec![person("m", Some(1)), person("b", Some(1)), person("a", Some(2))];
        sort_persons(&mut persons);
        let names: Vec<_> = persons.iter().map(|p| p.folder_name.as_str()).collect();
        assert_eq!(names, vec!["b", "m", "a"]);
    }

    #[test]
    fn test_person_alias_from_config() {
        let mut config = GenerationConfig::default();
        config.persons.insert(
            "marie".to_string(),
            PersonSettings { alias: Some("Marie Dupont".to_string()), order: Some(3) },
        );
        config.persons.insert(
            "blank".to_string(),
            PersonSettings { alias: Some("   ".to_string()), order: None },
        );

        let marie = Person::new("marie", vec![], Some(&config));
        assert_eq!(marie.alias, "Marie Dupont");
        assert_eq!(marie.order, Some(3));

        let blank = Person::new("blank", vec![], Some(&config));
        assert_eq!(blank.alias, "blank");

        let other = Person::new("other", vec![], Some(&config));
        assert_eq!(other.alias, "other");
        assert_eq!(other.order, None);
    }

    #[test]
    fn test_documents_sorted_by_file_name() {
        let docs = vec![
            DocumentEntry::from_path(PathBuf::from("p/Payslip-03.pdf")),
            DocumentEntry::from_path(PathBuf::from("p/CNI.pdf")),
            DocumentEntry::from_path(PathBuf::from("p/Contract_Work-2024.pdf")),
        ];
        let person = Person::new("p", docs, None);
        let labels: Vec<_> = person.documents.iter().map(|d| d.display_name.as_str()).collect();
        assert_eq!(labels, vec!["CNI", "Contract Work", "Payslip"]);
    }

    #[test]
    fn test_discover_skips_reserved_and_empty_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        for folder in ["alice", "bob", "protected_files", "temp_watermarked", "Dossier Location", "empty"] {
            fs::create_dir(root.join(folder)).unwrap();
        }
        touch(&root.join("alice/CNI.pdf"));
        touch(&root.join("bob/Bail-2024.PDF"));
        touch(&root.join("bob/notes.txt"));
        touch(&root.join("protected_files/CNI_f.pdf"));
        touch(&root.join("temp_watermarked/x.pdf"));
        touch(&root.join("Dossier Location/old.pdf"));
        touch(&root.join("loose.pdf"));

        let persons = discover(root, None).unwrap();
        let names: Vec<_> = persons.iter().map(|p| p.folder_name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(persons[1].documents.len(), 1);
        assert_eq!(persons[1].documents[0].display_name, "Bail");
    }

    #[test]
    fn test_discover_does_not_recurse() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("carol/archive")).unwrap();
        touch(&root.join("carol/archive/old.pdf"));

        let persons = discover(root, None).unwrap();
        assert!(persons.is_empty());
    }

    #[test]
    fn test_find_pdf_files_with_glob_characters_in_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path().join("dupont [garant]");
        fs::create_dir(&folder).unwrap();
        touch(&folder.join("RIB.pdf"));

        let files = find_pdf_files(&folder).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_discover_missing_root() {
        let result = discover(Path::new("does/not/exist"), None);
        assert!(matches!(result, Err(Error::SourceUnreadable { .. })));
    }
}
