//! Run directory layout and output shaping.
//!
//! A run writes into one root directory:
//! ```text
//! <root>/
//! ├── pdfs/                  payload copies, one per downloaded document
//! ├── txt_files/             separate mode only, one .txt per extracted document
//! └── merged_documents.txt   merged mode only, when anything was extracted
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use courtdocs_shared::{CourtDocsError, ExtractedText, OutputMode, Result, RetrievedPayload};

/// Subdirectory holding payload copies.
pub const PDF_DIR: &str = "pdfs";

/// Subdirectory holding separate-mode text files.
pub const TXT_DIR: &str = "txt_files";

/// File name of the merged-mode artifact.
pub const MERGED_FILE: &str = "merged_documents.txt";

// ---------------------------------------------------------------------------
// RunLayout
// ---------------------------------------------------------------------------

/// Directories of one run, created up front.
#[derive(Debug, Clone)]
pub struct RunLayout {
    pub root: PathBuf,
    pub pdf_dir: PathBuf,
    pub txt_dir: PathBuf,
}

impl RunLayout {
    /// Create `<root>/pdfs` and, in separate mode, `<root>/txt_files`.
    pub fn create(root: &Path, mode: OutputMode) -> Result<Self> {
        let layout = Self {
            root: root.to_path_buf(),
            pdf_dir: root.join(PDF_DIR),
            txt_dir: root.join(TXT_DIR),
        };

        create_dir(&layout.pdf_dir)?;
        if mode == OutputMode::Separate {
            create_dir(&layout.txt_dir)?;
        }

        Ok(layout)
    }

    /// Persist a payload copy under its suggested file name.
    pub fn save_payload(&self, payload: &RetrievedPayload) -> Result<PathBuf> {
        let path = self.pdf_dir.join(&payload.reference.suggested_filename);
        write_atomic(&path, &payload.bytes)?;
        debug!(path = %path.display(), "payload saved");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// OutputAssembler
// ---------------------------------------------------------------------------

/// Wrap one document's text in its merged-mode delimiters.
pub fn document_block(text: &ExtractedText) -> String {
    format!(
        "<document id={}>\n{}\n</document>",
        text.document_ordinal, text.text
    )
}

/// Artifacts left behind once assembly finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledOutput {
    /// Separate-mode text files in acceptance order.
    pub produced_artifacts: Vec<PathBuf>,
    /// Merged-mode file, when at least one document was accepted.
    pub merged_artifact: Option<PathBuf>,
    /// Number of documents accepted.
    pub accepted: usize,
}

/// Shapes extracted text into artifacts. The variant is the run's output mode.
#[derive(Debug)]
pub enum OutputAssembler {
    /// Write each document immediately as `<txt_dir>/<stem>.txt`.
    Separate {
        txt_dir: PathBuf,
        artifacts: Vec<PathBuf>,
    },
    /// Accumulate delimited blocks in one buffer, written once at the end.
    Merged {
        path: PathBuf,
        buffer: String,
        accepted: usize,
    },
}

impl OutputAssembler {
    /// Assembler for `mode` writing into `layout`.
    pub fn new(layout: &RunLayout, mode: OutputMode) -> Self {
        match mode {
            OutputMode::Separate => Self::Separate {
                txt_dir: layout.txt_dir.clone(),
                artifacts: Vec::new(),
            },
            OutputMode::Merged => Self::Merged {
                path: layout.root.join(MERGED_FILE),
                buffer: String::new(),
                accepted: 0,
            },
        }
    }

    pub fn mode(&self) -> OutputMode {
        match self {
            Self::Separate { .. } => OutputMode::Separate,
            Self::Merged { .. } => OutputMode::Merged,
        }
    }

    /// Take one extracted document. `stem` names the separate-mode file.
    ///
    /// Returns the written path in separate mode, `None` in merged mode.
    pub fn accept(&mut self, stem: &str, text: &ExtractedText) -> Result<Option<PathBuf>> {
        match self {
            Self::Separate { txt_dir, artifacts } => {
                let path = txt_dir.join(format!("{stem}.txt"));
                write_atomic(&path, text.text.as_bytes())?;
                debug!(path = %path.display(), "text file written");
                artifacts.push(path.clone());
                Ok(Some(path))
            }
            Self::Merged {
                buffer, accepted, ..
            } => {
                if !buffer.is_empty() {
                    buffer.push_str("\n\n");
                }
                buffer.push_str(&document_block(text));
                *accepted += 1;
                debug!(ordinal = text.document_ordinal, "added to merged content");
                Ok(None)
            }
        }
    }

    /// Finish the run. Merged mode writes its file only when something was accepted.
    #[instrument(skip_all, fields(mode = %self.mode()))]
    pub fn finish(self) -> Result<AssembledOutput> {
        match self {
            Self::Separate { artifacts, .. } => Ok(AssembledOutput {
                accepted: artifacts.len(),
                produced_artifacts: artifacts,
                merged_artifact: None,
            }),
            Self::Merged {
                path,
                buffer,
                accepted,
            } => {
                if accepted == 0 {
                    info!("nothing extracted, no merged file written");
                    return Ok(AssembledOutput::default());
                }

                write_atomic(&path, buffer.as_bytes())?;
                info!(path = %path.display(), documents = accepted, "merged file saved");

                Ok(AssembledOutput {
                    produced_artifacts: Vec::new(),
                    merged_artifact: Some(path),
                    accepted,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| CourtDocsError::io(path, e))
}

/// Write to a temp sibling, then rename over the target.
fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| CourtDocsError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| CourtDocsError::io(target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_root;
    use courtdocs_shared::DocumentReference;
    use url::Url;

    fn text(ordinal: usize, body: &str) -> ExtractedText {
        ExtractedText {
            document_ordinal: ordinal,
            text: body.into(),
        }
    }

    #[test]
    fn merged_output_matches_delimited_format() {
        let root = temp_root("merged");
        let layout = RunLayout::create(&root, OutputMode::Merged).unwrap();
        let mut assembler = OutputAssembler::new(&layout, OutputMode::Merged);

        assert_eq!(assembler.accept("document_1", &text(1, "Alpha")).unwrap(), None);
        assert_eq!(assembler.accept("document_2", &text(2, "Beta")).unwrap(), None);
        let output = assembler.finish().unwrap();

        let merged = output.merged_artifact.expect("merged file");
        assert_eq!(merged, root.join(MERGED_FILE));
        assert_eq!(
            std::fs::read_to_string(&merged).unwrap(),
            "<document id=1>\nAlpha\n</document>\n\n<document id=2>\nBeta\n</document>"
        );
        assert_eq!(output.accepted, 2);
        assert!(!root.join(TXT_DIR).exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn merged_output_keeps_ordinal_gaps() {
        let root = temp_root("gaps");
        let layout = RunLayout::create(&root, OutputMode::Merged).unwrap();
        let mut assembler = OutputAssembler::new(&layout, OutputMode::Merged);

        assembler.accept("a", &text(1, "One")).unwrap();
        assembler.accept("c", &text(3, "Three")).unwrap();
        let output = assembler.finish().unwrap();

        let content = std::fs::read_to_string(output.merged_artifact.unwrap()).unwrap();
        assert!(content.contains("<document id=1>"));
        assert!(content.contains("<document id=3>"));
        assert!(!content.contains("<document id=2>"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn empty_merged_run_writes_nothing() {
        let root = temp_root("merged-empty");
        let layout = RunLayout::create(&root, OutputMode::Merged).unwrap();
        let output = OutputAssembler::new(&layout, OutputMode::Merged).finish().unwrap();

        assert_eq!(output, AssembledOutput::default());
        assert!(!root.join(MERGED_FILE).exists());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn separate_mode_writes_one_file_per_document() {
        let root = temp_root("separate");
        let layout = RunLayout::create(&root, OutputMode::Separate).unwrap();
        let mut assembler = OutputAssembler::new(&layout, OutputMode::Separate);
        assert_eq!(assembler.mode(), OutputMode::Separate);

        let first = assembler
            .accept("document_1_12KB", &text(1, "First filing"))
            .unwrap()
            .unwrap();
        assembler.accept("document_2", &text(2, "Second")).unwrap();
        let output = assembler.finish().unwrap();

        assert_eq!(first, root.join(TXT_DIR).join("document_1_12KB.txt"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "First filing");
        assert_eq!(output.produced_artifacts.len(), 2);
        assert_eq!(output.merged_artifact, None);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn empty_separate_run_is_not_an_error() {
        let root = temp_root("separate-empty");
        let layout = RunLayout::create(&root, OutputMode::Separate).unwrap();
        let output = OutputAssembler::new(&layout, OutputMode::Separate).finish().unwrap();

        assert!(output.produced_artifacts.is_empty());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn save_payload_uses_suggested_filename() {
        let root = temp_root("payload");
        let layout = RunLayout::create(&root, OutputMode::Separate).unwrap();
        let payload = RetrievedPayload {
            reference: DocumentReference {
                ordinal: 1,
                source_url: Url::parse(
                    "https://search.txcourts.gov/SearchMedia.aspx?MediaVersionID=a",
                )
                .unwrap(),
                display_text: "Brief PDF/3 KB".into(),
                declared_size_kb: "3".into(),
                suggested_filename: "document_1_3KB.pdf".into(),
            },
            bytes: b"%PDF-1.4".to_vec(),
            content_type: "application/pdf".into(),
            sha256: String::new(),
        };

        let path = layout.save_payload(&payload).unwrap();
        assert_eq!(path, root.join(PDF_DIR).join("document_1_3KB.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        assert!(!root.join(PDF_DIR).join(".document_1_3KB.pdf.tmp").exists());

        let _ = std::fs::remove_dir_all(&root);
    }
}
