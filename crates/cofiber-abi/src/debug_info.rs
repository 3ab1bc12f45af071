//! Debug location table.
//!
//! Maps a (label id, pc) pair back to a source location so breakpoint,
//! trace, and uncaught-exception messages can tell the host where in the
//! original program they happened. The table itself is produced by the
//! code-loading collaborator (out of scope, see spec §1) and handed to the
//! debugger as-is.

use std::fmt;

/// Single debug location entry, sorted by `pc` within its label.
#[derive(Clone, Copy, Debug)]
pub struct DebugLoc {
    pub pc: u32,
    pub file_id: u16,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u16,
    /// Length of the span, for highlighting.
    pub len: u16,
}

/// Per-label debug information.
#[derive(Clone, Debug, Default)]
pub struct LabelDebugInfo {
    pub entries: Vec<DebugLoc>,
}

impl LabelDebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pc: u32, file_id: u16, line: u32, col: u16, len: u16) {
        self.entries.push(DebugLoc { pc, file_id, line, col, len });
    }

    pub fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.pc);
    }
}

/// Source location resolved from a lookup, ready to embed in a message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
    pub col: u16,
    pub len: u16,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: u32, col: u16, len: u16) -> Self {
        Self { file: file.into(), line, col, len }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Whole-program debug information: file table plus one `LabelDebugInfo`
/// per compiled label function.
#[derive(Clone, Debug, Default)]
pub struct DebugInfo {
    pub files: Vec<String>,
    pub labels: Vec<LabelDebugInfo>,
    /// File id of the program's main/entry source file, if known. The
    /// debugger's trace mode (spec §4.7) only posts a message for
    /// positions in this file.
    pub main_file: Option<u16>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_add_file(&mut self, file: &str) -> u16 {
        if let Some(idx) = self.files.iter().position(|f| f == file) {
            idx as u16
        } else {
            let idx = self.files.len() as u16;
            self.files.push(file.to_string());
            idx
        }
    }

    fn ensure_label(&mut self, label_id: u32) {
        while self.labels.len() <= label_id as usize {
            self.labels.push(LabelDebugInfo::new());
        }
    }

    pub fn add_loc(&mut self, label_id: u32, pc: u32, file: &str, line: u32, col: u16, len: u16) {
        let file_id = self.get_or_add_file(file);
        self.ensure_label(label_id);
        self.labels[label_id as usize].add(pc, file_id, line, col, len);
    }

    /// Sort every label's entries by pc. Call once after loading, before
    /// any lookup.
    pub fn finalize(&mut self) {
        for label in &mut self.labels {
            label.sort();
        }
    }

    /// Resolve the source location of the instruction at or immediately
    /// before `pc` within `label_id`.
    pub fn lookup(&self, label_id: u32, pc: u32) -> Option<SourceLoc> {
        let label = self.labels.get(label_id as usize)?;
        if label.entries.is_empty() {
            return None;
        }
        let idx = label.entries.partition_point(|e| e.pc <= pc);
        if idx == 0 {
            return None;
        }
        let entry = &label.entries[idx - 1];
        let file = self.files.get(entry.file_id as usize)?;
        Some(SourceLoc::new(file.clone(), entry.line, entry.col, entry.len))
    }

    /// True if `label_id`'s source file is the program's main file —
    /// the predicate trace mode (spec §4.7) uses to decide whether a
    /// traced position is worth posting.
    pub fn is_main_file(&self, label_id: u32) -> bool {
        match (self.main_file, self.labels.get(label_id as usize)) {
            (Some(main), Some(label)) => label
                .entries
                .first()
                .map(|e| e.file_id == main)
                .unwrap_or(false),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_location_at_or_before_pc() {
        let mut info = DebugInfo::new();
        info.add_loc(0, 0, "main.ts", 1, 1, 4);
        info.add_loc(0, 10, "main.ts", 2, 1, 4);
        info.finalize();

        assert_eq!(info.lookup(0, 0).unwrap().line, 1);
        assert_eq!(info.lookup(0, 5).unwrap().line, 1);
        assert_eq!(info.lookup(0, 10).unwrap().line, 2);
        assert_eq!(info.lookup(0, 999).unwrap().line, 2);
        assert!(info.lookup(1, 0).is_none());
    }

    #[test]
    fn is_main_file_only_true_for_entry_source() {
        let mut info = DebugInfo::new();
        info.add_loc(0, 0, "main.ts", 1, 1, 1);
        info.add_loc(1, 0, "lib.ts", 1, 1, 1);
        info.main_file = Some(info.get_or_add_file("main.ts"));
        info.finalize();

        assert!(info.is_main_file(0));
        assert!(!info.is_main_file(1));
    }
}
