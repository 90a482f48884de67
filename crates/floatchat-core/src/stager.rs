// ABOUTME: Attachment staging area for files chosen but not yet sent
// ABOUTME: Validates size and MIME type against policy and deduplicates by (name, size)

use crate::types::{format_file_size, Attachment};
use std::fmt;

/// Why a candidate file was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// A file with the same name and size is already staged
    Duplicate,
    TooLarge { limit: u64 },
    TypeNotAllowed { mime_type: String },
    /// Attachment input is switched off for this conversation stage
    AttachmentsDisabled,
}

/// A refused candidate, reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectReason::Duplicate => write!(f, "{} is already attached", self.name),
            RejectReason::TooLarge { limit } => write!(
                f,
                "{} exceeds size limit ({})",
                self.name,
                format_file_size(*limit)
            ),
            RejectReason::TypeNotAllowed { .. } => {
                write!(f, "{} is not an allowed file type", self.name)
            }
            RejectReason::AttachmentsDisabled => {
                write!(f, "{} was not attached: attachments are disabled", self.name)
            }
        }
    }
}

/// Outcome of a `stage` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub accepted: usize,
    pub rejected: Vec<Rejection>,
}

impl StageReport {
    pub fn all_rejected(candidates: &[Attachment], reason: RejectReason) -> Self {
        Self {
            accepted: 0,
            rejected: candidates
                .iter()
                .map(|file| Rejection {
                    name: file.name.clone(),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }
}

/// Files waiting to go out with the next send
#[derive(Debug)]
pub struct AttachmentStager {
    staged: Vec<Attachment>,
    max_file_size: u64,
    allowed_types: Vec<String>,
}

impl AttachmentStager {
    pub fn new(max_file_size: u64, allowed_types: Vec<String>) -> Self {
        Self {
            staged: Vec::new(),
            max_file_size,
            allowed_types,
        }
    }

    /// Validate and append candidates in arrival order.
    pub fn stage(&mut self, candidates: Vec<Attachment>) -> StageReport {
        let mut report = StageReport::default();

        for file in candidates {
            if let Some(reason) = self.check(&file) {
                report.rejected.push(Rejection {
                    name: file.name.clone(),
                    reason,
                });
                continue;
            }
            self.staged.push(file);
            report.accepted += 1;
        }

        report
    }

    fn check(&self, file: &Attachment) -> Option<RejectReason> {
        if self.staged.iter().any(|f| f.same_file(file)) {
            return Some(RejectReason::Duplicate);
        }
        if file.size > self.max_file_size {
            return Some(RejectReason::TooLarge {
                limit: self.max_file_size,
            });
        }
        if !type_allowed(&file.mime_type, &self.allowed_types) {
            return Some(RejectReason::TypeNotAllowed {
                mime_type: file.mime_type.clone(),
            });
        }
        None
    }

    /// Remove one staged file, keeping the order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        if index < self.staged.len() {
            Some(self.staged.remove(index))
        } else {
            None
        }
    }

    /// Take everything staged, leaving the stager empty.
    pub fn drain(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.staged)
    }

    pub fn staged(&self) -> &[Attachment] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// `*/*` matches everything, `type/*` matches by prefix, anything else exactly.
pub fn type_allowed(mime_type: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|pattern| {
        if pattern == "*/*" {
            return true;
        }
        match pattern.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('/') => mime_type.starts_with(prefix),
            _ => mime_type == pattern,
        }
    })
}
