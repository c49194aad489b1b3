//! Penn-Treebank bracket parsing
//!
//! Reads bracketed constituency parses into [`Tree`]s. Several sentences may
//! follow each other in one input; the reader yields one tree per balanced
//! top-level bracket group.

use crate::tree::{NodeId, Tree};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

/// Unbalanced or otherwise unreadable bracket input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedTreeError {
    #[error("Malformed tree: unmatched ')' at byte {offset}")]
    UnmatchedClose { offset: usize },

    #[error("Malformed tree: {depth} unclosed '(' at end of input")]
    Unclosed { depth: usize },

    #[error("Malformed tree: token {token:?} outside of any bracket at byte {offset}")]
    StrayToken { token: String, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    /// A label or leaf token ending at the given byte offset
    Label(usize),
}

/// Streaming reader over a forest of bracketed trees
pub struct BracketReader {
    text: String,
    pos: usize,
    failed: bool,
}

impl BracketReader {
    /// Create a reader over in-memory text
    pub fn from_str(text: &str) -> Self {
        Self::from_string(text.to_string())
    }

    pub fn from_string(text: String) -> Self {
        Self {
            text,
            pos: 0,
            failed: false,
        }
    }

    /// Read a parse file; `*.gz` files are decompressed transparently
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut text = String::new();
        if path.extension().is_some_and(|ext| ext == "gz") {
            MultiGzDecoder::new(file).read_to_string(&mut text)?;
        } else {
            io::BufReader::new(file).read_to_string(&mut text)?;
        }
        Ok(Self::from_string(text))
    }

    /// Tokens are separated by Unicode whitespace, so `NP\u{3000}` reads as `NP`
    fn next_token(&mut self) -> Option<(usize, Token)> {
        let rest = &self.text[self.pos..];
        self.pos += rest
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map_or(rest.len(), |(i, _)| i);

        let start = self.pos;
        let token = match self.text.as_bytes().get(start)? {
            b'(' => Token::Open,
            b')' => Token::Close,
            _ => {
                let rest = &self.text[start..];
                let bound = memchr::memchr2(b'(', b')', rest.as_bytes()).unwrap_or(rest.len());
                let len = rest[..bound]
                    .char_indices()
                    .find(|(_, c)| c.is_whitespace())
                    .map_or(bound, |(i, _)| i);
                Token::Label(start + len)
            }
        };
        self.pos = match token {
            Token::Label(end) => end,
            _ => start + 1,
        };
        Some((start, token))
    }
}

/// Leaf tokens the parser escapes
fn normalize_leaf(token: &str) -> &str {
    match token {
        "-LRB-" => "(",
        "-RRB-" => ")",
        _ => token,
    }
}

impl Iterator for BracketReader {
    type Item = Result<Tree, MalformedTreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut tree = Tree::default();
        // open nodes; a node's label slot is free while it has no label and no children
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let Some((offset, token)) = self.next_token() else {
                if stack.is_empty() {
                    return None;
                }
                self.failed = true;
                return Some(Err(MalformedTreeError::Unclosed { depth: stack.len() }));
            };

            match token {
                Token::Open => {
                    let id = match stack.last() {
                        Some(&parent) => tree.add_child(parent, None),
                        None => tree.root(),
                    };
                    stack.push(id);
                }
                Token::Close => {
                    if stack.pop().is_none() {
                        self.failed = true;
                        return Some(Err(MalformedTreeError::UnmatchedClose { offset }));
                    }
                    if stack.is_empty() {
                        return Some(Ok(std::mem::take(&mut tree).strip_empty_root()));
                    }
                }
                Token::Label(end) => {
                    let label = &self.text[offset..end];
                    let Some(&current) = stack.last() else {
                        let token = label.to_string();
                        self.failed = true;
                        return Some(Err(MalformedTreeError::StrayToken { token, offset }));
                    };
                    if tree.label(current).is_none() && tree.is_leaf(current) {
                        tree.set_label(current, Some(label));
                    } else {
                        tree.add_child(current, Some(normalize_leaf(label)));
                    }
                }
            }
        }
    }
}

/// Parse a whole forest, failing on the first malformed tree
pub fn parse_trees(text: &str) -> Result<Vec<Tree>, MalformedTreeError> {
    BracketReader::from_str(text).collect()
}
