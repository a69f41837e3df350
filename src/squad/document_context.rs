//! Shared document context (C2): a per-run blackboard agents read from and
//! write to across the life of an Evolution Loop.
//!
//! Every agent that produces a result calls [`SharedDocumentContext::add`],
//! keyed by its own agent name. [`SharedDocumentContext::start_new_loop`]
//! archives the current loop's documents into history and clears the
//! current slate for the next iteration, so later loops see earlier loops
//! only through the summarized history, never through a live reference.
//!
//! The type is a cheap-to-clone handle (`Arc<RwLock<Inner>>`) so it can be
//! handed to every agent invocation in a parallel fan-out without each
//! holding its own copy of the state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SUMMARY_CHAR_LIMIT: usize = 500;
const SUMMARY_DICT_KEY_LIMIT: usize = 5;

/// One agent's contribution for a single loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentEntry {
    pub agent: String,
    pub doc_type: String,
    pub created_at: DateTime<Utc>,
    pub loop_number: u32,
    pub content: Value,
}

/// An archived loop: its number and the (summarized) documents produced
/// during it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoopRecord {
    pub loop_number: u32,
    pub documents: HashMap<String, DocumentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Inner {
    current_loop: u32,
    current_documents: HashMap<String, DocumentEntry>,
    history: Vec<LoopRecord>,
    total_documents: u64,
}

/// A cloneable handle to a shared document blackboard.
#[derive(Clone)]
pub struct SharedDocumentContext {
    inner: Arc<RwLock<Inner>>,
}

impl Default for SharedDocumentContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedDocumentContext {
    pub fn new() -> Self {
        SharedDocumentContext {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Add or overwrite this agent's document for the current loop.
    pub fn add(&self, agent_name: &str, doc_type: &str, content: Value) {
        let mut inner = self.inner.write().expect("document context lock poisoned");
        let loop_number = inner.current_loop;
        inner.current_documents.insert(
            agent_name.to_string(),
            DocumentEntry {
                agent: agent_name.to_string(),
                doc_type: doc_type.to_string(),
                created_at: Utc::now(),
                loop_number,
                content,
            },
        );
        inner.total_documents += 1;
    }

    /// Total documents ever written via [`Self::add`] (across all loops,
    /// including ones since archived).
    pub fn total_documents(&self) -> u64 {
        self.inner.read().expect("document context lock poisoned").total_documents
    }

    /// This agent's document for the current loop, if it produced one.
    pub fn get(&self, agent_name: &str) -> Option<DocumentEntry> {
        let inner = self.inner.read().expect("document context lock poisoned");
        inner.current_documents.get(agent_name).cloned()
    }

    /// All documents produced so far in the current loop.
    pub fn all(&self) -> HashMap<String, DocumentEntry> {
        let inner = self.inner.read().expect("document context lock poisoned");
        inner.current_documents.clone()
    }

    /// Documents in the current loop whose `doc_type` matches.
    pub fn by_type(&self, doc_type: &str) -> HashMap<String, DocumentEntry> {
        let inner = self.inner.read().expect("document context lock poisoned");
        inner
            .current_documents
            .iter()
            .filter(|(_, d)| d.doc_type == doc_type)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Archive the current loop's documents into history and advance to
    /// the next loop number with an empty current slate. A loop that
    /// produced no documents is not archived at all.
    pub fn start_new_loop(&self) -> u32 {
        let mut inner = self.inner.write().expect("document context lock poisoned");
        if !inner.current_documents.is_empty() {
            let archived = LoopRecord {
                loop_number: inner.current_loop,
                documents: inner.current_documents.clone(),
            };
            inner.history.push(archived);
        }
        inner.current_loop += 1;
        inner.current_documents.clear();
        inner.current_loop
    }

    pub fn current_loop(&self) -> u32 {
        self.inner.read().expect("document context lock poisoned").current_loop
    }

    /// Render the context as the JSON shape injected into a model prompt:
    /// current-loop documents in full and, if `include_history` is set,
    /// the last `max_history_loops` historical loops, summarized. With
    /// `include_history = false` the rendered value has no
    /// `previous_loops` key at all, matching the non-AI-facing summary
    /// shape.
    pub fn context_for_model(&self, include_history: bool, max_history_loops: usize) -> Value {
        let inner = self.inner.read().expect("document context lock poisoned");

        let current_documents: serde_json::Map<String, Value> = inner
            .current_documents
            .iter()
            .map(|(agent, doc)| {
                (
                    agent.clone(),
                    serde_json::json!({
                        "type": doc.doc_type,
                        "created_at": doc.created_at,
                        "content": doc.content,
                    }),
                )
            })
            .collect();

        let mut context = serde_json::json!({
            "current_loop": inner.current_loop,
            "current_documents": current_documents,
        });

        if include_history && !inner.history.is_empty() {
            let start = inner.history.len().saturating_sub(max_history_loops);
            let previous_loops: Vec<Value> = inner.history[start..]
                .iter()
                .map(|rec| {
                    let docs: serde_json::Map<String, Value> = rec
                        .documents
                        .iter()
                        .map(|(agent, doc)| {
                            (
                                agent.clone(),
                                serde_json::json!({
                                    "type": doc.doc_type,
                                    "content_summary": summarize_content(&doc.content),
                                }),
                            )
                        })
                        .collect();
                    serde_json::json!({
                        "loop_number": rec.loop_number,
                        "documents": docs,
                    })
                })
                .collect();
            context["previous_loops"] = Value::Array(previous_loops);
        }

        context
    }

    /// A read-only rollup across every document produced so far (current
    /// loop plus archived history): counts of documents per type.
    pub fn analysis_summary(&self) -> Value {
        let inner = self.inner.read().expect("document context lock poisoned");
        let mut counts: HashMap<String, u32> = HashMap::new();
        for doc in inner.current_documents.values() {
            *counts.entry(doc.doc_type.clone()).or_insert(0) += 1;
        }
        for rec in &inner.history {
            for doc in rec.documents.values() {
                *counts.entry(doc.doc_type.clone()).or_insert(0) += 1;
            }
        }
        serde_json::json!({
            "total_loops_completed": inner.history.len(),
            "current_loop": inner.current_loop,
            "document_type_counts": counts,
        })
    }

    /// Discard all documents and history, resetting to loop zero.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("document context lock poisoned");
        *inner = Inner::default();
    }

    /// Export the full state (current documents plus history) for
    /// persistence.
    pub fn export_all(&self) -> Value {
        let inner = self.inner.read().expect("document context lock poisoned");
        serde_json::to_value(&*inner).expect("Inner is always serializable")
    }

    /// Replace the full state from a value previously produced by
    /// [`Self::export_all`].
    pub fn import_data(&self, data: Value) -> Result<(), serde_json::Error> {
        let restored: Inner = serde_json::from_value(data)?;
        let mut inner = self.inner.write().expect("document context lock poisoned");
        *inner = restored;
        Ok(())
    }
}

fn summarize_content(content: &Value) -> Value {
    match content {
        Value::String(s) if s.chars().count() > SUMMARY_CHAR_LIMIT => {
            let truncated: String = s.chars().take(SUMMARY_CHAR_LIMIT).collect();
            Value::String(format!("{truncated}..."))
        }
        Value::Object(map) if map.len() > SUMMARY_DICT_KEY_LIMIT => {
            let truncated: serde_json::Map<String, Value> = map
                .iter()
                .take(SUMMARY_DICT_KEY_LIMIT)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            serde_json::json!({
                "truncated": truncated,
                "omitted_keys": map.len() - SUMMARY_DICT_KEY_LIMIT,
            })
        }
        other => other.clone(),
    }
}
