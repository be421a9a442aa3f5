//! Multi-user signing sessions
//!
//! A session walks the users of a [`SignatureCaptureContext`] in order. Each
//! user accepts a signature (which renders page sets for all of their
//! documents), reviews pages, and completes; completion aggregates their
//! documents. A later user signs the documents an earlier user produced, so
//! signatures accumulate across users. After the last user the final
//! documents are encoded.

use crate::aggregate::aggregate_all;
use crate::encode::{EncodedResult, encode_result};
use crate::generate::generate_page_set;
use crate::rules::DocumentProfile;
use crate::types::*;
use lopdf::Document;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;

/// A source document offered for signing
#[derive(Debug, Clone)]
pub struct CaptureDocument {
    pub key: String,
    pub description: String,
    pub document: Arc<Document>,
}

impl CaptureDocument {
    pub fn new(key: impl Into<String>, description: impl Into<String>, document: Arc<Document>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
            document,
        }
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }
}

/// Someone who signs, and how they sign each of their documents
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserProfile {
    pub description: String,
    pub documents: Vec<DocumentProfile>,
}

/// Everything a session needs: the documents and who signs them
#[derive(Debug, Clone)]
pub struct SignatureCaptureContext {
    documents: Vec<CaptureDocument>,
    users: Vec<UserProfile>,
}

impl SignatureCaptureContext {
    pub fn new(documents: Vec<CaptureDocument>, users: Vec<UserProfile>) -> Result<Self> {
        let context = Self { documents, users };
        context.validate()?;
        Ok(context)
    }

    pub fn documents(&self) -> &[CaptureDocument] {
        &self.documents
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn document(&self, key: &str) -> Option<&CaptureDocument> {
        self.documents.iter().find(|doc| doc.key == key)
    }

    fn validate(&self) -> Result<()> {
        let mut keys = HashSet::new();
        for doc in &self.documents {
            if !keys.insert(doc.key.as_str()) {
                return Err(SignError::Config(format!(
                    "Duplicate document key '{}'",
                    doc.key
                )));
            }
        }

        for user in &self.users {
            for profile in &user.documents {
                profile.validate()?;
                if !keys.contains(profile.document_key.as_str()) {
                    return Err(SignError::Config(format!(
                        "User '{}' references unknown document '{}'",
                        user.description, profile.document_key
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A final document ready to hand back to the caller
#[derive(Debug, Clone)]
pub struct SignedDocument {
    pub document_key: String,
    pub result: EncodedResult,
}

/// Outcome of completing a user
#[derive(Debug, Clone)]
pub enum SessionStep {
    /// Another user is now signing
    NextUser { user_index: usize },
    /// Every user is done; results follow the context's document order
    Finished(Vec<SignedDocument>),
}

#[derive(Debug)]
pub struct SigningSession {
    context: Arc<SignatureCaptureContext>,
    user_index: usize,
    page_sets: Vec<PageSet>,
    finals: HashMap<String, FinalDocument>,
}

impl SigningSession {
    pub fn new(context: Arc<SignatureCaptureContext>) -> Result<Self> {
        if context.users().is_empty() {
            return Err(SignError::Config("No users to collect signatures from".to_string()));
        }
        Ok(Self {
            context,
            user_index: 0,
            page_sets: Vec::new(),
            finals: HashMap::new(),
        })
    }

    pub fn context(&self) -> &SignatureCaptureContext {
        &self.context
    }

    pub fn user_index(&self) -> usize {
        self.user_index
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.context.users().get(self.user_index)
    }

    pub fn is_finished(&self) -> bool {
        self.user_index >= self.context.users().len()
    }

    /// Page sets of the current user, in their profile order
    pub fn page_sets(&self) -> &[PageSet] {
        &self.page_sets
    }

    /// Render page sets for all of the current user's documents with a new
    /// signature, replacing any previous ones.
    pub async fn accept_signature(&mut self, signature: &[u8]) -> Result<()> {
        let profiles = self.current_profiles()?.to_vec();
        // A new signature invalidates the previous pass even if rendering fails
        self.page_sets.clear();

        let signature: Arc<[u8]> = signature.into();
        let mut tasks = JoinSet::new();
        for (idx, profile) in profiles.iter().enumerate() {
            let source = self.source_for(&profile.document_key)?;
            let profile = profile.clone();
            let signature = Arc::clone(&signature);
            tasks.spawn(async move { (idx, generate_page_set(&profile, source, &signature).await) });
        }

        let mut slots: Vec<Option<PageSet>> = (0..profiles.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (idx, result) = joined?;
            slots[idx] = Some(result?);
        }

        self.page_sets = slots.into_iter().flatten().collect();
        log::info!(
            "Signature accepted for user {} ({} document(s))",
            self.user_index,
            self.page_sets.len()
        );
        Ok(())
    }

    /// Acknowledge a page of one of the current user's documents
    pub fn mark_page_signed(&mut self, document_index: usize, page_index: usize) -> Result<()> {
        let set = self.page_sets.get_mut(document_index).ok_or_else(|| {
            SignError::Session(format!("no page set for document {}", document_index))
        })?;
        set.mark_signed(page_index)
    }

    /// True once every page needing a signature has been acknowledged
    pub fn is_user_complete(&self) -> bool {
        !self.page_sets.is_empty()
            && self
                .page_sets
                .iter()
                .all(|set| set.is_empty() || set.is_complete())
    }

    /// Aggregate the current user's documents and move on to the next user.
    ///
    /// Acknowledgment is not required; see [`crate::aggregate`].
    pub async fn complete_user(&mut self) -> Result<SessionStep> {
        let profiles = self.current_profiles()?;
        if self.page_sets.len() != profiles.len() {
            return Err(SignError::Session(format!(
                "user {} has not accepted a signature",
                self.user_index
            )));
        }

        let finals = aggregate_all(&self.page_sets).await?;
        for (set, document) in self.page_sets.iter().zip(finals) {
            self.finals.insert(set.document_key().to_string(), document);
        }

        self.page_sets.clear();
        self.user_index += 1;

        if !self.is_finished() {
            return Ok(SessionStep::NextUser {
                user_index: self.user_index,
            });
        }

        let mut results = Vec::new();
        for doc in self.context.documents() {
            if let Some(document) = self.finals.get(&doc.key) {
                results.push(SignedDocument {
                    document_key: doc.key.clone(),
                    result: encode_result(document)?,
                });
            }
        }
        log::info!("Signing session finished with {} document(s)", results.len());
        Ok(SessionStep::Finished(results))
    }

    fn current_profiles(&self) -> Result<&[DocumentProfile]> {
        self.current_user()
            .map(|user| user.documents.as_slice())
            .ok_or_else(|| SignError::Session("all users have completed".to_string()))
    }

    /// The document a user signs: an earlier user's output if there is one
    fn source_for(&self, key: &str) -> Result<Arc<Document>> {
        if let Some(previous) = self.finals.get(key) {
            return Ok(Arc::new(previous.document().clone()));
        }
        self.context
            .document(key)
            .map(|doc| Arc::clone(&doc.document))
            .ok_or_else(|| SignError::Config(format!("Unknown document '{}'", key)))
    }
}
