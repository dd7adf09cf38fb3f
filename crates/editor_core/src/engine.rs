use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use chrono::{DateTime, Utc};
use shared::{
    domain::{Paper, PaperId, PaperStatus, Question, QuestionOption, Section},
    error::ApiError,
    protocol::{ImportResult, PaperListQuery, PaperPage, PaperSummary, PublishReceipt},
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    autosave::AutoSaveScheduler,
    change::{PaperChange, PaperPatch},
    clock::{Clock, SystemClock},
    config::EditorConfig,
    error::EditorError,
    history::{HistoryManager, Snapshot},
    validation::{validate, ValidationIssue},
    PersistenceGateway,
};

const IMPORT_COMPLETED_MESSAGE: &str = "Import completed";

#[derive(Debug, Clone)]
pub enum EditorEvent {
    /// The live paper was replaced or edited.
    PaperChanged,
    DirtyChanged(bool),
    Saved {
        paper_id: Option<PaperId>,
        at: DateTime<Utc>,
    },
    Published(PublishReceipt),
    /// Background auto-save failed; the paper stays dirty.
    AutoSaveFailed(String),
    Error(String),
}

struct EditorState {
    paper: Option<Paper>,
    history: HistoryManager,
    autosave: AutoSaveScheduler,
    dirty: bool,
    /// Bumped on every local change so a save response can tell whether the
    /// paper moved on while the request was in flight.
    revision: u64,
    inflight_calls: usize,
    last_message: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    paper_list: Vec<PaperSummary>,
    total: u64,
    last_query: PaperListQuery,
}

impl EditorState {
    fn set_dirty(&mut self, dirty: bool) -> bool {
        let changed = self.dirty != dirty;
        self.dirty = dirty;
        changed
    }

    fn identified(&self) -> bool {
        self.paper.as_ref().is_some_and(Paper::is_identified)
    }

    /// Installs `paper` as a fresh baseline: history holds only this paper
    /// and nothing is dirty.
    fn install_baseline(&mut self, paper: Paper) {
        self.autosave.cancel();
        match Snapshot::capture(&paper) {
            Ok(snapshot) => self.history.reset(snapshot),
            Err(err) => {
                warn!(error = %err, "editor: failed to capture baseline snapshot");
                self.history.clear();
            }
        }
        self.paper = Some(paper);
        self.dirty = false;
        self.revision += 1;
    }
}

/// Lowers the loading counter when a gateway call finishes or its future is
/// dropped mid-flight.
struct InflightGuard<'a>(&'a EditorEngine);

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state();
        state.inflight_calls = state.inflight_calls.saturating_sub(1);
    }
}

/// Orchestrates the paper being edited: history, dirty tracking, validation,
/// auto-save and persistence through a [`PersistenceGateway`].
///
/// Local edits are synchronous. Network operations suspend only on gateway
/// calls and never hold the state lock across an await.
pub struct EditorEngine {
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn Clock>,
    inner: Mutex<EditorState>,
    events: broadcast::Sender<EditorEvent>,
    this: Weak<EditorEngine>,
}

impl EditorEngine {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, config: EditorConfig) -> Arc<Self> {
        Self::new_with_clock(gateway, Arc::new(SystemClock), config)
    }

    pub fn new_with_clock(
        gateway: Arc<dyn PersistenceGateway>,
        clock: Arc<dyn Clock>,
        config: EditorConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new_cyclic(|this| Self {
            gateway,
            clock,
            inner: Mutex::new(EditorState {
                paper: None,
                history: HistoryManager::with_capacity(config.history_capacity),
                autosave: AutoSaveScheduler::new(config.autosave_enabled, config.autosave_delay),
                dirty: false,
                revision: 0,
                inflight_calls: 0,
                last_message: None,
                last_saved_at: None,
                paper_list: Vec::new(),
                total: 0,
                last_query: PaperListQuery::default(),
            }),
            events,
            this: this.clone(),
        })
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EditorEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    // --- read side ---

    pub fn paper(&self) -> Option<Paper> {
        self.state().paper.clone()
    }

    pub fn sections(&self) -> Vec<Section> {
        self.state()
            .paper
            .as_ref()
            .map(|paper| paper.sections.clone())
            .unwrap_or_default()
    }

    pub fn flattened_questions(&self) -> Vec<Question> {
        self.state()
            .paper
            .iter()
            .flat_map(|paper| paper.sections.iter())
            .flat_map(|section| section.questions.iter().cloned())
            .collect()
    }

    /// Issues for the live paper, recomputed on every call.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        validate(self.state().paper.as_ref())
    }

    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    pub fn is_loading(&self) -> bool {
        self.state().inflight_calls > 0
    }

    pub fn can_undo(&self) -> bool {
        self.state().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.state().history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.state().history.len()
    }

    pub fn last_message(&self) -> Option<String> {
        self.state().last_message.clone()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.state().last_saved_at
    }

    pub fn paper_list(&self) -> Vec<PaperSummary> {
        self.state().paper_list.clone()
    }

    pub fn total(&self) -> u64 {
        self.state().total
    }

    pub fn autosave_enabled(&self) -> bool {
        self.state().autosave.is_enabled()
    }

    pub fn autosave_pending(&self) -> bool {
        self.state().autosave.is_pending()
    }

    // --- local edits ---

    /// Applies `change` to the live paper, records the result in history,
    /// marks the paper dirty and re-arms auto-save. Returns `false` when
    /// there is no paper or the change addressed nothing.
    pub fn mutate(&self, change: PaperChange) -> bool {
        let mut state = self.state();
        let Some(paper) = state.paper.as_mut() else {
            debug!("editor: mutate ignored, no paper loaded");
            return false;
        };
        if !change.apply_to(paper) {
            debug!("editor: mutate addressed a missing section or question");
            return false;
        }

        match Snapshot::capture(paper) {
            Ok(snapshot) => state.history.record(snapshot),
            Err(err) => warn!(error = %err, "editor: failed to capture snapshot"),
        }
        state.revision += 1;
        let dirty_changed = state.set_dirty(true);
        self.arm_autosave(&mut state);
        drop(state);

        self.emit(EditorEvent::PaperChanged);
        if dirty_changed {
            self.emit(EditorEvent::DirtyChanged(true));
        }
        true
    }

    pub fn update_paper(&self, patch: PaperPatch) -> bool {
        self.mutate(PaperChange::Patch(patch))
    }

    pub fn replace_paper(&self, paper: Paper) -> bool {
        self.mutate(PaperChange::Replace(paper))
    }

    pub fn update_sections(&self, sections: Vec<Section>) -> bool {
        self.mutate(PaperChange::Sections(sections))
    }

    pub fn upsert_question(&self, section_seq: u32, question: Question) -> bool {
        self.mutate(PaperChange::UpsertQuestion {
            section_seq,
            question,
        })
    }

    pub fn upsert_option(&self, section_seq: u32, question_seq: u32, option: QuestionOption) -> bool {
        self.mutate(PaperChange::UpsertOption {
            section_seq,
            question_seq,
            option,
        })
    }

    /// Installs the default template locally. Nothing is persisted, so the
    /// paper is dirty and has no identity until the first save.
    pub fn new_draft(&self) -> Paper {
        let draft = Paper::default_template();
        let mut state = self.state();
        state.install_baseline(draft.clone());
        state.dirty = true;
        drop(state);
        self.emit(EditorEvent::PaperChanged);
        self.emit(EditorEvent::DirtyChanged(true));
        draft
    }

    pub fn undo(&self) -> bool {
        self.replay(HistoryManager::undo)
    }

    pub fn redo(&self) -> bool {
        self.replay(HistoryManager::redo)
    }

    fn replay(&self, step: fn(&mut HistoryManager) -> Option<Snapshot>) -> bool {
        let mut state = self.state();
        let Some(current) = state.paper.as_ref() else {
            return false;
        };
        let (current_id, current_status) = (current.id.clone(), current.status);

        state.history.begin_replay();
        let restored = step(&mut state.history).map(|snapshot| snapshot.restore());
        let installed = match restored {
            None => false,
            Some(Err(err)) => {
                error!(error = %err, "editor: history snapshot could not be restored");
                false
            }
            Some(Ok(mut restored)) => {
                // Identity and status come from the server; history never
                // rolls them back.
                if restored.id.is_none() {
                    restored.id = current_id;
                }
                if !current_status.permits_local_transition(restored.status) {
                    restored.status = current_status;
                }
                state.paper = Some(restored);
                state.revision += 1;
                true
            }
        };
        state.history.end_replay();
        if !installed {
            return false;
        }

        let dirty_changed = state.set_dirty(true);
        self.arm_autosave(&mut state);
        drop(state);

        self.emit(EditorEvent::PaperChanged);
        if dirty_changed {
            self.emit(EditorEvent::DirtyChanged(true));
        }
        true
    }

    /// Drops the paper, its history and any pending auto-save. Used on
    /// logout and when leaving the editor.
    pub fn clear(&self) {
        let mut state = self.state();
        state.autosave.cancel();
        state.history.clear();
        state.paper = None;
        state.dirty = false;
        state.revision += 1;
        state.last_message = None;
        state.last_saved_at = None;
        drop(state);
        self.emit(EditorEvent::PaperChanged);
    }

    pub fn set_autosave_enabled(&self, enabled: bool) {
        self.state().autosave.set_enabled(enabled);
        info!(enabled, "editor: autosave toggled");
    }

    fn arm_autosave(&self, state: &mut EditorState) {
        let dirty = state.dirty;
        let identified = state.identified();
        let engine = self.this.clone();
        state.autosave.arm(dirty, identified, move |generation| async move {
            if let Some(engine) = engine.upgrade() {
                engine.run_autosave(generation).await;
            }
        });
    }

    async fn run_autosave(&self, generation: u64) {
        let (paper_id, paper, revision) = {
            let mut state = self.state();
            if !state.autosave.claim(generation) {
                return;
            }
            let Some(paper) = state.paper.clone().filter(|_| state.dirty) else {
                return;
            };
            let Some(paper_id) = paper.id.clone() else {
                return;
            };
            (paper_id, paper, state.revision)
        };

        debug!(%paper_id, generation, "autosave: saving");
        match self.gateway.update_paper(&paper_id, &paper).await {
            Ok(saved) => {
                self.accept_saved(saved, revision);
            }
            Err(err) => {
                warn!(%paper_id, error = %err, "autosave: failed, paper stays dirty");
                self.emit(EditorEvent::AutoSaveFailed(err.message));
            }
        }
    }

    // --- persistence ---

    /// Runs a gateway call with the loading flag raised. On failure the
    /// message is stored, broadcast, and the error returned to the caller.
    async fn call<T, Fut>(&self, operation: &'static str, call: Fut) -> Result<T, EditorError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        {
            let mut state = self.state();
            state.inflight_calls += 1;
            state.last_message = None;
        }
        let inflight = InflightGuard(self);
        let result = call.await;
        drop(inflight);

        result.map_err(|err| {
            let err = EditorError::from(err);
            let message = err.to_string();
            error!(operation, error = %message, "editor: gateway call failed");
            self.state().last_message = Some(message.clone());
            self.emit(EditorEvent::Error(message));
            err
        })
    }

    pub async fn load(&self, paper_id: &PaperId) -> Result<Paper, EditorError> {
        let paper = self
            .call("load", self.gateway.get_paper(paper_id))
            .await?;
        info!(%paper_id, "editor: paper loaded");
        self.state().install_baseline(paper.clone());
        self.emit(EditorEvent::PaperChanged);
        self.emit(EditorEvent::DirtyChanged(false));
        Ok(paper)
    }

    /// Persists `template` (or the default template) as a new paper and
    /// makes the server's copy the live paper.
    pub async fn create_draft(&self, template: Option<Paper>) -> Result<Paper, EditorError> {
        let request = template.unwrap_or_else(Paper::default_template);
        let created = self
            .call("create", self.gateway.create_paper(&request))
            .await?;
        info!(paper_id = ?created.id, "editor: draft created");
        self.state().install_baseline(created.clone());
        self.emit(EditorEvent::PaperChanged);
        self.emit(EditorEvent::DirtyChanged(false));
        Ok(created)
    }

    /// Saves the live paper: creates it when it has no identity yet,
    /// otherwise sends the full paper as an update.
    pub async fn save(&self) -> Result<Paper, EditorError> {
        let (paper, revision) = {
            let state = self.state();
            (state.paper.clone(), state.revision)
        };
        let Some(paper) = paper else {
            return self.create_draft(None).await;
        };
        let Some(paper_id) = paper.id.clone() else {
            let created = self
                .call("create", self.gateway.create_paper(&paper))
                .await?;
            info!(paper_id = ?created.id, "editor: draft created on first save");
            return Ok(self.accept_created(created, revision));
        };

        let saved = self
            .call("save", self.gateway.update_paper(&paper_id, &paper))
            .await?;
        Ok(self.accept_saved(saved, revision))
    }

    fn accept_created(&self, created: Paper, revision: u64) -> Paper {
        let mut state = self.state();
        if state.revision == revision {
            state.install_baseline(created.clone());
            state.last_saved_at = Some(self.clock.now());
            drop(state);
            self.emit(EditorEvent::PaperChanged);
            self.emit(EditorEvent::DirtyChanged(false));
        } else {
            debug!("editor: paper changed while creating, keeping local edits");
            if let Some(paper) = state.paper.as_mut() {
                paper.id = created.id.clone();
            }
            state.last_saved_at = Some(self.clock.now());
            self.arm_autosave(&mut state);
        }
        created
    }

    fn accept_saved(&self, saved: Paper, revision: u64) -> Paper {
        let now = self.clock.now();
        let mut state = self.state();
        state.last_saved_at = Some(now);
        if state.revision != revision {
            debug!("editor: paper changed while saving, keeping local edits");
            if let Some(paper) = state.paper.as_mut() {
                if paper.id.is_none() {
                    paper.id = saved.id.clone();
                }
            }
            drop(state);
            self.emit(EditorEvent::Saved {
                paper_id: saved.id.clone(),
                at: now,
            });
            return saved;
        }

        let mut saved = saved;
        if let Some(current) = state.paper.as_ref() {
            // A publish that completed while this save was in flight wins
            // over the pre-publish copy the server echoed back. Status never
            // returns to Draft in place.
            if saved.status == PaperStatus::Draft && current.status != PaperStatus::Draft {
                debug!(local = %current.status, saved = %saved.status, "editor: keeping local status");
                saved.status = current.status;
            }
        }
        state.autosave.cancel();
        state.paper = Some(saved.clone());
        let dirty_changed = state.set_dirty(false);
        drop(state);

        self.emit(EditorEvent::PaperChanged);
        if dirty_changed {
            self.emit(EditorEvent::DirtyChanged(false));
        }
        self.emit(EditorEvent::Saved {
            paper_id: saved.id.clone(),
            at: now,
        });
        saved
    }

    /// Publishes the live paper guarded by `expected_version`. On conflict
    /// nothing local changes and the error is returned for the caller to
    /// re-fetch or prompt; it is never retried here.
    pub async fn publish(&self, expected_version: Option<i64>) -> Result<PublishReceipt, EditorError> {
        let paper_id = self
            .state()
            .paper
            .as_ref()
            .and_then(|paper| paper.id.clone())
            .ok_or(EditorError::NoPersistedPaper)?;

        let receipt = self
            .call(
                "publish",
                self.gateway.publish_paper(&paper_id, expected_version),
            )
            .await?;
        info!(%paper_id, version = ?receipt.version, "editor: paper published");

        {
            let mut state = self.state();
            if let Some(paper) = state.paper.as_mut() {
                paper.status = receipt.status.unwrap_or(PaperStatus::Published);
                if let Some(reconciled) = receipt.paper_id.clone() {
                    paper.id = Some(reconciled);
                }
            }
        }
        self.emit(EditorEvent::PaperChanged);
        self.emit(EditorEvent::Published(receipt.clone()));
        Ok(receipt)
    }

    /// Converts Markdown through the server. The live paper is left alone;
    /// the caller decides whether to adopt the result.
    pub async fn import_markdown(&self, markdown_text: &str) -> Result<ImportResult, EditorError> {
        let result = self
            .call("import", self.gateway.import_markdown(markdown_text))
            .await?;
        self.state().last_message = Some(IMPORT_COMPLETED_MESSAGE.to_string());
        Ok(result)
    }

    pub async fn fetch_list(&self, query: PaperListQuery) -> Result<PaperPage, EditorError> {
        let page = self
            .call("list", self.gateway.list_papers(&query))
            .await?;
        let mut state = self.state();
        state.paper_list = page.items.clone();
        state.total = page.total;
        state.last_query = query;
        Ok(page)
    }

    /// Duplicates a paper on the server and refreshes the list with the
    /// last query used.
    pub async fn duplicate_paper(&self, paper_id: &PaperId) -> Result<PaperId, EditorError> {
        let duplicated = self
            .call("duplicate", self.gateway.duplicate_paper(paper_id))
            .await?;
        info!(source = %paper_id, duplicate = %duplicated, "editor: paper duplicated");
        self.refresh_list().await?;
        Ok(duplicated)
    }

    pub async fn delete_paper(&self, paper_id: &PaperId) -> Result<(), EditorError> {
        self.call("delete", self.gateway.delete_paper(paper_id))
            .await?;
        info!(%paper_id, "editor: paper deleted");
        self.refresh_list().await
    }

    async fn refresh_list(&self) -> Result<(), EditorError> {
        let query = self.state().last_query.clone();
        self.fetch_list(query).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
