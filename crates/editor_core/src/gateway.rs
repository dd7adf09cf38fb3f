use async_trait::async_trait;
use shared::{
    domain::{AssignmentId, Paper, PaperId, SessionId},
    error::ApiError,
    protocol::{ImportResult, PaperListQuery, PaperPage, PublishReceipt, ScheduleAssignment},
};

/// Server-side paper storage consumed by the editor engine.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn list_papers(&self, query: &PaperListQuery) -> Result<PaperPage, ApiError>;
    async fn get_paper(&self, paper_id: &PaperId) -> Result<Paper, ApiError>;
    async fn create_paper(&self, paper: &Paper) -> Result<Paper, ApiError>;
    async fn update_paper(&self, paper_id: &PaperId, paper: &Paper) -> Result<Paper, ApiError>;
    /// Publishes guarded by `version`. A version mismatch fails with
    /// [`shared::error::ErrorCode::Conflict`].
    async fn publish_paper(
        &self,
        paper_id: &PaperId,
        version: Option<i64>,
    ) -> Result<PublishReceipt, ApiError>;
    async fn duplicate_paper(&self, paper_id: &PaperId) -> Result<PaperId, ApiError>;
    async fn delete_paper(&self, paper_id: &PaperId) -> Result<(), ApiError>;
    async fn import_markdown(&self, markdown_text: &str) -> Result<ImportResult, ApiError>;
}

/// Assignment of papers to schedule sessions. Conflicts surface as
/// `Conflict`, sessions that already started as `Locked`.
#[async_trait]
pub trait AssignmentGateway: Send + Sync {
    async fn create_assignment(
        &self,
        session_id: &SessionId,
        assignment: &ScheduleAssignment,
    ) -> Result<ScheduleAssignment, ApiError>;
    async fn update_assignment(
        &self,
        session_id: &SessionId,
        assignment_id: &AssignmentId,
        assignment: &ScheduleAssignment,
    ) -> Result<ScheduleAssignment, ApiError>;
    async fn delete_assignment(
        &self,
        session_id: &SessionId,
        assignment_id: &AssignmentId,
    ) -> Result<(), ApiError>;
}
