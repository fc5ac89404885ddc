//! Document repository for database operations.
//!
//! Implements document metadata persistence using SeaORM.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use tracing::debug;

use crate::entities::documents;
use docstore_core::document::{
    Document, DocumentError, DocumentFields, DocumentId,
    DocumentRepository as DocumentRepoTrait, NewDocument,
};

/// Document repository implementation.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    db: DatabaseConnection,
}

impl DocumentRepository {
    /// Create a new document repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Run a list query, newest upload first.
    async fn fetch(&self, query: Select<documents::Entity>) -> Result<Vec<Document>, DocumentError> {
        let models = query
            .order_by_desc(documents::Column::UploadedAt)
            .order_by_desc(documents::Column::Id)
            .all(&self.db)
            .await
            .map_err(persistence)?;

        Ok(models.into_iter().map(to_domain).collect())
    }
}

impl DocumentRepoTrait for DocumentRepository {
    async fn create(&self, input: NewDocument) -> Result<Document, DocumentError> {
        let uploaded_at: DateTimeWithTimeZone = input.uploaded_at.into();
        let active_model = documents::ActiveModel {
            title: Set(input.fields.title),
            institution_name: Set(input.fields.institution_name),
            institution_type: Set(input.fields.institution_type),
            institution_url: Set(input.fields.institution_url),
            document_type: Set(input.fields.document_type),
            description: Set(input.fields.description),
            object_key: Set(input.object_key),
            retrieval_url: Set(input.retrieval_url),
            size_label: Set(input.size_label),
            uploaded_at: Set(uploaded_at),
            updated_at: Set(uploaded_at),
            ..Default::default()
        };

        let model = active_model.insert(&self.db).await.map_err(persistence)?;

        debug!(document_id = model.id, object_key = %model.object_key, "Document row inserted");
        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, DocumentError> {
        let model = documents::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(persistence)?;

        Ok(model.map(to_domain))
    }

    async fn update_fields(
        &self,
        id: DocumentId,
        fields: DocumentFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Document>, DocumentError> {
        let Some(model) = documents::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(persistence)?
        else {
            return Ok(None);
        };

        // Only editable columns are set; the blob attributes stay unchanged.
        let mut active_model = model.into_active_model();
        active_model.title = Set(fields.title);
        active_model.institution_name = Set(fields.institution_name);
        active_model.institution_type = Set(fields.institution_type);
        active_model.institution_url = Set(fields.institution_url);
        active_model.document_type = Set(fields.document_type);
        active_model.description = Set(fields.description);
        active_model.updated_at = Set(updated_at.into());

        match active_model.update(&self.db).await {
            Ok(model) => Ok(Some(to_domain(model))),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(persistence(e)),
        }
    }

    async fn delete(&self, id: DocumentId) -> Result<bool, DocumentError> {
        let result = documents::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(persistence)?;

        Ok(result.rows_affected > 0)
    }

    async fn list_all(&self) -> Result<Vec<Document>, DocumentError> {
        self.fetch(documents::Entity::find()).await
    }

    async fn find_by_institution(
        &self,
        institution_name: &str,
    ) -> Result<Vec<Document>, DocumentError> {
        self.fetch(
            documents::Entity::find()
                .filter(documents::Column::InstitutionName.eq(institution_name)),
        )
        .await
    }

    async fn find_by_type(&self, document_type: &str) -> Result<Vec<Document>, DocumentError> {
        self.fetch(documents::Entity::find().filter(documents::Column::DocumentType.eq(document_type)))
            .await
    }

    async fn find_by_institution_and_type(
        &self,
        institution_name: &str,
        document_type: &str,
    ) -> Result<Vec<Document>, DocumentError> {
        self.fetch(
            documents::Entity::find()
                .filter(documents::Column::InstitutionName.eq(institution_name))
                .filter(documents::Column::DocumentType.eq(document_type)),
        )
        .await
    }

    async fn search_by_title(&self, fragment: &str) -> Result<Vec<Document>, DocumentError> {
        let pattern = format!("%{}%", escape_like(&fragment.to_lowercase()));

        self.fetch(documents::Entity::find().filter(
            Expr::expr(Func::lower(Expr::col(documents::Column::Title)))
                .like(LikeExpr::new(pattern).escape('\\')),
        ))
        .await
    }

    async fn list_object_keys(&self) -> Result<Vec<String>, DocumentError> {
        documents::Entity::find()
            .select_only()
            .column(documents::Column::ObjectKey)
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(persistence)
    }
}

fn persistence(err: DbErr) -> DocumentError {
    DocumentError::persistence(err.to_string())
}

/// Escape LIKE wildcards so the fragment matches literally.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Convert database model to domain model.
fn to_domain(model: documents::Model) -> Document {
    Document {
        id: model.id,
        title: model.title,
        institution_name: model.institution_name,
        institution_type: model.institution_type,
        institution_url: model.institution_url,
        document_type: model.document_type,
        description: model.description,
        object_key: model.object_key,
        retrieval_url: model.retrieval_url,
        size_label: model.size_label,
        uploaded_at: model.uploaded_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
