//! Document workflows: the coordination layer between file storage, the
//! document table and the AI gateway. Handlers stay thin; the decisions
//! about what is fatal and what is best-effort live here.

use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ai::AiGateway;
use crate::db::document::{self, DocumentChanges, DocumentFilter, NewDocument};
use crate::entity::document::{DocStatus, Model};
use crate::error::Error;
use crate::filestore::FileStore;

/// Markdown marker used for generated documents.
const MARKDOWN_FILE_TYPE: &str = "md";

/// JSON body for creating a document without a file.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<DocStatus>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// JSON body for a partial update. Absent fields are left untouched;
/// supplied tags fully replace the previous set.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct UpdateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<DocStatus>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Decoded multipart upload.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub analyze: bool,
}

/// JSON body for AI document generation.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    #[serde(rename = "type")]
    pub document_type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A downloadable file plus its suggested client-side filename.
#[derive(Clone, Debug)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Lowercased extension of an uploaded filename, without the dot.
fn file_extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Store an uploaded file and create its document record.
///
/// When analysis is requested it is strictly best-effort: the saved file is
/// read back as text and sent to the gateway, and any failure along the way
/// is logged and dropped. The document is created either way.
pub async fn upload_create(
    conn: &DatabaseConnection,
    files: &FileStore,
    ai: &dyn AiGateway,
    owner_id: Uuid,
    request: UploadRequest,
) -> Result<Model, Error> {
    if request.filename.trim().is_empty() {
        return Err(Error::Validation("No file selected".to_string()));
    }

    let stored = files.save(owner_id, &request.filename, &request.bytes).await?;

    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| request.filename.clone());

    let analysis = if request.analyze {
        match analyze_stored_file(files, ai, &stored.path).await {
            Ok(analysis) => Some(analysis),
            Err(err) => {
                error!("Error analyzing document: {err}");
                None
            }
        }
    } else {
        None
    };

    document::create(
        conn,
        NewDocument {
            owner_id,
            title,
            content: request.description,
            file_path: Some(stored.path),
            file_type: file_extension(&request.filename),
            file_size: Some(stored.size),
            status: DocStatus::Draft,
            tags: request.tags,
            analysis,
        },
    )
    .await
}

/// Read a stored file back as text and run it through the gateway.
async fn analyze_stored_file(
    files: &FileStore,
    ai: &dyn AiGateway,
    path: &str,
) -> Result<String, Error> {
    let bytes = files.read(path).await?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::NoContent)?;
    ai.analyze(&text).await
}

/// Create a document from inline JSON. No file, no AI involvement.
pub async fn direct_create(
    conn: &DatabaseConnection,
    owner_id: Uuid,
    request: CreateDocumentRequest,
) -> Result<Model, Error> {
    if request.title.trim().is_empty() {
        return Err(Error::Validation("Missing required fields".to_string()));
    }

    document::create(
        conn,
        NewDocument {
            owner_id,
            title: request.title,
            content: request.content,
            status: request.status.unwrap_or_default(),
            tags: request.tags.unwrap_or_default(),
            ..Default::default()
        },
    )
    .await
}

pub async fn update_document(
    conn: &DatabaseConnection,
    owner_id: Uuid,
    id: Uuid,
    request: UpdateDocumentRequest,
) -> Result<Model, Error> {
    if let Some(title) = &request.title {
        if title.trim().is_empty() {
            return Err(Error::Validation("Title must not be empty".to_string()));
        }
    }

    document::update(
        conn,
        id,
        owner_id,
        DocumentChanges {
            title: request.title,
            content: request.content,
            status: request.status,
            tags: request.tags,
            analysis: None,
        },
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Document {id} not found")))
}

/// Delete a document and its stored file. File removal is best-effort: a
/// failure there never blocks removing the record.
pub async fn delete_document(
    conn: &DatabaseConnection,
    files: &FileStore,
    owner_id: Uuid,
    id: Uuid,
) -> Result<(), Error> {
    let Some(doc) = document::get(conn, id, owner_id).await? else {
        return Err(Error::NotFound(format!("Document {id} not found")));
    };

    if let Some(path) = &doc.file_path {
        if let Err(err) = files.delete(path).await {
            warn!("Failed to remove stored file for document {id}: {err}");
        }
    }

    if !document::delete(conn, id, owner_id).await? {
        // Lost a race with a concurrent delete
        return Err(Error::NotFound(format!("Document {id} not found")));
    }
    Ok(())
}

pub async fn list_documents(
    conn: &DatabaseConnection,
    owner_id: Uuid,
    filter: DocumentFilter,
) -> Result<Vec<Model>, Error> {
    document::list(conn, owner_id, filter).await
}

pub async fn get_document(
    conn: &DatabaseConnection,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Model, Error> {
    document::get(conn, id, owner_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Document {id} not found")))
}

/// Re-run analysis on an existing document. Unlike upload-time analysis this
/// is an explicit user action, so gateway failures propagate.
///
/// Content precedence: the stored file's text when present and readable,
/// otherwise the inline content field.
pub async fn analyze_existing(
    conn: &DatabaseConnection,
    files: &FileStore,
    ai: &dyn AiGateway,
    owner_id: Uuid,
    id: Uuid,
) -> Result<(String, Model), Error> {
    let doc = get_document(conn, owner_id, id).await?;

    let mut content: Option<String> = None;
    if let Some(path) = &doc.file_path {
        match files.read(path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) if !text.is_empty() => content = Some(text),
                Ok(_) => debug!("Stored file for document {id} is empty"),
                Err(_) => debug!("Stored file for document {id} is not text, falling back"),
            },
            Err(err) => debug!("Stored file for document {id} unreadable: {err}"),
        }
    }
    let content = content.or_else(|| doc.content.clone().filter(|c| !c.is_empty()));

    let Some(content) = content else {
        return Err(Error::NoContent);
    };

    let analysis = ai.analyze(&content).await?;

    let updated = document::update(
        conn,
        id,
        owner_id,
        DocumentChanges {
            analysis: Some(analysis.clone()),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("Document {id} not found")))?;

    Ok((analysis, updated))
}

/// Generate a new document via the gateway and persist it as a markdown
/// draft. Returns the record and the raw generated text.
pub async fn generate_create(
    conn: &DatabaseConnection,
    ai: &dyn AiGateway,
    owner_id: Uuid,
    request: GenerateRequest,
) -> Result<(Model, String), Error> {
    if request.document_type.trim().is_empty()
        || request.title.trim().is_empty()
        || request.description.trim().is_empty()
    {
        return Err(Error::Validation(
            "Missing required fields: title, type, or description".to_string(),
        ));
    }

    let content = ai
        .generate(&request.document_type, &request.title, &request.description)
        .await?;

    let doc = document::create(
        conn,
        NewDocument {
            owner_id,
            title: request.title,
            content: Some(content.clone()),
            file_type: Some(MARKDOWN_FILE_TYPE.to_string()),
            status: DocStatus::Draft,
            tags: request.tags.unwrap_or_default(),
            ..Default::default()
        },
    )
    .await?;

    Ok((doc, content))
}

/// Fetch a document's stored bytes for download, with a suggested filename
/// built from the title and stored file type.
pub async fn download(
    conn: &DatabaseConnection,
    files: &FileStore,
    owner_id: Uuid,
    id: Uuid,
) -> Result<Download, Error> {
    let doc = get_document(conn, owner_id, id).await?;

    let Some(path) = &doc.file_path else {
        return Err(Error::NotFound(format!(
            "Document {id} has no stored file"
        )));
    };

    let bytes = files.read(path).await?;

    let filename = match &doc.file_type {
        Some(ext) => format!("{}.{}", doc.title, ext),
        None => doc.title.clone(),
    };

    Ok(Download { bytes, filename })
}
