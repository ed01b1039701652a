//! Item routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::Serialize;

use crate::{AppState, error::ApiError, extractors::ItemForm};
use lectern_core::item::Item;

/// Creates the item routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items))
        .route("/items/{id}", get(get_item).delete(delete_item))
        .route("/upload", post(create_item))
        .route("/edit/{id}", put(edit_item))
}

/// Response for a deleted item.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Confirmation message.
    pub message: &'static str,
}

/// GET `/items`
/// List all items, newest first.
async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.item_service().list().await?;
    Ok(Json(items))
}

/// GET `/items/{id}`
async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let item = state.item_service().get(&id).await?;
    Ok(Json(item))
}

/// POST `/upload`
/// Create an item, uploading its thumbnail and audio file.
async fn create_item(
    State(state): State<AppState>,
    form: ItemForm,
) -> Result<Json<Item>, ApiError> {
    let item = state.item_service().create(form.fields, form.files).await?;
    Ok(Json(item))
}

/// PUT `/edit/{id}`
/// Update fields and replace files of an existing item.
async fn edit_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: ItemForm,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .item_service()
        .edit(&id, form.fields, form.files)
        .await?;
    Ok(Json(item))
}

/// DELETE `/items/{id}`
/// Delete an item together with its remote files.
async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.item_service().delete(&id).await?;
    Ok(Json(DeleteResponse {
        message: "Item deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use chrono::{TimeZone, Utc};
    use http_body_util::BodyExt;
    use lectern_core::storage::{StorageConfig, StorageProvider, StorageService};
    use lectern_db::entities::items;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::path::Path as FsPath;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "lectern-route-boundary";

    fn app(db: DatabaseConnection) -> (Router, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = StorageService::from_config(StorageConfig::new(StorageProvider::LocalFs {
            root: dir.path().to_path_buf(),
        }))
        .expect("local storage");
        let state = AppState {
            db: Arc::new(db),
            storage: Arc::new(storage),
        };
        (Router::new().merge(routes()).with_state(state), dir)
    }

    fn stored_files(dir: &FsPath) -> Vec<String> {
        std::fs::read_dir(dir)
            .expect("read storage dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn model(thumbnail: Option<&str>, audio_file: Option<&str>) -> items::Model {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        items::Model {
            id: Uuid::now_v7(),
            name: Some("Sermon 1".into()),
            date: at.into(),
            speaker: Some("Pastor Ade".into()),
            series: Some("Romans".into()),
            thumbnail: thumbnail.map(String::from),
            audio_file: audio_file.map(String::from),
            created_at: at.into(),
            updated_at: at.into(),
        }
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Body {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_list_items() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(Some("t1"), None), model(None, None)]])
            .into_connection();
        let (app, _dir) = app(db);

        let response = app
            .oneshot(Request::builder().uri("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let items = body.as_array().expect("array");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["thumbnail"], "t1");
        assert!(items[0]["audioFile"].is_null());
    }

    #[tokio::test]
    async fn test_get_item() {
        let row = model(Some("t1"), Some("a1"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row.clone()]])
            .into_connection();
        let (app, _dir) = app(db);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/items/{}", row.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], row.id.to_string());
        assert_eq!(body["audioFile"], "a1");
        assert_eq!(body["date"], "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_get_malformed_id_is_404() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (app, _dir) = app(db);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/items/not-a-valid-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Item not found");
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_missing_item_is_404_without_remote_calls() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<items::Model>::new()])
            .into_connection();
        let (app, dir) = app(db);
        std::fs::write(dir.path().join("keep.png"), b"png").unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/items/{}", Uuid::now_v7()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(stored_files(dir.path()), vec!["keep.png".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_item_removes_files() {
        let row = model(Some("cover.png"), Some("talk.mp3"));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let (app, dir) = app(db);
        std::fs::write(dir.path().join("cover.png"), b"png").unwrap();
        std::fs::write(dir.path().join("talk.mp3"), b"mp3").unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/items/{}", row.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await["message"],
            "Item deleted successfully"
        );
        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_upload_with_thumbnail_only() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(Some("stored-thumb"), None)]])
            .into_connection();
        let (app, dir) = app(db);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(
                        CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(multipart_body(&[
                        ("name", None, "Sermon 1"),
                        ("date", None, "2024-01-01"),
                        ("thumbnail", Some("cover.png"), "png-bytes"),
                        ("audioFile", Some(""), ""),
                    ]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(!body["thumbnail"].is_null());
        assert!(body["audioFile"].is_null());

        let files = stored_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("-cover.png"));
    }

    #[tokio::test]
    async fn test_upload_invalid_date_is_400_without_remote_calls() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (app, dir) = app(db);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(
                        CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(multipart_body(&[
                        ("date", None, "someday"),
                        ("thumbnail", Some("cover.png"), "png-bytes"),
                    ]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");
        assert!(stored_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_edit_replaces_thumbnail_and_deletes_old() {
        let existing = model(Some("old-cover.png"), None);
        let mut updated = existing.clone();
        updated.thumbnail = Some("new-cover-id".into());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![existing.clone()],
                vec![existing.clone()],
                vec![updated],
            ])
            .into_connection();
        let (app, dir) = app(db);
        std::fs::write(dir.path().join("old-cover.png"), b"old").unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/edit/{}", existing.id))
                    .header(
                        CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(multipart_body(&[("thumbnail", Some("new.png"), "new-bytes")]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["thumbnail"], "new-cover-id");

        let files = stored_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("-new.png"));
    }

    #[tokio::test]
    async fn test_edit_with_json_fields() {
        let existing = model(Some("t1"), Some("a1"));
        let mut updated = existing.clone();
        updated.speaker = Some("Guest Speaker".into());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![existing.clone()], vec![existing.clone()], vec![updated]])
            .into_connection();
        let (app, dir) = app(db);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/edit/{}", existing.id))
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"speaker":"Guest Speaker"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["speaker"], "Guest Speaker");
        assert_eq!(body["name"], "Sermon 1");
        assert_eq!(body["thumbnail"], "t1");
        assert!(stored_files(dir.path()).is_empty());
    }
}
