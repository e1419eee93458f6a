use std::io;
use std::path::Path;

use crate::error::UploadError;
use crate::services::uploader::Uploader;
use crate::utils::upload_file::{UploadForm, UploadedFile};
use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{
    body::SizedStream, http::Method, http::StatusCode, web, HttpResponse, Responder,
    ResponseError,
};
use futures_util::{stream, StreamExt};
use serde_json::json;
use tokio_util::io::ReaderStream;

/// Form field the image is expected under.
pub const IMAGE_FIELD: &str = "image";

#[derive(MultipartForm)]
pub struct ImageUploadForm {
    #[multipart(rename = "image")]
    image: Option<TempFile>,
    #[multipart(rename = "title")]
    title: Option<Text<String>>,
}

impl From<ImageUploadForm> for UploadForm {
    fn from(form: ImageUploadForm) -> Self {
        let mut upload_form = UploadForm::new();
        if let Some(title) = form.title {
            upload_form.insert_text("title", title.into_inner());
        }
        if let Some(image) = form.image {
            upload_form.insert_file(IMAGE_FIELD, UploadedFile::from_temp_file(image));
        }
        upload_form
    }
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::Move { .. } | UploadError::Read { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            UploadError::UnsupportedType { .. } => self.to_string(),
            // server side paths stay in the logs
            _ => "Could not store the uploaded file".to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

pub async fn upload_image(
    uploader: web::Data<Uploader>,
    MultipartForm(form): MultipartForm<ImageUploadForm>,
) -> Result<HttpResponse, actix_web::Error> {
    let mut form = UploadForm::from(form);
    let Some(file) = form.take_file(IMAGE_FIELD) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No file submitted in the `image` field",
        })));
    };

    tracing::debug!(
        title = form.text("title").unwrap_or_default(),
        name = %file.original_name(),
        client_mime = %file.client_mime_type(),
        "Received upload"
    );

    let uploader = uploader.into_inner();
    let stored = web::block(move || uploader.upload_file(file))
        .await?
        .map_err(|e| {
            if !matches!(e, UploadError::UnsupportedType { .. }) {
                tracing::error!(error = %e, "Upload failed");
            }
            e
        })?;

    let status = if stored.deduplicated {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok(HttpResponse::build(status).json(stored))
}

pub async fn serve_upload(
    name: web::Path<String>,
    method: Method,
    uploader: web::Data<Uploader>,
) -> impl Responder {
    let name = name.into_inner();
    if !is_single_component(&name) {
        return HttpResponse::NotFound().finish();
    }

    let path = uploader.target_dir().join(&name);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return HttpResponse::NotFound().finish();
        }
        Err(e) => {
            tracing::error!(name = %name, error = %e, "Could not open stored file");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let file_size = match file.metadata().await {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return HttpResponse::NotFound().finish(),
        Err(e) => {
            tracing::error!(name = %name, error = %e, "Could not stat stored file");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let stream = match method {
        // empty stream for HEAD requests
        Method::HEAD => stream::empty::<Result<_, io::Error>>().boxed_local(),

        // data stream for GET requests
        _ => ReaderStream::new(file).boxed_local(),
    };

    HttpResponse::Ok()
        .content_type(mime_guess::from_path(&name).first_or_octet_stream())
        .no_chunking(file_size)
        .body(SizedStream::new(file_size, stream))
}

/// A bare file name: no separators, no `..`, nothing hidden.
fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}
