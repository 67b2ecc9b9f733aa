use rocket::http::{ContentType, Status};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    SessionNotFound(String),
    TermNotFound(String),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::InvalidRequest(_) => Status::BadRequest,
            ApiError::SessionNotFound(_) | ApiError::TermNotFound(_) => Status::NotFound,
        }
    }

    fn body(&self) -> String {
        let (error, message) = match self {
            ApiError::InvalidRequest(message) => ("Invalid request", message.clone()),
            ApiError::SessionNotFound(id) => ("Session not found", format!("No feed session '{}'", id)),
            ApiError::TermNotFound(term) => ("Term not found", format!("'{}' is not in the search history", term)),
        };
        json!({ "error": error, "message": message }).to_string()
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let body = self.body();
        rocket::Response::build()
            .status(self.status())
            .header(ContentType::JSON)
            .sized_body(body.len(), std::io::Cursor::new(body))
            .ok()
    }
}
