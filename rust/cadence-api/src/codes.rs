//! Application response codes.
//!
//! Each [`Code`] maps to an HTTP status and to a localized title/body pair
//! shown to API consumers. The language is picked from `Accept-Language`.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Application-level result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    Success,
    Created,
    Accepted,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    TooManyRequests,
    ContextDeadlineExceeded,
    InternalServerError,
    ServiceUnavailable,
}

/// Supported display languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Indonesian,
}

impl Language {
    /// Pick the display language from an `Accept-Language` header value.
    ///
    /// Only the first listed tag is considered. Anything other than
    /// Indonesian falls back to English.
    #[must_use]
    pub fn from_accept_language(header: &str) -> Self {
        let primary = header
            .split(',')
            .next()
            .and_then(|tag| tag.split(';').next())
            .and_then(|tag| tag.trim().split(['-', '_']).next())
            .unwrap_or_default();

        if primary.eq_ignore_ascii_case("id") {
            Self::Indonesian
        } else {
            Self::English
        }
    }
}

/// Localized title and body for a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DisplayMessage {
    pub title: String,
    pub body: String,
}

impl Code {
    /// Numeric code reported in `metadata.error.code`.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Success => 1000,
            Self::Created => 1001,
            Self::Accepted => 1002,
            Self::BadRequest => 4000,
            Self::Unauthorized => 4001,
            Self::Forbidden => 4003,
            Self::NotFound => 4004,
            Self::ContextDeadlineExceeded => 4008,
            Self::Conflict => 4009,
            Self::TooManyRequests => 4029,
            Self::InternalServerError => 5000,
            Self::ServiceUnavailable => 5003,
        }
    }

    /// HTTP status the code is emitted with.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::Created => StatusCode::CREATED,
            Self::Accepted => StatusCode::ACCEPTED,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ContextDeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            Self::Conflict => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Created | Self::Accepted)
    }

    /// Title and body in the requested language.
    #[must_use]
    pub fn display(self, language: Language) -> DisplayMessage {
        let (title, body) = match language {
            Language::English => self.english(),
            Language::Indonesian => self.indonesian(),
        };
        DisplayMessage {
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    const fn english(self) -> (&'static str, &'static str) {
        match self {
            Self::Success => ("Success", "Request successful."),
            Self::Created => ("Created", "Resource created successfully."),
            Self::Accepted => ("Accepted", "Request accepted for processing."),
            Self::BadRequest => ("Bad Request", "Invalid input. Please validate your input."),
            Self::Unauthorized => (
                "Unauthorized",
                "Unauthorized access. You are not authorized to access this resource.",
            ),
            Self::Forbidden => (
                "Forbidden",
                "You do not have permission to access this resource.",
            ),
            Self::NotFound => (
                "Not Found",
                "Record does not exist. Please validate your input or contact the administrator.",
            ),
            Self::ContextDeadlineExceeded => (
                "Request Timeout",
                "Request took too long to process. Please try again.",
            ),
            Self::Conflict => ("Conflict", "Record already exists."),
            Self::TooManyRequests => (
                "Too Many Requests",
                "Too many requests. Please try again later.",
            ),
            Self::InternalServerError => (
                "Internal Server Error",
                "Internal server error. Please contact the administrator.",
            ),
            Self::ServiceUnavailable => (
                "Service Unavailable",
                "Service is temporarily unavailable. Please try again later.",
            ),
        }
    }

    const fn indonesian(self) -> (&'static str, &'static str) {
        match self {
            Self::Success => ("Sukses", "Permintaan berhasil."),
            Self::Created => ("Dibuat", "Data berhasil dibuat."),
            Self::Accepted => ("Diterima", "Permintaan diterima untuk diproses."),
            Self::BadRequest => (
                "Permintaan Tidak Valid",
                "Masukan tidak valid. Silakan periksa kembali masukan Anda.",
            ),
            Self::Unauthorized => (
                "Tidak Diizinkan",
                "Akses tidak sah. Anda tidak diizinkan mengakses sumber daya ini.",
            ),
            Self::Forbidden => (
                "Terlarang",
                "Anda tidak memiliki izin untuk mengakses sumber daya ini.",
            ),
            Self::NotFound => (
                "Tidak Ditemukan",
                "Data tidak ditemukan. Silakan periksa masukan Anda atau hubungi administrator.",
            ),
            Self::ContextDeadlineExceeded => (
                "Waktu Habis",
                "Permintaan memakan waktu terlalu lama. Silakan coba lagi.",
            ),
            Self::Conflict => ("Konflik", "Data sudah ada."),
            Self::TooManyRequests => (
                "Terlalu Banyak Permintaan",
                "Terlalu banyak permintaan. Silakan coba lagi nanti.",
            ),
            Self::InternalServerError => (
                "Kesalahan Server",
                "Terjadi kesalahan pada server. Silakan hubungi administrator.",
            ),
            Self::ServiceUnavailable => (
                "Layanan Tidak Tersedia",
                "Layanan sedang tidak tersedia. Silakan coba lagi nanti.",
            ),
        }
    }
}
