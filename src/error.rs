use ffmpeg_next as ffmpeg;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("missing credential: {0} is not set")]
    CredentialMissing(&'static str),

    #[error("script generation failed: {0}")]
    Generation(String),

    #[error("image lookup failed: {0}")]
    ImageLookup(String),

    #[error("failed to download image {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode image {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("video encoding error: {0}")]
    Encode(String),

    #[error("script is empty, nothing to assemble")]
    EmptyScript,

    #[error("font error: {0}")]
    Font(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg::Error),
}

pub type Result<T> = std::result::Result<T, VideoError>;
