//! Abstract texture query RPC.

use crate::core::SubmapId;
use crate::texture::{CodecError, TextureResponse};

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Per-fetch failures. None of these is fatal: the fetch is abandoned,
/// the record stays stale, and the next metadata update retries.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The call failed or returned no response.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The response carried an empty texture list.
    #[error("response carried no textures")]
    EmptyResponse,
    /// The payload did not decompress to the declared dimensions.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Request/response seam to the remote map service.
///
/// Implementations are expected to block for the duration of the call;
/// timeouts are the transport's concern, not the scheduler's.
pub trait TextureQuery: Send + Sync {
    fn fetch_textures(&self, id: SubmapId) -> FetchResult<TextureResponse>;
}
