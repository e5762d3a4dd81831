pub mod error;
pub mod relay;
pub mod response;
pub mod router;
pub mod translate;

pub use error::RelayError;
pub use relay::RelayService;
pub use response::{ProxyErrorResponse, ResponseTranslator};
pub use router::{CapturedPath, PathRouter};
pub use translate::{BodyPolicy, OutboundBody, OutboundRequest, RequestTranslator};
