pub mod cleanup;
pub mod codec;
pub mod config;
pub mod entity;
pub mod http;
pub mod registry;
pub mod repository;
mod resolver;
pub mod session;

pub use cleanup::{CleanupFailure, CleanupHandle, CleanupReport, CleanupTracker, TrackerPhase};
pub use codec::{FieldNamingPolicy, JsonCodec};
pub use config::HttpSettings;
pub use entity::{Binding, Entity, EntityError, EntityNode, EntityResult};
pub use http::{HttpMethod, HttpResponse, HttpTransport, ReqwestTransport};
pub use registry::{DataRegistry, EntityFactory};
pub use repository::{DeletePolicy, Repository};
pub use session::Session;

pub mod prelude {
    pub use crate::cleanup::*;
    pub use crate::codec::*;
    pub use crate::config::*;
    pub use crate::entity::*;
    pub use crate::http::*;
    pub use crate::registry::*;
    pub use crate::repository::*;
    pub use crate::session::*;
}
