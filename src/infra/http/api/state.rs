use std::sync::Arc;

use crate::application::auth::SharedSecret;
use crate::application::compile::CompileService;

#[derive(Clone)]
pub struct ApiState {
    pub compile: Arc<CompileService>,
    pub secret: Arc<SharedSecret>,
}
