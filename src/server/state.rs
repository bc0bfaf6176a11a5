use std::sync::Arc;

use crate::overlay::Renderer;
use crate::settings::Settings;

#[derive(Clone)]
pub struct ServerState {
    pub(crate) settings: Arc<Settings>,
    pub(crate) renderer: Renderer,
}

impl ServerState {
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        Self {
            renderer: Renderer::new(Arc::clone(&settings)),
            settings,
        }
    }
}
