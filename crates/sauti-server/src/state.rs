//! Application state management

use sauti_core::{AudioSink, SpeechGenerator, SpeechSession};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
pub struct AppState<S: AudioSink> {
    pub session: Arc<Mutex<SpeechSession<S>>>,
    pub generator: Arc<dyn SpeechGenerator>,
}

impl<S: AudioSink> AppState<S> {
    pub fn new(session: SpeechSession<S>, generator: Arc<dyn SpeechGenerator>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            generator,
        }
    }
}

impl<S: AudioSink> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            generator: self.generator.clone(),
        }
    }
}
