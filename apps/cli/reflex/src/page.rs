//! A page that renders to a terminal.
//!
//! Every element id the server binds to exists; each update is written as one
//! block to the output and remembered per element.

use reflex_client::session::Page;

use std::collections::HashMap;
use std::io::{Stdout, Write, stdout};
use std::sync::{Mutex, PoisonError};

use log::warn;

pub struct TerminalPage<W: Write + Send + 'static = Stdout> {
    output: Mutex<W>,
    rendered: Mutex<HashMap<String, String>>,
}

impl TerminalPage<Stdout> {
    pub fn stdout() -> Self {
        Self::with_writer(stdout())
    }
}

impl<W: Write + Send + 'static> TerminalPage<W> {
    pub fn with_writer(output: W) -> Self {
        Self {
            output: Mutex::new(output),
            rendered: Mutex::new(HashMap::new()),
        }
    }

    /// Last markup rendered for `id`.
    pub fn rendered(&self, id: &str) -> Option<String> {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

impl<W: Write + Send + 'static> Page for TerminalPage<W> {
    type Element = String;

    fn element_by_id(&self, id: &str) -> Option<String> {
        Some(id.to_string())
    }

    fn set_content(&self, element: &String, markup: &str) {
        self.rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(element.clone(), markup.to_string());

        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        let written = writeln!(output, "[{element}]")
            .and_then(|()| writeln!(output, "{markup}"))
            .and_then(|()| output.flush());

        if let Err(e) = written {
            warn!("Failed to render update for '{element}': {e}");
        }
    }
}
