//! In-memory stand-ins for the player and the save dialog.

use std::sync::{Arc, Mutex};

use crate::save::SaveAs;
use crate::session::MediaPlayer;

#[derive(Debug)]
pub struct FakePlayer {
    pub loads: Vec<String>,
    pub source: Option<String>,
    pub paused: bool,
    pub fail_load: bool,
    pub fail_unload: bool,
}

impl Default for FakePlayer {
    fn default() -> Self {
        Self {
            loads: Vec::new(),
            source: None,
            paused: true,
            fail_load: false,
            fail_unload: false,
        }
    }
}

impl MediaPlayer for FakePlayer {
    async fn load(&mut self, url: &str) -> anyhow::Result<()> {
        if self.fail_load {
            anyhow::bail!("load refused");
        }
        self.loads.push(url.to_string());
        self.source = Some(url.to_string());
        self.paused = false;
        Ok(())
    }

    async fn set_paused(&mut self, paused: bool) -> anyhow::Result<()> {
        if self.source.is_some() {
            self.paused = paused;
        }
        Ok(())
    }

    async fn unload(&mut self) -> anyhow::Result<()> {
        self.source = None;
        self.paused = true;
        if self.fail_unload {
            anyhow::bail!("unload refused");
        }
        Ok(())
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Records every save request instead of touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct RecordingSaver {
    pub saved: Arc<Mutex<Vec<(String, String)>>>,
    pub fail: bool,
}

impl RecordingSaver {
    pub fn saved(&self) -> Vec<(String, String)> {
        self.saved.lock().unwrap().clone()
    }
}

impl SaveAs for RecordingSaver {
    fn save_as(&self, url: &str, file_name: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("save dialog unavailable");
        }
        self.saved
            .lock()
            .unwrap()
            .push((url.to_string(), file_name.to_string()));
        Ok(())
    }
}
