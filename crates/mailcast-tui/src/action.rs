//! Action enum: all user-initiated intents.
//! Components produce Actions; the App dispatches them.

use mailcast_proto::Filter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Fetch ────────────────────────────────────────────────────────────────
    Search(Filter),
    Refresh, // search again with the current filter values
    FetchLatest,

    // ── Playback ─────────────────────────────────────────────────────────────
    Stream(String), // message id
    TogglePause,
    Stop,

    // ── Download ─────────────────────────────────────────────────────────────
    Download(String), // message id

    // ── Focus ────────────────────────────────────────────────────────────────
    FocusFilter,
    FocusList,

    Quit,
}
