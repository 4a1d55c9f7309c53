//! Request payloads shared between the server and its clients.
//!
//! Report responses are the engine's own serializable structures; only the
//! payloads that originate on the client side live here.

use serde::{Deserialize, Serialize};

pub mod editor {
    use super::*;

    /// Body of `POST /api/editor/validate` and
    /// `POST /api/editor/sheet/evaluate`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SheetRequest {
        pub content: String,
    }
}

pub mod prices {
    use super::*;

    /// Provider metadata exposed to the UI.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ProviderView {
        pub code: String,
        pub label: String,
        pub description: String,
    }
}
