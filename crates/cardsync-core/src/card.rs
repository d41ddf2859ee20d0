//! Declarative card loading.
//!
//! A card document looks like:
//!
//! ```json
//! {
//!   "templates": { ... },
//!   "card": {
//!     "log_id": "module_a_dynamic_form",
//!     "variables": [ { "name": "is_liked", "type": "boolean", "value": 0 } ],
//!     "states": [ ... ]
//!   }
//! }
//! ```
//!
//! Only `card.log_id` (the engine scope) and `card.variables` are
//! interpreted; the whole document is kept for the renderer.

use cardsync_types::{CardError, CardSource, VariableDecl};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BUNDLED_SUBDIR: &str = "mock";

/// Cards shipped with the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCard {
    Baseline,
    ModuleA,
}

impl BuiltinCard {
    pub const ALL: [BuiltinCard; 2] = [BuiltinCard::Baseline, BuiltinCard::ModuleA];

    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Baseline => "baseline-hello-world",
            Self::ModuleA => "module-a-dynamic-form",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "baseline" => Some(Self::Baseline),
            "module_a" | "module-a" => Some(Self::ModuleA),
            _ => None,
        }
    }
}

impl fmt::Display for BuiltinCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Baseline => write!(f, "baseline"),
            Self::ModuleA => write!(f, "module_a"),
        }
    }
}

/// Resolves and parses card documents.
#[derive(Debug, Clone)]
pub struct CardLoader {
    cards_dir: PathBuf,
}

impl CardLoader {
    pub fn new(cards_dir: impl Into<PathBuf>) -> Self {
        Self { cards_dir: cards_dir.into() }
    }

    pub fn cards_dir(&self) -> &Path {
        &self.cards_dir
    }

    /// Locate a built-in card: the bundled subdirectory first, then the
    /// cards directory itself.
    pub fn resolve(&self, card: BuiltinCard) -> Result<PathBuf, CardError> {
        let file_name = format!("{}.json", card.file_stem());
        let candidates = [
            self.cards_dir.join(BUNDLED_SUBDIR).join(&file_name),
            self.cards_dir.join(&file_name),
        ];

        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| CardError::NotFound { name: card.file_stem().to_string() })
    }

    pub async fn load_builtin(&self, card: BuiltinCard) -> Result<CardSource, CardError> {
        let path = self.resolve(card)?;
        Self::load(&path).await
    }

    /// Async read and parse.
    pub async fn load(path: &Path) -> Result<CardSource, CardError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| read_error(path, &e))?;
        let card = Self::parse(&content, &path.display().to_string())?;
        info!(path = %path.display(), scope = %card.scope_id, "📄 Card loaded");
        Ok(card)
    }

    pub fn from_path(path: &Path) -> Result<CardSource, CardError> {
        let content = std::fs::read_to_string(path).map_err(|e| read_error(path, &e))?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_json(content: &str) -> Result<CardSource, CardError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> Result<CardSource, CardError> {
        let document: serde_json::Value =
            serde_json::from_str(content).map_err(|e| CardError::from_json_error(&e))?;

        let card = document
            .get("card")
            .filter(|c| c.is_object())
            .ok_or_else(|| CardError::MissingCard { path: origin.to_string() })?;

        let scope_id = card
            .get("log_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CardError::Parse { message: "card.log_id is missing".to_string() })?
            .to_string();

        let variables: Vec<VariableDecl> = match card.get("variables") {
            Some(raw) => serde_json::from_value(raw.clone())
                .map_err(|e| CardError::Parse { message: format!("card.variables: {}", e) })?,
            None => Vec::new(),
        };

        for decl in &variables {
            if decl.initial_value().is_none() {
                return Err(CardError::InvalidVariable {
                    name: decl.name.clone(),
                    message: format!("{} is not a valid {} value", decl.value, decl.kind),
                });
            }
        }

        debug!(scope = %scope_id, variables = variables.len(), "Card parsed");
        Ok(CardSource { scope_id, variables, document })
    }
}

fn read_error(path: &Path, e: &std::io::Error) -> CardError {
    if e.kind() == std::io::ErrorKind::NotFound {
        CardError::NotFound { name: path.display().to_string() }
    } else {
        CardError::Parse { message: format!("failed to read {}: {}", path.display(), e) }
    }
}
