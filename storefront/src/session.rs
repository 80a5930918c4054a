use crate::cart::Cart;
use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub cart: Cart,
    #[serde(default)]
    pub checkout_address: String,
    #[serde(default)]
    pub checkout_phone: String,
}

/// Session state persisted to a JSON file; every mutation is written through.
pub struct SessionStore {
    path: PathBuf,
    data: SessionData,
}

impl SessionStore {
    /// Loads the session at `path`. A missing file is an empty session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let mut data = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => SessionData::default(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => SessionData::default(),
            Err(e) => return Err(e.into()),
        };
        data.cart.normalize();
        debug!(path = %path.display(), "Session loaded");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn token(&self) -> Option<&str> {
        self.data.token.as_deref()
    }

    pub fn set_token(&mut self, token: Option<String>) -> Result<(), ClientError> {
        self.data.token = token;
        self.save()
    }

    pub fn cart(&self) -> &Cart {
        &self.data.cart
    }

    /// Applies `change` to the cart and saves, returning whatever `change` returned.
    pub fn update_cart<R>(&mut self, change: impl FnOnce(&mut Cart) -> R) -> Result<R, ClientError> {
        let result = change(&mut self.data.cart);
        self.save()?;
        Ok(result)
    }

    pub fn set_draft(&mut self, address: &str, phone: &str) -> Result<(), ClientError> {
        self.data.checkout_address = address.to_string();
        self.data.checkout_phone = phone.to_string();
        self.save()
    }

    pub fn clear_draft(&mut self) -> Result<(), ClientError> {
        self.data.checkout_address.clear();
        self.data.checkout_phone.clear();
        self.save()
    }

    fn save(&self) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.data)?)?;
        Ok(())
    }
}
