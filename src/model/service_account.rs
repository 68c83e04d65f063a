use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CredentialLoadError;

/// A Google service-account key, as downloaded from the cloud console.
///
/// Only the fields the spreadsheet service needs are typed; everything else
/// is carried through untouched.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ServiceAccount {
    /// Read and parse a service-account file.
    pub fn load(path: &Path) -> Result<Self, CredentialLoadError> {
        let fail = |reason: String| CredentialLoadError {
            path: path.to_path_buf(),
            reason,
        };
        // File handle is released when the reader goes out of scope.
        let reader = BufReader::new(File::open(path).map_err(|e| fail(e.to_string()))?);
        serde_json::from_reader(reader).map_err(|e| fail(e.to_string()))
    }

    /// JSON object form handed to the spreadsheet service.
    pub fn to_value(&self) -> serde_json::Value {
        let mut object = self.extra.clone();
        object.insert("client_email".into(), self.client_email.clone().into());
        object.insert("private_key".into(), self.private_key.clone().into());
        serde_json::Value::Object(object)
    }
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}
