//! Request bodies for setup, create and update

use stampede_http::UserPayload;
use uuid::Uuid;

const DATE_OF_BIRTH: &str = "1990-01-01";
const UPDATED_DATE_OF_BIRTH: &str = "1991-01-01";
const GENDER: &str = "Other";

/// Builds user payloads that never collide on unique fields
///
/// Every run gets a short tag so setup users from consecutive runs against
/// the same target do not clash on username or email.
#[derive(Debug, Clone)]
pub struct PayloadFactory {
    run_tag: String,
}

impl Default for PayloadFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadFactory {
    pub fn new() -> Self {
        let mut tag = Uuid::new_v4().simple().to_string();
        tag.truncate(8);
        Self { run_tag: tag }
    }

    pub fn with_run_tag(run_tag: impl Into<String>) -> Self {
        Self {
            run_tag: run_tag.into(),
        }
    }

    pub fn run_tag(&self) -> &str {
        &self.run_tag
    }

    /// Pool user number `index` (0-based)
    pub fn setup(&self, index: usize) -> UserPayload {
        UserPayload {
            name: format!("Setup User {}", index),
            username: format!("setup_{}_{}", self.run_tag, index),
            email: format!("setup_{}_{}@loadtest.local", self.run_tag, index),
            date_of_birth: Some(DATE_OF_BIRTH.to_string()),
            gender: Some(GENDER.to_string()),
            location: Some("BR".to_string()),
        }
    }

    /// A brand new user for a create iteration
    pub fn create(&self) -> UserPayload {
        let id = Uuid::new_v4().simple();
        UserPayload {
            name: format!("User {}", id),
            username: format!("user_{}", id),
            email: format!("{}@loadtest.local", id),
            date_of_birth: Some(DATE_OF_BIRTH.to_string()),
            gender: Some(GENDER.to_string()),
            location: Some("BR".to_string()),
        }
    }

    /// New field values for an update by `vu` on `iteration`
    pub fn update(&self, vu: u32, iteration: u64) -> UserPayload {
        UserPayload {
            name: format!("User Updated by VU {} #{}", vu, iteration),
            username: format!("upd_{}_{}_{}", self.run_tag, vu, iteration),
            email: format!("upd_{}_{}_{}@loadtest.local", self.run_tag, vu, iteration),
            date_of_birth: Some(UPDATED_DATE_OF_BIRTH.to_string()),
            gender: Some(GENDER.to_string()),
            location: Some(format!("Location VU {} iteration {}", vu, iteration)),
        }
    }
}
